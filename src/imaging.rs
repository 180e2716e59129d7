//! Decoding and normalisation of uploaded images.
//!
//! Every image that ends up in a report goes through [`normalize_logo`] or
//! [`normalize_photo`]: it is decoded once, flattened over white into a
//! three-channel RGB buffer and re-encoded. The resulting [`NormalizedImage`] is
//! an owned value that is moved into the document's media store, so decoded
//! pixel buffers never outlive the embed step.

use std::io::Cursor;

use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImage, GenericImageView, ImageOutputFormat, ImageResult, Rgb, RgbImage};

const JPEG_QUALITY: u8 = 85;
const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// Container format of a normalized image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Jpeg,
}

impl ImageKind {
    /// File extension used for media parts.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
        }
    }

    /// MIME type registered in the package content types.
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }

    /// Maps a media part extension back to the kind.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            _ => None,
        }
    }
}

/// An encoded RGB image with known pixel dimensions.
#[derive(Clone, Debug, PartialEq)]
pub struct NormalizedImage {
    bytes: Vec<u8>,
    kind: ImageKind,
    width_px: u32,
    height_px: u32,
}

impl NormalizedImage {
    pub(crate) fn from_parts(bytes: Vec<u8>, kind: ImageKind, width_px: u32, height_px: u32) -> Self {
        Self {
            bytes,
            kind,
            width_px,
            height_px,
        }
    }

    /// Wraps already-encoded bytes, reading the pixel size from the data.
    pub fn from_encoded(bytes: Vec<u8>, kind: ImageKind) -> ImageResult<Self> {
        let (width_px, height_px) = decode_image_from_bytes(&bytes)?.dimensions();
        Ok(Self::from_parts(bytes, kind, width_px, height_px))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn kind(&self) -> ImageKind {
        self.kind
    }

    pub fn width_px(&self) -> u32 {
        self.width_px
    }

    pub fn height_px(&self) -> u32 {
        self.height_px
    }

    /// Decodes the stored bytes again.
    pub fn to_dynamic(&self) -> ImageResult<DynamicImage> {
        decode_image_from_bytes(&self.bytes)
    }
}

/// Loads an image from in-memory bytes, guessing the format from its signature.
pub fn decode_image_from_bytes(bytes: impl AsRef<[u8]>) -> ImageResult<DynamicImage> {
    image::load_from_memory(bytes.as_ref())
}

/// Composites the image over a white background and drops the alpha channel.
pub fn flatten_to_rgb(image: &DynamicImage) -> RgbImage {
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    RgbImage::from_fn(width, height, |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let blend = |channel: u8| -> u8 {
            let alpha = u16::from(a);
            ((u16::from(channel) * alpha + 255 * (255 - alpha)) / 255) as u8
        };
        Rgb([blend(r), blend(g), blend(b)])
    })
}

/// Normalizes a logo: RGB, original pixel size, PNG.
pub fn normalize_logo(bytes: impl AsRef<[u8]>) -> ImageResult<NormalizedImage> {
    let decoded = decode_image_from_bytes(bytes)?;
    let rgb = flatten_to_rgb(&decoded);
    let (width, height) = rgb.dimensions();
    let encoded = encode(rgb, ImageOutputFormat::Png)?;
    Ok(NormalizedImage::from_parts(encoded, ImageKind::Png, width, height))
}

/// Normalizes a photo into a fixed pixel box: RGB, letterboxed on white, JPEG.
///
/// The photo is scaled to fit inside `box_px` with its aspect ratio intact and
/// centred on a white canvas of exactly that size.
pub fn normalize_photo(bytes: impl AsRef<[u8]>, box_px: (u32, u32)) -> ImageResult<NormalizedImage> {
    let decoded = decode_image_from_bytes(bytes)?;
    let rgb = flatten_to_rgb(&decoded);
    let (box_width, box_height) = (box_px.0.max(1), box_px.1.max(1));

    let (width, height) = rgb.dimensions();
    let scale = (f64::from(box_width) / f64::from(width)).min(f64::from(box_height) / f64::from(height));
    let fitted_width = ((f64::from(width) * scale).round() as u32).clamp(1, box_width);
    let fitted_height = ((f64::from(height) * scale).round() as u32).clamp(1, box_height);
    let resized = imageops::resize(&rgb, fitted_width, fitted_height, FilterType::Triangle);

    let mut canvas = RgbImage::from_pixel(box_width, box_height, WHITE);
    canvas.copy_from(
        &resized,
        (box_width - fitted_width) / 2,
        (box_height - fitted_height) / 2,
    )?;

    let encoded = encode(canvas, ImageOutputFormat::Jpeg(JPEG_QUALITY))?;
    Ok(NormalizedImage::from_parts(encoded, ImageKind::Jpeg, box_width, box_height))
}

fn encode(image: RgbImage, format: ImageOutputFormat) -> ImageResult<Vec<u8>> {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(image).write_to(&mut Cursor::new(&mut bytes), format)?;
    Ok(bytes)
}
