//! Extra `genpdf` elements used by the built-in renderer.

use image::GenericImageView;

use genpdf::elements::Image;
use genpdf::error::Error;
use genpdf::style::Style;
use genpdf::{render, Alignment, Element, Mm, RenderResult, Scale, Size};

use crate::model::HorizontalAlignment;

/// Resolution `genpdf` assumes for images without an explicit DPI.
const DEFAULT_IMAGE_DPI: f64 = 300.0;
const MM_PER_INCH: f64 = 25.4;

pub(crate) fn mm_from_f64(value: f64) -> Mm {
    Mm::from(printpdf::Mm(value))
}

pub(crate) fn mm_to_f64(value: Mm) -> f64 {
    let mm: printpdf::Mm = value.into();
    mm.0
}

fn estimated_image_size(image: &image::DynamicImage, dpi: f64) -> Size {
    let (px_width, px_height) = image.dimensions();
    let width_mm = MM_PER_INCH * (px_width as f64) / dpi;
    let height_mm = MM_PER_INCH * (px_height as f64) / dpi;
    Size::new(mm_from_f64(width_mm), mm_from_f64(height_mm))
}

pub(crate) fn alignment(alignment: HorizontalAlignment) -> Alignment {
    match alignment {
        HorizontalAlignment::Left => Alignment::Left,
        HorizontalAlignment::Center => Alignment::Center,
        HorizontalAlignment::Right => Alignment::Right,
    }
}

/// An image drawn at a requested physical size, shrunk uniformly when the
/// remaining area is smaller so that it never spills onto the next page.
pub struct FittedImage {
    image: Image,
    natural_size: Size,
    width_mm: f64,
    height_mm: f64,
}

impl FittedImage {
    /// Wraps an RGB image; `genpdf` rejects images with an alpha channel.
    pub fn from_dynamic_image(
        image: image::DynamicImage,
        width_mm: f64,
        height_mm: f64,
    ) -> Result<Self, Error> {
        let natural_size = estimated_image_size(&image, DEFAULT_IMAGE_DPI);
        let image = Image::from_dynamic_image(image)?;
        Ok(Self {
            image,
            natural_size,
            width_mm,
            height_mm,
        })
    }

    /// Sets the horizontal alignment and returns the updated element.
    pub fn with_alignment(mut self, alignment: HorizontalAlignment) -> Self {
        self.image.set_alignment(self::alignment(alignment));
        self
    }

    /// Factor (at most 1) by which the requested size must shrink to fit `available`.
    fn fit_factor(&self, available: Size) -> f64 {
        let width = mm_to_f64(available.width);
        let height = mm_to_f64(available.height);
        let mut factor: f64 = 1.0;
        if self.width_mm > width && self.width_mm > f64::EPSILON {
            factor = factor.min(width / self.width_mm);
        }
        if self.height_mm > height && self.height_mm > f64::EPSILON {
            factor = factor.min(height / self.height_mm);
        }
        factor.max(0.0)
    }
}

impl Element for FittedImage {
    fn render(
        &mut self,
        context: &genpdf::Context,
        area: render::Area<'_>,
        style: Style,
    ) -> Result<RenderResult, Error> {
        let natural_width = mm_to_f64(self.natural_size.width);
        let natural_height = mm_to_f64(self.natural_size.height);
        if natural_width > f64::EPSILON && natural_height > f64::EPSILON {
            let factor = self.fit_factor(area.size());
            self.image.set_scale(Scale::new(
                self.width_mm * factor / natural_width,
                self.height_mm * factor / natural_height,
            ));
        }
        self.image.render(context, area, style)
    }
}
