use log::{info, warn};

use crate::config::ReportConfig;
use crate::dataset::Row;
use crate::error::RowAssetError;
use crate::imaging;
use crate::model::{Block, HorizontalAlignment, ImageBlock, Page, PageKind, ReportBuilder};
use crate::photos::PhotoIndex;
use crate::richtext::Span;

use super::{PhotoOutcome, MM_PER_CM};

/// Adds one content page for `row`: the bold identifier line, then the photo or a placeholder.
///
/// A photo that fails to decode yields the invalid-image placeholder; the page is still added.
pub fn build_content_page(
    builder: &mut ReportBuilder,
    row: &Row,
    photos: &PhotoIndex,
    config: &ReportConfig,
) -> PhotoOutcome {
    let labels = &config.labels;
    let layout = &config.layout;

    let mut label = format!("{}: {}", labels.id_label, row.id());
    if let Some(location) = row.location() {
        label.push_str(" | ");
        label.push_str(location);
    }
    let mut page =
        Page::new(PageKind::Content).with_block(Block::paragraph(vec![Span::new(label).bold()]));

    let outcome = match photos.get(row.id()) {
        None => {
            info!("No photo matches '{}'", row.id());
            page.push(Block::paragraph(vec![Span::new(labels.photo_not_found.clone())]));
            PhotoOutcome::NotFound
        }
        Some(asset) => match imaging::normalize_photo(asset.content(), layout.photo_box_px()) {
            Ok(photo) => {
                let media = builder.register_media(photo);
                page.push(Block::Image(
                    ImageBlock::new(
                        media,
                        layout.photo_width_cm * MM_PER_CM,
                        layout.photo_height_cm * MM_PER_CM,
                    )
                    .with_alignment(HorizontalAlignment::Center),
                ));
                PhotoOutcome::Embedded
            }
            Err(source) => {
                let err = RowAssetError::new(asset.file_name(), source);
                warn!("Row '{}': {}; using placeholder", row.id(), err);
                page.push(Block::paragraph(vec![Span::new(labels.invalid_image.clone())]));
                PhotoOutcome::Invalid(err)
            }
        },
    };

    builder.push_page(page);
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PageSetup;
    use crate::photos::{DuplicatePolicy, PhotoUpload};
    use image::{DynamicImage, ImageBuffer, ImageOutputFormat, Rgba};
    use std::io::Cursor;

    fn rgba_png() -> Vec<u8> {
        let buffer = ImageBuffer::from_pixel(6, 9, Rgba([0u8, 128, 255, 90]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(buffer)
            .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)
            .unwrap();
        bytes
    }

    fn index() -> PhotoIndex {
        PhotoIndex::build(
            vec![
                PhotoUpload::new("A1.png", rgba_png()),
                PhotoUpload::new("BAD.jpg", b"\xFF\xD8 truncated".to_vec()),
            ],
            DuplicatePolicy::LastWins,
        )
    }

    #[test]
    fn matched_photo_is_embedded_at_the_fixed_size() {
        let mut builder = ReportBuilder::new("t", PageSetup::default());
        let row = Row::new("A1", Some("Rua Augusta".to_string()));
        let outcome = build_content_page(&mut builder, &row, &index(), &ReportConfig::default());
        assert!(matches!(outcome, PhotoOutcome::Embedded));

        let page = &builder.pages()[0];
        assert_eq!(page.label().as_deref(), Some("CÓDIGO DO OLEÃO: A1 | Rua Augusta"));
        let images = page.images();
        assert_eq!(images.len(), 1);
        assert_eq!((images[0].width_mm(), images[0].height_mm()), (120.0, 160.0));
    }

    #[test]
    fn label_with_location_survives_the_word_round_trip() {
        let mut builder = ReportBuilder::new("t", PageSetup::default());
        let row = Row::new("A1", Some("Rua Augusta".to_string()));
        build_content_page(&mut builder, &row, &index(), &ReportConfig::default());
        let document = builder.finish();

        match &document.pages()[0].blocks()[0] {
            Block::Paragraph(label) => assert_eq!(label.spans().len(), 1),
            other => panic!("unexpected block {other:?}"),
        }
        let restored = crate::docx::read(&crate::docx::write(&document).unwrap()).unwrap();
        assert_eq!(restored.pages(), document.pages());
    }

    #[test]
    fn unmatched_row_gets_not_found_text_and_no_picture() {
        let mut builder = ReportBuilder::new("t", PageSetup::default());
        let outcome = build_content_page(&mut builder, &Row::new("A2", None), &index(), &ReportConfig::default());
        assert!(matches!(outcome, PhotoOutcome::NotFound));
        let page = &builder.pages()[0];
        assert!(page.contains_text("Photo not found"));
        assert!(page.images().is_empty());
    }

    #[test]
    fn corrupt_photo_degrades_to_invalid_placeholder() {
        let mut builder = ReportBuilder::new("t", PageSetup::default());
        let outcome = build_content_page(&mut builder, &Row::new("BAD", None), &index(), &ReportConfig::default());
        match outcome {
            PhotoOutcome::Invalid(err) => assert_eq!(err.file_name(), "BAD.jpg"),
            other => panic!("unexpected outcome {other:?}"),
        }
        let page = &builder.pages()[0];
        assert!(page.contains_text("Invalid image"));
        assert!(!page.contains_text("Photo not found"));
    }
}
