use std::io::Cursor;

use image::{DynamicImage, ImageBuffer, ImageOutputFormat, Rgb};
use photo_report::convert::{render_pdf, BuiltinConverter, FixedLayoutConverter};
use photo_report::model::{Block, HorizontalAlignment, ImageBlock, Page, PageKind, PageSetup, ReportBuilder};
use photo_report::richtext::Span;
use photo_report::{docx, fonts, imaging, ReportDocument};
use sha2::{Digest, Sha256};

const SKIP_HINT: &str =
    "no TrueType family found. Set PHOTO_REPORT_FONTS_DIR or copy assets/fonts next to the binary.";

fn sample_document() -> ReportDocument {
    let buffer = ImageBuffer::from_pixel(60, 80, Rgb([30u8, 120, 200]));
    let mut png = Vec::new();
    DynamicImage::ImageRgb8(buffer)
        .write_to(&mut Cursor::new(&mut png), ImageOutputFormat::Png)
        .unwrap();
    let photo = imaging::normalize_photo(&png, (60, 80)).unwrap();

    let mut builder = ReportBuilder::new("Amostra", PageSetup::default());
    let media = builder.register_media(photo);
    builder.push_page(
        Page::new(PageKind::Cover)
            .with_block(Block::aligned(
                vec![Span::new("Relatório Final").bold()],
                HorizontalAlignment::Center,
            ))
            .with_block(Block::Spacer),
    );
    for id in ["A1", "A2"] {
        builder.push_page(
            Page::new(PageKind::Content)
                .with_block(Block::paragraph(vec![Span::new(format!("CÓDIGO: {id}")).bold()]))
                .with_block(Block::Image(
                    ImageBlock::new(media, 120.0, 160.0).with_alignment(HorizontalAlignment::Center),
                )),
        );
    }
    builder.push_page(
        Page::new(PageKind::Closing)
            .with_block(Block::paragraph(vec![Span::new("Lisboa,\n14 de março de 2025")])),
    );
    builder.finish()
}

fn render_sample_pdf() -> Option<Vec<u8>> {
    if !fonts::default_fonts_available() {
        return None;
    }
    Some(render_pdf(&sample_document()).expect("render sample pdf"))
}

fn scrub_pdf(bytes: &[u8]) -> Vec<u8> {
    fn scrub_segment(data: &mut [u8], tag: &[u8], terminator: u8) {
        let mut index = 0;
        while index + tag.len() < data.len() {
            if data[index..].starts_with(tag) {
                let mut cursor = index + tag.len();
                while cursor < data.len() {
                    let byte = data[cursor];
                    if byte == terminator {
                        break;
                    }
                    if terminator == b')' {
                        data[cursor] = b'0';
                    } else if !matches!(byte, b'<' | b'>' | b' ' | b'\n' | b'\r' | b'\t') {
                        data[cursor] = b'0';
                    }
                    cursor += 1;
                }
                index = cursor;
            } else {
                index += 1;
            }
        }
    }

    fn scrub_xml(data: &mut [u8], start: &[u8], end: &[u8]) {
        let mut offset = 0;
        while offset + start.len() < data.len() {
            if let Some(start_pos) = data[offset..]
                .windows(start.len())
                .position(|window| window == start)
            {
                let start_index = offset + start_pos + start.len();
                if let Some(end_pos) = data[start_index..]
                    .windows(end.len())
                    .position(|window| window == end)
                {
                    for byte in &mut data[start_index..start_index + end_pos] {
                        if !matches!(*byte, b'<' | b'>' | b'/' | b' ' | b'\n' | b'\r' | b'\t') {
                            *byte = b'0';
                        }
                    }
                    offset = start_index + end_pos + end.len();
                } else {
                    break;
                }
            } else {
                break;
            }
        }
    }

    let mut normalized = bytes.to_vec();
    scrub_segment(&mut normalized, b"/CreationDate(", b')');
    scrub_segment(&mut normalized, b"/ModDate(", b')');
    scrub_segment(&mut normalized, b"/ID[", b']');
    scrub_segment(&mut normalized, b"/Producer(", b')');
    scrub_xml(&mut normalized, b"<xmp:CreateDate>", b"</xmp:CreateDate>");
    scrub_xml(&mut normalized, b"<xmp:ModifyDate>", b"</xmp:ModifyDate>");
    scrub_xml(
        &mut normalized,
        b"<xmp:MetadataDate>",
        b"</xmp:MetadataDate>",
    );
    scrub_xml(
        &mut normalized,
        b"<xmpMM:DocumentID>",
        b"</xmpMM:DocumentID>",
    );
    scrub_xml(
        &mut normalized,
        b"<xmpMM:InstanceID>",
        b"</xmpMM:InstanceID>",
    );
    scrub_xml(&mut normalized, b"<xmpMM:VersionID>", b"</xmpMM:VersionID>");
    normalized
}

fn normalized_hash(bytes: &[u8]) -> [u8; 32] {
    let normalized = scrub_pdf(bytes);
    let digest = Sha256::digest(&normalized);
    digest.into()
}

#[test]
fn renders_one_pdf_page_per_report_page() {
    let Some(bytes) = render_sample_pdf() else {
        eprintln!("Skipping renders_one_pdf_page_per_report_page: {SKIP_HINT}");
        return;
    };
    assert!(bytes.starts_with(b"%PDF"), "rendered output should be a PDF");

    #[cfg(feature = "bookmarks")]
    {
        let pdf = lopdf::Document::load_mem(&bytes).expect("parse rendered pdf");
        assert_eq!(pdf.get_pages().len(), 4);
    }
}

#[test]
fn builtin_converter_accepts_written_documents() {
    if !fonts::default_fonts_available() {
        eprintln!("Skipping builtin_converter_accepts_written_documents: {SKIP_HINT}");
        return;
    }
    let package = docx::write(&sample_document()).unwrap();
    let pdf = BuiltinConverter::new().convert(&package).unwrap();
    assert!(pdf.starts_with(b"%PDF"));
}

#[test]
fn rendering_is_deterministic() {
    let (Some(bytes_a), Some(bytes_b)) = (render_sample_pdf(), render_sample_pdf()) else {
        eprintln!("Skipping rendering_is_deterministic: {SKIP_HINT}");
        return;
    };

    assert_eq!(bytes_a.len(), bytes_b.len(), "PDF sizes should match");
    assert_eq!(
        normalized_hash(&bytes_a),
        normalized_hash(&bytes_b),
        "PDF renders must be deterministic after metadata normalization"
    );
}
