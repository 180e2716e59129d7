//! WordprocessingML (`.docx`) serialization of a [`ReportDocument`].
//!
//! The writer lays every run of same-kind pages out as one section so that only
//! content pages carry the live `PAGE` field footer. Each page opens with a
//! bookmark (`cover`, `row_<n>`, `closing`) that the reader uses to recover page
//! boundaries and kinds when the package is opened again.

mod reader;
mod writer;

use std::fmt;
use std::io;

pub use reader::read;
pub use writer::write;

use crate::model::PageKind;

/// File name offered for download is `<base>.docx`.
pub const DOCX_EXTENSION: &str = "docx";

pub(crate) const NS_W: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
pub(crate) const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
pub(crate) const NS_WP: &str = "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing";
pub(crate) const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
pub(crate) const NS_PIC: &str = "http://schemas.openxmlformats.org/drawingml/2006/picture";

pub(crate) const REL_TYPE_IMAGE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

pub(crate) const DOCUMENT_PART: &str = "word/document.xml";
pub(crate) const DOCUMENT_RELS_PART: &str = "word/_rels/document.xml.rels";
pub(crate) const CORE_PART: &str = "docProps/core.xml";
/// Footer holding the right-aligned `PAGE` field.
pub(crate) const NUMBERED_FOOTER: &str = "footer1.xml";
/// Footer with a single empty paragraph, for cover and closing sections.
pub(crate) const BLANK_FOOTER: &str = "footer2.xml";

const TWIPS_PER_INCH: f64 = 1440.0;
const MM_PER_INCH: f64 = 25.4;
const EMU_PER_MM: f64 = 36_000.0;

pub(crate) fn mm_to_twips(mm: f64) -> i64 {
    (mm / MM_PER_INCH * TWIPS_PER_INCH).round() as i64
}

pub(crate) fn twips_to_mm(twips: f64) -> f64 {
    (twips / TWIPS_PER_INCH * MM_PER_INCH * 10.0).round() / 10.0
}

pub(crate) fn mm_to_emu(mm: f64) -> i64 {
    (mm * EMU_PER_MM).round() as i64
}

pub(crate) fn emu_to_mm(emu: f64) -> f64 {
    emu / EMU_PER_MM
}

/// Bookmark name that marks the start of a page.
pub(crate) fn bookmark_name(kind: PageKind, content_index: usize) -> String {
    match kind {
        PageKind::Cover => "cover".to_string(),
        PageKind::Content => format!("row_{content_index}"),
        PageKind::Closing => "closing".to_string(),
    }
}

/// Inverse of [`bookmark_name`]; unrelated bookmarks yield `None`.
pub(crate) fn kind_from_bookmark(name: &str) -> Option<PageKind> {
    match name {
        "cover" => Some(PageKind::Cover),
        "closing" => Some(PageKind::Closing),
        other => other
            .strip_prefix("row_")
            .filter(|rest| !rest.is_empty() && rest.bytes().all(|byte| byte.is_ascii_digit()))
            .map(|_| PageKind::Content),
    }
}

/// Errors raised while writing or reading a `.docx` package.
#[derive(Debug)]
pub enum DocxError {
    /// The ZIP container could not be written or opened.
    Zip(String),
    /// An XML part could not be written or parsed.
    Xml(String),
    /// A required package part is absent.
    MissingPart(String),
    /// A block references media that the document does not hold.
    MissingMedia(String),
    /// An embedded image could not be decoded.
    Image(image::ImageError),
    /// Underlying I/O failure.
    Io(io::Error),
}

impl fmt::Display for DocxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Zip(message) => write!(f, "package error: {message}"),
            Self::Xml(message) => write!(f, "XML error: {message}"),
            Self::MissingPart(part) => write!(f, "package part {part} is missing"),
            Self::MissingMedia(reference) => write!(f, "image {reference} is not part of the document"),
            Self::Image(err) => write!(f, "embedded image is unreadable: {err}"),
            Self::Io(err) => write!(f, "I/O error: {err}"),
        }
    }
}

impl std::error::Error for DocxError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Image(err) => Some(err),
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<zip::result::ZipError> for DocxError {
    fn from(err: zip::result::ZipError) -> Self {
        Self::Zip(err.to_string())
    }
}

impl From<io::Error> for DocxError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

pub(crate) fn xml_error(err: impl fmt::Display) -> DocxError {
    DocxError::Xml(err.to_string())
}
