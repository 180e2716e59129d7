//! PDF outline (bookmark panel) entries for report pages, built with `lopdf`.

use std::fmt;
use std::io;

use lopdf::{Dictionary, Document, Object, ObjectId, StringFormat};

/// An outline entry pointing at a 1-based PDF page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutlineTarget {
    pub title: String,
    pub page_number: usize,
}

impl OutlineTarget {
    pub fn new(title: impl Into<String>, page_number: usize) -> Self {
        Self {
            title: title.into(),
            page_number,
        }
    }
}

#[derive(Debug)]
pub enum BookmarkError {
    /// The rendered bytes are not a PDF `lopdf` can load.
    Parse(lopdf::Error),
    /// Saving the amended PDF failed.
    Write(io::Error),
    /// The trailer has no `/Root` reference.
    MissingCatalog,
    /// `/Root` does not resolve to a dictionary.
    InvalidCatalog,
    /// An outline target lies past the last page.
    MissingPage { title: String, page_number: usize },
}

impl From<lopdf::Error> for BookmarkError {
    fn from(err: lopdf::Error) -> Self {
        Self::Parse(err)
    }
}

impl From<io::Error> for BookmarkError {
    fn from(err: io::Error) -> Self {
        Self::Write(err)
    }
}

impl fmt::Display for BookmarkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "cannot load the rendered PDF: {err}"),
            Self::Write(err) => write!(f, "cannot save the outlined PDF: {err}"),
            Self::MissingCatalog => f.write_str("the PDF has no document catalog"),
            Self::InvalidCatalog => f.write_str("the PDF document catalog is malformed"),
            Self::MissingPage { title, page_number } => {
                write!(f, "outline entry '{title}' targets missing page {page_number}")
            }
        }
    }
}

impl std::error::Error for BookmarkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            Self::Write(err) => Some(err),
            _ => None,
        }
    }
}

/// Adds a flat outline with one `/Dest [page /Fit]` entry per target.
///
/// Returns the input unchanged when `targets` is empty.
pub fn apply_outline(pdf: &[u8], targets: &[OutlineTarget]) -> Result<Vec<u8>, BookmarkError> {
    if targets.is_empty() {
        return Ok(pdf.to_vec());
    }

    let mut document = Document::load_mem(pdf)?;
    let pages = document.get_pages();
    let mut destinations = Vec::with_capacity(targets.len());
    for target in targets {
        let page = u32::try_from(target.page_number)
            .ok()
            .and_then(|number| pages.get(&number))
            .ok_or_else(|| BookmarkError::MissingPage {
                title: target.title.clone(),
                page_number: target.page_number,
            })?;
        destinations.push(*page);
    }

    let root_id = document.new_object_id();
    let item_ids: Vec<ObjectId> = targets.iter().map(|_| document.new_object_id()).collect();

    for (index, (target, page)) in targets.iter().zip(&destinations).enumerate() {
        let mut item = Dictionary::new();
        item.set("Title", text_string(&target.title));
        item.set(
            "Dest",
            Object::Array(vec![Object::Reference(*page), Object::Name(b"Fit".to_vec())]),
        );
        item.set("Parent", Object::Reference(root_id));
        if let Some(previous) = index.checked_sub(1).map(|i| item_ids[i]) {
            item.set("Prev", Object::Reference(previous));
        }
        if let Some(next) = item_ids.get(index + 1) {
            item.set("Next", Object::Reference(*next));
        }
        document.objects.insert(item_ids[index], Object::Dictionary(item));
    }

    let mut root = Dictionary::new();
    root.set("Type", Object::Name(b"Outlines".to_vec()));
    root.set("Count", Object::Integer(item_ids.len() as i64));
    if let (Some(first), Some(last)) = (item_ids.first(), item_ids.last()) {
        root.set("First", Object::Reference(*first));
        root.set("Last", Object::Reference(*last));
    }
    document.objects.insert(root_id, Object::Dictionary(root));

    let catalog_id = document
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .map_err(|_| BookmarkError::MissingCatalog)?;
    let catalog = document
        .objects
        .get_mut(&catalog_id)
        .ok_or(BookmarkError::MissingCatalog)?
        .as_dict_mut()
        .map_err(|_| BookmarkError::InvalidCatalog)?;
    catalog.set("Outlines", Object::Reference(root_id));
    catalog.set("PageMode", Object::Name(b"UseOutlines".to_vec()));

    let mut bytes = Vec::new();
    document.save_to(&mut bytes)?;
    Ok(bytes)
}

/// PDF text string: plain literal for ASCII, UTF-16BE with byte order mark otherwise.
fn text_string(text: &str) -> Object {
    if text.is_ascii() {
        return Object::string_literal(text);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_ascii_titles_are_utf16() {
        match text_string("Oleão") {
            Object::String(bytes, StringFormat::Hexadecimal) => {
                assert_eq!(&bytes[..2], &[0xFE, 0xFF]);
                assert_eq!(bytes.len(), 2 + 2 * 5);
            }
            other => panic!("unexpected object {other:?}"),
        }
        assert!(matches!(text_string("A1"), Object::String(_, StringFormat::Literal)));
    }

    #[test]
    fn empty_outline_returns_input() {
        assert_eq!(apply_outline(b"%PDF-1.4", &[]).unwrap(), b"%PDF-1.4");
    }

    #[test]
    fn garbage_is_a_parse_error() {
        let targets = [OutlineTarget::new("A1", 2)];
        assert!(matches!(apply_outline(b"nope", &targets), Err(BookmarkError::Parse(_))));
    }
}
