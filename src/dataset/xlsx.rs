//! Minimal `.xlsx` reader: first worksheet in workbook order, cell values as strings.

use std::io::{Cursor, Read};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use zip::ZipArchive;

use super::DatasetError;

/// Maximum decompressed bytes to read from a single ZIP entry.
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;
/// Maximum number of cells read from the worksheet.
const MAX_CELLS: usize = 1_000_000;
/// Maximum column index accepted from a cell reference.
const MAX_COLUMNS: usize = 16_384;

const SHEET_PREFIX: &str = "xl/worksheets/sheet";
const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";

type Archive<'a> = ZipArchive<Cursor<&'a [u8]>>;

fn malformed(err: impl std::fmt::Display) -> DatasetError {
    DatasetError::Spreadsheet(err.to_string())
}

/// Reads the first worksheet into rows of cell strings. Missing cells are empty strings.
pub(super) fn read_first_sheet(bytes: &[u8]) -> Result<Vec<Vec<String>>, DatasetError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(malformed)?;
    let shared_strings = read_shared_strings(&mut archive)?;
    let sheet = first_worksheet_name(&mut archive)?
        .ok_or_else(|| DatasetError::Spreadsheet("workbook has no worksheet".to_string()))?;
    let xml = read_entry_bounded(&mut archive, &sheet)?;
    parse_sheet(&xml, &shared_strings)
}

fn read_entry_bounded(archive: &mut Archive<'_>, name: &str) -> Result<Vec<u8>, DatasetError> {
    let entry = archive.by_name(name).map_err(malformed)?;
    let mut out = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut out)
        .map_err(malformed)?;
    if out.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(DatasetError::Spreadsheet(format!(
            "ZIP entry {name} exceeds size limit ({MAX_XML_ENTRY_BYTES} bytes)"
        )));
    }
    Ok(out)
}

/// The first `<sheet>` listed in the workbook, resolved through its relationship.
///
/// Packages without a usable workbook part fall back to the lowest-numbered worksheet.
fn first_worksheet_name(archive: &mut Archive<'_>) -> Result<Option<String>, DatasetError> {
    if let Some(name) = workbook_first_sheet(archive)? {
        if archive.index_for_name(&name).is_some() {
            return Ok(Some(name));
        }
    }
    Ok(lowest_numbered_sheet(archive))
}

fn workbook_first_sheet(archive: &mut Archive<'_>) -> Result<Option<String>, DatasetError> {
    if archive.index_for_name(WORKBOOK_PART).is_none()
        || archive.index_for_name(WORKBOOK_RELS_PART).is_none()
    {
        return Ok(None);
    }
    let workbook = read_entry_bounded(archive, WORKBOOK_PART)?;
    let Some(relationship) = first_sheet_relationship(&workbook)? else {
        return Ok(None);
    };
    let rels = read_entry_bounded(archive, WORKBOOK_RELS_PART)?;
    Ok(relationship_target(&rels, &relationship)?.map(|target| match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{target}"),
    }))
}

fn first_sheet_relationship(xml: &[u8]) -> Result<Option<String>, DatasetError> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf).map_err(malformed)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                return attribute_value(&e, b"id");
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
        buf.clear();
    }
}

fn relationship_target(xml: &[u8], id: &str) -> Result<Option<String>, DatasetError> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf).map_err(malformed)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                if attribute_value(&e, b"Id")?.as_deref() == Some(id) {
                    return attribute_value(&e, b"Target");
                }
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
        buf.clear();
    }
}

/// Looks an attribute up by local name, so `r:id` matches `id`.
fn attribute_value(element: &BytesStart<'_>, local: &[u8]) -> Result<Option<String>, DatasetError> {
    for attribute in element.attributes() {
        let attribute = attribute.map_err(malformed)?;
        if attribute.key.local_name().as_ref() == local {
            return Ok(Some(attribute.unescape_value().map_err(malformed)?.into_owned()));
        }
    }
    Ok(None)
}

fn lowest_numbered_sheet(archive: &Archive<'_>) -> Option<String> {
    archive
        .file_names()
        .filter(|name| name.starts_with(SHEET_PREFIX) && name.ends_with(".xml"))
        .min_by_key(|name| {
            name.trim_start_matches(SHEET_PREFIX)
                .trim_end_matches(".xml")
                .parse::<u32>()
                .unwrap_or(u32::MAX)
        })
        .map(str::to_string)
}

/// Reads `xl/sharedStrings.xml`; workbooks without shared strings yield an empty table.
fn read_shared_strings(archive: &mut Archive<'_>) -> Result<Vec<String>, DatasetError> {
    if archive.index_for_name("xl/sharedStrings.xml").is_none() {
        return Ok(Vec::new());
    }
    let xml = read_entry_bounded(archive, "xl/sharedStrings.xml")?;

    let mut strings = Vec::new();
    let mut reader = Reader::from_reader(xml.as_slice());
    let mut buf = Vec::new();
    let mut current: Option<String> = None;
    let mut in_text = false;
    // Phonetic runs (<rPh>) repeat the text as reading hints and are skipped.
    let mut in_phonetic = false;

    loop {
        match reader.read_event_into(&mut buf).map_err(malformed)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"si" => current = Some(String::new()),
                b"rPh" => in_phonetic = true,
                b"t" if !in_phonetic => in_text = true,
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Event::Text(text) if in_text => {
                if let Some(value) = current.as_mut() {
                    value.push_str(&text.unescape().map_err(malformed)?);
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"si" => strings.push(current.take().unwrap_or_default()),
                b"rPh" => in_phonetic = false,
                b"t" => in_text = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CellType {
    Number,
    SharedString,
    InlineString,
    Boolean,
    Text,
}

struct PendingCell {
    column: usize,
    kind: CellType,
    text: String,
}

fn cell_attributes(start: &BytesStart<'_>, next_column: usize) -> (usize, CellType) {
    let mut column = next_column;
    let mut kind = CellType::Number;
    for attribute in start.attributes().flatten() {
        match attribute.key.as_ref() {
            b"r" => {
                if let Some(index) = column_index(&attribute.value) {
                    column = index;
                }
            }
            b"t" => {
                kind = match attribute.value.as_ref() {
                    b"s" => CellType::SharedString,
                    b"inlineStr" => CellType::InlineString,
                    b"b" => CellType::Boolean,
                    b"n" => CellType::Number,
                    _ => CellType::Text,
                }
            }
            _ => {}
        }
    }
    (column, kind)
}

/// Converts the letters of a cell reference (`AB12`) into a zero-based column index.
fn column_index(reference: &[u8]) -> Option<usize> {
    let letters: Vec<u8> = reference
        .iter()
        .take_while(|byte| byte.is_ascii_alphabetic())
        .map(u8::to_ascii_uppercase)
        .collect();
    if letters.is_empty() {
        return None;
    }
    let mut index = 0usize;
    for letter in letters {
        index = index * 26 + usize::from(letter - b'A' + 1);
        if index > MAX_COLUMNS {
            return None;
        }
    }
    Some(index - 1)
}

/// Renders integral numbers without a fractional part, as they appear in the sheet.
fn format_number(raw: &str) -> String {
    let raw = raw.trim();
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 => {
            format!("{}", value as i64)
        }
        _ => raw.to_string(),
    }
}

fn resolve(cell: PendingCell, shared_strings: &[String]) -> String {
    match cell.kind {
        CellType::SharedString => cell
            .text
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|index| shared_strings.get(index))
            .cloned()
            .unwrap_or_default(),
        CellType::Boolean => match cell.text.trim() {
            "1" => "TRUE".to_string(),
            "0" => "FALSE".to_string(),
            other => other.to_string(),
        },
        CellType::Number => format_number(&cell.text),
        CellType::InlineString | CellType::Text => cell.text,
    }
}

fn place(row: &mut Vec<String>, column: usize, value: String) {
    if row.len() <= column {
        row.resize(column + 1, String::new());
    }
    row[column] = value;
}

fn parse_sheet(xml: &[u8], shared_strings: &[String]) -> Result<Vec<Vec<String>>, DatasetError> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();

    let mut rows = Vec::new();
    let mut row: Option<Vec<String>> = None;
    let mut next_column = 0usize;
    let mut cell: Option<PendingCell> = None;
    let mut in_value = false;
    let mut cell_count = 0usize;

    loop {
        match reader.read_event_into(&mut buf).map_err(malformed)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"row" => {
                    row = Some(Vec::new());
                    next_column = 0;
                }
                b"c" => {
                    let (column, kind) = cell_attributes(&e, next_column);
                    cell = Some(PendingCell {
                        column,
                        kind,
                        text: String::new(),
                    });
                }
                b"v" | b"t" if cell.is_some() => in_value = true,
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"row" => rows.push(Vec::new()),
                b"c" => {
                    let (column, _) = cell_attributes(&e, next_column);
                    next_column = column + 1;
                }
                _ => {}
            },
            Event::Text(text) if in_value => {
                if let Some(pending) = cell.as_mut() {
                    pending.text.push_str(&text.unescape().map_err(malformed)?);
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"v" | b"t" => in_value = false,
                b"c" => {
                    if let Some(pending) = cell.take() {
                        next_column = pending.column + 1;
                        let column = pending.column;
                        let value = resolve(pending, shared_strings);
                        if let Some(current) = row.as_mut() {
                            place(current, column, value);
                        }
                        cell_count += 1;
                        if cell_count >= MAX_CELLS {
                            return Err(DatasetError::Spreadsheet(format!(
                                "worksheet exceeds {MAX_CELLS} cells"
                            )));
                        }
                    }
                }
                b"row" => {
                    if let Some(finished) = row.take() {
                        rows.push(finished);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(rows)
}
