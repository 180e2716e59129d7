//! Row dataset loading from `.xlsx` workbooks and delimited text files.
//!
//! Both formats are reduced to a header plus string records and funnelled
//! through [`Dataset::from_records`], which locates the identifier and location
//! columns and preserves the sheet's row order.

mod delimited;
mod xlsx;

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::config::DatasetConfig;

/// One dataset entry, immutable after loading.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Row {
    id: String,
    location: Option<String>,
}

impl Row {
    pub fn new(id: impl Into<String>, location: Option<String>) -> Self {
        Self {
            id: id.into(),
            location,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }
}

/// Errors raised while reading the dataset.
#[derive(Debug)]
pub enum DatasetError {
    /// The file could not be read.
    Io { path: PathBuf, source: io::Error },
    /// The file extension is neither `.xlsx` nor `.csv`/`.tsv`/`.txt`.
    UnsupportedFormat(String),
    /// The workbook package or its XML is malformed.
    Spreadsheet(String),
    /// The delimited file could not be parsed.
    Csv(csv::Error),
    /// The sheet has no header row.
    Empty,
    /// The required identifier column is absent.
    MissingColumn { column: String, found: Vec<String> },
}

impl fmt::Display for DatasetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "cannot read {}: {}", path.display(), source),
            Self::UnsupportedFormat(ext) => {
                write!(f, "unsupported dataset format '{ext}' (expected .xlsx or .csv)")
            }
            Self::Spreadsheet(message) => write!(f, "malformed workbook: {message}"),
            Self::Csv(err) => write!(f, "malformed delimited file: {err}"),
            Self::Empty => write!(f, "the dataset has no header row"),
            Self::MissingColumn { column, found } => write!(
                f,
                "required column '{}' not found; detected columns: [{}]",
                column,
                found.join(", ")
            ),
        }
    }
}

impl std::error::Error for DatasetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Csv(err) => Some(err),
            _ => None,
        }
    }
}

impl From<csv::Error> for DatasetError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// Rows of the report in sheet order, plus the detected header.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Dataset {
    /// Loads a dataset, choosing the parser from the file extension.
    pub fn load(path: impl AsRef<Path>, config: &DatasetConfig) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| DatasetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        let dataset = match extension.as_str() {
            "xlsx" => Self::from_xlsx(&bytes, config)?,
            "csv" | "tsv" | "txt" => Self::from_delimited(&bytes, config)?,
            other => return Err(DatasetError::UnsupportedFormat(other.to_string())),
        };

        info!(
            "Loaded {} row(s) from {} (columns: {})",
            dataset.rows.len(),
            path.display(),
            dataset.columns.join(", ")
        );
        Ok(dataset)
    }

    /// Parses the first worksheet of an `.xlsx` workbook.
    pub fn from_xlsx(bytes: &[u8], config: &DatasetConfig) -> Result<Self, DatasetError> {
        let grid = xlsx::read_first_sheet(bytes)?;
        Self::from_grid(grid, config)
    }

    /// Parses delimited text, detecting `;`, `,` or tab from the header line.
    pub fn from_delimited(bytes: &[u8], config: &DatasetConfig) -> Result<Self, DatasetError> {
        let grid = delimited::read_records(bytes)?;
        Self::from_grid(grid, config)
    }

    fn from_grid(grid: Vec<Vec<String>>, config: &DatasetConfig) -> Result<Self, DatasetError> {
        let mut rows = grid.into_iter().skip_while(|row| is_blank(row));
        let header = rows.next().ok_or(DatasetError::Empty)?;
        Self::from_records(header, rows, config)
    }

    /// Builds the dataset from a header and its records.
    ///
    /// Fails with [`DatasetError::MissingColumn`] when the identifier column is
    /// absent. Fully blank records are dropped; records with a blank identifier
    /// are skipped with a warning.
    pub fn from_records<I>(header: Vec<String>, records: I, config: &DatasetConfig) -> Result<Self, DatasetError>
    where
        I: IntoIterator<Item = Vec<String>>,
    {
        let columns: Vec<String> = header.iter().map(|name| name.trim().to_string()).collect();
        let find = |name: &str| {
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            columns
                .iter()
                .position(|column| column.eq_ignore_ascii_case(name))
        };

        let id_index = find(&config.id_column).ok_or_else(|| DatasetError::MissingColumn {
            column: config.id_column.clone(),
            found: columns.clone(),
        })?;
        let location_index = find(&config.location_column);

        let mut rows = Vec::new();
        for (offset, record) in records.into_iter().enumerate() {
            if is_blank(&record) {
                continue;
            }
            let id = cell(&record, id_index);
            if id.is_empty() {
                warn!(
                    "Skipping record {} of the dataset: empty '{}' value",
                    offset + 1,
                    config.id_column
                );
                continue;
            }
            let location = location_index
                .map(|index| cell(&record, index))
                .filter(|value| !value.is_empty())
                .map(str::to_string);
            rows.push(Row::new(id, location));
        }

        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn cell(record: &[String], index: usize) -> &str {
    record.get(index).map(|value| value.trim()).unwrap_or_default()
}

fn is_blank(record: &[String]) -> bool {
    record.iter().all(|value| value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn keeps_order_and_optional_location() {
        let dataset = Dataset::from_records(
            strings(&["id", " Local "]),
            vec![
                strings(&["A2", "Rua B"]),
                strings(&["A1", ""]),
                strings(&["", ""]),
                strings(&["A3"]),
            ],
            &DatasetConfig::default(),
        )
        .unwrap();

        let ids: Vec<_> = dataset.rows().iter().map(Row::id).collect();
        assert_eq!(ids, ["A2", "A1", "A3"]);
        assert_eq!(dataset.rows()[0].location(), Some("Rua B"));
        assert_eq!(dataset.rows()[1].location(), None);
    }

    #[test]
    fn missing_id_column_is_reported_with_detected_columns() {
        let err = Dataset::from_records(
            strings(&["CODE", "LOCAL"]),
            vec![strings(&["A1", "x"])],
            &DatasetConfig::default(),
        )
        .unwrap_err();
        match err {
            DatasetError::MissingColumn { column, found } => {
                assert_eq!(column, "ID");
                assert_eq!(found, strings(&["CODE", "LOCAL"]));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn blank_identifier_rows_are_skipped() {
        let dataset = Dataset::from_records(
            strings(&["ID", "LOCAL"]),
            vec![strings(&["  ", "orphan"]), strings(&["B7", ""])],
            &DatasetConfig::default(),
        )
        .unwrap();
        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.rows()[0].id(), "B7");
    }

    #[test]
    fn header_is_first_non_blank_row() {
        let dataset = Dataset::from_grid(
            vec![strings(&["", ""]), strings(&["ID", "LOCAL"]), strings(&["X1", "Praça"])],
            &DatasetConfig::default(),
        )
        .unwrap();
        assert_eq!(dataset.columns(), strings(&["ID", "LOCAL"]).as_slice());
        assert_eq!(dataset.rows()[0].location(), Some("Praça"));
    }

    #[test]
    fn empty_grid_has_no_header() {
        let err = Dataset::from_grid(Vec::new(), &DatasetConfig::default()).unwrap_err();
        assert!(matches!(err, DatasetError::Empty));
    }
}
