//! Error types shared by the report pipeline.
//!
//! Fatal failures surface as [`ReportError`]. Per-row photo problems are
//! recorded as [`RowAssetError`] values on the assembled report instead of
//! aborting generation, and fixed-layout export failures are reported as
//! [`ConversionError`] warnings by the finalizer.

use std::fmt;
use std::io;
use std::path::PathBuf;

use crate::dataset::DatasetError;
use crate::docx::DocxError;

/// Errors that abort report generation.
#[derive(Debug)]
pub enum ReportError {
    /// A required input or dataset column is missing, or the configuration is invalid.
    Configuration(String),
    /// A branding image (company or certifier logo) could not be decoded.
    AssetDecode {
        /// Which logo failed.
        asset: &'static str,
        /// Underlying decoder error.
        source: image::ImageError,
    },
    /// The dataset could not be read.
    Dataset(DatasetError),
    /// The editable document could not be serialized.
    Docx(DocxError),
    /// Reading inputs or writing outputs failed.
    Io {
        /// Path involved in the failed operation.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
}

impl ReportError {
    /// Creates a configuration error from a message.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration(message) => write!(f, "Configuration error: {message}"),
            Self::AssetDecode { asset, .. } => write!(f, "Failed to decode the {asset}"),
            Self::Dataset(err) => write!(f, "Failed to load dataset: {err}"),
            Self::Docx(err) => write!(f, "Failed to write the Word document: {err}"),
            Self::Io { path, .. } => write!(f, "I/O failure on {}", path.display()),
        }
    }
}

impl std::error::Error for ReportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Configuration(_) => None,
            Self::AssetDecode { source, .. } => Some(source),
            Self::Dataset(err) => Some(err),
            Self::Docx(err) => Some(err),
            Self::Io { source, .. } => Some(source),
        }
    }
}

impl From<DatasetError> for ReportError {
    fn from(err: DatasetError) -> Self {
        match err {
            DatasetError::MissingColumn { .. } => Self::Configuration(err.to_string()),
            other => Self::Dataset(other),
        }
    }
}

impl From<DocxError> for ReportError {
    fn from(err: DocxError) -> Self {
        Self::Docx(err)
    }
}

/// A single row's photo could not be decoded or re-encoded.
///
/// The row still gets its page, with an inline placeholder in place of the photo.
#[derive(Debug)]
pub struct RowAssetError {
    file_name: String,
    source: image::ImageError,
}

impl RowAssetError {
    pub(crate) fn new(file_name: impl Into<String>, source: image::ImageError) -> Self {
        Self {
            file_name: file_name.into(),
            source,
        }
    }

    /// Name of the uploaded file that failed.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}

impl fmt::Display for RowAssetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "photo {} is unreadable: {}", self.file_name, self.source)
    }
}

impl std::error::Error for RowAssetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Fixed-layout export failures. Never fatal: the editable document is still delivered.
#[derive(Debug)]
pub enum ConversionError {
    /// No conversion capability exists on this platform.
    Unavailable(String),
    /// The converter ran but did not produce a document.
    Failed(String),
    /// Scratch files for the conversion could not be written or read.
    Io(io::Error),
    /// Every converter of a fallback chain failed.
    Exhausted(Vec<ConversionError>),
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable(reason) => write!(f, "PDF export unavailable: {reason}"),
            Self::Failed(reason) => write!(f, "PDF export failed: {reason}"),
            Self::Io(err) => write!(f, "PDF export failed: {err}"),
            Self::Exhausted(errors) => {
                let joined = errors
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; ");
                write!(f, "no PDF converter succeeded ({joined})")
            }
        }
    }
}

impl std::error::Error for ConversionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for ConversionError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}
