//! Fixed-layout (PDF) export of the editable document.
//!
//! Conversion is a platform capability that may be missing, so every converter
//! sits behind [`FixedLayoutConverter`] and failures are plain values the
//! finalizer downgrades to warnings.

mod builtin;
mod office;

use std::fmt;

use log::{debug, info};

pub use builtin::{render_pdf, BuiltinConverter};
pub use office::{OfficeConverter, SOFFICE_ENV};

use crate::error::ConversionError;

/// Converts a `.docx` package into PDF bytes.
pub trait FixedLayoutConverter {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Converts the editable document.
    fn convert(&self, docx: &[u8]) -> Result<Vec<u8>, ConversionError>;
}

/// A converter for platforms without any PDF capability.
#[derive(Clone, Debug)]
pub struct Unavailable {
    reason: String,
}

impl Unavailable {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl Default for Unavailable {
    fn default() -> Self {
        Self::new("PDF export is disabled")
    }
}

impl FixedLayoutConverter for Unavailable {
    fn name(&self) -> &str {
        "none"
    }

    fn convert(&self, _docx: &[u8]) -> Result<Vec<u8>, ConversionError> {
        Err(ConversionError::Unavailable(self.reason.clone()))
    }
}

/// Tries converters in order; the first success wins.
#[derive(Default)]
pub struct FallbackChain {
    converters: Vec<Box<dyn FixedLayoutConverter>>,
}

impl FallbackChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a converter and returns the updated chain.
    pub fn with(mut self, converter: impl FixedLayoutConverter + 'static) -> Self {
        self.converters.push(Box::new(converter));
        self
    }

    pub fn len(&self) -> usize {
        self.converters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }
}

impl FixedLayoutConverter for FallbackChain {
    fn name(&self) -> &str {
        "auto"
    }

    fn convert(&self, docx: &[u8]) -> Result<Vec<u8>, ConversionError> {
        if self.converters.is_empty() {
            return Err(ConversionError::Unavailable(
                "no PDF converter configured".to_string(),
            ));
        }
        let mut failures = Vec::with_capacity(self.converters.len());
        for converter in &self.converters {
            match converter.convert(docx) {
                Ok(pdf) => {
                    info!("PDF produced by the '{}' converter", converter.name());
                    return Ok(pdf);
                }
                Err(err) => {
                    debug!("Converter '{}' failed: {}", converter.name(), err);
                    failures.push(err);
                }
            }
        }
        Err(ConversionError::Exhausted(failures))
    }
}

/// Which PDF export to attempt.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PdfMode {
    /// Office suite first, then the built-in renderer.
    #[default]
    Auto,
    /// Headless LibreOffice only.
    Office,
    /// Built-in `genpdf` renderer only.
    Builtin,
    /// No PDF.
    None,
}

impl PdfMode {
    /// Builds the converter for this mode.
    pub fn converter(self) -> Box<dyn FixedLayoutConverter> {
        match self {
            Self::Auto => Box::new(
                FallbackChain::new()
                    .with(OfficeConverter::from_env())
                    .with(BuiltinConverter::new()),
            ),
            Self::Office => Box::new(OfficeConverter::from_env()),
            Self::Builtin => Box::new(BuiltinConverter::new()),
            Self::None => Box::new(Unavailable::default()),
        }
    }
}

impl fmt::Display for PdfMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Auto => "auto",
            Self::Office => "office",
            Self::Builtin => "builtin",
            Self::None => "none",
        };
        f.write_str(name)
    }
}
