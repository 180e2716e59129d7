//! Serializes the assembled report and attempts the PDF export.

use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::convert::FixedLayoutConverter;
use crate::docx::{self, DOCX_EXTENSION};
use crate::error::{ConversionError, ReportError};
use crate::model::ReportDocument;

/// Extension of the fixed-layout export.
pub const PDF_EXTENSION: &str = "pdf";

/// The deliverables of one report run.
#[derive(Debug)]
pub struct FinalizedReport {
    /// The editable document. Always present.
    pub docx: Vec<u8>,
    /// The fixed-layout export, when a converter succeeded.
    pub pdf: Option<Vec<u8>>,
    /// Export problems that did not stop the run.
    pub warnings: Vec<ConversionError>,
}

/// Paths written by [`FinalizedReport::write_to`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WrittenFiles {
    pub docx: PathBuf,
    pub pdf: Option<PathBuf>,
}

impl FinalizedReport {
    /// Writes `<base_name>.docx` and, if present, `<base_name>.pdf` into `dir`.
    pub fn write_to(&self, dir: impl AsRef<Path>, base_name: &str) -> Result<WrittenFiles, ReportError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|err| ReportError::io(dir, err))?;

        let docx_path = dir.join(format!("{base_name}.{DOCX_EXTENSION}"));
        fs::write(&docx_path, &self.docx).map_err(|err| ReportError::io(&docx_path, err))?;

        let pdf_path = match &self.pdf {
            Some(pdf) => {
                let path = dir.join(format!("{base_name}.{PDF_EXTENSION}"));
                fs::write(&path, pdf).map_err(|err| ReportError::io(&path, err))?;
                Some(path)
            }
            None => None,
        };

        Ok(WrittenFiles {
            docx: docx_path,
            pdf: pdf_path,
        })
    }
}

/// Writes the editable document, then tries `converter` on it.
///
/// Only a failure to produce the `.docx` is an error; a failed conversion is
/// logged and returned in [`FinalizedReport::warnings`].
pub fn finalize(
    document: &ReportDocument,
    converter: &dyn FixedLayoutConverter,
) -> Result<FinalizedReport, ReportError> {
    let docx = docx::write(document)?;
    info!(
        "Wrote Word document: {} page(s), {} image(s), {} bytes",
        document.page_count(),
        document.media().len(),
        docx.len()
    );

    let mut warnings = Vec::new();
    let pdf = match converter.convert(&docx) {
        Ok(pdf) => Some(pdf),
        Err(err) => {
            warn!("{err}; delivering the Word document only");
            warnings.push(err);
            None
        }
    };

    Ok(FinalizedReport {
        docx,
        pdf,
        warnings,
    })
}
