//! End-to-end report generation from files on disk.

use std::path::PathBuf;

use chrono::NaiveDate;
use log::info;

use crate::assembler::{AssembledReport, ReportAssembler};
use crate::branding::Branding;
use crate::config::ReportConfig;
use crate::convert::FixedLayoutConverter;
use crate::dataset::Dataset;
use crate::error::ReportError;
use crate::finalize::{finalize, FinalizedReport};
use crate::photos::{self, PhotoIndex};

/// Input files of one report.
#[derive(Clone, Debug, Default)]
pub struct ReportInputs {
    /// `.xlsx` or delimited text file with the identifier column.
    pub dataset: PathBuf,
    /// Photo files and/or directories of photos, in upload order.
    pub photos: Vec<PathBuf>,
    pub company_logo: PathBuf,
    pub certifier_logo: PathBuf,
}

impl ReportInputs {
    /// Checks that every input exists before any of them is read.
    pub fn validate(&self) -> Result<(), ReportError> {
        let required = [
            ("dataset", &self.dataset),
            ("company logo", &self.company_logo),
            ("certifier logo", &self.certifier_logo),
        ];
        for (what, path) in required {
            if path.as_os_str().is_empty() {
                return Err(ReportError::configuration(format!("no {what} was provided")));
            }
            if !path.is_file() {
                return Err(ReportError::configuration(format!(
                    "{what} {} does not exist",
                    path.display()
                )));
            }
        }
        if let Some(missing) = self.photos.iter().find(|path| !path.exists()) {
            return Err(ReportError::configuration(format!(
                "photo source {} does not exist",
                missing.display()
            )));
        }
        Ok(())
    }

    /// Builds the photo index; directories expand to their photos in file-name order.
    pub fn photo_index(&self, config: &ReportConfig) -> Result<PhotoIndex, ReportError> {
        let mut files = Vec::new();
        for source in &self.photos {
            if source.is_dir() {
                files.extend(photos::photo_files_in(source)?);
            } else {
                files.push(source.clone());
            }
        }
        let index = PhotoIndex::from_paths(&files, config.photos.duplicate_policy)?;
        info!("Indexed {} photo stem(s) from {} file(s)", index.len(), files.len());
        Ok(index)
    }
}

/// Everything a run produced.
#[derive(Debug)]
pub struct GeneratedReport {
    pub assembled: AssembledReport,
    pub files: FinalizedReport,
}

/// Validates inputs, loads them, assembles the report and finalizes it.
///
/// Fatal problems (missing inputs or identifier column, unreadable logos)
/// surface before any document bytes are produced.
pub fn generate(
    inputs: &ReportInputs,
    config: &ReportConfig,
    converter: &dyn FixedLayoutConverter,
    date: NaiveDate,
) -> Result<GeneratedReport, ReportError> {
    inputs.validate()?;
    let dataset = Dataset::load(&inputs.dataset, &config.dataset)?;
    let branding = Branding::load(&inputs.company_logo, &inputs.certifier_logo)?;
    let photos = inputs.photo_index(config)?;

    let assembled = ReportAssembler::new(config.clone()).assemble(&dataset, &photos, &branding, date);
    let files = finalize(&assembled.document, converter)?;

    Ok(GeneratedReport { assembled, files })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_inputs_are_configuration_errors() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = dir.path().join("rows.csv");
        std::fs::write(&dataset, "ID\nA1\n").unwrap();

        let inputs = ReportInputs {
            dataset,
            photos: vec![dir.path().to_path_buf()],
            company_logo: dir.path().join("missing.png"),
            certifier_logo: PathBuf::new(),
        };
        let err = inputs.validate().unwrap_err();
        assert!(matches!(err, ReportError::Configuration(_)));
        assert!(err.to_string().contains("company logo"));
    }
}
