use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::{debug, info};

use super::FixedLayoutConverter;
use crate::error::ConversionError;

/// Environment variable overriding the LibreOffice executable.
pub const SOFFICE_ENV: &str = "PHOTO_REPORT_SOFFICE";

const DEFAULT_PROGRAM: &str = "soffice";
const INPUT_NAME: &str = "report.docx";
const OUTPUT_NAME: &str = "report.pdf";

/// Converts through a headless LibreOffice run inside a scratch directory.
///
/// The scratch directory also holds a private user profile so that a desktop
/// instance of the office suite does not swallow the conversion request.
#[derive(Clone, Debug)]
pub struct OfficeConverter {
    program: PathBuf,
}

impl OfficeConverter {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Uses `$PHOTO_REPORT_SOFFICE`, falling back to `soffice` on the `PATH`.
    pub fn from_env() -> Self {
        let program = env::var_os(SOFFICE_ENV)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PROGRAM));
        Self::new(program)
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl Default for OfficeConverter {
    fn default() -> Self {
        Self::from_env()
    }
}

impl FixedLayoutConverter for OfficeConverter {
    fn name(&self) -> &str {
        "office"
    }

    fn convert(&self, docx: &[u8]) -> Result<Vec<u8>, ConversionError> {
        let workdir = tempfile::tempdir()?;
        let input = workdir.path().join(INPUT_NAME);
        fs::write(&input, docx)?;
        let profile = workdir.path().join("profile");

        debug!(
            "Running {} --convert-to pdf in {}",
            self.program.display(),
            workdir.path().display()
        );
        let output = Command::new(&self.program)
            .arg(format!("-env:UserInstallation=file://{}", profile.display()))
            .args(["--headless", "--norestore", "--convert-to", "pdf", "--outdir"])
            .arg(workdir.path())
            .arg(&input)
            .output()
            .map_err(|err| match err.kind() {
                io::ErrorKind::NotFound => ConversionError::Unavailable(format!(
                    "{} not found (set {SOFFICE_ENV})",
                    self.program.display()
                )),
                _ => ConversionError::Io(err),
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !output.status.success() {
            return Err(ConversionError::Failed(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                stderr
            )));
        }

        match fs::read(workdir.path().join(OUTPUT_NAME)) {
            Ok(pdf) => {
                info!("Converted document with {}", self.program.display());
                Ok(pdf)
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Err(ConversionError::Failed(
                format!("{} produced no PDF: {}", self.program.display(), stderr),
            )),
            Err(err) => Err(ConversionError::Io(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_program_is_unavailable_not_fatal() {
        let converter = OfficeConverter::new("/nonexistent/photo-report-soffice");
        assert!(matches!(
            converter.convert(b"PK"),
            Err(ConversionError::Unavailable(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn program_without_output_is_a_failure() {
        let converter = OfficeConverter::new("true");
        assert!(matches!(converter.convert(b"PK"), Err(ConversionError::Failed(_))));
    }
}
