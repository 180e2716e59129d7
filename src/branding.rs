//! Company and certifier logos.

use std::fs;
use std::path::Path;

use crate::error::ReportError;
use crate::imaging::{self, NormalizedImage};

/// Both branding logos, decoded and normalized once.
#[derive(Clone, Debug)]
pub struct Branding {
    company: NormalizedImage,
    certifier: NormalizedImage,
}

impl Branding {
    /// Decodes both logos from raw bytes. Either failing aborts the report.
    pub fn from_bytes(company: impl AsRef<[u8]>, certifier: impl AsRef<[u8]>) -> Result<Self, ReportError> {
        let company = imaging::normalize_logo(company).map_err(|source| ReportError::AssetDecode {
            asset: "company logo",
            source,
        })?;
        let certifier =
            imaging::normalize_logo(certifier).map_err(|source| ReportError::AssetDecode {
                asset: "certifier logo",
                source,
            })?;
        Ok(Self { company, certifier })
    }

    /// Reads and decodes both logos from disk.
    pub fn load(company: impl AsRef<Path>, certifier: impl AsRef<Path>) -> Result<Self, ReportError> {
        let read = |path: &Path| fs::read(path).map_err(|err| ReportError::io(path, err));
        Self::from_bytes(read(company.as_ref())?, read(certifier.as_ref())?)
    }

    pub fn company(&self) -> &NormalizedImage {
        &self.company
    }

    pub fn certifier(&self) -> &NormalizedImage {
        &self.certifier
    }
}
