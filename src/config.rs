//! Report configuration loaded from TOML.
//!
//! Every field carries a default, so an empty file (or no file at all) yields the
//! stock used-cooking-oil collection report.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::ReportError;
use crate::model::PageSetup;
use crate::photos::DuplicatePolicy;

const MM_PER_CM: f64 = 10.0;
/// Vertical room kept for the identifier line above the photo.
const LABEL_ALLOWANCE_CM: f64 = 1.0;
/// Vertical room kept for the cover texts around the two logos.
const COVER_TEXT_ALLOWANCE_CM: f64 = 4.0;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub report: ReportText,
    pub dataset: DatasetConfig,
    pub photos: PhotosConfig,
    pub labels: Labels,
    pub layout: LayoutConfig,
    pub closing: ClosingConfig,
}

/// Static cover texts and the output file base name.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportText {
    pub organization: String,
    pub title: String,
    pub campaign: String,
    pub output_name: String,
}

impl Default for ReportText {
    fn default() -> Self {
        Self {
            organization: "Município de Lisboa".to_string(),
            title: "Relatório Final de Instalações".to_string(),
            campaign: "Alargamento Rede de Oleões 2025".to_string(),
            output_name: "relatorio_oleoes".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    pub id_column: String,
    pub location_column: String,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            id_column: "ID".to_string(),
            location_column: "LOCAL".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PhotosConfig {
    pub duplicate_policy: DuplicatePolicy,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Labels {
    pub id_label: String,
    pub photo_not_found: String,
    pub invalid_image: String,
    pub certified_by: String,
}

impl Default for Labels {
    fn default() -> Self {
        Self {
            id_label: "CÓDIGO DO OLEÃO".to_string(),
            photo_not_found: "Photo not found".to_string(),
            invalid_image: "Invalid image".to_string(),
            certified_by: "GHG savings certified by:".to_string(),
        }
    }
}

/// Physical geometry of pages and placed images. Lengths are in centimetres.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub margin_cm: f64,
    pub photo_width_cm: f64,
    pub photo_height_cm: f64,
    pub photo_dpi: u32,
    pub company_logo_width_cm: f64,
    pub company_logo_max_height_cm: f64,
    pub certifier_logo_width_cm: f64,
    pub certifier_logo_max_height_cm: f64,
    pub page_numbers: bool,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            margin_cm: 2.0,
            photo_width_cm: 12.0,
            photo_height_cm: 16.0,
            photo_dpi: 150,
            company_logo_width_cm: 6.0,
            company_logo_max_height_cm: 6.0,
            certifier_logo_width_cm: 3.5,
            certifier_logo_max_height_cm: 3.5,
            page_numbers: true,
        }
    }
}

impl LayoutConfig {
    /// A4 landscape with the configured margin.
    pub fn page_setup(&self) -> PageSetup {
        let mut setup = PageSetup::a4_landscape(self.margin_cm * MM_PER_CM);
        setup.page_numbers = self.page_numbers;
        setup
    }

    /// Pixel size of the photo box at the configured DPI.
    pub fn photo_box_px(&self) -> (u32, u32) {
        let to_px = |cm: f64| ((cm / 2.54) * f64::from(self.photo_dpi)).round().max(1.0) as u32;
        (to_px(self.photo_width_cm), to_px(self.photo_height_cm))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClosingConfig {
    pub enabled: bool,
    pub city: String,
    pub contact_lines: Vec<String>,
}

impl Default for ClosingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            city: "Lisboa".to_string(),
            contact_lines: Vec::new(),
        }
    }
}

impl ReportConfig {
    /// Parses a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ReportError> {
        let config: Self = toml::from_str(text)
            .map_err(|err| ReportError::configuration(format!("invalid config: {err}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses the configuration file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ReportError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|err| ReportError::io(path, err))?;
        Self::from_toml_str(&text)
    }

    fn validate(&self) -> Result<(), ReportError> {
        let layout = &self.layout;
        let lengths = [
            ("layout.margin_cm", layout.margin_cm),
            ("layout.photo_width_cm", layout.photo_width_cm),
            ("layout.photo_height_cm", layout.photo_height_cm),
            ("layout.company_logo_width_cm", layout.company_logo_width_cm),
            ("layout.company_logo_max_height_cm", layout.company_logo_max_height_cm),
            ("layout.certifier_logo_width_cm", layout.certifier_logo_width_cm),
            ("layout.certifier_logo_max_height_cm", layout.certifier_logo_max_height_cm),
        ];
        for (name, value) in lengths {
            if !(value.is_finite() && value > 0.0) {
                return Err(ReportError::configuration(format!(
                    "{name} must be a positive length, got {value}"
                )));
            }
        }
        let content_height_cm = layout.page_setup().content_height_mm() / MM_PER_CM;
        if layout.photo_height_cm + LABEL_ALLOWANCE_CM > content_height_cm {
            return Err(ReportError::configuration(format!(
                "layout.photo_height_cm ({}) leaves no room for the label line within {content_height_cm} cm",
                layout.photo_height_cm
            )));
        }
        let cover_height_cm = layout.company_logo_max_height_cm
            + layout.certifier_logo_max_height_cm
            + COVER_TEXT_ALLOWANCE_CM;
        if cover_height_cm > content_height_cm {
            return Err(ReportError::configuration(format!(
                "logo heights do not fit on the cover page ({cover_height_cm} cm of {content_height_cm} cm)"
            )));
        }
        if layout.photo_dpi == 0 {
            return Err(ReportError::configuration("layout.photo_dpi must be positive"));
        }
        if self.dataset.id_column.trim().is_empty() {
            return Err(ReportError::configuration("dataset.id_column must not be empty"));
        }
        if self.report.output_name.trim().is_empty() {
            return Err(ReportError::configuration("report.output_name must not be empty"));
        }
        Ok(())
    }
}
