//! Report assembly: cover, one content page per dataset row, optional closing page.
//!
//! A single [`ReportBuilder`] is threaded through the three stages in order.
//! Fatal input problems are caught before assembly starts (missing columns when
//! the dataset loads, unreadable logos when [`Branding`] decodes), so assembly
//! itself cannot fail: bad photos degrade to placeholders and are reported in
//! [`AssembledReport::outcomes`].

mod closing;
mod content;
mod cover;

pub use closing::build_closing;
pub use content::build_content_page;
pub use cover::build_cover;

use chrono::NaiveDate;
use log::info;

use crate::branding::Branding;
use crate::config::ReportConfig;
use crate::dataset::Dataset;
use crate::error::RowAssetError;
use crate::model::{HorizontalAlignment, ImageBlock, ReportBuilder, ReportDocument};
use crate::photos::PhotoIndex;

const MM_PER_CM: f64 = 10.0;

/// Logo placements shared by the cover and closing pages.
///
/// Each logo is registered in the media store once; both pages reference the same entry.
#[derive(Clone, Debug)]
pub struct BrandingPlacement {
    pub company: ImageBlock,
    pub certifier: ImageBlock,
}

impl BrandingPlacement {
    /// Registers both logos, each sized to its configured width unless that would exceed its height cap.
    pub fn register(builder: &mut ReportBuilder, branding: &Branding, config: &ReportConfig) -> Self {
        let company_id = builder.register_media(branding.company().clone());
        let certifier_id = builder.register_media(branding.certifier().clone());
        let layout = &config.layout;

        Self {
            company: ImageBlock::fit_within(
                company_id,
                branding.company(),
                layout.company_logo_width_cm * MM_PER_CM,
                layout.company_logo_max_height_cm * MM_PER_CM,
            )
            .with_alignment(HorizontalAlignment::Center),
            certifier: ImageBlock::fit_within(
                certifier_id,
                branding.certifier(),
                layout.certifier_logo_width_cm * MM_PER_CM,
                layout.certifier_logo_max_height_cm * MM_PER_CM,
            )
            .with_alignment(HorizontalAlignment::Right),
        }
    }
}

/// What happened to a row's photo.
#[derive(Debug)]
pub enum PhotoOutcome {
    /// The matched photo was embedded.
    Embedded,
    /// No photo stem matches the row identifier.
    NotFound,
    /// A photo matched but could not be decoded or re-encoded.
    Invalid(RowAssetError),
}

/// Per-row result, in dataset order.
#[derive(Debug)]
pub struct RowOutcome {
    pub id: String,
    pub photo: PhotoOutcome,
}

/// The assembled document together with per-row outcomes.
#[derive(Debug)]
pub struct AssembledReport {
    pub document: ReportDocument,
    pub outcomes: Vec<RowOutcome>,
}

impl AssembledReport {
    /// Counts of embedded, not-found and invalid photos.
    pub fn summary(&self) -> (usize, usize, usize) {
        self.outcomes
            .iter()
            .fold((0, 0, 0), |(embedded, missing, invalid), outcome| match outcome.photo {
                PhotoOutcome::Embedded => (embedded + 1, missing, invalid),
                PhotoOutcome::NotFound => (embedded, missing + 1, invalid),
                PhotoOutcome::Invalid(_) => (embedded, missing, invalid + 1),
            })
    }
}

/// Runs the cover, content and closing stages for one report.
#[derive(Clone, Debug, Default)]
pub struct ReportAssembler {
    config: ReportConfig,
}

impl ReportAssembler {
    pub fn new(config: ReportConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Builds the report. `date` is printed on the closing page.
    pub fn assemble(
        &self,
        dataset: &Dataset,
        photos: &PhotoIndex,
        branding: &Branding,
        date: NaiveDate,
    ) -> AssembledReport {
        let config = &self.config;
        let mut builder = ReportBuilder::new(config.report.title.clone(), config.layout.page_setup());
        let placement = BrandingPlacement::register(&mut builder, branding, config);

        build_cover(&mut builder, &placement, config);

        let outcomes: Vec<RowOutcome> = dataset
            .rows()
            .iter()
            .map(|row| RowOutcome {
                id: row.id().to_string(),
                photo: build_content_page(&mut builder, row, photos, config),
            })
            .collect();

        if config.closing.enabled {
            build_closing(&mut builder, &placement, config, date);
        }

        let report = AssembledReport {
            document: builder.finish(),
            outcomes,
        };
        let (embedded, missing, invalid) = report.summary();
        info!(
            "Assembled {} page(s): {} photo(s) embedded, {} not found, {} invalid",
            report.document.page_count(),
            embedded,
            missing,
            invalid
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatasetConfig;
    use crate::dataset::Row;
    use crate::model::{PageKind, PageSetup};
    use crate::photos::{DuplicatePolicy, PhotoUpload};
    use image::{DynamicImage, ImageBuffer, ImageOutputFormat, Rgb};
    use std::io::Cursor;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let buffer = ImageBuffer::from_pixel(width, height, Rgb([200u8, 40, 40]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(buffer)
            .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)
            .unwrap();
        bytes
    }

    fn dataset(ids: &[&str]) -> Dataset {
        let records = ids.iter().map(|id| vec![id.to_string()]).collect::<Vec<_>>();
        Dataset::from_records(vec!["ID".to_string()], records, &DatasetConfig::default()).unwrap()
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 30).unwrap()
    }

    #[test]
    fn page_count_is_cover_rows_and_closing() {
        let branding = Branding::from_bytes(png(60, 30), png(20, 20)).unwrap();
        let photos = PhotoIndex::build(
            vec![PhotoUpload::new("A1.jpg", png(8, 12))],
            DuplicatePolicy::LastWins,
        );
        let report = ReportAssembler::default().assemble(&dataset(&["A1", "A2"]), &photos, &branding, date());

        let kinds: Vec<_> = report.document.pages().iter().map(|page| page.kind()).collect();
        assert_eq!(
            kinds,
            [PageKind::Cover, PageKind::Content, PageKind::Content, PageKind::Closing]
        );
        assert_eq!(report.summary(), (1, 1, 0));
    }

    #[test]
    fn closing_page_is_optional() {
        let mut config = ReportConfig::default();
        config.closing.enabled = false;
        let branding = Branding::from_bytes(png(60, 30), png(20, 20)).unwrap();
        let report = ReportAssembler::new(config).assemble(
            &dataset(&["A1"]),
            &PhotoIndex::default(),
            &branding,
            date(),
        );
        assert_eq!(report.document.page_count(), 2);
    }

    #[test]
    fn logos_are_stored_once_and_placed_twice() {
        let branding = Branding::from_bytes(png(60, 30), png(20, 20)).unwrap();
        let report = ReportAssembler::default().assemble(
            &dataset(&[]),
            &PhotoIndex::default(),
            &branding,
            date(),
        );
        let document = &report.document;
        assert_eq!(document.media().len(), 2);
        let cover_ids: Vec<_> = document.pages()[0].images().iter().map(|image| image.media()).collect();
        let closing_ids: Vec<_> = document.pages()[1].images().iter().map(|image| image.media()).collect();
        assert_eq!(cover_ids, closing_ids);
    }

    #[test]
    fn portrait_logos_are_capped_by_height() {
        let branding = Branding::from_bytes(png(100, 400), png(10, 40)).unwrap();
        let mut builder = ReportBuilder::new("t", PageSetup::default());
        let placement = BrandingPlacement::register(&mut builder, &branding, &ReportConfig::default());

        assert_eq!(placement.company.height_mm(), 60.0);
        assert_eq!(placement.company.width_mm(), 15.0);
        assert_eq!(placement.certifier.height_mm(), 35.0);
        assert!((placement.certifier.width_mm() - 8.75).abs() < 1e-9);
    }

    #[test]
    fn rows_keep_dataset_order() {
        let branding = Branding::from_bytes(png(10, 10), png(10, 10)).unwrap();
        let rows = dataset(&["Z9", "A1", "M5"]);
        let report = ReportAssembler::default().assemble(&rows, &PhotoIndex::default(), &branding, date());
        let ids: Vec<_> = report.outcomes.iter().map(|outcome| outcome.id.as_str()).collect();
        assert_eq!(ids, rows.rows().iter().map(Row::id).collect::<Vec<_>>());
    }
}
