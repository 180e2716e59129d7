//! Paginated photo reports from a spreadsheet and a set of photos.
//!
//! One content page is produced per dataset row, showing the row identifier,
//! its location and the photo whose file stem equals the identifier. A branded
//! cover and an optional closing page frame the content. The editable output is
//! a Word (`.docx`) document; a PDF is exported next to it when a converter is
//! available.
//!
//! ```no_run
//! use photo_report::{generate, PdfMode, ReportConfig, ReportInputs};
//!
//! let inputs = ReportInputs {
//!     dataset: "oleoes.xlsx".into(),
//!     photos: vec!["fotos".into()],
//!     company_logo: "empresa.png".into(),
//!     certifier_logo: "certificador.png".into(),
//! };
//! let config = ReportConfig::default();
//! let date = chrono::Local::now().date_naive();
//! let report = generate(&inputs, &config, PdfMode::Auto.converter().as_ref(), date)?;
//! report.files.write_to("out", &config.report.output_name)?;
//! # Ok::<(), photo_report::ReportError>(())
//! ```

pub mod assembler;
pub mod branding;
pub mod builder;
pub mod config;
pub mod convert;
pub mod dataset;
pub mod docx;
pub mod elements;
pub mod error;
pub mod finalize;
pub mod fonts;
pub mod imaging;
pub mod model;
pub mod photos;
pub mod pipeline;
pub mod richtext;

#[cfg(feature = "bookmarks")]
pub mod bookmarks;

pub use assembler::{AssembledReport, PhotoOutcome, ReportAssembler, RowOutcome};
pub use branding::Branding;
pub use config::ReportConfig;
pub use convert::{FixedLayoutConverter, PdfMode};
pub use dataset::{Dataset, Row};
pub use error::{ConversionError, ReportError};
pub use finalize::{finalize, FinalizedReport, WrittenFiles};
pub use model::ReportDocument;
pub use photos::{DuplicatePolicy, PhotoIndex};
pub use pipeline::{generate, GeneratedReport, ReportInputs};
