use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use env_logger::Env;
use log::info;
use photo_report::{generate, PdfMode, PhotoOutcome, ReportConfig, ReportInputs};

/// Builds the photo report (Word document plus optional PDF) for a dataset.
///
/// The LibreOffice executable can be set with `PHOTO_REPORT_SOFFICE` and the
/// fonts of the built-in PDF renderer with `PHOTO_REPORT_FONTS_DIR`.
#[derive(Parser)]
#[command(author, version, about = "Generate paginated photo reports")]
struct Cli {
    /// Spreadsheet (.xlsx) or delimited file (.csv, .tsv) with the identifier column.
    #[arg(long)]
    dataset: PathBuf,

    /// Photo files or directories of photos, processed in the given order.
    /// Without any, every row gets the missing-photo placeholder.
    #[arg(long, num_args = 0..)]
    photos: Vec<PathBuf>,

    #[arg(long)]
    company_logo: PathBuf,

    #[arg(long)]
    certifier_logo: PathBuf,

    /// TOML file overriding texts, labels and layout.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory receiving the outputs.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// PDF export strategy.
    #[arg(long, value_enum, default_value_t = PdfArg::Auto)]
    pdf: PdfArg,

    /// Leave out the closing page.
    #[arg(long)]
    no_closing: bool,

    /// Leave out page numbers on content pages.
    #[arg(long)]
    no_page_numbers: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum PdfArg {
    Auto,
    Office,
    Builtin,
    None,
}

impl From<PdfArg> for PdfMode {
    fn from(arg: PdfArg) -> Self {
        match arg {
            PdfArg::Auto => PdfMode::Auto,
            PdfArg::Office => PdfMode::Office,
            PdfArg::Builtin => PdfMode::Builtin,
            PdfArg::None => PdfMode::None,
        }
    }
}

fn main() {
    env_logger::init_from_env(Env::default().default_filter_or("info"));
    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        eprintln!("Error: {}", err);
        print_error_sources(err.as_ref());
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let mut config = match &cli.config {
        Some(path) => ReportConfig::load(path)?,
        None => ReportConfig::default(),
    };
    if cli.no_closing {
        config.closing.enabled = false;
    }
    if cli.no_page_numbers {
        config.layout.page_numbers = false;
    }

    let inputs = ReportInputs {
        dataset: cli.dataset,
        photos: cli.photos,
        company_logo: cli.company_logo,
        certifier_logo: cli.certifier_logo,
    };
    let mode = PdfMode::from(cli.pdf);
    info!("PDF export mode: {mode}");
    let converter = mode.converter();
    let date = chrono::Local::now().date_naive();

    let report = generate(&inputs, &config, converter.as_ref(), date)?;

    for outcome in &report.assembled.outcomes {
        match &outcome.photo {
            PhotoOutcome::Embedded => {}
            PhotoOutcome::NotFound => println!("{}: photo not found", outcome.id),
            PhotoOutcome::Invalid(err) => println!("{}: {}", outcome.id, err),
        }
    }
    let (embedded, missing, invalid) = report.assembled.summary();
    println!("Rows: {embedded} with photo, {missing} without, {invalid} invalid");

    let written = report.files.write_to(&cli.out_dir, &config.report.output_name)?;
    println!("Wrote {}", written.docx.display());
    match &written.pdf {
        Some(pdf) => println!("Wrote {}", pdf.display()),
        None => {
            for warning in &report.files.warnings {
                println!("PDF not produced: {warning}");
            }
        }
    }
    Ok(())
}

fn print_error_sources(mut error: &(dyn Error + 'static)) {
    while let Some(source) = error.source() {
        eprintln!("  caused by: {}", source);
        error = source;
    }
}
