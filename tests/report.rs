use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use image::{DynamicImage, ImageBuffer, ImageOutputFormat, Rgb};
use photo_report::convert::Unavailable;
use photo_report::docx;
use photo_report::model::PageKind;
use photo_report::{generate, DuplicatePolicy, PhotoOutcome, ReportConfig, ReportError, ReportInputs};
use tempfile::TempDir;

fn encoded(width: u32, height: u32, color: [u8; 3], format: ImageOutputFormat) -> Vec<u8> {
    let buffer = ImageBuffer::from_pixel(width, height, Rgb(color));
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(buffer)
        .write_to(&mut Cursor::new(&mut bytes), format)
        .unwrap();
    bytes
}

fn png(color: [u8; 3]) -> Vec<u8> {
    encoded(40, 30, color, ImageOutputFormat::Png)
}

fn jpeg(color: [u8; 3]) -> Vec<u8> {
    encoded(30, 40, color, ImageOutputFormat::Jpeg(90))
}

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new(dataset: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("oleoes.csv"), dataset).unwrap();
        fs::write(dir.path().join("empresa.png"), png([200, 30, 30])).unwrap();
        fs::write(dir.path().join("certificador.png"), png([30, 200, 30])).unwrap();
        fs::create_dir(dir.path().join("fotos")).unwrap();
        Self { dir }
    }

    fn photo(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.dir.path().join("fotos").join(name);
        fs::write(&path, bytes).unwrap();
        path
    }

    fn inputs(&self, photos: Vec<PathBuf>) -> ReportInputs {
        ReportInputs {
            dataset: self.path("oleoes.csv"),
            photos,
            company_logo: self.path("empresa.png"),
            certifier_logo: self.path("certificador.png"),
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn photo_dir(&self) -> PathBuf {
        self.path("fotos")
    }
}

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()
}

fn is_empty_dir(path: &Path) -> bool {
    fs::read_dir(path).map(|mut entries| entries.next().is_none()).unwrap_or(true)
}

#[test]
fn one_content_page_per_row_with_placeholders() {
    let workspace = Workspace::new("ID,LOCAL\nA1,Rua Augusta\nA2,Largo do Rato\nA3,\n");
    workspace.photo("A1.jpg", &jpeg([10, 20, 30]));
    workspace.photo("A3.png", &png([90, 90, 90]));

    let config = ReportConfig::default();
    let report = generate(
        &workspace.inputs(vec![workspace.photo_dir()]),
        &config,
        &Unavailable::default(),
        date(),
    )
    .unwrap();

    let document = &report.assembled.document;
    let kinds: Vec<PageKind> = document.pages().iter().map(|page| page.kind()).collect();
    assert_eq!(
        kinds,
        [
            PageKind::Cover,
            PageKind::Content,
            PageKind::Content,
            PageKind::Content,
            PageKind::Closing
        ]
    );

    let ids: Vec<&str> = report.assembled.outcomes.iter().map(|o| o.id.as_str()).collect();
    assert_eq!(ids, ["A1", "A2", "A3"]);
    assert!(matches!(report.assembled.outcomes[0].photo, PhotoOutcome::Embedded));
    assert!(matches!(report.assembled.outcomes[1].photo, PhotoOutcome::NotFound));
    assert!(matches!(report.assembled.outcomes[2].photo, PhotoOutcome::Embedded));
    assert_eq!(report.assembled.summary(), (2, 1, 0));

    let content: Vec<_> = document.content_pages().collect();
    assert_eq!(content[0].images().len(), 1);
    assert!(content[1].images().is_empty());
    assert!(content[1].contains_text("Photo not found"));
    assert!(content[1].contains_text("Largo do Rato"));

    assert!(report.files.pdf.is_none());
    assert_eq!(report.files.warnings.len(), 1);
}

#[test]
fn written_document_reads_back_with_the_same_pages() {
    let workspace = Workspace::new("ID;LOCAL\nA1;Rua Augusta\nA2;Largo do Rato\n");
    workspace.photo("A1.jpg", &jpeg([10, 20, 30]));

    let mut config = ReportConfig::default();
    config.closing.enabled = false;
    let report = generate(
        &workspace.inputs(vec![workspace.photo_dir()]),
        &config,
        &Unavailable::default(),
        date(),
    )
    .unwrap();

    let written = report
        .files
        .write_to(workspace.path("out"), &config.report.output_name)
        .unwrap();
    assert_eq!(written.docx, workspace.path("out/relatorio_oleoes.docx"));
    assert!(written.pdf.is_none());

    let reread = docx::read(&fs::read(&written.docx).unwrap()).unwrap();
    assert_eq!(reread.page_count(), 3);
    assert_eq!(reread.page_labels(), report.assembled.document.page_labels());
    assert_eq!(reread.pages(), report.assembled.document.pages());
}

#[test]
fn corrupt_photo_degrades_to_placeholder() {
    let workspace = Workspace::new("ID\nA1\nA2\n");
    workspace.photo("A1.jpg", b"definitely not a jpeg");
    workspace.photo("A2.png", &png([1, 2, 3]));

    let report = generate(
        &workspace.inputs(vec![workspace.photo_dir()]),
        &ReportConfig::default(),
        &Unavailable::default(),
        date(),
    )
    .unwrap();

    match &report.assembled.outcomes[0].photo {
        PhotoOutcome::Invalid(err) => assert_eq!(err.file_name(), "A1.jpg"),
        other => panic!("unexpected outcome {other:?}"),
    }
    assert!(matches!(report.assembled.outcomes[1].photo, PhotoOutcome::Embedded));

    let first = report.assembled.document.content_pages().next().unwrap();
    assert!(first.contains_text("Invalid image"));
    assert!(first.images().is_empty());
}

#[test]
fn missing_identifier_column_fails_before_any_output() {
    let workspace = Workspace::new("CODIGO,LOCAL\nA1,Rua Augusta\n");
    workspace.photo("A1.jpg", &jpeg([10, 20, 30]));

    let err = generate(
        &workspace.inputs(vec![workspace.photo_dir()]),
        &ReportConfig::default(),
        &Unavailable::default(),
        date(),
    )
    .unwrap_err();

    assert!(matches!(err, ReportError::Configuration(_)), "{err:?}");
    assert!(err.to_string().contains("ID"));
    assert!(is_empty_dir(&workspace.path("out")));
}

#[test]
fn later_upload_wins_by_default() {
    let workspace = Workspace::new("ID\nA1\n");
    let jpg = workspace.photo("A1.jpg", &jpeg([10, 20, 30]));
    let png_path = workspace.photo("A1.png", &png([200, 200, 200]));

    let mut config = ReportConfig::default();
    let index = workspace
        .inputs(vec![jpg.clone(), png_path.clone()])
        .photo_index(&config)
        .unwrap();
    assert_eq!(index.len(), 1);
    assert_eq!(index.get("A1").unwrap().file_name(), "A1.png");

    config.photos.duplicate_policy = DuplicatePolicy::FirstWins;
    let index = workspace.inputs(vec![jpg, png_path]).photo_index(&config).unwrap();
    assert_eq!(index.get("A1").unwrap().file_name(), "A1.jpg");
}

#[test]
fn generation_is_deterministic_for_a_fixed_date() {
    let workspace = Workspace::new("ID,LOCAL\nA1,Rua Augusta\nA2,Largo do Rato\n");
    workspace.photo("A1.jpg", &jpeg([10, 20, 30]));
    workspace.photo("A2.png", &png([40, 50, 60]));

    let run = || {
        generate(
            &workspace.inputs(vec![workspace.photo_dir()]),
            &ReportConfig::default(),
            &Unavailable::default(),
            date(),
        )
        .unwrap()
        .files
        .docx
    };
    assert_eq!(run(), run());
}

#[test]
fn no_photo_sources_gives_placeholders_for_every_row() {
    let workspace = Workspace::new("ID,LOCAL\nA1,Rua Augusta\nA2,Largo do Rato\n");

    let report = generate(
        &workspace.inputs(Vec::new()),
        &ReportConfig::default(),
        &Unavailable::default(),
        date(),
    )
    .unwrap();

    assert!(report
        .assembled
        .outcomes
        .iter()
        .all(|outcome| matches!(outcome.photo, PhotoOutcome::NotFound)));
    assert_eq!(report.assembled.summary(), (0, 2, 0));
    assert!(report.assembled.document.content_pages().all(|page| page.images().is_empty()));
}
