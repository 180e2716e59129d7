use std::cell::RefCell;
use std::rc::Rc;

use genpdf::elements::{Break, LinearLayout, PageBreak, Paragraph, TableLayout};
use genpdf::style::Style;
use genpdf::{render, Alignment, Element, Margins, RenderResult, Size};
use log::{debug, info};

use super::FixedLayoutConverter;
use crate::builder::DocumentBuilder;
use crate::docx;
use crate::elements::{self, mm_from_f64, FittedImage};
use crate::error::ConversionError;
use crate::model::{Block, PageKind, ReportDocument, RichParagraph};
use crate::richtext;

const FONT_SIZE_PT: u8 = 11;
const FOOTER_FONT_SIZE_PT: u8 = 9;
const FOOTER_HEIGHT_MM: f64 = 8.0;
/// Space after each paragraph, close to the Word document's default.
const PARAGRAPH_SPACING_MM: f64 = 2.8;

/// Renders the document with `genpdf`, without any external program.
///
/// Needs a TrueType family on disk (see [`crate::fonts`]); without one the
/// conversion reports itself unavailable.
#[derive(Clone, Debug, Default)]
pub struct BuiltinConverter;

impl BuiltinConverter {
    pub fn new() -> Self {
        Self
    }
}

impl FixedLayoutConverter for BuiltinConverter {
    fn name(&self) -> &str {
        "builtin"
    }

    fn convert(&self, docx: &[u8]) -> Result<Vec<u8>, ConversionError> {
        let document = docx::read(docx)
            .map_err(|err| ConversionError::Failed(format!("cannot re-read the document: {err}")))?;
        render_pdf(&document)
    }
}

fn failed(err: impl std::fmt::Display) -> ConversionError {
    ConversionError::Failed(err.to_string())
}

/// Logical page currently laid out, and the PDF page each logical page starts on.
#[derive(Debug)]
struct PageTracker {
    kind: PageKind,
    physical: usize,
    starts: Vec<usize>,
}

impl PageTracker {
    fn mark_start(&mut self) {
        let page = self.physical;
        self.starts.push(page);
    }
}

/// Opens a logical page. Every page but the first begins with a page break.
///
/// The kind is announced before the break so the decorator of the new PDF page
/// already sees it; pages that overflow keep the kind of the page they continue.
struct PageStart {
    kind: PageKind,
    tracker: Rc<RefCell<PageTracker>>,
    page_break: Option<PageBreak>,
    announced: bool,
}

impl Element for PageStart {
    fn render(
        &mut self,
        context: &genpdf::Context,
        area: render::Area<'_>,
        style: Style,
    ) -> Result<RenderResult, genpdf::error::Error> {
        let Some(page_break) = self.page_break.as_mut() else {
            self.tracker.borrow_mut().mark_start();
            return Ok(RenderResult::default());
        };
        if !self.announced {
            self.announced = true;
            self.tracker.borrow_mut().kind = self.kind;
        }
        let result = page_break.render(context, area, style)?;
        if !result.has_more {
            self.tracker.borrow_mut().mark_start();
        }
        Ok(result)
    }
}

/// Lays out every page of `document`, each starting on a new PDF page.
///
/// A page too tall for one sheet continues on the next; content pages and their
/// continuations get the page number in the footer when the document asks for it.
pub fn render_pdf(document: &ReportDocument) -> Result<Vec<u8>, ConversionError> {
    let setup = document.setup();
    let first_kind = document
        .pages()
        .first()
        .map_or(PageKind::Content, |page| page.kind());
    let tracker = Rc::new(RefCell::new(PageTracker {
        kind: first_kind,
        physical: 0,
        starts: Vec::with_capacity(document.page_count()),
    }));

    let page_numbers = setup.page_numbers;
    let footer_height = FOOTER_HEIGHT_MM.min(setup.margin_mm);
    let footer_tracker = Rc::clone(&tracker);
    let builder = DocumentBuilder::new()
        .with_title(document.title())
        .with_paper_size(Size::new(
            mm_from_f64(setup.width_mm),
            mm_from_f64(setup.height_mm),
        ))
        .with_margin(mm_from_f64(setup.margin_mm))
        .with_footer(mm_from_f64(footer_height), move |page| {
            let mut tracker = footer_tracker.borrow_mut();
            tracker.physical = page;
            (page_numbers && tracker.kind == PageKind::Content).then(|| {
                Paragraph::new(page.to_string())
                    .aligned(Alignment::Right)
                    .styled(Style::new().with_font_size(FOOTER_FONT_SIZE_PT))
            })
        });

    let mut pdf = builder
        .build()
        .map_err(|err| ConversionError::Unavailable(err.to_string()))?;
    pdf.set_font_size(FONT_SIZE_PT);

    for (index, page) in document.pages().iter().enumerate() {
        pdf.push(PageStart {
            kind: page.kind(),
            tracker: Rc::clone(&tracker),
            page_break: (index > 0).then(PageBreak::new),
            announced: false,
        });
        let mut layout = LinearLayout::vertical();
        for block in page.blocks() {
            push_block(&mut layout, block, document)?;
        }
        pdf.push(layout);
    }

    let mut bytes = Vec::new();
    pdf.render(&mut bytes).map_err(failed)?;
    debug!(
        "Rendered {} report pages on {} PDF pages ({} bytes)",
        document.page_count(),
        tracker.borrow().physical,
        bytes.len()
    );

    #[cfg(feature = "bookmarks")]
    let bytes = {
        let targets = outline_targets(document, &tracker.borrow().starts);
        crate::bookmarks::apply_outline(&bytes, &targets).map_err(failed)?
    };

    info!("Built-in renderer produced {} bytes", bytes.len());
    Ok(bytes)
}

/// One outline entry per content page, titled with the page's identifier line
/// and pointing at the PDF page the content page starts on.
#[cfg(feature = "bookmarks")]
fn outline_targets(document: &ReportDocument, starts: &[usize]) -> Vec<crate::bookmarks::OutlineTarget> {
    document
        .pages()
        .iter()
        .zip(starts)
        .filter(|(page, _)| page.kind() == PageKind::Content)
        .filter_map(|(page, start)| {
            page.label()
                .map(|label| crate::bookmarks::OutlineTarget::new(label, *start))
        })
        .collect()
}

fn push_block(
    layout: &mut LinearLayout,
    block: &Block,
    document: &ReportDocument,
) -> Result<(), ConversionError> {
    match block {
        Block::Paragraph(paragraph) => {
            let spacing = Margins::trbl(0, 0, mm_from_f64(PARAGRAPH_SPACING_MM), 0);
            layout.push(paragraph_element(paragraph).padded(spacing));
        }
        Block::Image(image) => {
            let media = document.media().get(image.media()).ok_or_else(|| {
                ConversionError::Failed(format!("image #{} is missing", image.media().index()))
            })?;
            let decoded = media.to_dynamic().map_err(failed)?;
            let element = FittedImage::from_dynamic_image(decoded, image.width_mm(), image.height_mm())
                .map_err(failed)?
                .with_alignment(image.alignment());
            layout.push(element);
        }
        Block::Columns(columns) if !columns.is_empty() => {
            let mut table = TableLayout::new(vec![1; columns.len()]);
            let mut cells: Vec<Box<dyn Element>> = Vec::with_capacity(columns.len());
            for column in columns {
                let mut cell = LinearLayout::vertical();
                for block in column {
                    push_block(&mut cell, block, document)?;
                }
                cells.push(Box::new(cell));
            }
            table.push_row(cells).map_err(failed)?;
            layout.push(table);
        }
        Block::Columns(_) => {}
        Block::Spacer => layout.push(Break::new(1)),
    }
    Ok(())
}

/// A paragraph becomes one `genpdf` paragraph per line; blank lines become breaks.
fn paragraph_element(paragraph: &RichParagraph) -> LinearLayout {
    let alignment = elements::alignment(paragraph.alignment());
    let mut lines = LinearLayout::vertical();
    for line in richtext::split_lines(paragraph.spans()) {
        if line.is_empty() {
            lines.push(Break::new(1));
            continue;
        }
        let mut element = Paragraph::default();
        for string in line {
            element.push(string);
        }
        element.set_alignment(alignment);
        lines.push(element);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "bookmarks")]
    #[test]
    fn outline_follows_where_pages_start() {
        use crate::model::{Page, PageSetup, ReportBuilder};
        use crate::richtext::Span;

        let mut builder = ReportBuilder::new("t", PageSetup::default());
        builder.push_page(Page::new(PageKind::Cover).with_block(Block::paragraph(vec![Span::new("Capa")])));
        for id in ["A1", "A2"] {
            builder.push_page(Page::new(PageKind::Content).with_block(Block::paragraph(vec![Span::new(id)])));
        }
        let document = builder.finish();

        // The cover spilled onto a second sheet.
        let targets = outline_targets(&document, &[1, 3, 4]);
        let pages: Vec<(String, usize)> = targets
            .into_iter()
            .map(|target| (target.title, target.page_number))
            .collect();
        assert_eq!(pages, [("A1".to_string(), 3), ("A2".to_string(), 4)]);
    }

    #[test]
    fn unreadable_package_is_a_failure() {
        let converter = BuiltinConverter::new();
        assert!(matches!(converter.convert(b"not a docx"), Err(ConversionError::Failed(_))));
    }
}
