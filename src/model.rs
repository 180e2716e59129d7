//! Data structures describing the logical content of a report.
//!
//! A [`ReportDocument`] is an ordered list of [`Page`]s plus a [`MediaStore`]
//! holding every embedded image exactly once. The model is independent of both
//! output formats: the DOCX writer serializes it, the DOCX reader reconstructs
//! it, and the built-in PDF renderer lays it out with `genpdf`.

use crate::imaging::NormalizedImage;
use crate::richtext::{self, Span};

/// Horizontal alignment of paragraphs and images.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HorizontalAlignment {
    /// Left aligned content.
    #[default]
    Left,
    /// Center aligned content.
    Center,
    /// Right aligned content.
    Right,
}

/// Rich text paragraph carrying inline styling information and alignment metadata.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RichParagraph {
    spans: Vec<Span>,
    alignment: HorizontalAlignment,
}

impl RichParagraph {
    /// Creates a paragraph from the provided spans using left alignment.
    pub fn new(spans: impl Into<Vec<Span>>) -> Self {
        Self {
            spans: spans.into(),
            ..Self::default()
        }
    }

    /// Returns the spans that make up the paragraph.
    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    /// Returns the configured alignment.
    pub fn alignment(&self) -> HorizontalAlignment {
        self.alignment
    }

    /// Returns the paragraph text without styling.
    pub fn text(&self) -> String {
        richtext::plain_text(&self.spans)
    }

    /// Sets the alignment and returns the updated paragraph.
    pub fn with_alignment(mut self, alignment: HorizontalAlignment) -> Self {
        self.alignment = alignment;
        self
    }
}

/// Handle to an image registered in a [`MediaStore`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MediaId(usize);

impl MediaId {
    /// Zero-based position of the image in the store.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Placement of a registered image with its physical size.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageBlock {
    media: MediaId,
    width_mm: f64,
    height_mm: f64,
    alignment: HorizontalAlignment,
}

impl ImageBlock {
    /// Places `media` at the given size.
    pub fn new(media: MediaId, width_mm: f64, height_mm: f64) -> Self {
        Self {
            media,
            width_mm,
            height_mm,
            alignment: HorizontalAlignment::Left,
        }
    }

    /// Places `media` at `width_mm`, deriving the height from the pixel aspect ratio.
    pub fn with_width(media: MediaId, image: &NormalizedImage, width_mm: f64) -> Self {
        let height_mm = width_mm * f64::from(image.height_px()) / f64::from(image.width_px());
        Self::new(media, width_mm, height_mm)
    }

    /// Places `media` as large as fits in `max_width_mm` × `max_height_mm`, keeping its aspect ratio.
    pub fn fit_within(media: MediaId, image: &NormalizedImage, max_width_mm: f64, max_height_mm: f64) -> Self {
        let block = Self::with_width(media, image, max_width_mm);
        if block.height_mm <= max_height_mm {
            return block;
        }
        let width_mm = max_height_mm * f64::from(image.width_px()) / f64::from(image.height_px());
        Self::new(media, width_mm, max_height_mm)
    }

    pub fn media(&self) -> MediaId {
        self.media
    }

    pub fn width_mm(&self) -> f64 {
        self.width_mm
    }

    pub fn height_mm(&self) -> f64 {
        self.height_mm
    }

    pub fn alignment(&self) -> HorizontalAlignment {
        self.alignment
    }

    /// Sets the alignment and returns the updated image block.
    pub fn with_alignment(mut self, alignment: HorizontalAlignment) -> Self {
        self.alignment = alignment;
        self
    }
}

/// Individual content blocks that make up a page.
#[derive(Clone, Debug, PartialEq)]
pub enum Block {
    /// Styled paragraph content.
    Paragraph(RichParagraph),
    /// Placed image.
    Image(ImageBlock),
    /// Side-by-side columns of equal width, each holding its own blocks.
    Columns(Vec<Vec<Block>>),
    /// An empty line.
    Spacer,
}

impl Block {
    /// Convenience helper for building a paragraph block.
    pub fn paragraph(spans: impl Into<Vec<Span>>) -> Self {
        Self::Paragraph(RichParagraph::new(spans))
    }

    /// Convenience helper for an aligned paragraph block.
    pub fn aligned(spans: impl Into<Vec<Span>>, alignment: HorizontalAlignment) -> Self {
        Self::Paragraph(RichParagraph::new(spans).with_alignment(alignment))
    }

    /// Text of the first paragraph found depth-first in this block.
    fn first_text(&self) -> Option<String> {
        match self {
            Self::Paragraph(paragraph) => Some(paragraph.text()),
            Self::Columns(columns) => columns
                .iter()
                .flat_map(|column| column.iter())
                .find_map(Block::first_text),
            Self::Image(_) | Self::Spacer => None,
        }
    }

    fn visit_images<'a>(&'a self, out: &mut Vec<&'a ImageBlock>) {
        match self {
            Self::Image(image) => out.push(image),
            Self::Columns(columns) => {
                for block in columns.iter().flatten() {
                    block.visit_images(out);
                }
            }
            Self::Paragraph(_) | Self::Spacer => {}
        }
    }
}

/// Role of a page within the report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PageKind {
    Cover,
    Content,
    Closing,
}

/// One page of the report.
#[derive(Clone, Debug, PartialEq)]
pub struct Page {
    kind: PageKind,
    blocks: Vec<Block>,
}

impl Page {
    /// Creates an empty page of the given kind.
    pub fn new(kind: PageKind) -> Self {
        Self {
            kind,
            blocks: Vec::new(),
        }
    }

    pub fn kind(&self) -> PageKind {
        self.kind
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Appends a block and returns the updated page.
    pub fn with_block(mut self, block: Block) -> Self {
        self.blocks.push(block);
        self
    }

    /// Appends a block in place.
    pub fn push(&mut self, block: Block) {
        self.blocks.push(block);
    }

    /// Text of the first paragraph on the page (the identifier line on content pages).
    pub fn label(&self) -> Option<String> {
        self.blocks.iter().find_map(Block::first_text)
    }

    /// Every image placed on the page, in reading order.
    pub fn images(&self) -> Vec<&ImageBlock> {
        let mut images = Vec::new();
        for block in &self.blocks {
            block.visit_images(&mut images);
        }
        images
    }

    /// Returns true if any paragraph on the page contains `needle`.
    pub fn contains_text(&self, needle: &str) -> bool {
        fn search(blocks: &[Block], needle: &str) -> bool {
            blocks.iter().any(|block| match block {
                Block::Paragraph(paragraph) => paragraph.text().contains(needle),
                Block::Columns(columns) => columns.iter().any(|column| search(column, needle)),
                Block::Image(_) | Block::Spacer => false,
            })
        }
        search(&self.blocks, needle)
    }
}

/// Paper geometry shared by every page. Lengths are in millimetres.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageSetup {
    pub width_mm: f64,
    pub height_mm: f64,
    pub margin_mm: f64,
    /// Whether content pages carry a live page number in their footer.
    pub page_numbers: bool,
}

impl PageSetup {
    /// A4 landscape with uniform margins.
    pub fn a4_landscape(margin_mm: f64) -> Self {
        Self {
            width_mm: 297.0,
            height_mm: 210.0,
            margin_mm,
            page_numbers: true,
        }
    }

    /// Width available between the left and right margins.
    pub fn content_width_mm(&self) -> f64 {
        self.width_mm - 2.0 * self.margin_mm
    }

    /// Height available between the top and bottom margins.
    pub fn content_height_mm(&self) -> f64 {
        self.height_mm - 2.0 * self.margin_mm
    }
}

impl Default for PageSetup {
    fn default() -> Self {
        Self::a4_landscape(20.0)
    }
}

/// Images embedded in a document, each stored once.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MediaStore {
    items: Vec<NormalizedImage>,
}

impl MediaStore {
    /// Stores an image and returns its handle.
    pub fn register(&mut self, image: NormalizedImage) -> MediaId {
        self.items.push(image);
        MediaId(self.items.len() - 1)
    }

    pub fn get(&self, id: MediaId) -> Option<&NormalizedImage> {
        self.items.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterates over all images with their handles.
    pub fn iter(&self) -> impl Iterator<Item = (MediaId, &NormalizedImage)> {
        self.items
            .iter()
            .enumerate()
            .map(|(index, image)| (MediaId(index), image))
    }
}

/// The assembled report: ordered pages plus their media.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReportDocument {
    title: String,
    setup: PageSetup,
    pages: Vec<Page>,
    media: MediaStore,
}

impl ReportDocument {
    pub(crate) fn from_parts(
        title: String,
        setup: PageSetup,
        pages: Vec<Page>,
        media: MediaStore,
    ) -> Self {
        Self {
            title,
            setup,
            pages,
            media,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn setup(&self) -> PageSetup {
        self.setup
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn media(&self) -> &MediaStore {
        &self.media
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Content pages in dataset order.
    pub fn content_pages(&self) -> impl Iterator<Item = &Page> {
        self.pages
            .iter()
            .filter(|page| page.kind() == PageKind::Content)
    }

    /// The first paragraph text of every page, in page order.
    pub fn page_labels(&self) -> Vec<Option<String>> {
        self.pages.iter().map(Page::label).collect()
    }
}

/// Owned builder threaded through the cover, content and closing stages.
#[derive(Debug, Default)]
pub struct ReportBuilder {
    title: String,
    setup: PageSetup,
    pages: Vec<Page>,
    media: MediaStore,
}

impl ReportBuilder {
    /// Starts an empty report with the given title and paper geometry.
    pub fn new(title: impl Into<String>, setup: PageSetup) -> Self {
        Self {
            title: title.into(),
            setup,
            ..Self::default()
        }
    }

    pub fn setup(&self) -> PageSetup {
        self.setup
    }

    /// Moves an image into the media store.
    pub fn register_media(&mut self, image: NormalizedImage) -> MediaId {
        self.media.register(image)
    }

    /// Looks up a registered image.
    pub fn media(&self, id: MediaId) -> Option<&NormalizedImage> {
        self.media.get(id)
    }

    /// Appends a finished page.
    pub fn push_page(&mut self, page: Page) {
        self.pages.push(page);
    }

    /// Pages added so far.
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    /// Consumes the builder and returns the document.
    pub fn finish(self) -> ReportDocument {
        ReportDocument::from_parts(self.title, self.setup, self.pages, self.media)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::ImageKind;

    fn pixel() -> NormalizedImage {
        NormalizedImage::from_parts(vec![0u8; 4], ImageKind::Png, 40, 20)
    }

    #[test]
    fn label_searches_inside_columns() {
        let page = Page::new(PageKind::Cover)
            .with_block(Block::Spacer)
            .with_block(Block::Columns(vec![
                vec![],
                vec![Block::paragraph(vec![Span::new("Title").bold()])],
            ]));
        assert_eq!(page.label().as_deref(), Some("Title"));
    }

    #[test]
    fn width_derives_height_from_aspect_ratio() {
        let mut builder = ReportBuilder::new("t", PageSetup::default());
        let id = builder.register_media(pixel());
        let block = ImageBlock::with_width(id, builder.media(id).unwrap(), 60.0);
        assert!((block.height_mm() - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn tall_images_are_capped_by_height() {
        let portrait = NormalizedImage::from_parts(vec![0u8; 4], ImageKind::Png, 100, 400);
        let mut builder = ReportBuilder::new("t", PageSetup::default());
        let id = builder.register_media(portrait);
        let block = ImageBlock::fit_within(id, builder.media(id).unwrap(), 60.0, 60.0);
        assert_eq!((block.width_mm(), block.height_mm()), (15.0, 60.0));

        let wide = builder.register_media(pixel());
        let block = ImageBlock::fit_within(wide, builder.media(wide).unwrap(), 60.0, 60.0);
        assert_eq!((block.width_mm(), block.height_mm()), (60.0, 30.0));
    }

    #[test]
    fn media_is_stored_once_per_registration() {
        let mut builder = ReportBuilder::new("t", PageSetup::default());
        let id = builder.register_media(pixel());
        builder.push_page(Page::new(PageKind::Cover).with_block(Block::Image(ImageBlock::new(id, 1.0, 1.0))));
        builder.push_page(Page::new(PageKind::Closing).with_block(Block::Image(ImageBlock::new(id, 1.0, 1.0))));
        let document = builder.finish();
        assert_eq!(document.media().len(), 1);
        assert_eq!(document.page_count(), 2);
        assert_eq!(document.pages()[1].images()[0].media(), id);
    }
}
