use std::collections::HashMap;
use std::io::{Cursor, Read};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use zip::ZipArchive;

use super::{
    emu_to_mm, kind_from_bookmark, twips_to_mm, xml_error, DocxError, CORE_PART, DOCUMENT_PART,
    DOCUMENT_RELS_PART, NUMBERED_FOOTER, REL_TYPE_IMAGE,
};
use crate::imaging::{ImageKind, NormalizedImage};
use crate::model::{
    Block, HorizontalAlignment, ImageBlock, MediaId, MediaStore, Page, PageKind, PageSetup,
    ReportDocument, RichParagraph,
};
use crate::richtext::Span;

/// Maximum decompressed bytes read from a single package part.
const MAX_PART_BYTES: u64 = 256 * 1024 * 1024;

type Archive<'a> = ZipArchive<Cursor<&'a [u8]>>;

/// Parses a `.docx` package back into a [`ReportDocument`].
///
/// Page boundaries come from the page bookmarks the writer emits; content that
/// follows an explicit page break (`<w:br w:type="page"/>` or `pageBreakBefore`)
/// without a bookmark starts a new content page.
/// Images are registered in the order their relationships are declared.
pub fn read(bytes: &[u8]) -> Result<ReportDocument, DocxError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;

    let relationships = parse_relationships(&read_part(&mut archive, DOCUMENT_RELS_PART)?)?;
    let mut media = MediaStore::default();
    let mut media_ids = HashMap::new();
    let mut numbered_footer = None;
    for relationship in &relationships {
        if relationship.kind == REL_TYPE_IMAGE {
            let part = resolve_target(&relationship.target);
            let kind = part
                .rsplit_once('.')
                .and_then(|(_, extension)| ImageKind::from_extension(extension))
                .unwrap_or(ImageKind::Png);
            let image = NormalizedImage::from_encoded(read_part(&mut archive, &part)?, kind)
                .map_err(DocxError::Image)?;
            media_ids.insert(relationship.id.clone(), media.register(image));
        } else if relationship.target == NUMBERED_FOOTER {
            numbered_footer = Some(relationship.id.clone());
        }
    }

    let title = if archive.index_for_name(CORE_PART).is_some() {
        parse_title(&read_part(&mut archive, CORE_PART)?)?
    } else {
        String::new()
    };

    let body = read_part(&mut archive, DOCUMENT_PART)?;
    let (pages, setup) = BodyParser::new(&media_ids, numbered_footer.as_deref()).parse(&body)?;
    Ok(ReportDocument::from_parts(title, setup, pages, media))
}

fn read_part(archive: &mut Archive<'_>, name: &str) -> Result<Vec<u8>, DocxError> {
    let entry = archive
        .by_name(name)
        .map_err(|_| DocxError::MissingPart(name.to_string()))?;
    let mut out = Vec::new();
    entry.take(MAX_PART_BYTES).read_to_end(&mut out)?;
    if out.len() as u64 >= MAX_PART_BYTES {
        return Err(DocxError::Zip(format!(
            "part {name} exceeds size limit ({MAX_PART_BYTES} bytes)"
        )));
    }
    Ok(out)
}

/// Relationship targets are relative to `word/`.
fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("word/{target}"),
    }
}

fn attribute(element: &BytesStart<'_>, local: &[u8]) -> Result<Option<String>, DocxError> {
    for attribute in element.attributes() {
        let attribute = attribute.map_err(xml_error)?;
        if attribute.key.local_name().as_ref() == local {
            let value = attribute.unescape_value().map_err(xml_error)?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn numeric_attribute(element: &BytesStart<'_>, local: &[u8]) -> Result<Option<f64>, DocxError> {
    Ok(attribute(element, local)?.and_then(|value| value.trim().parse().ok()))
}

/// `<w:b/>` and `<w:b w:val="1"/>` switch the property on; `0`, `false` and `off` switch it off.
fn toggle(element: &BytesStart<'_>) -> Result<bool, DocxError> {
    Ok(!matches!(
        attribute(element, b"val")?.as_deref(),
        Some("0" | "false" | "off")
    ))
}

struct Relationship {
    id: String,
    kind: String,
    target: String,
}

fn parse_relationships(xml: &[u8]) -> Result<Vec<Relationship>, DocxError> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut relationships = Vec::new();
    loop {
        match reader.read_event_into(&mut buf).map_err(xml_error)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                if let (Some(id), Some(kind), Some(target)) = (
                    attribute(&e, b"Id")?,
                    attribute(&e, b"Type")?,
                    attribute(&e, b"Target")?,
                ) {
                    relationships.push(Relationship { id, kind, target });
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(relationships)
}

fn parse_title(xml: &[u8]) -> Result<String, DocxError> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut title = String::new();
    let mut in_title = false;
    loop {
        match reader.read_event_into(&mut buf).map_err(xml_error)? {
            Event::Start(e) if e.local_name().as_ref() == b"title" => in_title = true,
            Event::Text(text) if in_title => title.push_str(&text.unescape().map_err(xml_error)?),
            Event::End(e) if e.local_name().as_ref() == b"title" => in_title = false,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(title)
}

#[derive(Default)]
struct ParagraphState {
    spans: Vec<Span>,
    alignment: HorizontalAlignment,
    images: Vec<ImageBlock>,
    page_break: bool,
    break_before: bool,
    section_break: bool,
}

#[derive(Default)]
struct RunState {
    text: String,
    bold: bool,
    italic: bool,
}

#[derive(Default)]
struct DrawingState {
    extent: Option<(f64, f64)>,
    embed: Option<String>,
}

enum Frame {
    Table(Vec<Vec<Block>>),
    Cell(Vec<Block>),
}

struct BodyParser<'a> {
    media_ids: &'a HashMap<String, MediaId>,
    numbered_footer: Option<&'a str>,
    pages: Vec<Page>,
    current: Option<Page>,
    pending_break: bool,
    frames: Vec<Frame>,
    paragraph: Option<ParagraphState>,
    run: Option<RunState>,
    drawing: Option<DrawingState>,
    in_text: bool,
    setup: PageSetup,
    page_numbers: bool,
}

impl<'a> BodyParser<'a> {
    fn new(media_ids: &'a HashMap<String, MediaId>, numbered_footer: Option<&'a str>) -> Self {
        Self {
            media_ids,
            numbered_footer,
            pages: Vec::new(),
            current: None,
            pending_break: false,
            frames: Vec::new(),
            paragraph: None,
            run: None,
            drawing: None,
            in_text: false,
            setup: PageSetup::default(),
            page_numbers: false,
        }
    }

    fn parse(mut self, xml: &[u8]) -> Result<(Vec<Page>, PageSetup), DocxError> {
        let mut reader = Reader::from_reader(xml);
        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf).map_err(xml_error)? {
                Event::Start(e) => self.start(&e, false)?,
                Event::Empty(e) => {
                    self.start(&e, true)?;
                    self.end(e.local_name().as_ref())?;
                }
                Event::Text(text) if self.in_text => {
                    let text = text.unescape().map_err(xml_error)?;
                    if let Some(run) = self.run.as_mut() {
                        run.text.push_str(&text);
                    }
                }
                Event::End(e) => self.end(e.local_name().as_ref())?,
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }
        self.finish_page();
        let mut setup = self.setup;
        setup.page_numbers = self.page_numbers;
        Ok((self.pages, setup))
    }

    fn start(&mut self, element: &BytesStart<'_>, empty: bool) -> Result<(), DocxError> {
        match element.local_name().as_ref() {
            b"p" => self.paragraph = Some(ParagraphState::default()),
            b"jc" => {
                if let Some(paragraph) = self.paragraph.as_mut() {
                    paragraph.alignment = match attribute(element, b"val")?.as_deref() {
                        Some("center") => HorizontalAlignment::Center,
                        Some("right" | "end") => HorizontalAlignment::Right,
                        _ => HorizontalAlignment::Left,
                    };
                }
            }
            b"pageBreakBefore" => {
                let on = toggle(element)?;
                if let Some(paragraph) = self.paragraph.as_mut() {
                    paragraph.break_before = on;
                }
            }
            b"r" => self.run = Some(RunState::default()),
            b"b" => {
                let on = toggle(element)?;
                if let Some(run) = self.run.as_mut() {
                    run.bold = on;
                }
            }
            b"i" => {
                let on = toggle(element)?;
                if let Some(run) = self.run.as_mut() {
                    run.italic = on;
                }
            }
            b"t" => self.in_text = !empty,
            b"tab" => {
                if let Some(run) = self.run.as_mut() {
                    run.text.push('\t');
                }
            }
            b"br" => {
                if attribute(element, b"type")?.as_deref() == Some("page") {
                    if let Some(paragraph) = self.paragraph.as_mut() {
                        paragraph.page_break = true;
                    } else {
                        self.pending_break = true;
                    }
                } else if let Some(run) = self.run.as_mut() {
                    run.text.push('\n');
                }
            }
            b"drawing" => self.drawing = Some(DrawingState::default()),
            b"extent" => {
                if let Some(drawing) = self.drawing.as_mut() {
                    if let (Some(cx), Some(cy)) =
                        (numeric_attribute(element, b"cx")?, numeric_attribute(element, b"cy")?)
                    {
                        drawing.extent = Some((emu_to_mm(cx), emu_to_mm(cy)));
                    }
                }
            }
            b"blip" => {
                if let Some(drawing) = self.drawing.as_mut() {
                    drawing.embed = attribute(element, b"embed")?;
                }
            }
            b"sectPr" => {
                if let Some(paragraph) = self.paragraph.as_mut() {
                    paragraph.section_break = true;
                }
            }
            b"footerReference" => {
                let id = attribute(element, b"id")?;
                if id.is_some() && id.as_deref() == self.numbered_footer {
                    self.page_numbers = true;
                }
            }
            b"pgSz" => {
                if let Some(width) = numeric_attribute(element, b"w")? {
                    self.setup.width_mm = twips_to_mm(width);
                }
                if let Some(height) = numeric_attribute(element, b"h")? {
                    self.setup.height_mm = twips_to_mm(height);
                }
            }
            b"pgMar" => {
                if let Some(left) = numeric_attribute(element, b"left")? {
                    self.setup.margin_mm = twips_to_mm(left);
                }
            }
            b"bookmarkStart" => {
                if let Some(kind) = attribute(element, b"name")?.as_deref().and_then(kind_from_bookmark) {
                    self.finish_page();
                    self.current = Some(Page::new(kind));
                    self.pending_break = false;
                }
            }
            b"tbl" => self.frames.push(Frame::Table(Vec::new())),
            b"tc" => self.frames.push(Frame::Cell(Vec::new())),
            _ => {}
        }
        Ok(())
    }

    fn end(&mut self, name: &[u8]) -> Result<(), DocxError> {
        match name {
            b"t" => self.in_text = false,
            b"r" => self.finish_run(),
            b"drawing" => self.finish_drawing()?,
            b"p" => self.finish_paragraph(),
            b"tc" => {
                if let Some(Frame::Cell(mut blocks)) = self.frames.pop() {
                    // Drop the empty paragraph that terminates a cell.
                    let padded = matches!(
                        blocks.as_slice(),
                        [Block::Spacer] | [.., Block::Columns(_), Block::Spacer]
                    );
                    if padded {
                        blocks.pop();
                    }
                    if let Some(Frame::Table(columns)) = self.frames.last_mut() {
                        columns.push(blocks);
                    }
                }
            }
            b"tbl" => {
                if let Some(Frame::Table(columns)) = self.frames.pop() {
                    self.emit(Block::Columns(columns));
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn finish_run(&mut self) {
        let (Some(run), Some(paragraph)) = (self.run.take(), self.paragraph.as_mut()) else {
            return;
        };
        if run.text.is_empty() {
            return;
        }
        let span = Span::new(run.text).with_bold(run.bold).with_italic(run.italic);
        match paragraph.spans.last_mut() {
            Some(last) if last.same_style(&span) => last.push_str(span.text()),
            _ => paragraph.spans.push(span),
        }
    }

    fn finish_drawing(&mut self) -> Result<(), DocxError> {
        let Some(drawing) = self.drawing.take() else {
            return Ok(());
        };
        let (Some((width_mm, height_mm)), Some(embed)) = (drawing.extent, drawing.embed) else {
            return Ok(());
        };
        let media = *self
            .media_ids
            .get(&embed)
            .ok_or_else(|| DocxError::MissingMedia(embed.clone()))?;
        if let Some(paragraph) = self.paragraph.as_mut() {
            paragraph
                .images
                .push(ImageBlock::new(media, width_mm, height_mm));
        }
        Ok(())
    }

    fn finish_paragraph(&mut self) {
        let Some(paragraph) = self.paragraph.take() else {
            return;
        };
        let page_started = self
            .current
            .as_ref()
            .map_or(true, |page| page.blocks().is_empty());
        if paragraph.break_before && self.frames.is_empty() && !page_started {
            self.pending_break = true;
        }
        let has_content = !paragraph.spans.is_empty() || !paragraph.images.is_empty();
        let marks_boundary = paragraph.section_break || paragraph.page_break || paragraph.break_before;
        if !has_content && marks_boundary {
            if paragraph.page_break {
                self.pending_break = true;
            }
            return;
        }

        if !paragraph.spans.is_empty() {
            self.emit(Block::Paragraph(
                RichParagraph::new(paragraph.spans).with_alignment(paragraph.alignment),
            ));
        }
        for image in paragraph.images {
            self.emit(Block::Image(image.with_alignment(paragraph.alignment)));
        }
        if !has_content {
            self.emit(Block::Spacer);
        }
        if paragraph.page_break {
            self.pending_break = true;
        }
    }

    fn emit(&mut self, block: Block) {
        if let Some(Frame::Cell(blocks)) = self.frames.last_mut() {
            blocks.push(block);
            return;
        }
        if self.pending_break || self.current.is_none() {
            self.finish_page();
            self.current = Some(Page::new(PageKind::Content));
            self.pending_break = false;
        }
        if let Some(page) = self.current.as_mut() {
            page.push(block);
        }
    }

    fn finish_page(&mut self) {
        if let Some(page) = self.current.take() {
            self.pages.push(page);
        }
    }
}
