use std::io::{Cursor, Write};

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::{
    bookmark_name, mm_to_emu, mm_to_twips, xml_error, DocxError, BLANK_FOOTER, CORE_PART,
    DOCUMENT_PART, DOCUMENT_RELS_PART, NS_A, NS_PIC, NS_R, NS_W, NS_WP, NUMBERED_FOOTER,
    REL_TYPE_IMAGE,
};
use crate::model::{
    Block, HorizontalAlignment, ImageBlock, MediaId, Page, PageKind, PageSetup, ReportDocument,
    RichParagraph,
};

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Default Extension="png" ContentType="image/png"/><Default Extension="jpeg" ContentType="image/jpeg"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/><Override PartName="/word/footer1.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.footer+xml"/><Override PartName="/word/footer2.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.footer+xml"/><Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/></Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/></Relationships>"#;

const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:docDefaults><w:rPrDefault><w:rPr><w:rFonts w:ascii="Calibri" w:hAnsi="Calibri" w:cs="Calibri"/><w:sz w:val="22"/><w:lang w:val="pt-PT"/></w:rPr></w:rPrDefault><w:pPrDefault><w:pPr><w:spacing w:after="160" w:line="259" w:lineRule="auto"/></w:pPr></w:pPrDefault></w:docDefaults><w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/></w:style><w:style w:type="table" w:default="1" w:styleId="TableNormal"><w:name w:val="Normal Table"/><w:tblPr><w:tblInd w:w="0" w:type="dxa"/><w:tblCellMar><w:top w:w="0" w:type="dxa"/><w:left w:w="108" w:type="dxa"/><w:bottom w:w="0" w:type="dxa"/><w:right w:w="108" w:type="dxa"/></w:tblCellMar></w:tblPr></w:style></w:styles>"#;

const NUMBERED_FOOTER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:ftr xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:p><w:pPr><w:jc w:val="right"/></w:pPr><w:fldSimple w:instr=" PAGE "><w:r><w:t>1</w:t></w:r></w:fldSimple></w:p></w:ftr>"#;

const BLANK_FOOTER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:ftr xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:p/></w:ftr>"#;

const REL_STYLES: &str = "rIdStyles";
const REL_NUMBERED_FOOTER: &str = "rIdFooterNumbered";
const REL_BLANK_FOOTER: &str = "rIdFooterBlank";

fn media_rel_id(id: MediaId) -> String {
    format!("rIdImage{}", id.index() + 1)
}

fn media_part_name(id: MediaId, extension: &str) -> String {
    format!("media/image{}.{}", id.index() + 1, extension)
}

/// Thin wrapper over `quick_xml::Writer` with error mapping.
struct Xml {
    inner: Writer<Vec<u8>>,
}

impl Xml {
    fn new() -> Result<Self, DocxError> {
        let mut inner = Writer::new(Vec::new());
        inner
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))
            .map_err(xml_error)?;
        Ok(Self { inner })
    }

    fn open(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<(), DocxError> {
        let start = BytesStart::new(name).with_attributes(attributes.iter().copied());
        self.inner.write_event(Event::Start(start)).map_err(xml_error)
    }

    fn close(&mut self, name: &str) -> Result<(), DocxError> {
        self.inner
            .write_event(Event::End(BytesEnd::new(name)))
            .map_err(xml_error)
    }

    fn empty(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<(), DocxError> {
        let start = BytesStart::new(name).with_attributes(attributes.iter().copied());
        self.inner.write_event(Event::Empty(start)).map_err(xml_error)
    }

    fn text(&mut self, text: &str) -> Result<(), DocxError> {
        self.inner
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(xml_error)
    }

    fn finish(self) -> Vec<u8> {
        self.inner.into_inner()
    }
}

/// Serializes the report into `.docx` bytes.
pub fn write(document: &ReportDocument) -> Result<Vec<u8>, DocxError> {
    let deflated = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default());
    let stored = deflated.compression_method(CompressionMethod::Stored);

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    put(&mut zip, "[Content_Types].xml", deflated, CONTENT_TYPES.as_bytes())?;
    put(&mut zip, "_rels/.rels", deflated, PACKAGE_RELS.as_bytes())?;
    put(&mut zip, CORE_PART, deflated, &core_properties(document)?)?;
    put(&mut zip, "word/styles.xml", deflated, STYLES.as_bytes())?;
    put(&mut zip, &format!("word/{NUMBERED_FOOTER}"), deflated, NUMBERED_FOOTER_XML.as_bytes())?;
    put(&mut zip, &format!("word/{BLANK_FOOTER}"), deflated, BLANK_FOOTER_XML.as_bytes())?;
    put(&mut zip, DOCUMENT_RELS_PART, deflated, &document_relationships(document)?)?;
    put(&mut zip, DOCUMENT_PART, deflated, &DocumentWriter::new(document)?.write()?)?;

    for (id, image) in document.media().iter() {
        let part = format!("word/{}", media_part_name(id, image.kind().extension()));
        put(&mut zip, &part, stored, image.bytes())?;
    }

    Ok(zip.finish()?.into_inner())
}

fn put(
    zip: &mut ZipWriter<Cursor<Vec<u8>>>,
    name: &str,
    options: SimpleFileOptions,
    data: &[u8],
) -> Result<(), DocxError> {
    zip.start_file(name, options)?;
    zip.write_all(data)?;
    Ok(())
}

fn core_properties(document: &ReportDocument) -> Result<Vec<u8>, DocxError> {
    let mut xml = Xml::new()?;
    xml.open(
        "cp:coreProperties",
        &[
            (
                "xmlns:cp",
                "http://schemas.openxmlformats.org/package/2006/metadata/core-properties",
            ),
            ("xmlns:dc", "http://purl.org/dc/elements/1.1/"),
        ],
    )?;
    xml.open("dc:title", &[])?;
    xml.text(document.title())?;
    xml.close("dc:title")?;
    xml.open("dc:creator", &[])?;
    xml.text(env!("CARGO_PKG_NAME"))?;
    xml.close("dc:creator")?;
    xml.close("cp:coreProperties")?;
    Ok(xml.finish())
}

fn document_relationships(document: &ReportDocument) -> Result<Vec<u8>, DocxError> {
    let mut xml = Xml::new()?;
    xml.open(
        "Relationships",
        &[("xmlns", "http://schemas.openxmlformats.org/package/2006/relationships")],
    )?;
    xml.empty(
        "Relationship",
        &[
            ("Id", REL_STYLES),
            (
                "Type",
                "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles",
            ),
            ("Target", "styles.xml"),
        ],
    )?;
    let footer_type = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/footer";
    xml.empty(
        "Relationship",
        &[("Id", REL_NUMBERED_FOOTER), ("Type", footer_type), ("Target", NUMBERED_FOOTER)],
    )?;
    xml.empty(
        "Relationship",
        &[("Id", REL_BLANK_FOOTER), ("Type", footer_type), ("Target", BLANK_FOOTER)],
    )?;
    for (id, image) in document.media().iter() {
        let rel_id = media_rel_id(id);
        let target = media_part_name(id, image.kind().extension());
        xml.empty(
            "Relationship",
            &[("Id", &rel_id), ("Type", REL_TYPE_IMAGE), ("Target", &target)],
        )?;
    }
    xml.close("Relationships")?;
    Ok(xml.finish())
}

/// Page and section boundaries folded into a top-level paragraph's properties.
#[derive(Clone, Copy, Default)]
struct Boundary {
    /// The paragraph starts a page inside a section.
    break_before: bool,
    /// The paragraph ends a non-final section of this kind.
    section_end: Option<PageKind>,
}

/// Whether a block is written as a paragraph that reads back with content.
fn carries_boundary(block: &Block) -> bool {
    match block {
        Block::Paragraph(paragraph) => paragraph.spans().iter().any(|span| !span.text().is_empty()),
        Block::Image(_) => true,
        Block::Columns(_) | Block::Spacer => false,
    }
}

fn alignment_value(alignment: HorizontalAlignment) -> Option<&'static str> {
    match alignment {
        HorizontalAlignment::Left => None,
        HorizontalAlignment::Center => Some("center"),
        HorizontalAlignment::Right => Some("right"),
    }
}

struct DocumentWriter<'a> {
    document: &'a ReportDocument,
    xml: Xml,
    next_drawing_id: usize,
    next_bookmark_id: usize,
}

impl<'a> DocumentWriter<'a> {
    fn new(document: &'a ReportDocument) -> Result<Self, DocxError> {
        let mut xml = Xml::new()?;
        xml.open(
            "w:document",
            &[
                ("xmlns:w", NS_W),
                ("xmlns:r", NS_R),
                ("xmlns:wp", NS_WP),
                ("xmlns:a", NS_A),
                ("xmlns:pic", NS_PIC),
            ],
        )?;
        xml.open("w:body", &[])?;
        Ok(Self {
            document,
            xml,
            next_drawing_id: 1,
            next_bookmark_id: 0,
        })
    }

    fn write(mut self) -> Result<Vec<u8>, DocxError> {
        let document = self.document;
        let sections = sections(document.pages());
        let mut content_index = 0;
        for (section_index, section) in sections.iter().enumerate() {
            let kind = section.first().map(|page| page.kind());
            let last_section = section_index + 1 == sections.len();
            for (page_index, page) in section.iter().enumerate() {
                if page.kind() == PageKind::Content {
                    content_index += 1;
                }
                self.bookmark(&bookmark_name(page.kind(), content_index))?;
                let section_end = if !last_section && page_index + 1 == section.len() {
                    kind
                } else {
                    None
                };
                self.page_blocks(page.blocks(), page_index > 0, section_end)?;
            }
            if last_section {
                self.section_properties(kind)?;
            }
        }
        if sections.is_empty() {
            self.section_properties(None)?;
        }

        self.xml.close("w:body")?;
        self.xml.close("w:document")?;
        Ok(self.xml.finish())
    }

    fn section_properties(&mut self, kind: Option<PageKind>) -> Result<(), DocxError> {
        let setup: PageSetup = self.document.setup();
        let footer = if kind == Some(PageKind::Content) && setup.page_numbers {
            REL_NUMBERED_FOOTER
        } else {
            REL_BLANK_FOOTER
        };
        let width = mm_to_twips(setup.width_mm).to_string();
        let height = mm_to_twips(setup.height_mm).to_string();
        let margin = mm_to_twips(setup.margin_mm).to_string();
        let orientation = if setup.width_mm > setup.height_mm {
            "landscape"
        } else {
            "portrait"
        };

        let xml = &mut self.xml;
        xml.open("w:sectPr", &[])?;
        xml.empty("w:footerReference", &[("w:type", "default"), ("r:id", footer)])?;
        xml.empty("w:type", &[("w:val", "nextPage")])?;
        xml.empty(
            "w:pgSz",
            &[("w:w", &width), ("w:h", &height), ("w:orient", orientation)],
        )?;
        xml.empty(
            "w:pgMar",
            &[
                ("w:top", &margin),
                ("w:right", &margin),
                ("w:bottom", &margin),
                ("w:left", &margin),
                ("w:header", "709"),
                ("w:footer", "709"),
                ("w:gutter", "0"),
            ],
        )?;
        xml.close("w:sectPr")
    }

    fn bookmark(&mut self, name: &str) -> Result<(), DocxError> {
        let id = self.next_bookmark_id.to_string();
        self.next_bookmark_id += 1;
        let xml = &mut self.xml;
        xml.empty("w:bookmarkStart", &[("w:id", &id), ("w:name", name)])?;
        xml.empty("w:bookmarkEnd", &[("w:id", &id)])
    }

    /// Writes one page's blocks.
    ///
    /// A page inside a section starts with `pageBreakBefore` and a non-final
    /// section ends with its `sectPr`, both on the page's own paragraphs. A zero
    /// height marker paragraph carries them when the first or last block is not
    /// a paragraph with content.
    fn page_blocks(
        &mut self,
        blocks: &[Block],
        break_before: bool,
        mut section_end: Option<PageKind>,
    ) -> Result<(), DocxError> {
        let mut boundary = Boundary {
            break_before,
            section_end: None,
        };
        if break_before && !blocks.first().is_some_and(carries_boundary) {
            self.marker_paragraph(boundary)?;
            boundary = Boundary::default();
        }
        let last = blocks.len().checked_sub(1);
        for (index, block) in blocks.iter().enumerate() {
            if Some(index) == last && carries_boundary(block) {
                boundary.section_end = section_end.take();
            }
            self.block(block, boundary)?;
            boundary = Boundary::default();
        }
        if section_end.is_some() {
            self.marker_paragraph(Boundary {
                break_before: false,
                section_end,
            })?;
        }
        Ok(())
    }

    fn marker_paragraph(&mut self, boundary: Boundary) -> Result<(), DocxError> {
        self.xml.open("w:p", &[])?;
        self.paragraph_properties(HorizontalAlignment::Left, true, boundary)?;
        self.xml.close("w:p")
    }

    /// `tight` drops the default after-spacing and line leading, for images and markers.
    fn paragraph_properties(
        &mut self,
        alignment: HorizontalAlignment,
        tight: bool,
        boundary: Boundary,
    ) -> Result<(), DocxError> {
        let jc = alignment_value(alignment);
        if jc.is_none() && !tight && !boundary.break_before && boundary.section_end.is_none() {
            return Ok(());
        }
        self.xml.open("w:pPr", &[])?;
        if boundary.break_before {
            self.xml.empty("w:pageBreakBefore", &[])?;
        }
        if tight {
            self.xml.empty(
                "w:spacing",
                &[("w:after", "0"), ("w:line", "240"), ("w:lineRule", "auto")],
            )?;
        }
        if let Some(value) = jc {
            self.xml.empty("w:jc", &[("w:val", value)])?;
        }
        if tight {
            self.xml.open("w:rPr", &[])?;
            self.xml.empty("w:sz", &[("w:val", "2")])?;
            self.xml.close("w:rPr")?;
        }
        if let Some(kind) = boundary.section_end {
            self.section_properties(Some(kind))?;
        }
        self.xml.close("w:pPr")
    }

    fn block(&mut self, block: &Block, boundary: Boundary) -> Result<(), DocxError> {
        match block {
            Block::Paragraph(paragraph) => self.paragraph(paragraph, boundary),
            Block::Image(image) => self.image_paragraph(image, boundary),
            Block::Columns(columns) => self.table(columns),
            Block::Spacer => self.xml.empty("w:p", &[]),
        }
    }

    fn paragraph(&mut self, paragraph: &RichParagraph, boundary: Boundary) -> Result<(), DocxError> {
        self.xml.open("w:p", &[])?;
        self.paragraph_properties(paragraph.alignment(), false, boundary)?;
        for span in paragraph.spans() {
            let xml = &mut self.xml;
            xml.open("w:r", &[])?;
            if span.is_bold() || span.is_italic() {
                xml.open("w:rPr", &[])?;
                if span.is_bold() {
                    xml.empty("w:b", &[])?;
                }
                if span.is_italic() {
                    xml.empty("w:i", &[])?;
                }
                xml.close("w:rPr")?;
            }
            for (index, line) in span.text().split('\n').enumerate() {
                if index > 0 {
                    xml.empty("w:br", &[])?;
                }
                if !line.is_empty() {
                    xml.open("w:t", &[("xml:space", "preserve")])?;
                    xml.text(line)?;
                    xml.close("w:t")?;
                }
            }
            xml.close("w:r")?;
        }
        self.xml.close("w:p")
    }

    fn image_paragraph(&mut self, image: &ImageBlock, boundary: Boundary) -> Result<(), DocxError> {
        let media = self
            .document
            .media()
            .get(image.media())
            .ok_or_else(|| DocxError::MissingMedia(media_rel_id(image.media())))?;
        let file_name = media_part_name(image.media(), media.kind().extension());
        let rel_id = media_rel_id(image.media());
        let cx = mm_to_emu(image.width_mm()).to_string();
        let cy = mm_to_emu(image.height_mm()).to_string();
        let drawing_id = self.next_drawing_id.to_string();
        self.next_drawing_id += 1;
        let picture_name = format!("Picture {drawing_id}");

        self.xml.open("w:p", &[])?;
        self.paragraph_properties(image.alignment(), true, boundary)?;
        let xml = &mut self.xml;
        xml.open("w:r", &[])?;
        xml.open("w:drawing", &[])?;
        xml.open(
            "wp:inline",
            &[("distT", "0"), ("distB", "0"), ("distL", "0"), ("distR", "0")],
        )?;
        xml.empty("wp:extent", &[("cx", &cx), ("cy", &cy)])?;
        xml.empty("wp:docPr", &[("id", &drawing_id), ("name", &picture_name)])?;
        xml.open("a:graphic", &[])?;
        xml.open("a:graphicData", &[("uri", NS_PIC)])?;
        xml.open("pic:pic", &[])?;
        xml.open("pic:nvPicPr", &[])?;
        xml.empty("pic:cNvPr", &[("id", &drawing_id), ("name", &file_name)])?;
        xml.empty("pic:cNvPicPr", &[])?;
        xml.close("pic:nvPicPr")?;
        xml.open("pic:blipFill", &[])?;
        xml.empty("a:blip", &[("r:embed", &rel_id)])?;
        xml.open("a:stretch", &[])?;
        xml.empty("a:fillRect", &[])?;
        xml.close("a:stretch")?;
        xml.close("pic:blipFill")?;
        xml.open("pic:spPr", &[])?;
        xml.open("a:xfrm", &[])?;
        xml.empty("a:off", &[("x", "0"), ("y", "0")])?;
        xml.empty("a:ext", &[("cx", &cx), ("cy", &cy)])?;
        xml.close("a:xfrm")?;
        xml.open("a:prstGeom", &[("prst", "rect")])?;
        xml.empty("a:avLst", &[])?;
        xml.close("a:prstGeom")?;
        xml.close("pic:spPr")?;
        xml.close("pic:pic")?;
        xml.close("a:graphicData")?;
        xml.close("a:graphic")?;
        xml.close("wp:inline")?;
        xml.close("w:drawing")?;
        xml.close("w:r")?;
        xml.close("w:p")
    }

    fn table(&mut self, columns: &[Vec<Block>]) -> Result<(), DocxError> {
        let count = columns.len().max(1) as i64;
        let total = mm_to_twips(self.document.setup().content_width_mm());
        let column_width = (total / count).to_string();
        let total = total.to_string();

        let xml = &mut self.xml;
        xml.open("w:tbl", &[])?;
        xml.open("w:tblPr", &[])?;
        xml.empty("w:tblW", &[("w:w", &total), ("w:type", "dxa")])?;
        xml.empty("w:tblLayout", &[("w:type", "fixed")])?;
        xml.close("w:tblPr")?;
        xml.open("w:tblGrid", &[])?;
        for _ in columns {
            xml.empty("w:gridCol", &[("w:w", &column_width)])?;
        }
        xml.close("w:tblGrid")?;
        xml.open("w:tr", &[])?;

        for column in columns {
            let xml = &mut self.xml;
            xml.open("w:tc", &[])?;
            xml.open("w:tcPr", &[])?;
            xml.empty("w:tcW", &[("w:w", &column_width), ("w:type", "dxa")])?;
            xml.close("w:tcPr")?;
            for block in column {
                self.block(block, Boundary::default())?;
            }
            // A cell must end with a paragraph.
            if !matches!(
                column.last(),
                Some(Block::Paragraph(_) | Block::Image(_) | Block::Spacer)
            ) {
                self.xml.empty("w:p", &[])?;
            }
            self.xml.close("w:tc")?;
        }

        let xml = &mut self.xml;
        xml.close("w:tr")?;
        xml.close("w:tbl")
    }
}

/// Groups consecutive pages of the same kind.
fn sections(pages: &[Page]) -> Vec<Vec<&Page>> {
    let mut sections: Vec<Vec<&Page>> = Vec::new();
    for page in pages {
        match sections.last_mut() {
            Some(section) if section.first().map(|first| first.kind()) == Some(page.kind()) => {
                section.push(page)
            }
            _ => sections.push(vec![page]),
        }
    }
    sections
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PageSetup, ReportBuilder};
    use crate::richtext::Span;
    use std::io::Read;

    fn document_xml(bytes: &[u8]) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut xml = String::new();
        archive
            .by_name(DOCUMENT_PART)
            .unwrap()
            .read_to_string(&mut xml)
            .unwrap();
        xml
    }

    fn sample() -> ReportDocument {
        let mut builder = ReportBuilder::new("Relatório & Co", PageSetup::default());
        builder.push_page(Page::new(PageKind::Cover).with_block(Block::paragraph(vec![Span::new("Capa")])));
        for id in ["A1", "A2"] {
            builder.push_page(
                Page::new(PageKind::Content).with_block(Block::paragraph(vec![Span::new(id).bold()])),
            );
        }
        builder.push_page(Page::new(PageKind::Closing).with_block(Block::Spacer));
        builder.finish()
    }

    #[test]
    fn only_the_content_section_references_the_page_number_footer() {
        let xml = document_xml(&write(&sample()).unwrap());
        assert_eq!(xml.matches("<w:sectPr>").count(), 3);
        assert_eq!(xml.matches(REL_NUMBERED_FOOTER).count(), 1);
        assert!(xml.contains(r#"w:name="row_2""#));
    }

    #[test]
    fn page_and_section_breaks_ride_on_content_paragraphs() {
        let xml = document_xml(&write(&sample()).unwrap());
        assert!(!xml.contains(r#"w:type="page""#));
        assert_eq!(xml.matches("<w:pageBreakBefore/>").count(), 1);
        assert!(!xml.contains(r#"<w:sz w:val="2"/>"#));
        // Cover and content sections end inside their last text paragraph.
        assert!(xml.contains(r#"</w:sectPr></w:pPr><w:r><w:t xml:space="preserve">Capa</w:t>"#));
        assert!(xml.contains(r#"<w:pPr><w:pageBreakBefore/><w:sectPr>"#));
    }

    #[test]
    fn pages_without_leading_text_get_a_marker_paragraph() {
        let mut builder = ReportBuilder::new("t", PageSetup::default());
        builder.push_page(Page::new(PageKind::Cover).with_block(Block::Columns(vec![Vec::new()])));
        builder.push_page(Page::new(PageKind::Closing).with_block(Block::Spacer));
        builder.push_page(Page::new(PageKind::Closing).with_block(Block::Spacer));
        let xml = document_xml(&write(&builder.finish()).unwrap());

        // One marker closes the cover section after its table, one starts the second closing page.
        assert_eq!(xml.matches(r#"<w:sz w:val="2"/>"#).count(), 2);
        assert!(xml.contains(r#"</w:tbl><w:p><w:pPr><w:spacing"#));
        assert!(xml.contains(r#"<w:p><w:pPr><w:pageBreakBefore/><w:spacing"#));
    }

    #[test]
    fn image_paragraphs_drop_default_spacing() {
        let mut builder = ReportBuilder::new("t", PageSetup::default());
        let buffer = image::RgbImage::from_pixel(2, 1, image::Rgb([1, 2, 3]));
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgb8(buffer)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageOutputFormat::Png)
            .unwrap();
        let photo = builder.register_media(
            crate::imaging::NormalizedImage::from_encoded(bytes, crate::imaging::ImageKind::Png).unwrap(),
        );
        builder.push_page(
            Page::new(PageKind::Content)
                .with_block(Block::paragraph(vec![Span::new("ID: A1").bold()]))
                .with_block(Block::Image(
                    ImageBlock::new(photo, 120.0, 160.0).with_alignment(HorizontalAlignment::Center),
                )),
        );
        let xml = document_xml(&write(&builder.finish()).unwrap());
        assert!(xml.contains(
            r#"<w:pPr><w:spacing w:after="0" w:line="240" w:lineRule="auto"/><w:jc w:val="center"/>"#
        ));
        assert_eq!(xml.matches("<w:spacing").count(), 1);
    }

    #[test]
    fn page_numbers_off_leaves_the_numbered_footer_unreferenced() {
        let mut setup = PageSetup::default();
        setup.page_numbers = false;
        let mut builder = ReportBuilder::new("t", setup);
        builder.push_page(Page::new(PageKind::Cover).with_block(Block::paragraph(vec![Span::new("Capa")])));
        builder.push_page(Page::new(PageKind::Content).with_block(Block::paragraph(vec![Span::new("A1")])));
        let bytes = write(&builder.finish()).unwrap();

        let xml = document_xml(&bytes);
        assert!(!xml.contains(REL_NUMBERED_FOOTER));
        assert_eq!(xml.matches(REL_BLANK_FOOTER).count(), 2);
        assert!(!crate::docx::read(&bytes).unwrap().setup().page_numbers);
    }

    #[test]
    fn page_number_footer_is_a_live_field() {
        let bytes = write(&sample()).unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();
        let mut footer = String::new();
        archive
            .by_name("word/footer1.xml")
            .unwrap()
            .read_to_string(&mut footer)
            .unwrap();
        assert!(footer.contains(r#"w:fldSimple w:instr=" PAGE ""#));
    }

    #[test]
    fn text_is_escaped_and_line_breaks_become_br() {
        let mut builder = ReportBuilder::new("t", PageSetup::default());
        builder.push_page(
            Page::new(PageKind::Cover).with_block(Block::paragraph(vec![Span::new("a < b\nc & d")])),
        );
        let xml = document_xml(&write(&builder.finish()).unwrap());
        assert!(xml.contains("a &lt; b</w:t><w:br/><w:t xml:space=\"preserve\">c &amp; d"));
    }

    #[test]
    fn output_is_deterministic() {
        assert_eq!(write(&sample()).unwrap(), write(&sample()).unwrap());
    }

    #[test]
    fn sections_group_consecutive_kinds() {
        let document = sample();
        let grouped = sections(document.pages());
        let sizes: Vec<_> = grouped.iter().map(Vec::len).collect();
        assert_eq!(sizes, [1, 2, 1]);
    }
}
