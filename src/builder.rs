//! `genpdf` document construction for the built-in renderer.

use genpdf::error::{Error, ErrorKind};
use genpdf::style;
use genpdf::{self, Element, Margins, Mm, PageDecorator, Position, Size};

use crate::fonts;

/// Callback producing the footer of a page, given its 1-based number.
/// Returning `None` leaves the page without footer.
type FooterFactory = dyn Fn(usize) -> Option<Box<dyn Element>>;

/// Builder for `genpdf::Document` instances with the report's page geometry.
#[derive(Default)]
pub struct DocumentBuilder {
    title: Option<String>,
    paper_size: Option<Size>,
    margin: Option<Mm>,
    footer: Option<FooterSpec>,
}

impl DocumentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the document title stored in the PDF metadata.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_paper_size(mut self, paper_size: impl Into<Size>) -> Self {
        self.paper_size = Some(paper_size.into());
        self
    }

    /// Uniform margin of every page; the footer is drawn inside the bottom one.
    pub fn with_margin(mut self, margin: impl Into<Mm>) -> Self {
        self.margin = Some(margin.into());
        self
    }

    /// Configures a footer drawn centred inside the bottom margin.
    ///
    /// `height` must not exceed the bottom margin.
    pub fn with_footer<F, E>(mut self, height: impl Into<Mm>, footer: F) -> Self
    where
        F: Fn(usize) -> Option<E> + 'static,
        E: Element + 'static,
    {
        self.footer = Some(FooterSpec::new(height, footer));
        self
    }

    /// Loads the default font family and creates the document.
    pub fn build(self) -> Result<genpdf::Document, Error> {
        let font_family = fonts::default_font_family()?;
        let mut document = genpdf::Document::new(font_family);

        if let Some(title) = self.title {
            document.set_title(title);
        }
        if let Some(paper_size) = self.paper_size {
            document.set_paper_size(paper_size);
        }

        document.set_page_decorator(MarginFooterDecorator::new(self.margin, self.footer));
        Ok(document)
    }
}

/// Height and per-page factory of the margin footer.
pub struct FooterSpec {
    height: Mm,
    factory: Box<FooterFactory>,
}

impl FooterSpec {
    pub fn new<F, E>(height: impl Into<Mm>, factory: F) -> Self
    where
        F: Fn(usize) -> Option<E> + 'static,
        E: Element + 'static,
    {
        Self {
            height: height.into(),
            factory: Box::new(move |page| {
                factory(page).map(|element| Box::new(element) as Box<dyn Element>)
            }),
        }
    }
}

struct MarginFooterDecorator {
    page: usize,
    margin: Mm,
    footer: Option<FooterSpec>,
}

impl MarginFooterDecorator {
    fn new(margin: Option<Mm>, footer: Option<FooterSpec>) -> Self {
        Self {
            page: 0,
            margin: margin.unwrap_or_default(),
            footer,
        }
    }
}

impl PageDecorator for MarginFooterDecorator {
    fn decorate_page<'a>(
        &mut self,
        context: &genpdf::Context,
        mut area: genpdf::render::Area<'a>,
        style: style::Style,
    ) -> Result<genpdf::render::Area<'a>, Error> {
        self.page += 1;
        let page_area = area.clone();
        let margin = self.margin;
        area.add_margins(Margins::trbl(margin, margin, margin, margin));

        if let Some(footer) = &self.footer {
            let Some(mut element) = (footer.factory)(self.page) else {
                return Ok(area);
            };
            if footer.height > margin {
                return Err(Error::new(
                    "Footer height exceeds the bottom margin",
                    ErrorKind::InvalidData,
                ));
            }

            let mut footer_area = page_area;
            footer_area.add_margins(Margins::trbl(0, margin, 0, margin));
            let page_height = footer_area.size().height;
            footer_area.add_offset(Position::new(
                0,
                page_height - margin + (margin - footer.height) / 2.0,
            ));
            footer_area.set_height(footer.height);
            let result = element.render(context, footer_area, style)?;
            if result.has_more {
                return Err(Error::new(
                    "Footer content is taller than the footer height",
                    ErrorKind::PageSizeExceeded,
                ));
            }
        }

        Ok(area)
    }
}
