//! Styled text fragments shared by the DOCX writer and the PDF renderer.
//!
//! A [`Span`] carries the inline decorations the report uses (bold and italic).
//! Line breaks inside a span are written as `\n` and become `<w:br/>` in the
//! Word document or separate lines in the PDF rendering.

use genpdf::style::{Style, StyledString};

/// A run of text with one set of decorations.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Span {
    text: String,
    bold: bool,
    italic: bool,
}

impl Span {
    /// Undecorated text.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_bold(&self) -> bool {
        self.bold
    }

    pub fn is_italic(&self) -> bool {
        self.italic
    }

    pub fn with_bold(mut self, bold: bool) -> Self {
        self.bold = bold;
        self
    }

    pub fn with_italic(mut self, italic: bool) -> Self {
        self.italic = italic;
        self
    }

    pub fn bold(self) -> Self {
        self.with_bold(true)
    }

    pub fn italic(self) -> Self {
        self.with_italic(true)
    }

    /// Appends text to the span, keeping its style.
    pub(crate) fn push_str(&mut self, text: &str) {
        self.text.push_str(text);
    }

    /// Returns true when both spans carry the same decorations.
    pub(crate) fn same_style(&self, other: &Span) -> bool {
        self.bold == other.bold && self.italic == other.italic
    }

    fn pdf_style(&self) -> Style {
        let style = Style::new();
        match (self.bold, self.italic) {
            (true, true) => style.bold().italic(),
            (true, false) => style.bold(),
            (false, true) => style.italic(),
            (false, false) => style,
        }
    }

    pub fn to_styled_string(&self) -> StyledString {
        StyledString::new(self.text.clone(), self.pdf_style())
    }
}

impl From<&Span> for StyledString {
    fn from(span: &Span) -> Self {
        span.to_styled_string()
    }
}

/// Splits spans on embedded `\n`, yielding one vector of styled strings per line.
///
/// Empty fragments are dropped, but an empty line still yields an (empty) entry so
/// that blank lines survive.
pub fn split_lines(spans: &[Span]) -> Vec<Vec<StyledString>> {
    let mut lines = vec![Vec::new()];
    for span in spans {
        let style = span.pdf_style();
        for (index, fragment) in span.text.split('\n').enumerate() {
            if index > 0 {
                lines.push(Vec::new());
            }
            if !fragment.is_empty() {
                if let Some(line) = lines.last_mut() {
                    line.push(StyledString::new(fragment.to_string(), style));
                }
            }
        }
    }
    lines
}

/// Concatenates the text of all spans.
pub fn plain_text(spans: &[Span]) -> String {
    spans.iter().map(Span::text).collect()
}
