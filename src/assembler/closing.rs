use chrono::NaiveDate;

use crate::config::ReportConfig;
use crate::model::{Block, HorizontalAlignment, Page, PageKind, ReportBuilder};
use crate::richtext::Span;

/// Date format printed on the closing page.
pub const CLOSING_DATE_FORMAT: &str = "%d/%m/%Y";

/// Adds the closing page: company logo, then the dated contact block and certifier logo.
pub fn build_closing(
    builder: &mut ReportBuilder,
    placement: &super::BrandingPlacement,
    config: &ReportConfig,
    date: NaiveDate,
) {
    let closing = &config.closing;
    let mut right = vec![Block::aligned(
        vec![Span::new(format!(
            "{}, {}",
            closing.city,
            date.format(CLOSING_DATE_FORMAT)
        ))],
        HorizontalAlignment::Right,
    )];
    if !closing.contact_lines.is_empty() {
        right.push(Block::aligned(
            vec![Span::new(closing.contact_lines.join("\n"))],
            HorizontalAlignment::Right,
        ));
    }
    right.push(Block::aligned(
        vec![Span::new(config.labels.certified_by.clone())],
        HorizontalAlignment::Right,
    ));
    right.push(Block::Image(placement.certifier.clone()));

    let page = Page::new(PageKind::Closing)
        .with_block(Block::Spacer)
        .with_block(Block::Columns(vec![
            vec![Block::Image(placement.company.clone())],
            right,
        ]));

    builder.push_page(page);
}
