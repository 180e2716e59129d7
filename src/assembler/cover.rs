use crate::config::ReportConfig;
use crate::model::{Block, HorizontalAlignment, Page, PageKind, ReportBuilder};
use crate::richtext::Span;

use super::BrandingPlacement;

/// Adds the cover page: company logo beside the title block, certifier line at the trailing edge.
pub fn build_cover(builder: &mut ReportBuilder, placement: &BrandingPlacement, config: &ReportConfig) {
    let text = &config.report;
    let title = format!("{}\n{}\n{}", text.organization, text.title, text.campaign);

    let page = Page::new(PageKind::Cover)
        .with_block(Block::Spacer)
        .with_block(Block::Columns(vec![
            vec![Block::Image(placement.company.clone())],
            vec![Block::aligned(
                vec![Span::new(title).bold()],
                HorizontalAlignment::Center,
            )],
        ]))
        .with_block(Block::Spacer)
        .with_block(Block::Columns(vec![
            Vec::new(),
            vec![
                Block::aligned(
                    vec![Span::new(config.labels.certified_by.clone())],
                    HorizontalAlignment::Right,
                ),
                Block::Image(placement.certifier.clone()),
            ],
        ]));

    builder.push_page(page);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ImageBlock, MediaId, PageSetup};

    fn placement(builder: &mut ReportBuilder) -> BrandingPlacement {
        use crate::imaging::{ImageKind, NormalizedImage};
        let company = builder.register_media(NormalizedImage::from_parts(Vec::new(), ImageKind::Png, 2, 1));
        let certifier = builder.register_media(NormalizedImage::from_parts(Vec::new(), ImageKind::Png, 1, 1));
        BrandingPlacement {
            company: ImageBlock::new(company, 60.0, 30.0),
            certifier: ImageBlock::new(certifier, 35.0, 35.0),
        }
    }

    #[test]
    fn cover_carries_title_block_and_both_logos() {
        let mut builder = ReportBuilder::new("t", PageSetup::default());
        let placement = placement(&mut builder);
        build_cover(&mut builder, &placement, &ReportConfig::default());

        let document = builder.finish();
        let cover = &document.pages()[0];
        assert_eq!(cover.kind(), PageKind::Cover);
        assert_eq!(
            cover.label().as_deref(),
            Some("Município de Lisboa\nRelatório Final de Instalações\nAlargamento Rede de Oleões 2025")
        );
        assert!(cover.contains_text("GHG savings certified by:"));
        let media: Vec<MediaId> = cover.images().iter().map(|image| image.media()).collect();
        assert_eq!(media, [placement.company.media(), placement.certifier.media()]);
    }
}
