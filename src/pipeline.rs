//! Pipeline – ties validation, cover rendering, section layout,
//! pagination reconciliation, and final merging into a single build call.
//!
//! One build is strictly forward: validate → draft cover → cover →
//! sections → reconcile → table of contents → headers/footers → merge.
//! A failed stage aborts the build with no partial output.

use std::collections::BTreeMap;
use std::io;

use log::debug;
use lopdf::Document;

use crate::canvas::Canvas;
use crate::compose::Merger;
use crate::content::{DocumentConfig, PageTemplate};
use crate::error::{Error, Result};
use crate::fonts::FontManager;
use crate::layout::{LayoutEngine, TocEntry};
use crate::pagination::reconcile;

/// The finished document: final bytes plus the bookkeeping callers and
/// tests assert on.
pub struct Output {
    bytes: Vec<u8>,
    toc: BTreeMap<usize, TocEntry>,
    page_count: usize,
}

impl Output {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Pipe the finished bytes into any sink.
    pub fn write_to<W: io::Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.bytes)
    }

    /// The reconciled table of contents, keyed by 1-based section index.
    pub fn toc(&self) -> &BTreeMap<usize, TocEntry> {
        &self.toc
    }

    /// Final page count, embeds included.
    pub fn page_count(&self) -> usize {
        self.page_count
    }
}

/// Build a document from its declarative description.
pub fn build(config: &DocumentConfig) -> Result<Output> {
    config.validate()?;

    let mut fonts = FontManager::new();
    for spec in &config.fonts {
        fonts.register(&spec.name, spec.data.bytes()?.into_owned())?;
    }

    let page_step = config.page_step();
    let mut merger = Merger::new();

    // Cover-like pages render on their own one-page canvases and
    // contribute exactly one page each.
    if let Some(draft_cover) = &config.draft_cover {
        debug!("rendering draft cover");
        merger.append_document(render_single_page(config, &fonts, draft_cover)?)?;
    }
    if let Some(cover) = &config.cover {
        debug!("rendering cover");
        merger.append_document(render_single_page(config, &fonts, cover)?)?;
    }

    // Master body: sections, then (post-reconciliation) the table of
    // contents, then headers and footers over every buffered page.
    let mut master = Canvas::new(&config.title, config.size, config.margins);
    let mut engine = LayoutEngine::new(&mut master, &fonts, &config.default_font, page_step);

    debug!("rendering {} sections", config.sections.len());
    engine.render_sections(&config.sections, config.has_toc())?;

    let embeds = reconcile(&config.sections, &mut engine.session.toc)?;
    debug!("reconciled {} embedded documents", embeds.len());

    if let Some(contents) = &config.table_of_contents {
        engine.render_contents_page(&contents.items)?;
    }
    engine.stamp_headers_footers(
        config.header.as_ref(),
        config.footer.as_ref(),
        page_step,
    )?;

    let toc = engine.session.toc.clone();
    drop(engine);

    let master_doc = Document::load_mem(&master.serialize())
        .map_err(|e| Error::Compose(format!("failed to reload master document: {e}")))?;
    merger.append_document(master_doc)?;

    for embed in embeds {
        merger.insert_document(embed.insertion_index, embed.document)?;
    }

    let page_count = merger.page_count();
    let bytes = merger.finish()?;
    debug!("composed {} pages, {} bytes", page_count, bytes.len());

    Ok(Output {
        bytes,
        toc,
        page_count,
    })
}

/// Convenience: deserialize a JSON content tree and build it.
pub fn build_from_json(json: &str) -> Result<Output> {
    let config: DocumentConfig =
        serde_json::from_str(json).map_err(|e| Error::Content(format!("invalid content tree: {e}")))?;
    build(&config)
}

/// Run the layout engine for a single logical page and reload the result
/// as a document object.
fn render_single_page(
    config: &DocumentConfig,
    fonts: &FontManager,
    template: &PageTemplate,
) -> Result<Document> {
    let mut canvas = Canvas::new(&config.title, config.size, config.margins);
    let mut engine = LayoutEngine::new(&mut canvas, fonts, &config.default_font, 0);
    engine.start_page();
    engine.render_overlay(&template.items)?;
    drop(engine);

    Document::load_mem(&canvas.serialize())
        .map_err(|e| Error::Compose(format!("failed to reload rendered page: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{ContentItem, Placement, Section, TextItem};

    fn text_section(title: &str) -> Section {
        Section {
            embed: false,
            items: vec![ContentItem::Text(TextItem {
                placement: Placement {
                    relative: true,
                    is_title: true,
                    ..Placement::default()
                },
                value: title.into(),
                ..TextItem::default()
            })],
        }
    }

    #[test]
    fn minimal_build_produces_valid_pdf() {
        let config = DocumentConfig {
            sections: vec![text_section("Only section")],
            ..DocumentConfig::default()
        };
        let output = build(&config).unwrap();
        assert_eq!(&output.as_bytes()[0..5], b"%PDF-");
        assert_eq!(output.page_count(), 1);
        assert_eq!(output.toc()[&1].page, 1);
    }

    #[test]
    fn invalid_margins_fail_before_any_rendering() {
        let config = DocumentConfig {
            margins: crate::content::Margins::uniform(500.0),
            sections: vec![text_section("S")],
            ..DocumentConfig::default()
        };
        assert!(matches!(build(&config), Err(Error::Configuration(_))));
    }

    #[test]
    fn build_from_json_rejects_unknown_item_type() {
        let json = r##"{"sections": [{"items": [{"type": "marquee"}]}]}"##;
        assert!(matches!(build_from_json(json), Err(Error::Content(_))));
    }

    #[test]
    fn output_write_to_round_trips() {
        let config = DocumentConfig {
            sections: vec![text_section("S")],
            ..DocumentConfig::default()
        };
        let output = build(&config).unwrap();
        let mut sink = Vec::new();
        output.write_to(&mut sink).unwrap();
        assert_eq!(sink.len(), output.len());
    }
}
