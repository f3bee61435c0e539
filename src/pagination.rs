//! Pagination reconciler – accounts for externally supplied sub-documents
//! whose page counts are only knowable after their bytes are loaded.
//!
//! The layout pass reserves exactly one page number per embed placeholder.
//! This pass walks sections in original order, loads each embed payload,
//! reads its true page count, and shifts every later TOC entry by the
//! cumulative "page gap" (`count - 1` per embed). Page numbers before the
//! first embed are never touched; later numbers grow monotonically, so the
//! original relative ordering is preserved.

use std::collections::BTreeMap;

use log::debug;
use lopdf::Document;

use crate::content::Section;
use crate::error::{Error, Result};
use crate::layout::TocEntry;

/// An external sub-document scheduled for splicing. Produced while
/// scanning embed placeholders; consumed exactly once by the composer.
#[derive(Debug)]
pub struct EmbedRequest {
    /// 0-based page index in the final document where the first embedded
    /// page lands. Already accounts for pages spliced in ahead of it.
    pub insertion_index: usize,
    /// The loaded sub-document.
    pub document: Document,
}

fn shift_entry(entry: &mut TocEntry, gap: u32) {
    entry.page += gap;
    for child in &mut entry.children {
        shift_entry(child, gap);
    }
}

/// Single forward pass: apply the accumulated gap to each section's entry,
/// then load any embed payload and grow the gap by its page count minus
/// the one reserved number.
///
/// A one-page embed shifts nothing; a zero-page embed neither shifts nor
/// splices.
pub fn reconcile(
    sections: &[Section],
    toc: &mut BTreeMap<usize, TocEntry>,
) -> Result<Vec<EmbedRequest>> {
    let mut embeds = Vec::new();
    let mut page_gap: u32 = 0;

    for (i, section) in sections.iter().enumerate() {
        let index = i + 1;
        if let Some(entry) = toc.get_mut(&index) {
            shift_entry(entry, page_gap);
        }

        let Some(payload) = section.embed_payload() else {
            continue;
        };
        let bytes = payload.bytes()?;
        let document = Document::load_mem(&bytes).map_err(|e| {
            Error::Asset(format!("embedded document in section {index}: {e}"))
        })?;
        let page_count = document.get_pages().len();

        if page_count == 0 {
            debug!("section {index}: zero-page embed, nothing to splice");
            continue;
        }

        let insertion_index = match toc.get(&index) {
            Some(entry) => entry.page.saturating_sub(1) as usize,
            None => continue,
        };
        debug!("section {index}: splicing {page_count} pages at index {insertion_index}");
        embeds.push(EmbedRequest {
            insertion_index,
            document,
        });
        page_gap += page_count as u32 - 1;
    }

    Ok(embeds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Canvas;
    use crate::content::{Binary, ContentItem, Margins, PageSize, PdfItem};

    /// Serialize an empty document with `pages` blank pages.
    fn blank_pdf(pages: usize) -> Vec<u8> {
        let mut canvas = Canvas::new("fixture", PageSize::a4(), Margins::uniform(40.0));
        for _ in 0..pages {
            canvas.add_page();
        }
        canvas.serialize()
    }

    /// A structurally valid PDF whose page tree is empty.
    fn zero_page_pdf() -> Vec<u8> {
        use lopdf::{dictionary, Object};

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.add_object(dictionary! {
            "Type" => "Pages",
            "Kids" => Vec::<Object>::new(),
            "Count" => 0,
        });
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    fn embed_section(bytes: Vec<u8>) -> Section {
        Section {
            embed: true,
            items: vec![ContentItem::Pdf(PdfItem {
                value: Some("Appendix".to_string()),
                pdf: Some(Binary::Bytes(bytes)),
            })],
        }
    }

    fn body_section() -> Section {
        Section {
            embed: false,
            items: vec![ContentItem::Text(Default::default())],
        }
    }

    fn toc_at_pages(pages: &[u32]) -> BTreeMap<usize, TocEntry> {
        pages
            .iter()
            .enumerate()
            .map(|(i, &page)| {
                (
                    i + 1,
                    TocEntry {
                        title: format!("Section {}", i + 1),
                        original_page: Some(page),
                        page,
                        children: Vec::new(),
                    },
                )
            })
            .collect()
    }

    #[test]
    fn three_page_embed_shifts_later_sections_by_two() {
        let sections = vec![
            body_section(),
            embed_section(blank_pdf(3)),
            body_section(),
            body_section(),
        ];
        let mut toc = toc_at_pages(&[1, 2, 3, 4]);

        let embeds = reconcile(&sections, &mut toc).unwrap();

        assert_eq!(embeds.len(), 1);
        assert_eq!(embeds[0].insertion_index, 1);
        assert_eq!(toc[&1].page, 1, "sections before the embed never move");
        assert_eq!(toc[&2].page, 2);
        assert_eq!(toc[&3].page, 5);
        assert_eq!(toc[&4].page, 6);
        // original_page is never rewritten
        assert_eq!(toc[&3].original_page, Some(3));
    }

    #[test]
    fn one_page_embed_shifts_nothing() {
        let sections = vec![body_section(), embed_section(blank_pdf(1)), body_section()];
        let mut toc = toc_at_pages(&[1, 2, 3]);

        let embeds = reconcile(&sections, &mut toc).unwrap();

        assert_eq!(embeds.len(), 1);
        assert_eq!(toc[&3].page, 3);
    }

    #[test]
    fn zero_page_embed_shifts_nothing_and_splices_nothing() {
        let sections = vec![body_section(), embed_section(zero_page_pdf()), body_section()];
        let mut toc = toc_at_pages(&[1, 2, 3]);

        let embeds = reconcile(&sections, &mut toc).unwrap();

        assert!(embeds.is_empty());
        assert_eq!(toc[&2].page, 2);
        assert_eq!(toc[&3].page, 3);
    }

    #[test]
    fn consecutive_embeds_accumulate_gap() {
        let sections = vec![
            embed_section(blank_pdf(2)),
            embed_section(blank_pdf(4)),
            body_section(),
        ];
        let mut toc = toc_at_pages(&[1, 2, 3]);

        let embeds = reconcile(&sections, &mut toc).unwrap();

        assert_eq!(embeds.len(), 2);
        assert_eq!(embeds[0].insertion_index, 0);
        // Second embed already shifted by the first's gap of one.
        assert_eq!(embeds[1].insertion_index, 2);
        assert_eq!(toc[&3].page, 3 + 1 + 3);
    }

    #[test]
    fn children_shift_with_their_section() {
        let sections = vec![embed_section(blank_pdf(3)), body_section()];
        let mut toc = toc_at_pages(&[1, 2]);
        toc.get_mut(&2).unwrap().children.push(TocEntry {
            title: "sub".to_string(),
            original_page: Some(2),
            page: 2,
            children: Vec::new(),
        });

        reconcile(&sections, &mut toc).unwrap();

        assert_eq!(toc[&2].page, 4);
        assert_eq!(toc[&2].children[0].page, 4);
    }

    #[test]
    fn corrupt_embed_bytes_are_fatal() {
        let sections = vec![embed_section(vec![0u8; 32])];
        let mut toc = toc_at_pages(&[1]);
        let err = reconcile(&sections, &mut toc).unwrap_err();
        assert!(matches!(err, Error::Asset(_)));
    }
}
