//! Composer/merger – stitches rendered parts into the final document.
//!
//! Parts arrive as independently serialized PDFs (cover pages, the master
//! body, embedded sub-documents). Each one is loaded, its objects are
//! renumbered into a shared pool, and its pages are spliced into an
//! explicit page order; `finish` rebuilds a fresh page tree and catalog
//! around that order and saves the result.

use std::collections::BTreeMap;

use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::error::{Error, Result};

/// Accumulates pages from multiple documents in an explicit order.
pub struct Merger {
    objects: BTreeMap<ObjectId, Object>,
    /// Page dictionaries in final output order.
    pages: Vec<(ObjectId, Dictionary)>,
    max_id: u32,
}

impl Merger {
    pub fn new() -> Self {
        Self {
            objects: BTreeMap::new(),
            pages: Vec::new(),
            max_id: 1,
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Append every page of `doc` after the current last page.
    pub fn append_document(&mut self, doc: Document) -> Result<()> {
        self.insert_document(self.pages.len(), doc)
    }

    /// Splice every page of `doc` so its first page lands at the 0-based
    /// `index` (clamped to the current end).
    pub fn insert_document(&mut self, index: usize, mut doc: Document) -> Result<()> {
        doc.renumber_objects_with(self.max_id);
        self.max_id = doc.max_id + 1;

        // get_pages is keyed by 1-based page number, so iteration follows
        // the source document's own page order.
        let source_pages = doc.get_pages();
        let mut incoming: Vec<(ObjectId, Dictionary)> = Vec::with_capacity(source_pages.len());
        for page_id in source_pages.values() {
            let dict = doc.get_object(*page_id)?.as_dict()?.clone();
            incoming.push((*page_id, dict));
        }

        // Structural objects are rebuilt in `finish`; XMP metadata streams
        // carry per-run identifiers and would break reproducible output.
        for (object_id, object) in doc.objects {
            match object.type_name().unwrap_or(b"") {
                b"Catalog" | b"Pages" | b"Page" | b"Outlines" | b"Outline" | b"Metadata" => {}
                _ => {
                    self.objects.insert(object_id, object);
                }
            }
        }

        let at = index.min(self.pages.len());
        self.pages.splice(at..at, incoming);
        Ok(())
    }

    /// Rebuild the page tree around the accumulated order and save.
    pub fn finish(self) -> Result<Vec<u8>> {
        let Merger {
            objects,
            pages,
            max_id,
        } = self;

        if pages.is_empty() {
            return Err(Error::Compose("no pages to compose".to_string()));
        }

        let mut document = Document::with_version("1.5");
        for (object_id, object) in objects {
            document.objects.insert(object_id, object);
        }
        document.max_id = max_id;

        let pages_id = document.new_object_id();
        for (object_id, dict) in &pages {
            let mut page_dict = dict.clone();
            page_dict.set("Parent", Object::Reference(pages_id));
            document
                .objects
                .insert(*object_id, Object::Dictionary(page_dict));
        }

        let kids: Vec<Object> = pages
            .iter()
            .map(|(id, _)| Object::Reference(*id))
            .collect();
        let pages_dict = Dictionary::from_iter([
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(kids)),
            ("Count", Object::Integer(pages.len() as i64)),
        ]);
        document
            .objects
            .insert(pages_id, Object::Dictionary(pages_dict));

        let catalog_id = document.new_object_id();
        let catalog_dict = Dictionary::from_iter([
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
        ]);
        document
            .objects
            .insert(catalog_id, Object::Dictionary(catalog_dict));
        document.trailer.set("Root", Object::Reference(catalog_id));

        // Orphaned source-document objects (old info dictionaries and the
        // like) would otherwise survive into the output.
        document.prune_objects();
        document.max_id = document.objects.len() as u32;
        document.renumber_objects();
        document.compress();

        let mut output = Vec::new();
        document
            .save_to(&mut output)
            .map_err(|e| Error::Compose(format!("failed to save composed document: {e}")))?;
        Ok(output)
    }
}

impl Default for Merger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Canvas;
    use crate::content::{Margins, PageSize};

    fn blank_doc(pages: usize, size: PageSize) -> Document {
        let mut canvas = Canvas::new("part", size, Margins::uniform(40.0));
        for _ in 0..pages {
            canvas.add_page();
        }
        Document::load_mem(&canvas.serialize()).unwrap()
    }

    fn page_heights(bytes: &[u8]) -> Vec<i64> {
        let doc = Document::load_mem(bytes).unwrap();
        doc.get_pages()
            .values()
            .map(|&page_id| {
                let dict = doc.get_object(page_id).unwrap().as_dict().unwrap();
                let media_box = dict.get(b"MediaBox").unwrap().as_array().unwrap();
                match media_box[3] {
                    Object::Integer(i) => i,
                    Object::Real(r) => r.round() as i64,
                    _ => panic!("unexpected MediaBox entry"),
                }
            })
            .collect()
    }

    #[test]
    fn append_concatenates_in_order() {
        let mut merger = Merger::new();
        merger.append_document(blank_doc(2, PageSize::a4())).unwrap();
        merger
            .append_document(blank_doc(1, PageSize::letter()))
            .unwrap();
        assert_eq!(merger.page_count(), 3);

        let heights = page_heights(&merger.finish().unwrap());
        assert_eq!(heights.len(), 3);
        // A4 pages first (842 pt tall), then the letter page (792 pt).
        assert_eq!(heights[2], 792);
        assert!(heights[0] > 800);
    }

    #[test]
    fn insert_splices_at_index() {
        let mut merger = Merger::new();
        merger.append_document(blank_doc(3, PageSize::a4())).unwrap();
        merger
            .insert_document(1, blank_doc(2, PageSize::letter()))
            .unwrap();

        let heights = page_heights(&merger.finish().unwrap());
        assert_eq!(heights.len(), 5);
        assert!(heights[0] > 800);
        assert_eq!(heights[1], 792);
        assert_eq!(heights[2], 792);
        assert!(heights[3] > 800);
        assert!(heights[4] > 800);
    }

    #[test]
    fn insert_index_clamps_to_end() {
        let mut merger = Merger::new();
        merger.append_document(blank_doc(1, PageSize::a4())).unwrap();
        merger
            .insert_document(99, blank_doc(1, PageSize::letter()))
            .unwrap();
        assert_eq!(merger.page_count(), 2);
    }

    #[test]
    fn finish_with_no_pages_is_an_error() {
        let err = Merger::new().finish().unwrap_err();
        assert!(matches!(err, Error::Compose(_)));
    }
}
