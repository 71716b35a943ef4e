//! Document sinks: accumulate retained pages and produce the output.
//!
//! [`PdfSink`] never re-encodes a page. It keeps the original page
//! dictionaries and content streams and only rewrites the page tree that
//! points at them, then prunes whatever is no longer reachable.
//!
//! The sink owns the document it rewrites, while the pipeline borrows the
//! source for the whole run. Callers that do not want two parsed copies
//! alive collect handles with [`CollectingSink`] instead and rewrite the
//! source's own document afterwards with [`FilteredPdf::from_retained`].

use crate::error::DeblankError;
use crate::model::{OutputDocument, Page};
use lopdf::{Document, Object, ObjectId};
use std::path::Path;
use tracing::{debug, info};

/// Leaf collaborator that receives retained pages in order.
pub trait DocumentSink<H> {
    type Output;

    /// Append `page` after every page accepted so far.
    fn accept(&mut self, page: Page<H>) -> Result<(), DeblankError>;

    /// Produce the output. A second call returns
    /// [`DeblankError::AlreadyFinalized`].
    fn finalize(&mut self) -> Result<Self::Output, DeblankError>;
}

// ── In-memory ────────────────────────────────────────────────────────────

/// Collects page handles into an [`OutputDocument`].
#[derive(Debug)]
pub struct CollectingSink<H> {
    pages: Vec<Page<H>>,
    finalized: bool,
}

impl<H> CollectingSink<H> {
    pub fn new() -> Self {
        Self {
            pages: Vec::new(),
            finalized: false,
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }
}

impl<H> Default for CollectingSink<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> DocumentSink<H> for CollectingSink<H> {
    type Output = OutputDocument<H>;

    fn accept(&mut self, page: Page<H>) -> Result<(), DeblankError> {
        if self.finalized {
            return Err(DeblankError::AlreadyFinalized);
        }
        self.pages.push(page);
        Ok(())
    }

    fn finalize(&mut self) -> Result<OutputDocument<H>, DeblankError> {
        if self.finalized {
            return Err(DeblankError::AlreadyFinalized);
        }
        self.finalized = true;
        Ok(OutputDocument::new(std::mem::take(&mut self.pages)))
    }
}

// ── PDF ──────────────────────────────────────────────────────────────────

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Guard against cyclic `/Parent` chains in malformed files.
const MAX_TREE_DEPTH: usize = 64;

/// Builds the output PDF from the source document's own page objects.
#[derive(Debug)]
pub struct PdfSink {
    document: Option<Document>,
    retained: Vec<Page<ObjectId>>,
}

impl PdfSink {
    /// Start from `document`, which must be the document the page handles
    /// were read from.
    pub fn new(document: Document) -> Self {
        Self {
            document: Some(document),
            retained: Vec::new(),
        }
    }
}

impl DocumentSink<ObjectId> for PdfSink {
    type Output = FilteredPdf;

    fn accept(&mut self, page: Page<ObjectId>) -> Result<(), DeblankError> {
        if self.document.is_none() {
            return Err(DeblankError::AlreadyFinalized);
        }
        if let Some(last) = self.retained.last() {
            check_ascending(last.index(), page.index())?;
        }
        self.retained.push(page);
        Ok(())
    }

    fn finalize(&mut self) -> Result<FilteredPdf, DeblankError> {
        let document = self.document.take().ok_or(DeblankError::AlreadyFinalized)?;
        let pages = OutputDocument::new(std::mem::take(&mut self.retained));
        FilteredPdf::from_retained(document, pages)
    }
}

/// A page object listed twice in /Kids is an invalid page tree.
fn check_ascending(previous: usize, next: usize) -> Result<(), DeblankError> {
    if next <= previous {
        return Err(DeblankError::Internal(format!(
            "page index {} accepted after page index {}",
            next, previous
        )));
    }
    Ok(())
}

/// Replace the page tree with a flat list of `pages`, in order.
fn rebuild_page_tree(document: &mut Document, pages: &[ObjectId]) -> Result<(), DeblankError> {
    let root_id = document
        .catalog()
        .and_then(|catalog| catalog.get(b"Pages"))
        .and_then(Object::as_reference)
        .map_err(|e| DeblankError::Internal(format!("output has no page tree root: {}", e)))?;

    // Flattening removes intermediate nodes, so inherited attributes must
    // be materialised on each page first.
    for &page_id in pages {
        for key in INHERITABLE_KEYS {
            let has_own = document
                .get_dictionary(page_id)
                .map(|dict| dict.has(key))
                .map_err(|e| page_object_error(page_id, e))?;
            if has_own {
                continue;
            }
            if let Some(value) = inherited_attribute(document, page_id, key) {
                document
                    .get_dictionary_mut(page_id)
                    .map_err(|e| page_object_error(page_id, e))?
                    .set(key.to_vec(), value);
            }
        }
    }

    let kids: Vec<Object> = pages.iter().map(|&id| Object::Reference(id)).collect();
    let root = document
        .get_dictionary_mut(root_id)
        .map_err(|e| DeblankError::Internal(format!("page tree root unreadable: {}", e)))?;
    root.set("Kids", kids);
    root.set("Count", pages.len() as i64);
    root.remove(b"Parent");

    for &page_id in pages {
        document
            .get_dictionary_mut(page_id)
            .map_err(|e| page_object_error(page_id, e))?
            .set("Parent", Object::Reference(root_id));
    }

    let pruned = document.prune_objects();
    debug!(pruned = pruned.len(), kept_pages = pages.len(), "Page tree rebuilt");
    Ok(())
}

fn inherited_attribute(document: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut node = document.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        let parent_id = node.get(b"Parent").and_then(Object::as_reference).ok()?;
        node = document.get_dictionary(parent_id).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
    }
    None
}

fn page_object_error(page_id: ObjectId, e: lopdf::Error) -> DeblankError {
    DeblankError::Internal(format!("page object {:?} unreadable: {}", page_id, e))
}

/// The finalized output PDF.
#[derive(Debug, Clone)]
pub struct FilteredPdf {
    document: Document,
    retained_pages: Vec<usize>,
}

impl FilteredPdf {
    /// Rewrite `document` in place so that it holds only `retained`, in
    /// order. The handles must come from `document` and ascend by index.
    pub fn from_retained(
        mut document: Document,
        retained: OutputDocument<ObjectId>,
    ) -> Result<Self, DeblankError> {
        for pair in retained.pages().windows(2) {
            check_ascending(pair[0].index(), pair[1].index())?;
        }
        let page_ids: Vec<ObjectId> = retained.pages().iter().map(|p| *p.handle()).collect();

        rebuild_page_tree(&mut document, &page_ids)?;

        info!("Output document finalized with {} pages", page_ids.len());
        Ok(FilteredPdf {
            document,
            retained_pages: retained.indices(),
        })
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// 0-indexed source pages present in the output, in order.
    pub fn retained_pages(&self) -> &[usize] {
        &self.retained_pages
    }

    pub fn page_count(&self) -> usize {
        self.retained_pages.len()
    }

    /// Serialise the output PDF.
    pub fn to_bytes(&mut self) -> Result<Vec<u8>, DeblankError> {
        let mut buf = Vec::new();
        self.document
            .save_to(&mut buf)
            .map_err(|e| DeblankError::Internal(format!("failed to serialise output PDF: {}", e)))?;
        Ok(buf)
    }

    /// Write the output PDF to `path`.
    pub fn save(&mut self, path: &Path) -> Result<(), DeblankError> {
        let bytes = self.to_bytes()?;
        std::fs::write(path, bytes).map_err(|source| DeblankError::OutputWriteFailed {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn into_document(self) -> Document {
        self.document
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Stream};

    /// Five pages under two intermediate nodes; MediaBox and Resources
    /// live on the intermediate nodes only.
    fn nested_doc() -> (Document, Vec<ObjectId>) {
        let mut doc = Document::with_version("1.7");
        let root_id = doc.new_object_id();
        let font = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let mut page_ids = Vec::new();
        let mut branches = Vec::new();
        for (branch, range) in [(0, 0..3), (1, 3..5)] {
            let branch_id = doc.new_object_id();
            let mut kids = Vec::new();
            for i in range {
                let content = doc.add_object(Stream::new(
                    dictionary! {},
                    format!("BT /F1 12 Tf 72 720 Td (page {i}) Tj ET").into_bytes(),
                ));
                let page = doc.add_object(dictionary! {
                    "Type" => "Page",
                    "Parent" => branch_id,
                    "Contents" => content,
                });
                kids.push(Object::Reference(page));
                page_ids.push(page);
            }
            let count = kids.len() as i64;
            doc.objects.insert(
                branch_id,
                Object::Dictionary(dictionary! {
                    "Type" => "Pages",
                    "Parent" => root_id,
                    "Kids" => kids,
                    "Count" => count,
                    "MediaBox" => vec![0.into(), 0.into(), (595 + branch).into(), 842.into()],
                    "Resources" => dictionary! { "Font" => dictionary! { "F1" => font } },
                }),
            );
            branches.push(Object::Reference(branch_id));
        }
        doc.objects.insert(
            root_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => branches,
                "Count" => 5,
            }),
        );
        let catalog = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => root_id });
        doc.trailer.set("Root", catalog);
        (doc, page_ids)
    }

    fn content_of(doc: &Document, page_id: ObjectId) -> Vec<u8> {
        let contents = doc
            .get_dictionary(page_id)
            .unwrap()
            .get(b"Contents")
            .unwrap()
            .as_reference()
            .unwrap();
        doc.get_object(contents)
            .unwrap()
            .as_stream()
            .unwrap()
            .content
            .clone()
    }

    #[test]
    fn collecting_sink_finalizes_once() {
        let mut sink = CollectingSink::new();
        sink.accept(Page::new(0, "a")).unwrap();
        sink.accept(Page::new(2, "c")).unwrap();
        let out = sink.finalize().unwrap();
        assert_eq!(out.indices(), vec![0, 2]);
        assert!(sink.is_finalized());
        assert!(matches!(sink.finalize(), Err(DeblankError::AlreadyFinalized)));
        assert!(matches!(
            sink.accept(Page::new(3, "d")),
            Err(DeblankError::AlreadyFinalized)
        ));
    }

    #[test]
    fn pdf_sink_keeps_original_content_and_inherits_attributes() {
        let (doc, ids) = nested_doc();
        let original = doc.clone();
        let mut sink = PdfSink::new(doc);
        for index in [0, 2, 4] {
            sink.accept(Page::new(index, ids[index])).unwrap();
        }
        let mut out = sink.finalize().unwrap();
        assert_eq!(out.retained_pages(), &[0, 2, 4]);

        let bytes = out.to_bytes().unwrap();
        let reloaded = Document::load_mem(&bytes).unwrap();
        let reloaded_pages: Vec<ObjectId> = reloaded.get_pages().into_values().collect();
        assert_eq!(reloaded_pages.len(), 3);

        for (&new_id, &old_index) in reloaded_pages.iter().zip([0usize, 2, 4].iter()) {
            assert_eq!(
                content_of(&reloaded, new_id),
                content_of(&original, ids[old_index]),
                "content stream of page {old_index} changed"
            );
            let page = reloaded.get_dictionary(new_id).unwrap();
            assert!(page.has(b"MediaBox"), "page {old_index} lost its MediaBox");
            assert!(page.has(b"Resources"), "page {old_index} lost its Resources");
        }

        // Page 4 sat under the second branch, whose MediaBox is 596 wide.
        let last = reloaded.get_dictionary(reloaded_pages[2]).unwrap();
        let media_box = last.get(b"MediaBox").unwrap().as_array().unwrap();
        assert_eq!(media_box[2].as_i64().unwrap(), 596);
    }

    #[test]
    fn pdf_sink_with_no_pages_still_finalizes() {
        let (doc, _) = nested_doc();
        let mut sink = PdfSink::new(doc);
        let mut out = sink.finalize().unwrap();
        assert_eq!(out.page_count(), 0);
        let bytes = out.to_bytes().unwrap();
        let reloaded = Document::load_mem(&bytes).unwrap();
        assert!(reloaded.get_pages().is_empty());
    }

    #[test]
    fn pdf_sink_rejects_second_finalize() {
        let (doc, _) = nested_doc();
        let mut sink = PdfSink::new(doc);
        sink.finalize().unwrap();
        assert!(matches!(sink.finalize(), Err(DeblankError::AlreadyFinalized)));
    }

    #[test]
    fn pdf_sink_rejects_out_of_order_pages() {
        let (doc, ids) = nested_doc();
        let mut sink = PdfSink::new(doc);
        sink.accept(Page::new(3, ids[3])).unwrap();
        assert!(sink.accept(Page::new(3, ids[3])).is_err());
        assert!(sink.accept(Page::new(1, ids[1])).is_err());
    }

    #[test]
    fn collected_handles_rewrite_the_source_document() {
        let (doc, ids) = nested_doc();
        let mut sink = CollectingSink::new();
        sink.accept(Page::new(1, ids[1])).unwrap();
        sink.accept(Page::new(3, ids[3])).unwrap();

        let mut out = FilteredPdf::from_retained(doc, sink.finalize().unwrap()).unwrap();
        assert_eq!(out.retained_pages(), &[1, 3]);
        let reloaded = Document::load_mem(&out.to_bytes().unwrap()).unwrap();
        for id in reloaded.get_pages().into_values() {
            assert!(reloaded.get_dictionary(id).unwrap().has(b"MediaBox"));
        }
        assert_eq!(reloaded.get_pages().len(), 2);
    }

    #[test]
    fn from_retained_rejects_unordered_handles() {
        let (doc, ids) = nested_doc();
        let pages = OutputDocument::new(vec![Page::new(2, ids[2]), Page::new(0, ids[0])]);
        assert!(matches!(
            FilteredPdf::from_retained(doc, pages),
            Err(DeblankError::Internal(_))
        ));
    }

    #[test]
    fn dropped_pages_are_pruned() {
        let (doc, ids) = nested_doc();
        let dropped = ids[1];
        let mut sink = PdfSink::new(doc);
        sink.accept(Page::new(0, ids[0])).unwrap();
        let out = sink.finalize().unwrap();
        assert!(out.document().get_object(dropped).is_err());
    }
}
