//! Document source: page count and original page handles.
//!
//! [`PdfSource`] reads the page tree with lopdf. The handles it hands out
//! are object ids of the original page dictionaries; nothing is decoded or
//! copied until the sink writes the output.

use crate::error::{BoxError, DeblankError};
use crate::model::{Page, PageRange};
use crate::output::DocumentMetadata;
use lopdf::{Document, Object, ObjectId};
use std::path::Path;
use tracing::{debug, info, warn};

/// Leaf collaborator that exposes the input document's pages.
pub trait DocumentSource {
    /// How a page is addressed. Opaque to the pipeline.
    type Handle;

    /// Total number of pages.
    fn page_count(&self) -> Result<usize, BoxError>;

    /// Original pages in `range`, in ascending index order.
    fn pages_in_range(&self, range: PageRange) -> Result<Vec<Page<Self::Handle>>, BoxError>;
}

/// A PDF loaded with lopdf.
#[derive(Debug, Clone)]
pub struct PdfSource {
    document: Document,
    page_ids: Vec<ObjectId>,
}

impl PdfSource {
    /// Load a PDF from the filesystem.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DeblankError> {
        let path = path.as_ref();
        let document = Document::load(path).map_err(|e| {
            DeblankError::document_read(format!("failed to parse '{}': {}", path.display(), e))
        })?;
        info!("Loaded PDF page tree: {}", path.display());
        Self::from_document(document)
    }

    /// Load a PDF from bytes already in memory.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DeblankError> {
        let document = Document::load_mem(bytes).map_err(|e| {
            DeblankError::document_read(format!("failed to parse PDF from memory: {}", e))
        })?;
        Self::from_document(document)
    }

    /// Wrap an already-parsed document.
    ///
    /// Fails when the catalog or its `/Pages` entry is missing, since the
    /// pages could not be enumerated.
    pub fn from_document(document: Document) -> Result<Self, DeblankError> {
        document
            .catalog()
            .and_then(|catalog| catalog.get(b"Pages"))
            .map_err(|e| DeblankError::document_read(format!("no page tree: {}", e)))?;

        if document.is_encrypted() {
            warn!("PDF is encrypted; page content may not be readable");
        }

        // get_pages is keyed by 1-indexed page number, so values come out in order.
        let page_ids: Vec<ObjectId> = document.get_pages().into_values().collect();
        debug!(pages = page_ids.len(), "Page tree enumerated");

        Ok(Self { document, page_ids })
    }

    /// Borrow the parsed document.
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Give up the page list and keep the parsed document.
    pub fn into_document(self) -> Document {
        self.document
    }

    /// Number of pages in the page tree.
    pub fn len(&self) -> usize {
        self.page_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.page_ids.is_empty()
    }

    /// Document information dictionary plus structural facts.
    pub fn metadata(&self) -> DocumentMetadata {
        DocumentMetadata {
            title: info_string(&self.document, b"Title"),
            author: info_string(&self.document, b"Author"),
            subject: info_string(&self.document, b"Subject"),
            creator: info_string(&self.document, b"Creator"),
            producer: info_string(&self.document, b"Producer"),
            page_count: self.page_ids.len(),
            pdf_version: self.document.version.clone(),
            is_encrypted: self.document.is_encrypted(),
        }
    }
}

impl DocumentSource for PdfSource {
    type Handle = ObjectId;

    fn page_count(&self) -> Result<usize, BoxError> {
        Ok(self.page_ids.len())
    }

    fn pages_in_range(&self, range: PageRange) -> Result<Vec<Page<ObjectId>>, BoxError> {
        let ids = self.page_ids.get(range.start..range.end).ok_or_else(|| {
            format!(
                "page range {} exceeds page count {}",
                range,
                self.page_ids.len()
            )
        })?;
        Ok(ids
            .iter()
            .zip(range.indices())
            .map(|(&id, index)| Page::new(index, id))
            .collect())
    }
}

/// Read a text string from the trailer's `/Info` dictionary.
fn info_string(document: &Document, key: &[u8]) -> Option<String> {
    let info = match document.trailer.get(b"Info").ok()? {
        Object::Reference(id) => document.get_dictionary(*id).ok()?,
        Object::Dictionary(dict) => dict,
        _ => return None,
    };
    match info.get(key).ok()? {
        Object::String(bytes, _) => {
            let text = decode_text_string(bytes);
            let text = text.trim();
            if text.is_empty() {
                None
            } else {
                Some(text.to_string())
            }
        }
        _ => None,
    }
}

/// PDF text strings are UTF-16BE when they start with a BOM, otherwise
/// (close enough to) Latin-1.
fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        bytes.iter().map(|&b| b as char).collect()
    }
}
