//! Result types returned by the file-level API.

use serde::{Deserialize, Serialize};

/// Counters and timings for one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterStats {
    /// Pages in the input document.
    pub total_pages: usize,
    /// Pages forwarded to the output.
    pub retained_pages: usize,
    /// Pages classified blank and dropped.
    pub blank_pages: usize,
    /// Batches processed.
    pub batches: usize,
    /// Batch size the run used.
    pub batch_size: usize,
    /// Wall-clock time spent inside the rasterizer.
    pub render_duration_ms: u64,
    /// Wall-clock time spent inside the classifier.
    pub classify_duration_ms: u64,
    /// Wall-clock time for the whole run, finalization included.
    pub total_duration_ms: u64,
}

/// A filtered PDF held in memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterOutput {
    /// Serialised output PDF.
    #[serde(skip)]
    pub pdf_bytes: Vec<u8>,
    /// 0-indexed source pages that were kept, in order.
    pub retained_pages: Vec<usize>,
    /// 0-indexed source pages that were dropped, in order.
    pub blank_pages: Vec<usize>,
    pub stats: FilterStats,
}

/// Metadata read from a PDF without rendering it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
    pub is_encrypted: bool,
}
