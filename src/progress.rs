//! Progress-callback trait for batch and page events.
//!
//! Inject an [`Arc<dyn FilterProgressCallback>`] via
//! [`crate::config::FilterConfigBuilder::progress_callback`] to receive
//! events while the pipeline works through a document.
//!
//! # Example
//!
//! ```rust
//! use pdf_deblank::{FilterConfig, FilterProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct BlankCounter {
//!     blanks: AtomicUsize,
//! }
//!
//! impl FilterProgressCallback for BlankCounter {
//!     fn on_page_classified(&self, page_index: usize, is_blank: bool) {
//!         if is_blank {
//!             self.blanks.fetch_add(1, Ordering::SeqCst);
//!             eprintln!("page {} is blank", page_index + 1);
//!         }
//!     }
//! }
//!
//! let counter = Arc::new(BlankCounter { blanks: AtomicUsize::new(0) });
//!
//! let config = FilterConfig::builder()
//!     .progress_callback(counter as Arc<dyn FilterProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::model::PageRange;
use std::sync::Arc;

/// Called by the pipeline as it processes each batch.
///
/// Implementations must be `Send + Sync` because the config holding them is
/// moved onto a blocking worker thread. Every event fires on the thread
/// driving the pipeline, in page order, even with parallel classification.
/// All methods default to no-ops.
pub trait FilterProgressCallback: Send + Sync {
    /// Called once, after the page count is known and before any rendering.
    fn on_filter_start(&self, total_pages: usize, total_batches: usize) {
        let _ = (total_pages, total_batches);
    }

    /// Called before a batch is rasterised. `batch_num` is 1-indexed.
    fn on_batch_start(&self, range: PageRange, batch_num: usize, total_batches: usize) {
        let _ = (range, batch_num, total_batches);
    }

    /// Called once per page with the classifier's verdict (0-indexed page).
    fn on_page_classified(&self, page_index: usize, is_blank: bool) {
        let _ = (page_index, is_blank);
    }

    /// Called after the batch's kept pages have been forwarded.
    fn on_batch_complete(&self, range: PageRange, retained: usize) {
        let _ = (range, retained);
    }

    /// Called once after the output document has been finalized.
    fn on_filter_complete(&self, total_pages: usize, retained: usize) {
        let _ = (total_pages, retained);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl FilterProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::FilterConfig`].
pub type ProgressCallback = Arc<dyn FilterProgressCallback>;
