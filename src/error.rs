//! Error types for the pdf-deblank library.
//!
//! Every failure is fatal to the call that hit it. The pipeline never skips
//! a page it could not rasterize or classify: a silently shortened document
//! looks exactly like a correct one to the caller, so the whole run aborts
//! and the caller decides whether to retry from scratch.
//!
//! Collaborators (rasterizer, classifier, document source) report their own
//! causes as a [`BoxError`]; the pipeline wraps that cause in the variant that
//! names the stage and the pages involved.

use crate::model::PageRange;
use std::path::PathBuf;
use thiserror::Error;

/// Boxed cause reported by a pipeline collaborator.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// All errors returned by the pdf-deblank library.
#[derive(Debug, Error)]
pub enum DeblankError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── Pipeline errors ───────────────────────────────────────────────────
    /// Bad batch size, DPI or strategy. Not retryable without correction.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The document could not be opened or its pages enumerated.
    #[error("Cannot read document: {detail}")]
    DocumentRead { detail: String },

    /// The rasterizer failed on a batch. No output is produced.
    #[error("Rasterisation failed for pages {range}: {source}")]
    Rasterization {
        range: PageRange,
        #[source]
        source: BoxError,
    },

    /// The classifier failed on a page (0-indexed). No output is produced.
    #[error("Classification failed for page index {page}: {source}")]
    Classification {
        page: usize,
        #[source]
        source: BoxError,
    },

    /// `finalize` was called twice, or a page was accepted after it.
    #[error("Output document was already finalized")]
    AlreadyFinalized,

    /// The cancel flag was raised; observed between batches only.
    #[error("Cancelled after {completed_batches} completed batches")]
    Cancelled { completed_batches: usize },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write the output PDF file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Install pdfium for your platform, or point PDFIUM_LIB_PATH at an existing\n\
libpdfium (.so / .dylib / .dll) or the directory that contains it.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DeblankError {
    pub(crate) fn document_read(detail: impl Into<String>) -> Self {
        Self::DocumentRead {
            detail: detail.into(),
        }
    }
}
