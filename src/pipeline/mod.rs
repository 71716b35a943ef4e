//! Pipeline stages for blank-page removal.
//!
//! The orchestrator depends only on the four collaborator traits; the PDF
//! implementations sit next to them and can be swapped for fakes in tests.
//!
//! ## Data Flow
//!
//! ```text
//!            ┌──────────── per batch ────────────┐
//! source ──▶ │ render ──▶ classify ──▶ forward   │ ──▶ sink ──▶ PDF
//! (lopdf)    │ (pdfium)   (ink / OCR)  (order)   │    (lopdf)
//!            └───────────────────────────────────┘
//! ```
//!
//! 1. [`input`]     validate the path and derive the default output name
//! 2. [`partition`] split `[0, N)` into batches of at most B pages
//! 3. [`source`]    page count and original page handles
//! 4. [`render`]    rasterise one batch; blocking, runs off the async runtime
//! 5. [`classify`]  blank or not, one page at a time
//! 6. [`sink`]      collect retained pages and write the output document
//! 7. [`orchestrator`] the batch loop tying the above together

pub mod classify;
pub mod input;
#[cfg(feature = "ocr")]
pub mod ocr;
pub mod orchestrator;
pub mod partition;
pub mod render;
pub mod sink;
pub mod source;
