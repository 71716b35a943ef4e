//! # pdf-deblank
//!
//! Remove blank pages from scanned PDF documents.
//!
//! ## Why rasterise?
//!
//! A scanned "blank" page is rarely empty at the PDF level: it is a full-page
//! image of paper with dust, bleed-through and scanner noise. Only the
//! rendered pixels say whether anything was printed on it, so every page is
//! rendered and judged on its pixels. The pages that survive are copied to
//! the output untouched; the renderings are thrown away.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input     check the file is a readable PDF
//!  ├─ 2. Partition split pages into batches of B (default 5)
//!  ├─ 3. Render    rasterise one batch via pdfium (spawn_blocking)
//!  ├─ 4. Classify  geometric ink bounds, or OCR text emptiness
//!  ├─ 5. Forward   original non-blank pages, in order, to the sink
//!  └─ 6. Output    rebuilt page tree, written atomically
//! ```
//!
//! At most one batch of rendered pages is in memory at a time, whatever the
//! length of the document.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf_deblank::{remove_blank_pages, FilterConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = FilterConfig::default();
//!     let stats = remove_blank_pages("scan.pdf", "cleaned_scan.pdf", &config).await?;
//!     eprintln!("kept {}/{} pages", stats.retained_pages, stats.total_pages);
//!     Ok(())
//! }
//! ```
//!
//! ## Custom collaborators
//!
//! [`process`] runs the batch loop over any [`DocumentSource`],
//! [`Rasterizer`], [`PageClassifier`] and [`DocumentSink`]:
//!
//! ```rust
//! use pdf_deblank::{process, BoxError, CollectingSink, DocumentSource, Page, PageClassifier, PageRange, Rasterizer};
//!
//! struct Numbers(usize);
//! impl DocumentSource for Numbers {
//!     type Handle = usize;
//!     fn page_count(&self) -> Result<usize, BoxError> { Ok(self.0) }
//!     fn pages_in_range(&self, r: PageRange) -> Result<Vec<Page<usize>>, BoxError> {
//!         Ok(r.indices().map(|i| Page::new(i, i)).collect())
//!     }
//! }
//!
//! struct Identity;
//! impl Rasterizer for Identity {
//!     type Image = usize;
//!     fn rasterize(&mut self, r: PageRange, _dpi: u32) -> Result<Vec<usize>, BoxError> {
//!         Ok(r.indices().collect())
//!     }
//! }
//!
//! struct Odd;
//! impl PageClassifier<usize> for Odd {
//!     fn classify(&self, page: &usize) -> Result<bool, BoxError> { Ok(page % 2 == 1) }
//! }
//!
//! let mut sink = CollectingSink::new();
//! let out = process(&Numbers(5), 2, &mut Identity, &Odd, &mut sink).unwrap();
//! assert_eq!(out.indices(), vec![0, 2, 4]);
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `deblank` binary (clap + anyhow + tracing-subscriber + indicatif) |
//! | `ocr`   | off     | Text-content strategy via the pure-Rust `ocrs` engine |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdf-deblank = { version = "0.1", default-features = false }
//! ```
//!
//! ## Native library
//!
//! Rendering needs the pdfium shared library. Set `PDFIUM_LIB_PATH` to the
//! library file or its directory, or install it on the system library path.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod filter;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{BlankStrategy, FilterConfig, FilterConfigBuilder, GeometricOptions, TextContentOptions};
pub use error::{BoxError, DeblankError};
pub use filter::{filter_bytes, filter_pdf, inspect, remove_blank_pages, remove_blank_pages_sync};
pub use model::{Classification, OutputDocument, Page, PageRange, RasterImage};
pub use output::{DocumentMetadata, FilterOutput, FilterStats};
pub use pipeline::classify::{
    build_classifier, GeometricClassifier, PageClassifier, TextContentClassifier, TextRecognizer,
};
pub use pipeline::input::default_output_path;
pub use pipeline::orchestrator::{process, BatchPipeline, FilterRun, PipelineOptions};
pub use pipeline::render::Rasterizer;
pub use pipeline::sink::{CollectingSink, DocumentSink, FilteredPdf, PdfSink};
pub use pipeline::source::{DocumentSource, PdfSource};
pub use progress::{FilterProgressCallback, NoopProgressCallback, ProgressCallback};
