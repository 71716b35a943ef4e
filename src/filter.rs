//! File-level entry points: PDF in, PDF without blank pages out.
//!
//! All PDF work (lopdf parsing, pdfium rendering, classification) is
//! blocking, so each entry point hops onto `spawn_blocking` and the async
//! caller never stalls a Tokio worker.
//!
//! The input is read into memory once. lopdf parses it for the page tree;
//! pdfium renders from the same bytes. Both must agree on the page count,
//! otherwise the document is treated as unreadable. The run only collects
//! page handles, and the output is the parsed source document rewritten in
//! place once the raw bytes have been released.

use crate::config::FilterConfig;
use crate::error::DeblankError;
use crate::output::{DocumentMetadata, FilterOutput, FilterStats};
use crate::pipeline::classify::build_classifier;
use crate::pipeline::input;
use crate::pipeline::orchestrator::BatchPipeline;
use crate::pipeline::render::{bind_pdfium, PdfiumRasterizer};
use crate::pipeline::sink::{CollectingSink, FilteredPdf};
use crate::pipeline::source::PdfSource;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Remove blank pages from the PDF at `input`, writing the result to `output`.
///
/// The output is written atomically (temp file + rename), so a failed run
/// never leaves a truncated PDF behind.
///
/// # Errors
/// Any failure aborts the whole run: unreadable input, a page that cannot
/// be rendered or classified, or an output that cannot be written.
pub async fn remove_blank_pages(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    config: &FilterConfig,
) -> Result<FilterStats, DeblankError> {
    let result = filter_pdf(input, config).await?;
    write_atomic(output.as_ref(), &result.pdf_bytes).await?;
    info!("Wrote {}", output.as_ref().display());
    Ok(result.stats)
}

/// Synchronous wrapper around [`remove_blank_pages`].
///
/// Creates a temporary tokio runtime internally.
pub fn remove_blank_pages_sync(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    config: &FilterConfig,
) -> Result<FilterStats, DeblankError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| DeblankError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(remove_blank_pages(input, output, config))
}

/// Filter the PDF at `input` and return the result in memory.
pub async fn filter_pdf(
    input: impl AsRef<Path>,
    config: &FilterConfig,
) -> Result<FilterOutput, DeblankError> {
    let path = input::resolve_input(input)?;
    info!("Removing blank pages: {}", path.display());

    let bytes = tokio::fs::read(&path).await.map_err(|e| {
        DeblankError::document_read(format!("failed to read '{}': {}", path.display(), e))
    })?;
    run_blocking(bytes, config.clone()).await
}

/// Filter PDF bytes already in memory.
///
/// ```rust,no_run
/// use pdf_deblank::{filter_bytes, FilterConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes = std::fs::read("scan.pdf")?;
/// let out = filter_bytes(&bytes, &FilterConfig::default()).await?;
/// std::fs::write("scan-clean.pdf", &out.pdf_bytes)?;
/// eprintln!("dropped pages {:?}", out.blank_pages);
/// # Ok(())
/// # }
/// ```
pub async fn filter_bytes(
    bytes: &[u8],
    config: &FilterConfig,
) -> Result<FilterOutput, DeblankError> {
    input::check_magic(bytes).map_err(|magic| DeblankError::NotAPdf {
        path: PathBuf::from("<memory>"),
        magic,
    })?;
    run_blocking(bytes.to_vec(), config.clone()).await
}

/// Read page count, PDF version and the Info dictionary without rendering.
///
/// Does not need pdfium.
pub async fn inspect(input: impl AsRef<Path>) -> Result<DocumentMetadata, DeblankError> {
    let path = input::resolve_input(input)?;
    tokio::task::spawn_blocking(move || PdfSource::open(&path).map(|source| source.metadata()))
        .await
        .map_err(|e| DeblankError::Internal(format!("inspect task panicked: {}", e)))?
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn run_blocking(bytes: Vec<u8>, config: FilterConfig) -> Result<FilterOutput, DeblankError> {
    tokio::task::spawn_blocking(move || filter_in_memory(bytes, &config))
        .await
        .map_err(|e| DeblankError::Internal(format!("filter task panicked: {}", e)))?
}

fn filter_in_memory(bytes: Vec<u8>, config: &FilterConfig) -> Result<FilterOutput, DeblankError> {
    config.validate()?;
    let source = PdfSource::from_bytes(&bytes)?;

    let pdfium = bind_pdfium()?;
    let mut rasterizer = PdfiumRasterizer::from_bytes(&pdfium, &bytes, config.max_rendered_pixels)?;
    if rasterizer.page_count() != source.len() {
        return Err(DeblankError::document_read(format!(
            "page tree lists {} pages but the renderer sees {}",
            source.len(),
            rasterizer.page_count()
        )));
    }

    let classifier = build_classifier(&config.strategy)?;
    debug!(strategy = config.strategy.name(), "Classifier ready");

    let mut sink = CollectingSink::<lopdf::ObjectId>::new();
    let run = BatchPipeline::from_config(config).run(&source, &mut rasterizer, &classifier, &mut sink)?;
    drop(rasterizer);
    drop(bytes);

    let mut pdf = FilteredPdf::from_retained(source.into_document(), run.output)?;
    let pdf_bytes = pdf.to_bytes()?;
    Ok(FilterOutput {
        pdf_bytes,
        retained_pages: run.retained_pages,
        blank_pages: run.blank_pages,
        stats: run.stats,
    })
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), DeblankError> {
    let write_err = |source| DeblankError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("pdf.tmp");
    tokio::fs::write(&tmp_path, bytes).await.map_err(write_err)?;
    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(write_err(e));
    }
    Ok(())
}
