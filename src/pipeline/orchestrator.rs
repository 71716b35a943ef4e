//! Batch pipeline: rasterize → classify → forward, one batch at a time.
//!
//! The loop is strictly sequential across batches. A batch's raster images
//! are dropped before the next batch is rasterized, so at most
//! `batch_size` images are alive at any moment regardless of document
//! length. Retained pages reach the sink in source order without any
//! sort or merge step.
//!
//! Any collaborator failure aborts the run before the sink is finalized.
//! There is no skipping and no partial output.

use crate::config::FilterConfig;
use crate::error::{BoxError, DeblankError};
use crate::model::{Classification, PageRange};
use crate::output::FilterStats;
use crate::pipeline::classify::PageClassifier;
use crate::pipeline::partition;
use crate::pipeline::render::Rasterizer;
use crate::pipeline::sink::DocumentSink;
use crate::pipeline::source::DocumentSource;
use crate::progress::{FilterProgressCallback, NoopProgressCallback, ProgressCallback};
use rayon::prelude::*;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Where a run currently is. Logged on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Validating,
    Rasterizing(PageRange),
    Classifying(PageRange),
    Forwarding(PageRange),
    Finalizing,
    Done,
    Failed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineState::Idle => write!(f, "idle"),
            PipelineState::Validating => write!(f, "validating"),
            PipelineState::Rasterizing(r) => write!(f, "rasterizing {}", r),
            PipelineState::Classifying(r) => write!(f, "classifying {}", r),
            PipelineState::Forwarding(r) => write!(f, "forwarding {}", r),
            PipelineState::Finalizing => write!(f, "finalizing"),
            PipelineState::Done => write!(f, "done"),
            PipelineState::Failed => write!(f, "failed"),
        }
    }
}

/// Knobs for one [`BatchPipeline`].
#[derive(Clone)]
pub struct PipelineOptions {
    /// Pages per batch. Validated at the start of every run.
    pub batch_size: usize,

    /// Resolution passed to the rasterizer.
    pub dpi: u32,

    /// Classify the pages of a batch on the rayon pool.
    pub parallel: bool,

    /// Checked before each batch, never inside one.
    pub cancel_flag: Option<Arc<AtomicBool>>,

    pub progress: Option<ProgressCallback>,
}

impl fmt::Debug for PipelineOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineOptions")
            .field("batch_size", &self.batch_size)
            .field("dpi", &self.dpi)
            .field("parallel", &self.parallel)
            .field("cancel_flag", &self.cancel_flag.is_some())
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            batch_size: crate::config::DEFAULT_BATCH_SIZE,
            dpi: crate::config::DEFAULT_DPI,
            parallel: false,
            cancel_flag: None,
            progress: None,
        }
    }
}

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct FilterRun<O> {
    /// Whatever the sink produced on finalize.
    pub output: O,

    /// 0-indexed source pages forwarded to the sink, ascending.
    pub retained_pages: Vec<usize>,

    /// 0-indexed source pages classified blank, ascending.
    pub blank_pages: Vec<usize>,

    pub stats: FilterStats,
}

/// Drives a [`DocumentSource`], [`Rasterizer`], [`PageClassifier`] and
/// [`DocumentSink`] through the batch loop.
#[derive(Debug, Clone, Default)]
pub struct BatchPipeline {
    options: PipelineOptions,
}

impl BatchPipeline {
    /// Pipeline with default DPI, sequential classification, no callbacks.
    pub fn new(batch_size: usize) -> Self {
        Self {
            options: PipelineOptions {
                batch_size,
                ..Default::default()
            },
        }
    }

    pub fn with_options(options: PipelineOptions) -> Self {
        Self { options }
    }

    /// Take batch size, DPI, parallelism, progress and cancellation from `config`.
    pub fn from_config(config: &FilterConfig) -> Self {
        Self {
            options: PipelineOptions {
                batch_size: config.batch_size,
                dpi: config.dpi,
                parallel: config.parallel_classification,
                cancel_flag: config.cancel_flag.clone(),
                progress: config.progress_callback.clone(),
            },
        }
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.options.dpi = dpi;
        self
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.options.parallel = parallel;
        self
    }

    pub fn cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.options.cancel_flag = Some(flag);
        self
    }

    pub fn progress(mut self, callback: ProgressCallback) -> Self {
        self.options.progress = Some(callback);
        self
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Run the whole document through the pipeline.
    ///
    /// The sink is finalized exactly once, and only when every batch
    /// succeeded. On error it is left unfinalized and nothing is returned.
    pub fn run<D, R, C, S>(
        &self,
        source: &D,
        rasterizer: &mut R,
        classifier: &C,
        sink: &mut S,
    ) -> Result<FilterRun<S::Output>, DeblankError>
    where
        D: DocumentSource,
        R: Rasterizer,
        R::Image: Sync,
        C: PageClassifier<R::Image> + Sync + ?Sized,
        S: DocumentSink<D::Handle>,
    {
        let mut state = PipelineState::Idle;
        match self.run_batches(source, rasterizer, classifier, sink, &mut state) {
            Ok(run) => Ok(run),
            Err(e) => {
                warn!("Pipeline failed while {}: {}", state, e);
                transition(&mut state, PipelineState::Failed);
                Err(e)
            }
        }
    }

    fn run_batches<D, R, C, S>(
        &self,
        source: &D,
        rasterizer: &mut R,
        classifier: &C,
        sink: &mut S,
        state: &mut PipelineState,
    ) -> Result<FilterRun<S::Output>, DeblankError>
    where
        D: DocumentSource,
        R: Rasterizer,
        R::Image: Sync,
        C: PageClassifier<R::Image> + Sync + ?Sized,
        S: DocumentSink<D::Handle>,
    {
        let total_start = Instant::now();
        let batch_size = self.options.batch_size;
        let progress = self.progress_callback();

        transition(state, PipelineState::Validating);
        partition::validate_batch_size(batch_size)?;
        let total_pages = source
            .page_count()
            .map_err(|e| DeblankError::document_read(e.to_string()))?;
        let total_batches = partition::batch_count(total_pages, batch_size);
        info!(
            "Filtering {} pages in {} batches of up to {}",
            total_pages, total_batches, batch_size
        );
        progress.on_filter_start(total_pages, total_batches);

        let mut retained_pages = Vec::new();
        let mut blank_pages = Vec::new();
        let mut render_time = Duration::ZERO;
        let mut classify_time = Duration::ZERO;

        for (batch_idx, range) in partition::batches(total_pages, batch_size)?.enumerate() {
            self.check_cancelled(batch_idx)?;
            progress.on_batch_start(range, batch_idx + 1, total_batches);

            transition(state, PipelineState::Rasterizing(range));
            let render_start = Instant::now();
            let images = rasterizer
                .rasterize(range, self.options.dpi)
                .map_err(|source| DeblankError::Rasterization { range, source })?;
            render_time += render_start.elapsed();
            if images.len() != range.len() {
                return Err(DeblankError::Rasterization {
                    range,
                    source: format!("expected {} images, got {}", range.len(), images.len())
                        .into(),
                });
            }

            transition(state, PipelineState::Classifying(range));
            let classify_start = Instant::now();
            let verdicts = self.classify_batch(range, &images, classifier)?;
            classify_time += classify_start.elapsed();
            drop(images);

            transition(state, PipelineState::Forwarding(range));
            let pages = source
                .pages_in_range(range)
                .map_err(|e| DeblankError::document_read(e.to_string()))?;
            if pages.len() != range.len() {
                return Err(DeblankError::document_read(format!(
                    "source returned {} pages for {}",
                    pages.len(),
                    range
                )));
            }

            let mut retained_in_batch = 0;
            for (page, verdict) in pages.into_iter().zip(verdicts) {
                let index = page.index();
                if index != verdict.page_index {
                    return Err(DeblankError::document_read(format!(
                        "source returned page index {} where {} was expected",
                        index, verdict.page_index
                    )));
                }
                progress.on_page_classified(index, verdict.is_blank);
                if verdict.is_blank {
                    debug!("Page {} is blank, dropping", index + 1);
                    blank_pages.push(index);
                } else {
                    sink.accept(page)?;
                    retained_pages.push(index);
                    retained_in_batch += 1;
                }
            }

            progress.on_batch_complete(range, retained_in_batch);
            info!("Processed pages {} to {}", range.start + 1, range.end);
        }

        transition(state, PipelineState::Finalizing);
        let output = sink.finalize()?;
        transition(state, PipelineState::Done);

        let stats = FilterStats {
            total_pages,
            retained_pages: retained_pages.len(),
            blank_pages: blank_pages.len(),
            batches: total_batches,
            batch_size,
            render_duration_ms: render_time.as_millis() as u64,
            classify_duration_ms: classify_time.as_millis() as u64,
            total_duration_ms: total_start.elapsed().as_millis() as u64,
        };
        progress.on_filter_complete(total_pages, stats.retained_pages);
        info!(
            "Kept {}/{} pages ({} blank) in {}ms",
            stats.retained_pages, total_pages, stats.blank_pages, stats.total_duration_ms
        );

        Ok(FilterRun {
            output,
            retained_pages,
            blank_pages,
            stats,
        })
    }

    /// Classify every image of one batch; verdicts come back in range order.
    ///
    /// A failure is reported for the lowest failing page index, in parallel
    /// mode too.
    fn classify_batch<I, C>(
        &self,
        range: PageRange,
        images: &[I],
        classifier: &C,
    ) -> Result<Vec<Classification>, DeblankError>
    where
        I: Sync,
        C: PageClassifier<I> + Sync + ?Sized,
    {
        let into_verdict = |(result, page_index): (Result<bool, BoxError>, usize)| match result {
            Ok(is_blank) => Ok(Classification {
                page_index,
                is_blank,
            }),
            Err(source) => Err(DeblankError::Classification {
                page: page_index,
                source,
            }),
        };

        if self.options.parallel && images.len() > 1 {
            let results: Vec<Result<bool, BoxError>> = images
                .par_iter()
                .map(|image| classifier.classify(image))
                .collect();
            results.into_iter().zip(range.indices()).map(into_verdict).collect()
        } else {
            images
                .iter()
                .map(|image| classifier.classify(image))
                .zip(range.indices())
                .map(into_verdict)
                .collect()
        }
    }

    fn check_cancelled(&self, completed_batches: usize) -> Result<(), DeblankError> {
        match &self.options.cancel_flag {
            Some(flag) if flag.load(Ordering::Relaxed) => {
                Err(DeblankError::Cancelled { completed_batches })
            }
            _ => Ok(()),
        }
    }

    fn progress_callback(&self) -> &dyn FilterProgressCallback {
        match &self.options.progress {
            Some(cb) => cb.as_ref(),
            None => &NoopProgressCallback,
        }
    }
}

fn transition(state: &mut PipelineState, next: PipelineState) {
    debug!(from = %state, to = %next, "Pipeline state");
    *state = next;
}

/// Run `source` through the pipeline with `batch_size` and default options,
/// returning only the sink's output.
pub fn process<D, R, C, S>(
    source: &D,
    batch_size: usize,
    rasterizer: &mut R,
    classifier: &C,
    sink: &mut S,
) -> Result<S::Output, DeblankError>
where
    D: DocumentSource,
    R: Rasterizer,
    R::Image: Sync,
    C: PageClassifier<R::Image> + Sync + ?Sized,
    S: DocumentSink<D::Handle>,
{
    BatchPipeline::new(batch_size)
        .run(source, rasterizer, classifier, sink)
        .map(|run| run.output)
}
