//! CLI binary for pdf-deblank.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `FilterConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf_deblank::{
    default_output_path, inspect, remove_blank_pages, BlankStrategy, FilterConfig,
    FilterProgressCallback, GeometricOptions, PageRange, ProgressCallback, TextContentOptions,
};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar over all pages, plus a log line for
/// every page that gets dropped. The run summary is printed by `main`.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    /// The bar starts as a spinner; `on_filter_start` sets its length.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }

    /// Stop the spinner where it is. Used when the run fails or is cancelled,
    /// since `on_filter_complete` never fires then.
    fn abandon(&self) {
        if !self.bar.is_finished() {
            self.bar.abandon();
        }
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>4}/{len} pages  {msg}  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Scanning");
        self.bar.reset_eta();
    }
}

impl FilterProgressCallback for CliProgressCallback {
    fn on_filter_start(&self, total_pages: usize, total_batches: usize) {
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!(
                "Checking {total_pages} pages in {total_batches} batches…"
            ))
        ));
    }

    fn on_batch_start(&self, range: PageRange, batch_num: usize, total_batches: usize) {
        self.bar.set_message(format!(
            "batch {batch_num}/{total_batches} (pages {}-{})",
            range.start + 1,
            range.end
        ));
    }

    fn on_page_classified(&self, page_index: usize, is_blank: bool) {
        if is_blank {
            self.bar.println(format!(
                "  {} Page {:>4}  {}",
                dim("✗"),
                page_index + 1,
                dim("blank, dropped")
            ));
        }
        self.bar.inc(1);
    }

    fn on_filter_complete(&self, _total_pages: usize, _retained: usize) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Write cleaned_scan.pdf next to scan.pdf
  deblank scan.pdf

  # Explicit output, bigger batches
  deblank scan.pdf -o clean.pdf --batch-size 20

  # Treat light-grey marks as paper (watermarks, bleed-through)
  deblank --ink-threshold 160 scan.pdf

  # Blank means "no readable text" (needs the `ocr` feature)
  deblank --strategy text --ocr-models ~/.cache/ocrs scan.pdf

  # Inspect PDF metadata without rendering
  deblank --inspect-only scan.pdf

  # Machine-readable statistics
  deblank --json scan.pdf > stats.json

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH   Path to libpdfium (file or directory)
  RUST_LOG          Override log filtering (e.g. pdf_deblank=debug)
  DEBLANK_*         Every flag also reads DEBLANK_<FLAG>, e.g. DEBLANK_BATCH_SIZE
"#;

/// Remove blank pages from scanned PDF documents.
#[derive(Parser, Debug)]
#[command(
    name = "deblank",
    version,
    about = "Remove blank pages from scanned PDF documents",
    long_about = "Render each page of a PDF, decide whether anything is printed on it, and \
write a copy containing only the non-blank pages. Pages are processed in small batches so \
memory use does not grow with document length.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path.
    input: PathBuf,

    /// Output PDF. Default: cleaned_<input name> next to the input.
    #[arg(short, long, env = "DEBLANK_OUTPUT")]
    output: Option<PathBuf>,

    /// Pages rendered and classified per batch.
    #[arg(long, env = "DEBLANK_BATCH_SIZE", default_value_t = 5,
          value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    batch_size: usize,

    /// Rendering DPI (36–600).
    #[arg(long, env = "DEBLANK_DPI", default_value_t = 300,
          value_parser = clap::value_parser!(u32).range(36..=600))]
    dpi: u32,

    /// Cap on either edge of a rendered page, in pixels.
    #[arg(long, env = "DEBLANK_MAX_PIXELS", default_value_t = 4000)]
    max_pixels: u32,

    /// Blank-page test: geometric (ink bounds) or text (OCR).
    #[arg(long, env = "DEBLANK_STRATEGY", value_enum, default_value = "geometric")]
    strategy: StrategyArg,

    /// Luma below which a pixel counts as ink (geometric).
    #[arg(long, env = "DEBLANK_INK_THRESHOLD", default_value_t = 200)]
    ink_threshold: u8,

    /// Fraction of each edge ignored as scanner border (geometric).
    #[arg(long, env = "DEBLANK_MARGIN", default_value_t = 0.01)]
    margin: f32,

    /// Minimum ink pixels for a page to count as printed (geometric).
    #[arg(long, env = "DEBLANK_MIN_INK", default_value_t = 1)]
    min_ink: u32,

    /// Skip the 3×3 median filter that removes scanner speckle (geometric).
    #[arg(long, env = "DEBLANK_NO_DESPECKLE")]
    no_despeckle: bool,

    /// Directory holding text-detection.rten and text-recognition.rten (text).
    #[arg(long, env = "DEBLANK_OCR_MODELS")]
    ocr_models: Option<PathBuf>,

    /// Binarisation threshold applied before OCR (text).
    #[arg(long, env = "DEBLANK_BINARIZE_THRESHOLD", default_value_t = 150)]
    binarize_threshold: u8,

    /// Classify the pages of each batch in parallel.
    #[arg(long, env = "DEBLANK_PARALLEL")]
    parallel: bool,

    /// Print run statistics as JSON on stdout.
    #[arg(long, env = "DEBLANK_JSON")]
    json: bool,

    /// Print PDF metadata only, no filtering.
    #[arg(long)]
    inspect_only: bool,

    /// Disable progress bar.
    #[arg(long, env = "DEBLANK_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DEBLANK_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "DEBLANK_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum StrategyArg {
    Geometric,
    Text,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level library logs.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.inspect_only;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let meta = inspect(&cli.input).await.context("Failed to inspect PDF")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&meta).context("Failed to serialize metadata")?
            );
        } else {
            println!("File:         {}", cli.input.display());
            if let Some(ref t) = meta.title {
                println!("Title:        {}", t);
            }
            if let Some(ref a) = meta.author {
                println!("Author:       {}", a);
            }
            if let Some(ref s) = meta.subject {
                println!("Subject:      {}", s);
            }
            println!("Pages:        {}", meta.page_count);
            println!("PDF Version:  {}", meta.pdf_version);
            println!("Encrypted:    {}", meta.is_encrypted);
            if let Some(ref p) = meta.producer {
                println!("Producer:     {}", p);
            }
            if let Some(ref c) = meta.creator {
                println!("Creator:      {}", c);
            }
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress = show_progress.then(CliProgressCallback::new_dynamic);
    let progress_cb: Option<ProgressCallback> = progress
        .clone()
        .map(|cb| cb as Arc<dyn FilterProgressCallback>);

    // Ctrl-C finishes the current batch, then stops without writing output.
    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("Interrupted; stopping after the current batch…");
                cancel.store(true, Ordering::SeqCst);
            }
        });
    }

    let config = build_config(&cli, progress_cb, cancel)?;
    let output_path = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&cli.input));

    // ── Run ──────────────────────────────────────────────────────────────
    let stats = match remove_blank_pages(&cli.input, &output_path, &config).await {
        Ok(stats) => stats,
        Err(e) => {
            if let Some(cb) = &progress {
                cb.abandon();
            }
            return Err(e).context("Blank-page removal failed");
        }
    };

    if cli.json {
        let json = serde_json::to_string_pretty(&stats).context("Failed to serialise stats")?;
        println!("{json}");
    } else if !cli.quiet {
        eprintln!(
            "{}  {}/{} pages kept  {}ms  →  {}",
            green("✔"),
            stats.retained_pages,
            stats.total_pages,
            stats.total_duration_ms,
            bold(&output_path.display().to_string()),
        );
        if stats.blank_pages > 0 {
            eprintln!(
                "   {}",
                dim(&format!("{} blank pages removed", stats.blank_pages))
            );
        }
    }

    Ok(())
}

/// Map CLI args to `FilterConfig`.
fn build_config(
    cli: &Cli,
    progress: Option<ProgressCallback>,
    cancel: Arc<AtomicBool>,
) -> Result<FilterConfig> {
    let strategy = match cli.strategy {
        StrategyArg::Geometric => BlankStrategy::Geometric(GeometricOptions {
            ink_threshold: cli.ink_threshold,
            margin_fraction: cli.margin,
            min_ink_pixels: cli.min_ink,
            despeckle: !cli.no_despeckle,
        }),
        StrategyArg::Text => BlankStrategy::TextContent(TextContentOptions {
            model_dir: cli.ocr_models.clone(),
            binarize_threshold: cli.binarize_threshold,
        }),
    };

    let mut builder = FilterConfig::builder()
        .batch_size(cli.batch_size)
        .dpi(cli.dpi)
        .max_rendered_pixels(cli.max_pixels)
        .strategy(strategy)
        .parallel_classification(cli.parallel)
        .cancel_flag(cancel);

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
