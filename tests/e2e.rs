//! End-to-end tests for pdf-deblank.
//!
//! These tests render real PDFs through pdfium, so they need the pdfium
//! shared library. They are gated behind the `E2E_ENABLED` environment
//! variable so they do not run in CI unless explicitly requested.
//!
//! Run with:
//!   E2E_ENABLED=1 PDFIUM_LIB_PATH=/path/to/libpdfium.so cargo test --test e2e -- --nocapture
//!
//! Test PDFs are generated on the fly with lopdf into a temp directory.

use lopdf::{dictionary, Document, Object, Stream};
use pdf_deblank::{
    default_output_path, filter_bytes, filter_pdf, inspect, remove_blank_pages,
    remove_blank_pages_sync, BlankStrategy, DeblankError, FilterConfig, FilterProgressCallback,
    GeometricOptions,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Skip this test if E2E_ENABLED is not set; otherwise route library logs
/// to the test output (`RUST_LOG=pdf_deblank=debug` for per-page detail).
macro_rules! e2e_skip_unless_ready {
    () => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP: set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }};
}

/// Page content, one entry per page.
enum Content {
    Text(&'static str),
    Empty,
    /// A filled rectangle in the given gray level (0 = black, 1 = white).
    Rect(f32),
}

fn build_pdf(pages: &[Content]) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let font = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let mut kids = Vec::new();
    for content in pages {
        let ops = match content {
            Content::Text(s) => format!("BT /F1 36 Tf 72 600 Td ({s}) Tj ET"),
            Content::Empty => String::new(),
            Content::Rect(gray) => format!("{gray} g 150 300 300 200 re f"),
        };
        let stream = doc.add_object(Stream::new(dictionary! {}, ops.into_bytes()));
        let page = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => dictionary! { "Font" => dictionary! { "F1" => font } },
            "Contents" => stream,
        });
        kids.push(Object::Reference(page));
    }
    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
    doc.trailer.set("Root", catalog);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).expect("serialise test PDF");
    buf
}

fn write_pdf(dir: &Path, name: &str, pages: &[Content]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, build_pdf(pages)).expect("write test PDF");
    path
}

fn page_count(path: &Path) -> usize {
    Document::load(path).expect("reload output").get_pages().len()
}

/// Low DPI keeps the tests fast; the pages are simple.
fn fast_config() -> FilterConfig {
    FilterConfig::builder().dpi(72).batch_size(2).build().unwrap()
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_removes_empty_pages() {
    e2e_skip_unless_ready!();
    let dir = tempfile::tempdir().unwrap();
    let input = write_pdf(
        dir.path(),
        "scan.pdf",
        &[
            Content::Text("Chapter one"),
            Content::Empty,
            Content::Text("Chapter two"),
            Content::Empty,
            Content::Empty,
            Content::Rect(0.0),
        ],
    );
    let output = default_output_path(&input);

    let stats = remove_blank_pages(&input, &output, &fast_config())
        .await
        .expect("filtering should succeed");

    println!("{}", serde_json::to_string_pretty(&stats).unwrap());
    assert_eq!(stats.total_pages, 6);
    assert_eq!(stats.retained_pages, 3);
    assert_eq!(stats.blank_pages, 3);
    assert_eq!(stats.batches, 3);
    assert_eq!(output.file_name().unwrap(), "cleaned_scan.pdf");
    assert_eq!(page_count(&output), 3);
}

#[tokio::test]
async fn test_light_marks_are_blank_dark_marks_are_not() {
    e2e_skip_unless_ready!();
    let bytes = build_pdf(&[Content::Rect(0.95), Content::Rect(0.3)]);

    let out = filter_bytes(&bytes, &fast_config()).await.unwrap();
    assert_eq!(out.blank_pages, vec![0]);
    assert_eq!(out.retained_pages, vec![1]);

    // Raising the threshold makes the faint rectangle count as ink.
    let config = FilterConfig::builder()
        .dpi(72)
        .strategy(BlankStrategy::Geometric(GeometricOptions {
            ink_threshold: 250,
            ..Default::default()
        }))
        .build()
        .unwrap();
    let out = filter_bytes(&bytes, &config).await.unwrap();
    assert!(out.blank_pages.is_empty());
}

#[tokio::test]
async fn test_all_blank_document_writes_empty_pdf() {
    e2e_skip_unless_ready!();
    let dir = tempfile::tempdir().unwrap();
    let input = write_pdf(dir.path(), "blank.pdf", &[Content::Empty, Content::Empty]);
    let output = dir.path().join("out").join("blank-clean.pdf");

    let stats = remove_blank_pages(&input, &output, &fast_config())
        .await
        .unwrap();
    assert_eq!(stats.retained_pages, 0);
    assert_eq!(page_count(&output), 0);
}

#[tokio::test]
async fn test_filter_pdf_output_reloads() {
    e2e_skip_unless_ready!();
    let dir = tempfile::tempdir().unwrap();
    let input = write_pdf(
        dir.path(),
        "mixed.pdf",
        &[Content::Empty, Content::Text("Only page with words")],
    );

    let out = filter_pdf(&input, &fast_config()).await.unwrap();
    let reloaded = Document::load_mem(&out.pdf_bytes).unwrap();
    assert_eq!(reloaded.get_pages().len(), 1);
    assert_eq!(out.retained_pages, vec![1]);
}

#[tokio::test]
async fn test_progress_callback_sees_every_page() {
    e2e_skip_unless_ready!();

    struct Counter(AtomicUsize);
    impl FilterProgressCallback for Counter {
        fn on_page_classified(&self, _page_index: usize, _is_blank: bool) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    let counter = Arc::new(Counter(AtomicUsize::new(0)));
    let config = FilterConfig::builder()
        .dpi(72)
        .batch_size(3)
        .parallel_classification(true)
        .progress_callback(counter.clone())
        .build()
        .unwrap();

    let bytes = build_pdf(&[
        Content::Text("a"),
        Content::Empty,
        Content::Text("b"),
        Content::Empty,
        Content::Text("c"),
    ]);
    let out = filter_bytes(&bytes, &config).await.unwrap();
    assert_eq!(counter.0.load(Ordering::SeqCst), 5);
    assert_eq!(out.retained_pages, vec![0, 2, 4]);
}

#[tokio::test]
async fn test_inspect_reads_page_count() {
    e2e_skip_unless_ready!();
    let dir = tempfile::tempdir().unwrap();
    let input = write_pdf(dir.path(), "three.pdf", &[Content::Empty, Content::Empty, Content::Empty]);

    let meta = inspect(&input).await.unwrap();
    assert_eq!(meta.page_count, 3);
    assert_eq!(meta.pdf_version, "1.7");
    assert!(!meta.is_encrypted);
}

#[tokio::test]
async fn test_not_a_pdf_is_rejected() {
    e2e_skip_unless_ready!();
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("photo.pdf");
    std::fs::write(&input, b"\xFF\xD8\xFF\xE0 not really a pdf").unwrap();

    let err = filter_pdf(&input, &fast_config()).await.unwrap_err();
    assert!(matches!(err, DeblankError::NotAPdf { .. }));
}

#[test]
fn test_sync_wrapper() {
    e2e_skip_unless_ready!();
    let dir = tempfile::tempdir().unwrap();
    let input = write_pdf(
        dir.path(),
        "sync.pdf",
        &[Content::Text("kept"), Content::Empty],
    );
    let output = dir.path().join("sync-clean.pdf");

    let stats = remove_blank_pages_sync(&input, &output, &fast_config()).unwrap();
    assert_eq!(stats.retained_pages, 1);
    assert_eq!(page_count(&output), 1);
}
