//! Data model shared by the pipeline and its collaborators.
//!
//! Everything here is plain data. The pipeline never looks inside a
//! [`Page`] handle; it only decides whether to forward it.

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// A half-open range of 0-indexed page numbers, `[start, end)`.
///
/// Batches are `PageRange`s produced by [`crate::pipeline::partition::batches`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageRange {
    pub start: usize,
    pub end: usize,
}

impl PageRange {
    /// Create a range. `end` is clamped up to `start` so the range is never inverted.
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, index: usize) -> bool {
        self.start <= index && index < self.end
    }

    /// Iterate the page indices covered by this range.
    pub fn indices(&self) -> Range<usize> {
        self.start..self.end
    }
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// An opaque handle to one original page, tagged with its index.
///
/// `H` is whatever the document source uses to address a page (a lopdf
/// object id for [`crate::pipeline::source::PdfSource`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<H> {
    index: usize,
    handle: H,
}

impl<H> Page<H> {
    pub fn new(index: usize, handle: H) -> Self {
        Self { index, handle }
    }

    /// 0-indexed position in the source document.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn handle(&self) -> &H {
        &self.handle
    }

    pub fn into_handle(self) -> H {
        self.handle
    }
}

/// Pixels of one rendered page. Lives for a single batch only.
#[derive(Debug, Clone)]
pub struct RasterImage {
    page_index: usize,
    image: DynamicImage,
}

impl RasterImage {
    pub fn new(page_index: usize, image: DynamicImage) -> Self {
        Self { page_index, image }
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }

    pub fn into_image(self) -> DynamicImage {
        self.image
    }
}

/// The verdict for one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub page_index: usize,
    pub is_blank: bool,
}

/// Retained pages in original order, as produced by
/// [`crate::pipeline::sink::CollectingSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDocument<H> {
    pages: Vec<Page<H>>,
}

impl<H> OutputDocument<H> {
    pub(crate) fn new(pages: Vec<Page<H>>) -> Self {
        Self { pages }
    }

    pub fn pages(&self) -> &[Page<H>] {
        &self.pages
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Source indices of the retained pages, in output order.
    pub fn indices(&self) -> Vec<usize> {
        self.pages.iter().map(Page::index).collect()
    }

    pub fn into_pages(self) -> Vec<Page<H>> {
        self.pages
    }
}
