//! Batch partitioning: split `[0, total_pages)` into fixed-size ranges.

use crate::error::DeblankError;
use crate::model::PageRange;

/// Lazily partition `[0, total_pages)` into ascending batches of at most
/// `batch_size` pages. The last batch may be shorter.
///
/// `total_pages == 0` yields no batches. `batch_size == 0` is rejected.
pub fn batches(total_pages: usize, batch_size: usize) -> Result<Batches, DeblankError> {
    validate_batch_size(batch_size)?;
    Ok(Batches {
        next_start: 0,
        total_pages,
        batch_size,
    })
}

/// Reject a batch size of zero.
pub fn validate_batch_size(batch_size: usize) -> Result<(), DeblankError> {
    if batch_size == 0 {
        return Err(DeblankError::InvalidConfiguration(
            "batch size must be ≥ 1, got 0".into(),
        ));
    }
    Ok(())
}

/// Number of batches [`batches`] will yield.
pub fn batch_count(total_pages: usize, batch_size: usize) -> usize {
    if batch_size == 0 {
        return 0;
    }
    total_pages.div_ceil(batch_size)
}

/// Iterator returned by [`batches`].
#[derive(Debug, Clone)]
pub struct Batches {
    next_start: usize,
    total_pages: usize,
    batch_size: usize,
}

impl Iterator for Batches {
    type Item = PageRange;

    fn next(&mut self) -> Option<PageRange> {
        if self.next_start >= self.total_pages {
            return None;
        }
        let start = self.next_start;
        let end = start.saturating_add(self.batch_size).min(self.total_pages);
        self.next_start = end;
        Some(PageRange::new(start, end))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = batch_count(
            self.total_pages.saturating_sub(self.next_start),
            self.batch_size,
        );
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Batches {}
