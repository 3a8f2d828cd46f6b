//! Page ranges and unit partitioning.

use serde::{Deserialize, Serialize};

/// A contiguous, 1-based, inclusive span of pages assigned to a sub-job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageRange {
    /// First page of the span (inclusive, 1-based).
    pub start: u32,
    /// Last page of the span (inclusive).
    pub end: u32,
}

impl PageRange {
    /// Creates a new page range.
    ///
    /// # Panics
    ///
    /// Panics if `start` is zero or greater than `end`; ranges are only
    /// constructed by [`partition`] and by tests, where both would be bugs.
    #[must_use]
    pub fn new(start: u32, end: u32) -> Self {
        assert!(start >= 1 && start <= end, "invalid page range {start}..={end}");
        Self { start, end }
    }

    /// Returns the number of pages in the range.
    #[must_use]
    pub const fn len(&self) -> u32 {
        self.end - self.start + 1
    }

    /// Returns false; a page range is never empty by construction.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Returns true if the range contains the given page.
    #[must_use]
    pub const fn contains(&self, page: u32) -> bool {
        page >= self.start && page <= self.end
    }
}

impl std::fmt::Display for PageRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Partitions `total` units into contiguous, non-overlapping ranges that
/// together cover exactly `1..=total`.
///
/// The chunk size is `ceil(total / max_parts)`, so the result never has more
/// than `max_parts` ranges and never contains an empty range. Returns an
/// empty vector when `total` is zero. A `max_parts` of zero is treated as 1.
#[must_use]
pub fn partition(total: u32, max_parts: usize) -> Vec<PageRange> {
    if total == 0 {
        return Vec::new();
    }
    let parts = (max_parts.max(1) as u32).min(total);
    let chunk = total.div_ceil(parts);

    let mut ranges = Vec::with_capacity(parts as usize);
    let mut start = 1u32;
    while start <= total {
        let end = (start + chunk - 1).min(total);
        ranges.push(PageRange::new(start, end));
        start = end + 1;
    }
    ranges
}
