//! Slices an ordered working set into bounded, contiguous batches.

/// Cursor over a working set that hands out fixed-size slices.
///
/// Batches are disjoint, keep the working-set order, and together cover the
/// whole working set unless `batch_limit` stops the run early.
///
/// # Examples
///
/// ```
/// use eco_enrich::Batcher;
///
/// let working_set = [1, 2, 3, 4, 5];
/// let mut batcher = Batcher::new(2, None);
/// assert_eq!(batcher.next(&working_set), Some(&working_set[0..2]));
/// assert_eq!(batcher.next(&working_set), Some(&working_set[2..4]));
/// assert_eq!(batcher.next(&working_set), Some(&working_set[4..5]));
/// assert_eq!(batcher.next(&working_set), None);
/// ```
#[derive(Debug, Clone)]
pub struct Batcher {
    batch_size: usize,
    batch_limit: Option<usize>,
    cursor: usize,
    batches_emitted: usize,
}

impl Batcher {
    /// Creates a batcher emitting slices of `batch_size` elements (at least 1),
    /// stopping after `batch_limit` batches when given.
    pub fn new(batch_size: usize, batch_limit: Option<usize>) -> Self {
        Self {
            batch_size: batch_size.max(1),
            batch_limit,
            cursor: 0,
            batches_emitted: 0,
        }
    }

    /// Returns the next batch and advances the cursor past it, or `None` once
    /// the working set is exhausted or the batch limit has been reached.
    pub fn next<'a, T>(&mut self, working_set: &'a [T]) -> Option<&'a [T]> {
        if !self.has_more(working_set.len()) {
            return None;
        }
        let start = self.cursor;
        let end = (start + self.batch_size).min(working_set.len());
        self.cursor = end;
        self.batches_emitted += 1;
        Some(&working_set[start..end])
    }

    /// Whether another call to [`Batcher::next`] would yield a batch.
    pub fn has_more(&self, working_set_len: usize) -> bool {
        let under_limit = self
            .batch_limit
            .map_or(true, |limit| self.batches_emitted < limit);
        under_limit && self.cursor < working_set_len
    }

    /// Returns true when the batch limit, rather than the end of the data, stopped
    /// the batcher.
    pub fn limit_reached(&self, working_set_len: usize) -> bool {
        self.cursor < working_set_len
            && self
                .batch_limit
                .is_some_and(|limit| self.batches_emitted >= limit)
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn batches_emitted(&self) -> usize {
        self.batches_emitted
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }
}
