//! The output space — a compact, range-compressed value domain.
//!
//! A space is a sequence of fragments, each an arithmetic progression of
//! output values. It is not a set: the same value may appear in several
//! fragments, and repetition is meaningful — a value that appears twice is
//! twice as likely to be drawn, so duplication doubles as weighting.

use crate::error::CoreError;
use crate::{Output, INVALID_OUTPUT};

/// Fragments reserved beyond the requested capacity at construction.
pub const SPARE_CAPACITY: usize = 5;

/// One arithmetic progression of outputs: `start, start+step, ..., end`.
///
/// A single value is the degenerate progression `start == end, step == 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fragment {
    pub start: Output,
    pub end: Output,
    pub step: Output,
}

impl Fragment {
    /// Number of values in this fragment.
    fn len(&self) -> u64 {
        ((self.end - self.start) / self.step + 1) as u64
    }

    /// Value at a position within this fragment. Callers guarantee
    /// `index < self.len()`.
    fn value_at(&self, index: u64) -> Output {
        self.start + self.step * index as Output
    }
}

/// A weighted, range-compressed output domain.
///
/// Lookup is a linear scan over fragments: the representation trades
/// O(fragments) indexing for O(fragments) memory instead of O(values),
/// which wins whenever ranges are wide relative to their count.
///
/// # Example
///
/// ```
/// use axon_core::{OutputSpace, INVALID_OUTPUT};
///
/// let mut space = OutputSpace::new();
/// space.add(7);
/// space.add_range(1, 9, 2).unwrap(); // 1, 3, 5, 7, 9
///
/// assert_eq!(space.size(), 6);
/// assert_eq!(space.get(0), 7);
/// assert_eq!(space.get(3), 5);
/// assert_eq!(space.get(99), INVALID_OUTPUT);
/// ```
#[derive(Debug, Clone)]
pub struct OutputSpace {
    fragments: Vec<Fragment>,
    /// Cached total value count across fragments.
    len: u64,
}

impl Default for OutputSpace {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputSpace {
    /// Creates an empty space with the spare fragment margin reserved.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty space sized for `fragments` fragments plus the
    /// spare margin.
    pub fn with_capacity(fragments: usize) -> Self {
        Self {
            fragments: Vec::with_capacity(fragments + SPARE_CAPACITY),
            len: 0,
        }
    }

    /// Appends a single output value.
    ///
    /// # Example
    ///
    /// ```
    /// use axon_core::OutputSpace;
    ///
    /// let mut space = OutputSpace::new();
    /// space.add(3);
    /// space.add(3); // weight: 3 now appears twice
    /// assert_eq!(space.size(), 2);
    /// ```
    pub fn add(&mut self, output: Output) {
        self.fragments.push(Fragment {
            start: output,
            end: output,
            step: 1,
        });
        self.len += 1;
    }

    /// Appends a range of outputs `start, start+step, ..., end`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidRange`] if `step` is zero or points away
    /// from `end`; the space is left untouched.
    ///
    /// # Example
    ///
    /// ```
    /// use axon_core::OutputSpace;
    ///
    /// let mut space = OutputSpace::new();
    /// space.add_range(10, 2, -2).unwrap(); // 10, 8, 6, 4, 2
    /// assert_eq!(space.size(), 5);
    /// assert!(space.add_range(0, 5, -1).is_err());
    /// assert_eq!(space.size(), 5);
    /// ```
    pub fn add_range(&mut self, start: Output, end: Output, step: Output) -> Result<(), CoreError> {
        if step == 0 || (end - start) / step < 0 {
            return Err(CoreError::InvalidRange { start, end, step });
        }
        let frag = Fragment { start, end, step };
        self.len += frag.len();
        self.fragments.push(frag);
        Ok(())
    }

    /// Total number of outputs, duplicates counted.
    pub fn size(&self) -> u64 {
        self.len
    }

    /// Returns `true` if the space holds no outputs.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Current fragment capacity.
    pub fn capacity(&self) -> usize {
        self.fragments.capacity()
    }

    /// Output at logical position `index`, or [`INVALID_OUTPUT`] when out
    /// of bounds.
    pub fn get(&self, index: u64) -> Output {
        let mut seen = 0u64;
        for frag in &self.fragments {
            let here = frag.len();
            if seen + here > index {
                return frag.value_at(index - seen);
            }
            seen += here;
        }
        INVALID_OUTPUT
    }

    /// First output in the space, or the sentinel when empty.
    pub fn first(&self) -> Output {
        self.get(0)
    }

    /// Last output in the space, or the sentinel when empty.
    pub fn last(&self) -> Output {
        if self.len == 0 {
            return INVALID_OUTPUT;
        }
        self.get(self.len - 1)
    }

    /// Removes all fragments, keeping the allocation.
    pub fn clear(&mut self) {
        self.fragments.clear();
        self.len = 0;
    }

    /// Iterates every output in order, duplicates included.
    ///
    /// # Example
    ///
    /// ```
    /// use axon_core::OutputSpace;
    ///
    /// let mut space = OutputSpace::new();
    /// space.add_range(1, 5, 2).unwrap();
    /// let values: Vec<_> = space.iter().collect();
    /// assert_eq!(values, vec![1, 3, 5]);
    /// ```
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            space: self,
            fragment: 0,
            offset: 0,
        }
    }
}

/// Iterator over the outputs of an [`OutputSpace`].
pub struct Iter<'a> {
    space: &'a OutputSpace,
    fragment: usize,
    offset: u64,
}

impl Iterator for Iter<'_> {
    type Item = Output;

    fn next(&mut self) -> Option<Output> {
        let frag = self.space.fragments.get(self.fragment)?;
        let value = frag.value_at(self.offset);
        self.offset += 1;
        if self.offset >= frag.len() {
            self.fragment += 1;
            self.offset = 0;
        }
        Some(value)
    }
}

impl<'a> IntoIterator for &'a OutputSpace {
    type Item = Output;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_space_is_empty() {
        let space = OutputSpace::new();
        assert!(space.is_empty());
        assert_eq!(space.size(), 0);
        assert_eq!(space.first(), INVALID_OUTPUT);
        assert_eq!(space.last(), INVALID_OUTPUT);
    }

    #[test]
    fn spare_margin_reserved() {
        let space = OutputSpace::new();
        assert!(space.capacity() >= SPARE_CAPACITY);
    }

    #[test]
    fn range_size_is_exact_progression_count() {
        let mut space = OutputSpace::new();
        space.add_range(1, 9, 2).unwrap();
        assert_eq!(space.size(), 5);

        space.add_range(0, 0, 1).unwrap();
        assert_eq!(space.size(), 6);

        space.add_range(10, 1, -3).unwrap(); // 10, 7, 4, 1
        assert_eq!(space.size(), 10);
    }

    #[test]
    fn last_matches_final_index() {
        let mut space = OutputSpace::new();
        space.add(42);
        space.add_range(1, 9, 2).unwrap();
        assert_eq!(space.get(space.size() - 1), space.last());
        assert_eq!(space.last(), 9);
    }

    #[test]
    fn out_of_bounds_returns_sentinel() {
        let mut space = OutputSpace::new();
        space.add_range(1, 5, 1).unwrap();
        for index in space.size()..space.size() + 10 {
            assert_eq!(space.get(index), INVALID_OUTPUT);
        }
    }

    #[test]
    fn indexing_spans_fragments() {
        let mut space = OutputSpace::new();
        space.add(100);
        space.add_range(1, 3, 1).unwrap();
        space.add(200);

        assert_eq!(space.get(0), 100);
        assert_eq!(space.get(1), 1);
        assert_eq!(space.get(3), 3);
        assert_eq!(space.get(4), 200);
    }

    #[test]
    fn duplicates_are_counted() {
        let mut space = OutputSpace::new();
        space.add(7);
        space.add(7);
        space.add_range(7, 7, 1).unwrap();
        assert_eq!(space.size(), 3);
        assert!(space.iter().all(|v| v == 7));
    }

    #[test]
    fn invalid_range_leaves_space_untouched() {
        let mut space = OutputSpace::new();
        space.add(1);

        assert_eq!(
            space.add_range(0, 5, -1),
            Err(CoreError::InvalidRange {
                start: 0,
                end: 5,
                step: -1
            })
        );
        assert!(space.add_range(0, 5, 0).is_err());
        assert_eq!(space.size(), 1);
    }

    #[test]
    fn clear_resets_size() {
        let mut space = OutputSpace::new();
        space.add_range(1, 100, 1).unwrap();
        space.clear();
        assert!(space.is_empty());
        assert_eq!(space.get(0), INVALID_OUTPUT);
    }

    #[test]
    fn iter_yields_all_values_in_order() {
        let mut space = OutputSpace::new();
        space.add(9);
        space.add_range(2, 6, 2).unwrap();
        let values: Vec<_> = space.iter().collect();
        assert_eq!(values, vec![9, 2, 4, 6]);
        assert_eq!(values.len() as u64, space.size());
    }

    #[test]
    fn clone_is_a_deep_copy() {
        let mut space = OutputSpace::new();
        space.add_range(1, 3, 1).unwrap();

        let mut copy = space.clone();
        copy.add(99);

        assert_eq!(space.size(), 3);
        assert_eq!(copy.size(), 4);
    }

    #[test]
    fn negative_values_supported() {
        let mut space = OutputSpace::new();
        space.add_range(-5, 5, 5).unwrap(); // -5, 0, 5
        assert_eq!(space.size(), 3);
        assert_eq!(space.get(0), -5);
        assert_eq!(space.get(2), 5);
    }
}
