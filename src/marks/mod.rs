//! Points of interest left behind by template expansion.
//!
//! Marks are char offsets. They behave like editor markers: an insertion
//! exactly at a mark leaves the mark in front of the new text, and a deletion
//! spanning a mark collapses it to the start of the deleted range.

/// A change to buffer text, used to keep tracked positions in step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edit {
    /// `len` chars inserted at `at`.
    Insert { at: usize, len: usize },
    /// Chars between `start` and `end` removed, in either order.
    Delete { start: usize, end: usize },
}

impl Edit {
    /// Where a position ends up after this edit.
    pub const fn adjust(&self, pos: usize) -> usize {
        match *self {
            Self::Insert { at, len } => {
                if pos > at {
                    pos + len
                } else {
                    pos
                }
            }
            Self::Delete { start, end } => {
                let (start, end) = if start <= end {
                    (start, end)
                } else {
                    (end, start)
                };
                if pos <= start {
                    pos
                } else if pos >= end {
                    pos - (end - start)
                } else {
                    start
                }
            }
        }
    }
}

/// Strictly ascending, duplicate-free list of mark positions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkList {
    marks: Vec<usize>,
}

impl MarkList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a mark, keeping order. A position already present is ignored.
    pub fn add(&mut self, pos: usize) {
        if let Err(idx) = self.marks.binary_search(&pos) {
            self.marks.insert(idx, pos);
        }
    }

    /// Smallest mark strictly after `pos`.
    pub fn forward(&self, pos: usize) -> Option<usize> {
        let idx = self.marks.partition_point(|&m| m <= pos);
        self.marks.get(idx).copied()
    }

    /// The mark just before the first mark at or after `pos`.
    pub fn backward(&self, pos: usize) -> Option<usize> {
        let idx = self.marks.partition_point(|&m| m < pos);
        idx.checked_sub(1).map(|i| self.marks[i])
    }

    /// Shift marks for an edit. Marks that collapse onto one position merge.
    pub fn apply(&mut self, edit: &Edit) {
        for mark in &mut self.marks {
            *mark = edit.adjust(*mark);
        }
        self.marks.dedup();
    }

    pub fn clear(&mut self) {
        self.marks.clear();
    }

    pub fn all(&self) -> &[usize] {
        &self.marks
    }

    pub fn len(&self) -> usize {
        self.marks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marks(positions: &[usize]) -> MarkList {
        let mut list = MarkList::new();
        for &p in positions {
            list.add(p);
        }
        list
    }

    #[test]
    fn test_add_keeps_sorted() {
        let list = marks(&[7, 0, 3]);
        assert_eq!(list.all(), &[0, 3, 7]);
    }

    #[test]
    fn test_add_duplicate_is_noop() {
        let mut list = marks(&[2, 5]);
        list.add(5);
        assert_eq!(list.all(), &[2, 5]);
    }

    #[test]
    fn test_forward_is_strict() {
        let list = marks(&[0, 7, 8]);
        assert_eq!(list.forward(0), Some(7));
        assert_eq!(list.forward(7), Some(8));
        assert_eq!(list.forward(8), None);
    }

    #[test]
    fn test_backward_skips_mark_at_point() {
        let list = marks(&[0, 7, 8]);
        assert_eq!(list.backward(7), Some(0));
        assert_eq!(list.backward(8), Some(7));
        assert_eq!(list.backward(20), Some(8));
        assert_eq!(list.backward(0), None);
    }

    #[test]
    fn test_empty_list_navigation() {
        let list = MarkList::new();
        assert_eq!(list.forward(0), None);
        assert_eq!(list.backward(10), None);
    }

    #[test]
    fn test_insert_at_mark_leaves_it_in_front() {
        let mut list = marks(&[3, 5]);
        list.apply(&Edit::Insert { at: 3, len: 4 });
        assert_eq!(list.all(), &[3, 9]);
    }

    #[test]
    fn test_delete_collapses_and_merges() {
        let mut list = marks(&[1, 4, 6, 10]);
        list.apply(&Edit::Delete { start: 2, end: 8 });
        assert_eq!(list.all(), &[1, 2, 4]);
    }

    #[test]
    fn test_reversed_delete_matches_forward_delete() {
        let reversed = Edit::Delete { start: 8, end: 2 };
        assert_eq!(reversed.adjust(1), 1);
        assert_eq!(reversed.adjust(5), 2);
        assert_eq!(reversed.adjust(10), 4);

        let mut list = marks(&[1, 4, 6, 10]);
        list.apply(&reversed);
        assert_eq!(list.all(), &[1, 2, 4]);
    }

    #[test]
    fn test_clear() {
        let mut list = marks(&[1, 2]);
        list.clear();
        assert!(list.is_empty());
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        fn edit_strategy() -> impl Strategy<Value = Edit> {
            prop_oneof![
                (0..200usize, 0..50usize).prop_map(|(at, len)| Edit::Insert { at, len }),
                (0..200usize, 0..50usize).prop_map(|(start, span)| Edit::Delete {
                    start,
                    end: start + span,
                }),
                (0..200usize, 0..50usize).prop_map(|(end, span)| Edit::Delete {
                    start: end + span,
                    end,
                }),
            ]
        }

        proptest! {
            #[test]
            fn stays_strictly_ascending(
                positions in proptest::collection::vec(0..500usize, 0..40),
                edits in proptest::collection::vec(edit_strategy(), 0..10),
            ) {
                let mut list = marks(&positions);
                for edit in &edits {
                    list.apply(edit);
                }
                prop_assert!(list.all().windows(2).all(|w| w[0] < w[1]));
            }

            #[test]
            fn adding_twice_is_idempotent(
                positions in proptest::collection::vec(0..500usize, 0..40),
                extra in 0..500usize,
            ) {
                let mut once = marks(&positions);
                once.add(extra);
                let mut twice = once.clone();
                twice.add(extra);
                prop_assert_eq!(once, twice);
            }

            #[test]
            fn forward_and_backward_bracket_gaps(
                positions in proptest::collection::btree_set(0..500usize, 2..30),
            ) {
                let list = marks(&positions.iter().copied().collect::<Vec<_>>());
                for pair in list.all().windows(2) {
                    let (m1, m2) = (pair[0], pair[1]);
                    for p in (m1 + 1)..m2 {
                        prop_assert_eq!(list.forward(p), Some(m2));
                        prop_assert_eq!(list.backward(p), Some(m1));
                    }
                }
            }
        }
    }
}
