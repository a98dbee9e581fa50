//! Sorted, disjoint half-open ranges of HEALPix indices at [`MAX_ORDER`].

use crate::healpix::{Cell, MAX_ORDER};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeSet {
    ranges: Vec<(u64, u64)>,
}

impl RangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from arbitrary ranges, sorting them and merging overlaps and
    /// adjacent runs.
    pub fn from_ranges(mut ranges: Vec<(u64, u64)>) -> Self {
        ranges.retain(|&(start, end)| start < end);
        ranges.sort_unstable();

        let mut merged: Vec<(u64, u64)> = Vec::with_capacity(ranges.len());
        for (start, end) in ranges {
            match merged.last_mut() {
                Some(last) if start <= last.1 => last.1 = last.1.max(end),
                _ => merged.push((start, end)),
            }
        }
        Self { ranges: merged }
    }

    pub fn from_cells(cells: impl IntoIterator<Item = Cell>) -> Self {
        Self::from_ranges(cells.into_iter().map(|c| c.range_at_max_order()).collect())
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(u64, u64)> {
        self.ranges.iter()
    }

    /// Whether the [`MAX_ORDER`] index `value` falls inside any range.
    pub fn contains(&self, value: u64) -> bool {
        let idx = self.ranges.partition_point(|&(_, end)| end <= value);
        self.ranges
            .get(idx)
            .is_some_and(|&(start, _)| start <= value)
    }

    /// Total number of [`MAX_ORDER`] pixels covered.
    pub fn covered(&self) -> u64 {
        self.ranges.iter().map(|&(s, e)| e - s).sum()
    }

    /// Decompose the ranges into the minimal list of nested cells, ordered
    /// by position on the sphere.
    pub fn to_cells(&self) -> Vec<Cell> {
        let mut cells = Vec::new();
        for &(start, end) in &self.ranges {
            let mut cursor = start;
            while cursor < end {
                let cell = largest_cell_at(cursor, end);
                cursor += 1u64 << (2 * (MAX_ORDER - cell.order) as u32);
                cells.push(cell);
            }
        }
        cells
    }
}

/// Largest cell starting at `start` that does not extend past `end`.
fn largest_cell_at(start: u64, end: u64) -> Cell {
    for order in 0..MAX_ORDER {
        let shift = 2 * (MAX_ORDER - order) as u32;
        let size = 1u64 << shift;
        if start % size == 0 && start + size <= end {
            return Cell {
                order,
                ipix: start >> shift,
            };
        }
    }
    Cell {
        order: MAX_ORDER,
        ipix: start,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_overlapping_and_adjacent() {
        let set = RangeSet::from_ranges(vec![(10, 20), (0, 5), (5, 8), (15, 30), (40, 40)]);
        let ranges: Vec<_> = set.iter().copied().collect();
        assert_eq!(ranges, vec![(0, 8), (10, 30)]);
    }

    #[test]
    fn test_contains_edges() {
        let set = RangeSet::from_ranges(vec![(10, 20), (30, 31)]);
        assert!(!set.contains(9));
        assert!(set.contains(10));
        assert!(set.contains(19));
        assert!(!set.contains(20));
        assert!(set.contains(30));
        assert!(!set.contains(31));
        assert!(!set.contains(u64::MAX));
    }

    #[test]
    fn test_empty_contains_nothing() {
        let set = RangeSet::new();
        assert!(set.is_empty());
        assert!(!set.contains(0));
        assert_eq!(set.covered(), 0);
    }

    #[test]
    fn test_to_cells_collapses_siblings() {
        let children = (0..4).map(|ipix| Cell { order: 3, ipix: 8 + ipix });
        let set = RangeSet::from_cells(children);
        assert_eq!(set.to_cells(), vec![Cell { order: 2, ipix: 2 }]);
    }

    #[test]
    fn test_to_cells_mixed_orders() {
        let cells = vec![
            Cell { order: 0, ipix: 3 },
            Cell { order: 2, ipix: 5 },
            Cell { order: 4, ipix: 100 },
        ];
        let set = RangeSet::from_cells(cells.clone());
        let mut recovered = set.to_cells();
        recovered.sort_by_key(|c| c.range_at_max_order());
        let mut expected = cells;
        expected.sort_by_key(|c| c.range_at_max_order());
        assert_eq!(recovered, expected);
    }

    #[test]
    fn test_covered_counts_max_order_pixels() {
        let set = RangeSet::from_cells([Cell { order: MAX_ORDER - 1, ipix: 0 }]);
        assert_eq!(set.covered(), 4);
    }
}
