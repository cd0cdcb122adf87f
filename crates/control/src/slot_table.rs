//! Range-indexed slot tables.
//!
//! The grid addresses rows and group headers through one contiguous "slot"
//! space. Two tables carry the bookkeeping:
//!
//! - `RowGroupHeadersTable`: which slots are group headers (sparse, sorted).
//! - `CollapsedSlotsTable`: which slots are hidden by collapsed groups,
//!   stored as coalesced inclusive ranges (`RangeSet`).
//!
//! Both answer `count_before(slot)` in O(log n) via binary search over
//! sorted starts plus cached prefix sums; that count is the kernel of the
//! slot ↔ row-index conversion.

use gridkit_core::Value;

// ============================================================================
// RangeSet
// ============================================================================

/// Sorted, disjoint, coalesced list of inclusive slot ranges.
///
/// Invariant: for consecutive ranges `a`, `b`: `a.end + 1 < b.start`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeSet {
    ranges: Vec<(usize, usize)>,
    /// prefix[i] = number of member slots in ranges[..i]. Rebuilt on mutation.
    prefix: Vec<usize>,
}

impl RangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn ranges(&self) -> &[(usize, usize)] {
        &self.ranges
    }

    /// Total number of member slots.
    pub fn len(&self) -> usize {
        self.prefix.last().copied().unwrap_or(0)
    }

    fn rebuild_prefix(&mut self) {
        self.prefix.clear();
        self.prefix.push(0);
        let mut total = 0;
        for &(start, end) in &self.ranges {
            total += end - start + 1;
            self.prefix.push(total);
        }
        debug_assert!(self.ranges.windows(2).all(|w| w[0].1 + 1 < w[1].0));
    }

    pub fn insert_range(&mut self, start: usize, end: usize) {
        debug_assert!(start <= end);
        // Find everything that overlaps or touches [start, end] and merge
        let mut new_start = start;
        let mut new_end = end;
        let mut i = 0;
        while i < self.ranges.len() {
            let (s, e) = self.ranges[i];
            if e + 1 < new_start {
                i += 1;
                continue;
            }
            if new_end + 1 < s {
                break;
            }
            new_start = new_start.min(s);
            new_end = new_end.max(e);
            self.ranges.remove(i);
        }
        self.ranges.insert(
            self.ranges.partition_point(|&(s, _)| s < new_start),
            (new_start, new_end),
        );
        self.rebuild_prefix();
    }

    pub fn remove_range(&mut self, start: usize, end: usize) {
        debug_assert!(start <= end);
        let mut result = Vec::with_capacity(self.ranges.len() + 1);
        for &(s, e) in &self.ranges {
            if e < start || s > end {
                result.push((s, e));
                continue;
            }
            if s < start {
                result.push((s, start - 1));
            }
            if e > end {
                result.push((end + 1, e));
            }
        }
        self.ranges = result;
        self.rebuild_prefix();
    }

    pub fn contains(&self, slot: usize) -> bool {
        let idx = self.ranges.partition_point(|&(s, _)| s <= slot);
        idx > 0 && self.ranges[idx - 1].1 >= slot
    }

    /// Number of member slots strictly below `slot`. O(log n).
    pub fn count_before(&self, slot: usize) -> usize {
        let idx = self.ranges.partition_point(|&(s, _)| s < slot);
        // prefix is only seeded once a mutation runs; a fresh set has none
        let mut count = self.prefix.get(idx).copied().unwrap_or(0);
        if idx > 0 {
            let (s, e) = self.ranges[idx - 1];
            // prefix already counted this range fully; subtract the part
            // at or above `slot`
            if e >= slot {
                count -= e - slot + 1;
                debug_assert!(s < slot);
            }
        }
        count
    }

    /// First member slot at or after `slot`, if any.
    pub fn first_at_or_after(&self, slot: usize) -> Option<usize> {
        let idx = self.ranges.partition_point(|&(_, e)| e < slot);
        self.ranges.get(idx).map(|&(s, _)| s.max(slot))
    }

    /// End of the range containing `slot`, if `slot` is a member.
    pub fn range_end_of(&self, slot: usize) -> Option<usize> {
        let idx = self.ranges.partition_point(|&(s, _)| s <= slot);
        if idx > 0 && self.ranges[idx - 1].1 >= slot {
            Some(self.ranges[idx - 1].1)
        } else {
            None
        }
    }

    /// Start of the range containing `slot`, if `slot` is a member.
    pub fn range_start_of(&self, slot: usize) -> Option<usize> {
        let idx = self.ranges.partition_point(|&(s, _)| s <= slot);
        if idx > 0 && self.ranges[idx - 1].1 >= slot {
            Some(self.ranges[idx - 1].0)
        } else {
            None
        }
    }

    /// Renumber for `count` slots inserted at `at`: members at or above `at`
    /// move up. Insertion inside an existing range extends that range (new
    /// slots inside a collapsed group stay collapsed).
    pub fn insert_index_shift(&mut self, at: usize, count: usize) {
        for range in &mut self.ranges {
            if range.0 >= at {
                range.0 += count;
                range.1 += count;
            } else if range.1 >= at {
                range.1 += count;
            }
        }
        self.rebuild_prefix();
    }

    /// Renumber for `count` slots removed starting at `at`: members inside
    /// the removed window disappear, higher members move down.
    pub fn remove_index_shift(&mut self, at: usize, count: usize) {
        let end = at + count - 1;
        self.remove_range(at, end);
        for range in &mut self.ranges {
            if range.0 > end {
                range.0 -= count;
                range.1 -= count;
            }
        }
        // A range split by the removal can become adjacent after the shift
        let mut merged: Vec<(usize, usize)> = Vec::with_capacity(self.ranges.len());
        for &(s, e) in &self.ranges {
            if let Some(last) = merged.last_mut() {
                if s <= last.1 + 1 {
                    last.1 = last.1.max(e);
                    continue;
                }
            }
            merged.push((s, e));
        }
        self.ranges = merged;
        self.rebuild_prefix();
    }

    pub fn clear(&mut self) {
        self.ranges.clear();
        self.rebuild_prefix();
    }

    pub fn iter_slots(&self) -> impl Iterator<Item = usize> + '_ {
        self.ranges.iter().flat_map(|&(s, e)| s..=e)
    }
}

// ============================================================================
// Group headers
// ============================================================================

/// Metadata carried by a group-header slot.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupInfo {
    /// The group key value shown in the header.
    pub key: Value,
    /// Number of data rows in the group.
    pub row_count: usize,
}

/// Sparse sorted map slot -> group header metadata.
#[derive(Debug, Clone, Default)]
pub struct RowGroupHeadersTable {
    entries: Vec<(usize, GroupInfo)>,
}

impl RowGroupHeadersTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn insert(&mut self, slot: usize, info: GroupInfo) {
        let idx = self.entries.partition_point(|(s, _)| *s < slot);
        if self.entries.get(idx).map(|(s, _)| *s) == Some(slot) {
            self.entries[idx].1 = info;
        } else {
            self.entries.insert(idx, (slot, info));
        }
    }

    pub fn remove(&mut self, slot: usize) -> Option<GroupInfo> {
        let idx = self.entries.partition_point(|(s, _)| *s < slot);
        if self.entries.get(idx).map(|(s, _)| *s) == Some(slot) {
            Some(self.entries.remove(idx).1)
        } else {
            None
        }
    }

    pub fn get(&self, slot: usize) -> Option<&GroupInfo> {
        let idx = self.entries.partition_point(|(s, _)| *s < slot);
        match self.entries.get(idx) {
            Some((s, info)) if *s == slot => Some(info),
            _ => None,
        }
    }

    pub fn is_header(&self, slot: usize) -> bool {
        self.get(slot).is_some()
    }

    /// Number of header slots strictly below `slot`. O(log n).
    pub fn count_before(&self, slot: usize) -> usize {
        self.entries.partition_point(|(s, _)| *s < slot)
    }

    /// Number of header slots at or below `slot`.
    pub fn count_at_or_before(&self, slot: usize) -> usize {
        self.entries.partition_point(|(s, _)| *s <= slot)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &GroupInfo)> {
        self.entries.iter().map(|(s, info)| (*s, info))
    }

    pub fn insert_index_shift(&mut self, at: usize, count: usize) {
        for (slot, _) in &mut self.entries {
            if *slot >= at {
                *slot += count;
            }
        }
    }

    pub fn remove_index_shift(&mut self, at: usize, count: usize) {
        let end = at + count - 1;
        self.entries.retain(|(slot, _)| *slot < at || *slot > end);
        for (slot, _) in &mut self.entries {
            if *slot > end {
                *slot -= count;
            }
        }
    }
}

/// Slots hidden because an ancestor group is collapsed.
pub type CollapsedSlotsTable = RangeSet;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_coalesces_adjacent_and_overlapping() {
        let mut set = RangeSet::new();
        set.insert_range(5, 7);
        set.insert_range(10, 12);
        assert_eq!(set.ranges(), &[(5, 7), (10, 12)]);

        // Adjacent on the left, overlapping on the right: all merge
        set.insert_range(8, 10);
        assert_eq!(set.ranges(), &[(5, 12)]);
        assert_eq!(set.len(), 8);
    }

    #[test]
    fn test_remove_splits_range() {
        let mut set = RangeSet::new();
        set.insert_range(0, 9);
        set.remove_range(3, 5);
        assert_eq!(set.ranges(), &[(0, 2), (6, 9)]);
        assert!(!set.contains(4));
        assert!(set.contains(6));
    }

    #[test]
    fn test_count_before() {
        let mut set = RangeSet::new();
        set.insert_range(2, 4);
        set.insert_range(8, 8);

        assert_eq!(set.count_before(0), 0);
        assert_eq!(set.count_before(2), 0);
        assert_eq!(set.count_before(3), 1);
        assert_eq!(set.count_before(5), 3);
        assert_eq!(set.count_before(8), 3);
        assert_eq!(set.count_before(9), 4);
        assert_eq!(set.count_before(100), 4);
    }

    #[test]
    fn test_count_before_on_fresh_set() {
        let set = RangeSet::new();
        assert_eq!(set.count_before(0), 0);
        assert_eq!(set.count_before(3), 0);
        assert_eq!(RangeSet::default().count_before(7), 0);
    }

    #[test]
    fn test_first_at_or_after_and_range_end() {
        let mut set = RangeSet::new();
        set.insert_range(3, 6);
        assert_eq!(set.first_at_or_after(0), Some(3));
        assert_eq!(set.first_at_or_after(4), Some(4));
        assert_eq!(set.first_at_or_after(7), None);
        assert_eq!(set.range_end_of(4), Some(6));
        assert_eq!(set.range_end_of(7), None);
        assert_eq!(set.range_start_of(4), Some(3));
    }

    #[test]
    fn test_insert_index_shift() {
        let mut set = RangeSet::new();
        set.insert_range(2, 4);
        set.insert_range(8, 9);

        // Insert 2 slots at 3: range (2,4) straddles and extends
        set.insert_index_shift(3, 2);
        assert_eq!(set.ranges(), &[(2, 6), (10, 11)]);
    }

    #[test]
    fn test_remove_index_shift() {
        let mut set = RangeSet::new();
        set.insert_range(2, 4);
        set.insert_range(8, 9);

        // Remove slots 3..=4: members vanish, higher members shift down
        set.remove_index_shift(3, 2);
        assert_eq!(set.ranges(), &[(2, 2), (6, 7)]);
    }

    #[test]
    fn test_remove_index_shift_rejoins_split_range() {
        let mut set = RangeSet::new();
        set.insert_range(2, 8);
        // Removing slots 4..=5 from inside the range leaves one range
        set.remove_index_shift(4, 2);
        assert_eq!(set.ranges(), &[(2, 6)]);
    }

    #[test]
    fn test_headers_table_sorted_lookup() {
        let mut table = RowGroupHeadersTable::new();
        table.insert(5, GroupInfo { key: Value::Text("B".into()), row_count: 2 });
        table.insert(0, GroupInfo { key: Value::Text("A".into()), row_count: 4 });

        assert!(table.is_header(0));
        assert!(table.is_header(5));
        assert!(!table.is_header(3));
        assert_eq!(table.get(5).map(|g| g.row_count), Some(2));
    }

    #[test]
    fn test_headers_count_before() {
        let mut table = RowGroupHeadersTable::new();
        table.insert(0, GroupInfo { key: Value::Empty, row_count: 1 });
        table.insert(4, GroupInfo { key: Value::Empty, row_count: 1 });

        assert_eq!(table.count_before(0), 0);
        assert_eq!(table.count_before(1), 1);
        assert_eq!(table.count_before(4), 1);
        assert_eq!(table.count_before(5), 2);
        assert_eq!(table.count_at_or_before(4), 2);
    }

    #[test]
    fn test_headers_shift() {
        let mut table = RowGroupHeadersTable::new();
        table.insert(0, GroupInfo { key: Value::Empty, row_count: 1 });
        table.insert(4, GroupInfo { key: Value::Empty, row_count: 1 });

        table.insert_index_shift(2, 3);
        let slots: Vec<usize> = table.iter().map(|(s, _)| s).collect();
        assert_eq!(slots, vec![0, 7]);

        table.remove_index_shift(6, 2);
        let slots: Vec<usize> = table.iter().map(|(s, _)| s).collect();
        assert_eq!(slots, vec![0]);
    }

    #[test]
    fn test_insert_replaces_same_slot() {
        let mut table = RowGroupHeadersTable::new();
        table.insert(3, GroupInfo { key: Value::Number(1.0), row_count: 1 });
        table.insert(3, GroupInfo { key: Value::Number(2.0), row_count: 5 });
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(3).map(|g| g.row_count), Some(5));
    }
}
