//! Sort/filter view layer.
//!
//! Maps between view space (what the user sees) and data space (canonical
//! source order). Invariants:
//! - the grid's slot space is built from view space
//! - `visible_mask` is indexed by DATA row, so sorting never touches it
//! - conversions are O(1) via cached inverse maps

use gridkit_core::{FilterDescriptor, SearchDescriptor, SortDescriptor, SortDirection, Value};

use crate::collection::RowsSource;
use crate::columns::ColumnCollection;

#[derive(Debug, Clone, Default)]
pub struct RowView {
    /// view position -> data row. Identity until sorted.
    row_order: Vec<usize>,
    /// data row -> view position. Rebuilt when `row_order` changes.
    data_to_view_map: Vec<usize>,
    /// Indexed by data row; false = hidden by filter.
    visible_mask: Vec<bool>,
    /// Data rows that survive the filter, in view order. The grid builds
    /// its slot space from this list.
    visible_in_order: Vec<usize>,
}

impl RowView {
    pub fn new(row_count: usize) -> Self {
        Self {
            row_order: (0..row_count).collect(),
            data_to_view_map: (0..row_count).collect(),
            visible_mask: vec![true; row_count],
            visible_in_order: (0..row_count).collect(),
        }
    }

    pub fn row_count(&self) -> usize {
        self.row_order.len()
    }

    pub fn visible_count(&self) -> usize {
        self.visible_in_order.len()
    }

    /// Data rows surviving the filter, in view order.
    pub fn visible_rows(&self) -> &[usize] {
        &self.visible_in_order
    }

    pub fn view_to_data(&self, view_row: usize) -> Option<usize> {
        self.row_order.get(view_row).copied()
    }

    pub fn data_to_view(&self, data_row: usize) -> Option<usize> {
        self.data_to_view_map.get(data_row).copied()
    }

    pub fn is_data_row_visible(&self, data_row: usize) -> bool {
        self.visible_mask.get(data_row).copied().unwrap_or(false)
    }

    pub fn is_sorted(&self) -> bool {
        self.row_order.iter().enumerate().any(|(i, &d)| i != d)
    }

    pub fn is_filtered(&self) -> bool {
        self.visible_count() < self.row_count()
    }

    fn rebuild_inverse_map(&mut self) {
        self.data_to_view_map.resize(self.row_order.len(), 0);
        for (view_row, &data_row) in self.row_order.iter().enumerate() {
            if data_row < self.data_to_view_map.len() {
                self.data_to_view_map[data_row] = view_row;
            }
        }
    }

    fn rebuild_visible_cache(&mut self) {
        self.visible_in_order = self
            .row_order
            .iter()
            .copied()
            .filter(|&data_row| self.visible_mask.get(data_row).copied().unwrap_or(false))
            .collect();
    }

    /// Apply a sort permutation (new view position -> data row).
    /// Must be produced by a stable sort.
    pub fn apply_sort(&mut self, permutation: Vec<usize>) {
        debug_assert_eq!(permutation.len(), self.row_order.len());
        self.row_order = permutation;
        self.rebuild_inverse_map();
        self.rebuild_visible_cache();
    }

    pub fn clear_sort(&mut self) {
        self.row_order = (0..self.row_order.len()).collect();
        self.rebuild_inverse_map();
        self.rebuild_visible_cache();
    }

    /// Apply filter visibility (mask indexed by data row).
    pub fn apply_filter(&mut self, visible_mask: Vec<bool>) {
        debug_assert_eq!(visible_mask.len(), self.row_order.len());
        self.visible_mask = visible_mask;
        self.rebuild_visible_cache();
    }

    pub fn clear_filter(&mut self) {
        self.visible_mask = vec![true; self.row_order.len()];
        self.rebuild_visible_cache();
    }

    /// Register an insertion at `data_row`. Unsorted views keep canonical
    /// position; sorted views append (the next re-sort integrates it).
    pub fn insert_row(&mut self, data_row: usize) {
        let sort_active = self.is_sorted();

        for data_ref in self.row_order.iter_mut() {
            if *data_ref >= data_row {
                *data_ref += 1;
            }
        }

        if sort_active {
            self.row_order.push(data_row);
        } else {
            let at = data_row.min(self.row_order.len());
            self.row_order.insert(at, data_row);
        }

        self.visible_mask.insert(data_row.min(self.visible_mask.len()), true);
        self.rebuild_inverse_map();
        self.rebuild_visible_cache();
    }

    /// Register a removal at `data_row`.
    pub fn remove_row(&mut self, data_row: usize) {
        if data_row >= self.row_order.len() {
            return;
        }
        let view_row = self.data_to_view_map[data_row];
        self.row_order.remove(view_row);
        self.visible_mask.remove(data_row);

        for data_ref in self.row_order.iter_mut() {
            if *data_ref > data_row {
                *data_ref -= 1;
            }
        }
        self.rebuild_inverse_map();
        self.rebuild_visible_cache();
    }

    /// Rebuild identity for a new row count (collection Reset).
    pub fn reset(&mut self, row_count: usize) {
        *self = Self::new(row_count);
    }
}

// ============================================================================
// Descriptor compilation
// ============================================================================

/// Compile sort descriptors into a stable multi-key permutation
/// (view position -> data row). Descriptors that name unknown or
/// non-sortable columns are skipped.
pub fn sort_permutation<T>(
    source: &dyn RowsSource<T>,
    columns: &ColumnCollection<T>,
    sorts: &[SortDescriptor],
) -> Vec<usize> {
    let keys: Vec<(usize, SortDirection)> = sorts
        .iter()
        .filter_map(|s| {
            let idx = columns.index_of(s.column)?;
            columns.get(idx).filter(|c| c.can_sort)?;
            Some((idx, s.direction))
        })
        .collect();

    let mut order: Vec<usize> = (0..source.len()).collect();
    if keys.is_empty() {
        return order;
    }

    // Cache key values per row so each accessor runs once per row per key
    let key_values: Vec<Vec<Value>> = order
        .iter()
        .map(|&row| {
            let item = source.get(row);
            keys.iter()
                .map(|&(col_idx, _)| match (item, columns.get(col_idx)) {
                    (Some(item), Some(col)) => col.get_value(item),
                    _ => Value::Empty,
                })
                .collect()
        })
        .collect();

    order.sort_by(|&a, &b| {
        for (i, &(_, direction)) in keys.iter().enumerate() {
            let ord = key_values[a][i].cmp(&key_values[b][i]);
            let ord = match direction {
                SortDirection::Ascending => ord,
                SortDirection::Descending => ord.reverse(),
            };
            if ord != std::cmp::Ordering::Equal {
                return ord;
            }
        }
        std::cmp::Ordering::Equal
    });
    order
}

/// Compile filter descriptors into a visibility mask (indexed by data
/// row). Multiple descriptors AND together.
pub fn filter_mask<T>(
    source: &dyn RowsSource<T>,
    columns: &ColumnCollection<T>,
    filters: &[FilterDescriptor],
) -> Vec<bool> {
    let active: Vec<(usize, &FilterDescriptor)> = filters
        .iter()
        .filter_map(|f| {
            let idx = columns.index_of(f.column)?;
            columns.get(idx).filter(|c| c.can_filter)?;
            Some((idx, f))
        })
        .collect();

    (0..source.len())
        .map(|row| {
            let Some(item) = source.get(row) else {
                return false;
            };
            active.iter().all(|&(col_idx, filter)| {
                columns
                    .get(col_idx)
                    .map(|col| filter.matches(&col.get_value(item)))
                    .unwrap_or(true)
            })
        })
        .collect()
}

/// Evaluate a search over the visible rows. Returns (data_row, column
/// index) hits in view order, columns left to right.
pub fn search_hits<T>(
    source: &dyn RowsSource<T>,
    columns: &ColumnCollection<T>,
    view: &RowView,
    search: &SearchDescriptor,
) -> Vec<(usize, usize)> {
    let mut hits = Vec::new();
    if search.query.is_empty() {
        return hits;
    }

    for &data_row in view.visible_rows() {
        let Some(item) = source.get(data_row) else {
            continue;
        };
        for (col_idx, column) in columns.iter().enumerate() {
            if !column.can_search || !search.covers_column(column.id, column.is_visible()) {
                continue;
            }
            if search.matches(&column.get_value(item)) {
                hits.push((data_row, col_idx));
            }
        }
    }
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::VecSource;
    use crate::columns::GridColumn;
    use gridkit_core::{FieldAccessor, FilterOp, MatchMode};

    #[derive(Clone)]
    struct Item {
        name: &'static str,
        score: f64,
    }

    fn fixture() -> (VecSource<Item>, ColumnCollection<Item>) {
        let source = VecSource::new(vec![
            Item { name: "cherry", score: 3.0 },
            Item { name: "apple", score: 1.0 },
            Item { name: "banana", score: 2.0 },
            Item { name: "apricot", score: 1.0 },
        ]);
        let mut cols = ColumnCollection::new();
        cols.add(GridColumn::new(
            "Name",
            FieldAccessor::read_only(|i: &Item| Value::Text(i.name.to_string())),
        ));
        cols.add(GridColumn::new(
            "Score",
            FieldAccessor::read_only(|i: &Item| Value::Number(i.score)),
        ));
        (source, cols)
    }

    #[test]
    fn test_sort_single_key() {
        let (source, cols) = fixture();
        let by_name = cols.get(0).map(|c| c.id).unwrap();
        let perm = sort_permutation(&source, &cols, &[SortDescriptor::ascending(by_name)]);
        assert_eq!(perm, vec![1, 3, 2, 0]); // apple, apricot, banana, cherry
    }

    #[test]
    fn test_sort_multi_key_is_stable() {
        let (source, cols) = fixture();
        let by_score = cols.get(1).map(|c| c.id).unwrap();
        // apple(1.0) and apricot(1.0) tie on score; source order breaks it
        let perm = sort_permutation(&source, &cols, &[SortDescriptor::ascending(by_score)]);
        assert_eq!(perm, vec![1, 3, 2, 0]);
    }

    #[test]
    fn test_sort_descending() {
        let (source, cols) = fixture();
        let by_score = cols.get(1).map(|c| c.id).unwrap();
        let perm = sort_permutation(&source, &cols, &[SortDescriptor::descending(by_score)]);
        assert_eq!(perm, vec![0, 2, 1, 3]);
    }

    #[test]
    fn test_filter_mask_ands_descriptors() {
        let (source, cols) = fixture();
        let by_name = cols.get(0).map(|c| c.id).unwrap();
        let by_score = cols.get(1).map(|c| c.id).unwrap();
        let mask = filter_mask(
            &source,
            &cols,
            &[
                FilterDescriptor::new(by_name, FilterOp::Contains, Value::Text("a".into())),
                FilterDescriptor::new(by_score, FilterOp::LessThan, Value::Number(2.0)),
            ],
        );
        // "cherry" fails contains-a; banana fails score<2
        assert_eq!(mask, vec![false, true, false, true]);
    }

    #[test]
    fn test_view_sort_then_filter() {
        let (source, cols) = fixture();
        let by_name = cols.get(0).map(|c| c.id).unwrap();
        let mut view = RowView::new(source.len());
        view.apply_sort(sort_permutation(&source, &cols, &[SortDescriptor::ascending(by_name)]));
        view.apply_filter(filter_mask(
            &source,
            &cols,
            &[FilterDescriptor::new(by_name, FilterOp::StartsWith, Value::Text("ap".into()))],
        ));

        // apple then apricot, in sorted order, by data row
        assert_eq!(view.visible_rows(), &[1, 3]);
        assert!(view.is_sorted());
        assert!(view.is_filtered());
    }

    #[test]
    fn test_insert_unsorted_keeps_canonical_position() {
        let mut view = RowView::new(3);
        view.insert_row(1);
        assert_eq!(view.visible_rows(), &[0, 1, 2, 3]);
        assert_eq!(view.view_to_data(1), Some(1));
    }

    #[test]
    fn test_insert_while_sorted_appends() {
        let mut view = RowView::new(3);
        view.apply_sort(vec![2, 0, 1]);
        view.insert_row(0);
        // Existing refs shifted, new data row 0 appended at the end
        assert_eq!(view.visible_rows(), &[3, 1, 2, 0]);
    }

    #[test]
    fn test_remove_row_shifts_references() {
        let mut view = RowView::new(4);
        view.apply_sort(vec![3, 1, 0, 2]);
        view.remove_row(1);
        assert_eq!(view.visible_rows(), &[2, 0, 1]);
        assert_eq!(view.row_count(), 3);
    }

    #[test]
    fn test_search_hits_in_view_order() {
        let (source, cols) = fixture();
        let mut view = RowView::new(source.len());
        let by_name = cols.get(0).map(|c| c.id).unwrap();
        view.apply_sort(sort_permutation(&source, &cols, &[SortDescriptor::ascending(by_name)]));

        let search = SearchDescriptor::new("ap")
            .with_mode(MatchMode::Contains { case_sensitive: false });
        let hits = search_hits(&source, &cols, &view, &search);
        assert_eq!(hits, vec![(1, 0), (3, 0)]);
    }

    #[test]
    fn test_empty_query_no_hits() {
        let (source, cols) = fixture();
        let view = RowView::new(source.len());
        let hits = search_hits(&source, &cols, &view, &SearchDescriptor::new(""));
        assert!(hits.is_empty());
    }
}
