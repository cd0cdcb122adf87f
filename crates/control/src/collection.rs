//! Collection view adapter.
//!
//! The grid consumes any row source through `RowsSource`; the editable-item
//! contract (begin/commit/cancel) is optional: sources that cannot roll
//! back report `cancel_item_edit` as false and callers decide whether to
//! force a non-transactional cancel.

/// A change notification from the backing collection, in data-row space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionChange {
    Add { row: usize },
    Remove { row: usize },
    Replace { row: usize },
    Move { from: usize, to: usize },
    /// Everything changed; the grid rebuilds.
    Reset,
}

/// Read/write access to the backing rows.
pub trait RowsSource<T> {
    fn len(&self) -> usize;

    fn get(&self, row: usize) -> Option<&T>;

    fn get_mut(&mut self, row: usize) -> Option<&mut T>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Open an edit transaction on one item (snapshot for rollback).
    /// Default: no transaction support.
    fn begin_item_edit(&mut self, _row: usize) {}

    /// Finalize the item's edit transaction.
    fn commit_item_edit(&mut self, _row: usize) {}

    /// Roll the item back to its pre-edit snapshot. Returns false when the
    /// source does not support rollback (or no edit was open).
    fn cancel_item_edit(&mut self, _row: usize) -> bool {
        false
    }
}

/// Vec-backed source with snapshot rollback.
pub struct VecSource<T: Clone> {
    items: Vec<T>,
    /// (row, snapshot) of the item currently open for edit.
    editing: Option<(usize, T)>,
}

impl<T: Clone> VecSource<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self { items, editing: None }
    }

    pub fn push(&mut self, item: T) -> CollectionChange {
        self.items.push(item);
        CollectionChange::Add { row: self.items.len() - 1 }
    }

    pub fn insert(&mut self, row: usize, item: T) -> CollectionChange {
        self.items.insert(row, item);
        CollectionChange::Add { row }
    }

    pub fn remove(&mut self, row: usize) -> (T, CollectionChange) {
        (self.items.remove(row), CollectionChange::Remove { row })
    }

    pub fn replace(&mut self, row: usize, item: T) -> CollectionChange {
        self.items[row] = item;
        CollectionChange::Replace { row }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }
}

impl<T: Clone> RowsSource<T> for VecSource<T> {
    fn len(&self) -> usize {
        self.items.len()
    }

    fn get(&self, row: usize) -> Option<&T> {
        self.items.get(row)
    }

    fn get_mut(&mut self, row: usize) -> Option<&mut T> {
        self.items.get_mut(row)
    }

    fn begin_item_edit(&mut self, row: usize) {
        if let Some(item) = self.items.get(row) {
            self.editing = Some((row, item.clone()));
        }
    }

    fn commit_item_edit(&mut self, _row: usize) {
        self.editing = None;
    }

    fn cancel_item_edit(&mut self, row: usize) -> bool {
        match self.editing.take() {
            Some((edit_row, snapshot)) if edit_row == row => {
                if let Some(item) = self.items.get_mut(row) {
                    *item = snapshot;
                }
                true
            }
            other => {
                self.editing = other;
                false
            }
        }
    }
}
