//! Column definitions.

use gridkit_core::accessor::{ColumnAccessor, EditError};
use gridkit_core::value::NumberFormat;
use gridkit_core::{ColumnId, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Visible,
    Hidden,
}

/// One grid column: header, layout, participation flags, and the accessor
/// strategy that reads/writes the column's value on an item.
pub struct GridColumn<T> {
    pub id: ColumnId,
    pub header: String,
    pub width: f32,
    pub visibility: Visibility,
    pub read_only: bool,
    pub can_sort: bool,
    pub can_filter: bool,
    pub can_search: bool,
    pub format: Option<NumberFormat>,
    accessor: Box<dyn ColumnAccessor<T>>,
}

impl<T> GridColumn<T> {
    /// Id is assigned when the column joins a collection.
    pub fn new(header: impl Into<String>, accessor: impl ColumnAccessor<T> + 'static) -> Self {
        Self {
            id: ColumnId(0),
            header: header.into(),
            width: 120.0,
            visibility: Visibility::Visible,
            read_only: false,
            can_sort: true,
            can_filter: true,
            can_search: true,
            format: None,
            accessor: Box::new(accessor),
        }
    }

    pub fn with_width(mut self, width: f32) -> Self {
        self.width = width;
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn with_format(mut self, format: NumberFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn is_visible(&self) -> bool {
        self.visibility == Visibility::Visible
    }

    /// Effectively read-only: either flagged on the column or the accessor
    /// has no setter.
    pub fn is_effectively_read_only(&self) -> bool {
        self.read_only || self.accessor.is_read_only()
    }

    pub fn get_value(&self, item: &T) -> Value {
        self.accessor.get(item)
    }

    pub fn set_value(&self, item: &mut T, value: Value) -> Result<(), EditError> {
        if self.read_only {
            return Err(EditError::ReadOnly);
        }
        self.accessor.set(item, value)
    }

    /// Display text for a value in this column, honoring the number format.
    pub fn display_value(&self, value: &Value) -> String {
        match (&self.format, value) {
            (Some(format), Value::Number(n)) => Value::format_number(*n, format),
            _ => value.display(),
        }
    }
}

/// Ordered column list with id assignment and lookup.
pub struct ColumnCollection<T> {
    columns: Vec<GridColumn<T>>,
    next_id: u32,
}

impl<T> Default for ColumnCollection<T> {
    fn default() -> Self {
        Self { columns: Vec::new(), next_id: 0 }
    }
}

impl<T> ColumnCollection<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, mut column: GridColumn<T>) -> ColumnId {
        let id = ColumnId(self.next_id);
        self.next_id += 1;
        column.id = id;
        self.columns.push(column);
        id
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&GridColumn<T>> {
        self.columns.get(index)
    }

    pub fn by_id(&self, id: ColumnId) -> Option<&GridColumn<T>> {
        self.columns.iter().find(|c| c.id == id)
    }

    pub fn index_of(&self, id: ColumnId) -> Option<usize> {
        self.columns.iter().position(|c| c.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &GridColumn<T>> {
        self.columns.iter()
    }

    /// Indices of visible columns in display order.
    pub fn visible_indices(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_visible())
            .map(|(i, _)| i)
            .collect()
    }

    /// First column a user can edit, if any.
    pub fn first_editable_index(&self) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.is_visible() && !c.is_effectively_read_only())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridkit_core::accessor::FieldAccessor;

    struct Item {
        name: String,
    }

    fn name_column() -> GridColumn<Item> {
        GridColumn::new(
            "Name",
            FieldAccessor::new(
                |i: &Item| Value::Text(i.name.clone()),
                |i: &mut Item, v| {
                    i.name = v.display();
                    Ok(())
                },
            ),
        )
    }

    #[test]
    fn test_collection_assigns_unique_ids() {
        let mut cols = ColumnCollection::new();
        let a = cols.add(name_column());
        let b = cols.add(name_column().read_only());
        assert_ne!(a, b);
        assert_eq!(cols.index_of(b), Some(1));
        assert_eq!(cols.by_id(a).map(|c| c.header.as_str()), Some("Name"));
    }

    #[test]
    fn test_first_editable_skips_read_only_and_hidden() {
        let mut cols = ColumnCollection::new();
        cols.add(name_column().read_only());
        cols.add(name_column().with_visibility(Visibility::Hidden));
        cols.add(name_column());
        assert_eq!(cols.first_editable_index(), Some(2));
    }

    #[test]
    fn test_read_only_flag_blocks_set() {
        let col = name_column().read_only();
        let mut item = Item { name: "x".into() };
        assert!(col.set_value(&mut item, Value::Text("y".into())).is_err());
        assert_eq!(item.name, "x");
    }

    #[test]
    fn test_accessor_without_setter_is_effectively_read_only() {
        let col: GridColumn<Item> =
            GridColumn::new("Name", FieldAccessor::read_only(|i: &Item| Value::Text(i.name.clone())));
        assert!(col.is_effectively_read_only());
    }

    #[test]
    fn test_visible_indices() {
        let mut cols = ColumnCollection::new();
        cols.add(name_column());
        cols.add(name_column().with_visibility(Visibility::Hidden));
        cols.add(name_column());
        assert_eq!(cols.visible_indices(), vec![0, 2]);
    }
}
