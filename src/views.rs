// Copyright (c) 2025 Keyed Hash Collections Contributors
//
//! Collection-style views over a table: key set, value iterator, and entry
//! set.
//!
//! Each view borrows the table and has no storage of its own beyond the
//! snapshot it takes at construction; `remove` on a view item delegates
//! straight back to the table's own `remove_key`/`remove`. The cached
//! index-snapshot used for positional access lives on `OpenAddressedTable`
//! itself as `get_by_index`, not here.

use crate::adapter::KeyAdapter;
use crate::error::Result;
use crate::open_addressed::OpenAddressedTable;

/// A view over a table's derived keys. Iterating clones each live value and
/// extracts its key; `remove` delegates to the table.
pub struct KeySetView<'t, V, A: KeyAdapter<V>> {
    table: &'t OpenAddressedTable<V, A>,
}

impl<'t, V, A: KeyAdapter<V>> KeySetView<'t, V, A> {
    pub fn new(table: &'t OpenAddressedTable<V, A>) -> Self {
        Self { table }
    }

    pub fn iter(&self) -> impl Iterator<Item = A::Key> + '_
    where
        V: Clone,
    {
        self.table.snapshot().into_iter().map(|v| A::key_of(&v))
    }

    pub fn contains(&self, key: &A::Key) -> Result<bool>
    where
        V: Clone,
    {
        self.table.contains_key(key)
    }

    pub fn remove(&self, key: &A::Key) -> Result<bool>
    where
        V: Clone,
    {
        Ok(self.table.remove_key(key)?.is_some())
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// A view over a table's live values.
pub struct ValuesView<'t, V, A: KeyAdapter<V>> {
    table: &'t OpenAddressedTable<V, A>,
}

impl<'t, V, A: KeyAdapter<V>> ValuesView<'t, V, A> {
    pub fn new(table: &'t OpenAddressedTable<V, A>) -> Self {
        Self { table }
    }

    pub fn iter(&self) -> std::vec::IntoIter<V>
    where
        V: Clone,
    {
        self.table.snapshot().into_iter()
    }

    pub fn contains(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        self.table.contains_value(value)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// A view over `(key, value)` pairs, each key re-derived from its value.
pub struct EntrySetView<'t, V, A: KeyAdapter<V>> {
    table: &'t OpenAddressedTable<V, A>,
}

impl<'t, V, A: KeyAdapter<V>> EntrySetView<'t, V, A> {
    pub fn new(table: &'t OpenAddressedTable<V, A>) -> Self {
        Self { table }
    }

    pub fn iter(&self) -> impl Iterator<Item = (A::Key, V)> + '_
    where
        V: Clone,
    {
        self.table
            .snapshot()
            .into_iter()
            .map(|v| (A::key_of(&v), v))
    }

    pub fn remove(&self, key: &A::Key, expected: &V) -> Result<bool>
    where
        V: Clone + PartialEq,
    {
        Ok(self.table.remove(key, expected)?.is_some())
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TableConfig;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Item {
        id: u64,
        tag: &'static str,
    }

    struct ItemById;
    impl KeyAdapter<Item> for ItemById {
        type Key = u64;
        fn key_of(value: &Item) -> u64 {
            value.id
        }
    }

    fn table() -> OpenAddressedTable<Item, ItemById> {
        OpenAddressedTable::new(TableConfig::with_capacity(4)).unwrap()
    }

    #[test]
    fn key_set_view_reflects_table() {
        let t = table();
        t.put(Item { id: 1, tag: "A" }).unwrap();
        t.put(Item { id: 2, tag: "B" }).unwrap();
        let view = KeySetView::new(&t);
        let mut keys: Vec<u64> = view.iter().collect();
        keys.sort();
        assert_eq!(keys, vec![1, 2]);
        assert!(view.remove(&1).unwrap());
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn values_view_reflects_table() {
        let t = table();
        t.put(Item { id: 1, tag: "A" }).unwrap();
        let view = ValuesView::new(&t);
        assert!(view.contains(&Item { id: 1, tag: "A" }));
        assert_eq!(view.len(), 1);
    }

    #[test]
    fn entry_set_view_remove_with_expected() {
        let t = table();
        t.put(Item { id: 1, tag: "A" }).unwrap();
        let view = EntrySetView::new(&t);
        let wrong = Item { id: 1, tag: "wrong" };
        assert!(!view.remove(&1, &wrong).unwrap());
        let right = Item { id: 1, tag: "A" };
        assert!(view.remove(&1, &right).unwrap());
        assert_eq!(t.len(), 0);
    }

    #[test]
    fn get_by_index_caches_until_write() {
        let t = table();
        t.put(Item { id: 1, tag: "A" }).unwrap();
        let first = t.get_by_index(0);
        assert_eq!(first, Some(Item { id: 1, tag: "A" }));

        t.put(Item { id: 2, tag: "B" }).unwrap();
        let refreshed = t.get_by_index(0).or(t.get_by_index(1));
        assert!(refreshed.is_some());
        assert_eq!(t.get_by_index(99), None);
    }
}
