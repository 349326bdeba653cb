//! Scenario S6: repeated growth and shrink-via-compact over a mixed
//! workload, checked against a plain `HashMap` reference model at every
//! step.

use std::collections::HashMap;

use keyed_hash_collections::{KeyAdapter, OpenAddressedTable, TableConfig};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    id: u64,
    value: u64,
}

struct EntryById;
impl KeyAdapter<Entry> for EntryById {
    type Key = u64;
    fn key_of(value: &Entry) -> u64 {
        value.id
    }
}

type Table = OpenAddressedTable<Entry, EntryById>;

fn assert_matches_reference(table: &Table, reference: &HashMap<u64, Entry>) {
    assert_eq!(table.len(), reference.len());
    for (key, value) in reference {
        assert_eq!(table.get(key).unwrap().as_ref(), Some(value));
    }
}

#[test]
fn rehash_over_growing_and_shrinking_batches() {
    let table = Table::new(TableConfig::with_capacity(4)).unwrap();
    let mut reference: HashMap<u64, Entry> = HashMap::new();

    // Five disjoint batches, growing the table roughly 65x over baseline.
    let batch_sizes = [20usize, 60, 150, 400, 650];
    let mut next_id = 0u64;
    let mut batches: Vec<Vec<u64>> = Vec::new();

    for (batch_index, &size) in batch_sizes.iter().enumerate() {
        let mut ids = Vec::with_capacity(size);
        for _ in 0..size {
            let id = next_id;
            next_id += 1;
            let entry = Entry {
                id,
                value: (batch_index as u64) * 1_000 + id,
            };
            assert_eq!(table.put(entry.clone()).unwrap(), None);
            reference.insert(id, entry);
            ids.push(id);
        }
        assert_matches_reference(&table, &reference);
        batches.push(ids);
    }

    // Remove batches in reverse order, compacting between each, checking
    // the reference model at every step and that no invariant error fires.
    for ids in batches.into_iter().rev() {
        for id in &ids {
            let removed = table.remove_key(id).unwrap();
            assert!(removed.is_some());
            reference.remove(id);
        }
        table.compact().unwrap();
        assert_matches_reference(&table, &reference);
    }

    assert!(table.is_empty());
}

#[test]
fn ensure_capacity_preallocates_without_losing_entries() {
    let table = Table::new(TableConfig::with_capacity(2)).unwrap();
    for id in 0..10u64 {
        table.put(Entry { id, value: id }).unwrap();
    }
    table.ensure_capacity(500).unwrap();
    for id in 0..10u64 {
        assert_eq!(table.get(&id).unwrap().map(|e| e.value), Some(id));
    }
    for id in 10..510u64 {
        table.put(Entry { id, value: id }).unwrap();
    }
    assert_eq!(table.len(), 510);
}
