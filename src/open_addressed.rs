// Copyright (c) 2025 Keyed Hash Collections Contributors
//
//! The flat, open-addressed, double-hash-probed table.
//!
//! A single-writer-mutex / lock-free-reader design with `Acquire`/`Release`
//! slot publication. Retired nodes are reclaimed through the `crossbeam-epoch`
//! crate rather than an immediate free, so a reader that loaded a pointer
//! before a concurrent remove/rehash can keep dereferencing it safely.
//!
//! Tombstones are represented as a tagged null pointer (tag bit 1) rather
//! than a distinct heap-allocated sentinel, using `crossbeam_epoch::Shared`'s
//! native tag bits.

use crossbeam_epoch::{self as epoch, Atomic, Guard, Owned, Shared};
use parking_lot::Mutex;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::adapter::KeyAdapter;
use crate::config::TableConfig;
use crate::error::{KeyedError, Result};
use crate::prime::PrimeTable;

const TOMBSTONE_TAG: usize = 1;

/// One generation of the backing array. Replaced wholesale on rehash; never
/// mutated in length once constructed, so a probe sequence computed against
/// one generation stays valid for that generation's entire lifetime.
struct Storage<V> {
    slots: Box<[Atomic<V>]>,
}

impl<V> Storage<V> {
    fn new(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        for _ in 0..capacity {
            slots.push(Atomic::null());
        }
        Self {
            slots: slots.into_boxed_slice(),
        }
    }

    fn len(&self) -> usize {
        self.slots.len()
    }
}

impl<V> Drop for Storage<V> {
    fn drop(&mut self) {
        // SAFETY: a `Storage` is only ever dropped once retired through the
        // epoch collector, by which point no reader can still be
        // traversing it, so an unprotected load/own is sound here.
        let guard = unsafe { epoch::unprotected() };
        for slot in self.slots.iter() {
            let shared = slot.load(Ordering::Relaxed, guard);
            if !shared.is_null() {
                unsafe {
                    drop(shared.into_owned());
                }
            }
        }
    }
}

/// What a probe resolved to.
enum Resolution<'g, V> {
    /// Found a live slot whose key matches.
    Match { idx: usize, current: Shared<'g, V> },
    /// No live match; insert here (a remembered tombstone, or the first
    /// empty slot if no tombstone was seen).
    Insert { idx: usize },
}

fn probe<'g, V>(
    storage: &'g Storage<V>,
    hash: u64,
    mut key_matches: impl FnMut(&V) -> bool,
    guard: &'g Guard,
) -> Result<Resolution<'g, V>> {
    let len = storage.len();
    let start = (hash as usize) % len;
    let step = 1 + (hash as usize % (len - 2));
    let mut idx = start;
    let mut tombstone_idx: Option<usize> = None;

    for _ in 0..len {
        let shared = storage.slots[idx].load(Ordering::Acquire, guard);
        if shared.is_null() {
            if shared.tag() == TOMBSTONE_TAG {
                if tombstone_idx.is_none() {
                    tombstone_idx = Some(idx);
                }
            } else {
                return Ok(Resolution::Insert {
                    idx: tombstone_idx.unwrap_or(idx),
                });
            }
        } else {
            let v = unsafe { shared.deref() };
            if key_matches(v) {
                return Ok(Resolution::Match { idx, current: shared });
            }
        }
        idx = (idx + len - (step % len)) % len;
    }
    Err(KeyedError::CycleDetected)
}

/// Places `value` into the first empty slot of a brand-new, unpublished
/// array. No tombstones exist yet so this always terminates without the
/// full `probe` machinery.
fn insert_fresh<V>(storage: &Storage<V>, hash: u64, value: V) {
    let len = storage.len();
    let step = 1 + (hash as usize % (len - 2));
    let mut idx = (hash as usize) % len;
    // SAFETY: storage is not yet reachable from any other thread.
    let guard = unsafe { epoch::unprotected() };
    loop {
        let cur = storage.slots[idx].load(Ordering::Relaxed, guard);
        if cur.is_null() {
            storage.slots[idx].store(Owned::new(value), Ordering::Relaxed);
            return;
        }
        idx = (idx + len - (step % len)) % len;
    }
}

enum Mode<'a, V> {
    Put,
    IfAbsent,
    Replace,
    ReplaceExpected(&'a V),
}

struct WriterState {
    capacity: usize,
    free: usize,
    max_size: usize,
}

struct IndexCache<V> {
    generation: usize,
    values: Vec<V>,
}

/// The open-addressed, double-hash-probed keyed collection.
///
/// `V` is the value type; `A` extracts and compares its derived key. Reads
/// (`get`, `contains_key`, `snapshot`) take no lock. Writes (`put` and
/// friends) are serialised behind a single `parking_lot::Mutex`.
pub struct OpenAddressedTable<V, A: KeyAdapter<V>> {
    storage: Atomic<Storage<V>>,
    size: AtomicUsize,
    generation: AtomicUsize,
    load_factor: f64,
    write: Mutex<WriterState>,
    index_cache: Mutex<IndexCache<V>>,
    _adapter: PhantomData<A>,
}

impl<V, A: KeyAdapter<V>> OpenAddressedTable<V, A> {
    pub fn new(config: TableConfig) -> Result<Self> {
        config.validate()?;
        let capacity = PrimeTable::next_prime(config.initial_capacity.max(PrimeTable::smallest()));
        let max_size = Self::compute_max_size(capacity, config.load_factor);
        Ok(Self {
            storage: Atomic::new(Storage::new(capacity)),
            size: AtomicUsize::new(0),
            generation: AtomicUsize::new(0),
            load_factor: config.load_factor,
            write: Mutex::new(WriterState {
                capacity,
                free: capacity,
                max_size,
            }),
            index_cache: Mutex::new(IndexCache {
                generation: usize::MAX,
                values: Vec::new(),
            }),
            _adapter: PhantomData,
        })
    }

    fn compute_max_size(capacity: usize, load_factor: f64) -> usize {
        (capacity - 1).min((capacity as f64 * load_factor).floor() as usize)
    }

    pub fn len(&self) -> usize {
        self.size.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.write.lock().capacity
    }

    /// A generation counter bumped on every successful write. Used by
    /// `views`/`get_by_index` to invalidate their cached snapshot.
    pub fn generation(&self) -> usize {
        self.generation.load(Ordering::Acquire)
    }

    /// Concurrent-safe, lock-free lookup. Returns a clone of the matching
    /// value, or `None` if no live entry has this key.
    pub fn get(&self, key: &A::Key) -> Result<Option<V>>
    where
        V: Clone,
    {
        let guard = epoch::pin();
        let storage = unsafe { self.storage.load(Ordering::Acquire, &guard).deref() };
        let hash = A::hash_of(key);
        match probe(storage, hash, |v| A::equal_key(key, v), &guard)? {
            Resolution::Match { current, .. } => Ok(Some(unsafe { current.deref() }.clone())),
            Resolution::Insert { .. } => Ok(None),
        }
    }

    pub fn contains_key(&self, key: &A::Key) -> Result<bool>
    where
        V: Clone,
    {
        Ok(self.get(key)?.is_some())
    }

    /// O(capacity) scan; allowed per the collection API contract.
    pub fn contains_value(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        let guard = epoch::pin();
        let storage = unsafe { self.storage.load(Ordering::Acquire, &guard).deref() };
        storage.slots.iter().any(|slot| {
            let shared = slot.load(Ordering::Acquire, &guard);
            !shared.is_null() && unsafe { shared.deref() } == value
        })
    }

    /// A lock-free clone of every live value, in no particular order. Used
    /// by the collection views and by `get_by_index`.
    pub fn snapshot(&self) -> Vec<V>
    where
        V: Clone,
    {
        let guard = epoch::pin();
        let storage = unsafe { self.storage.load(Ordering::Acquire, &guard).deref() };
        storage
            .slots
            .iter()
            .filter_map(|slot| {
                let shared = slot.load(Ordering::Acquire, &guard);
                if shared.is_null() {
                    None
                } else {
                    Some(unsafe { shared.deref() }.clone())
                }
            })
            .collect()
    }

    /// Returns the value at position `index` of some snapshot of the
    /// table's live contents. The snapshot is cached against the table's
    /// write generation counter, so repeated calls between writes reuse it
    /// instead of re-walking the storage array each time.
    pub fn get_by_index(&self, index: usize) -> Option<V>
    where
        V: Clone,
    {
        let mut cache = self.index_cache.lock();
        let current_generation = self.generation();
        if cache.generation != current_generation {
            cache.values = self.snapshot();
            cache.generation = current_generation;
        }
        cache.values.get(index).cloned()
    }

    pub fn put(&self, value: V) -> Result<Option<V>>
    where
        V: Clone,
    {
        let key = A::key_of(&value);
        self.put_if_match(&key, value, Mode::Put)
    }

    pub fn put_if_absent(&self, value: V) -> Result<Option<V>>
    where
        V: Clone,
    {
        let key = A::key_of(&value);
        self.put_if_match(&key, value, Mode::IfAbsent)
    }

    pub fn replace(&self, value: V) -> Result<Option<V>>
    where
        V: Clone,
    {
        let key = A::key_of(&value);
        self.put_if_match(&key, value, Mode::Replace)
    }

    /// 3-argument replace: succeeds only if the live value at `value`'s key
    /// equals `expected`. `expected` is required — Rust's `V` vs. `Option<V>`
    /// typing makes a null *value* unrepresentable, but a caller can still
    /// pass `None` here to mean "no expected value", which this API treats
    /// as misuse rather than silently matching nothing.
    pub fn replace_expected(&self, value: V, expected: Option<&V>) -> Result<Option<V>>
    where
        V: Clone + PartialEq,
    {
        let expected = expected.ok_or(KeyedError::NullValueDisallowed)?;
        let key = A::key_of(&value);
        self.put_if_match(&key, value, Mode::ReplaceExpected(expected))
    }

    fn put_if_match(&self, key: &A::Key, value: V, mode: Mode<'_, V>) -> Result<Option<V>>
    where
        V: Clone,
    {
        if A::key_of(&value) != *key {
            return Err(KeyedError::KeyInconsistent);
        }

        let guard = epoch::pin();
        let mut writer = self.write.lock();
        let storage_shared = self.storage.load(Ordering::Acquire, &guard);
        let storage = unsafe { storage_shared.deref() };
        let hash = A::hash_of(key);

        match probe(storage, hash, |v| A::equal_key(key, v), &guard)? {
            Resolution::Match { idx, current } => {
                let existing = unsafe { current.deref() };
                let replace_now = match &mode {
                    Mode::Put | Mode::Replace => true,
                    Mode::IfAbsent => false,
                    Mode::ReplaceExpected(expected) => existing == *expected,
                };
                let previous = existing.clone();
                if !replace_now {
                    return Ok(Some(previous));
                }
                let retired = storage.slots[idx].swap(Owned::new(value), Ordering::AcqRel, &guard);
                unsafe {
                    guard.defer_destroy(retired);
                }
                Ok(Some(previous))
            }
            Resolution::Insert { idx } => {
                if matches!(mode, Mode::Replace | Mode::ReplaceExpected(_)) {
                    return Ok(None);
                }
                let was_tombstone =
                    storage.slots[idx].load(Ordering::Acquire, &guard).tag() == TOMBSTONE_TAG;
                storage.slots[idx].store(Owned::new(value), Ordering::Release);
                if !was_tombstone {
                    writer.free -= 1;
                }
                self.size.fetch_add(1, Ordering::Relaxed);
                self.generation.fetch_add(1, Ordering::Release);
                self.maybe_rehash(&mut writer, &guard);
                Ok(None)
            }
        }
    }

    /// Removes the entry for `key`, if any, tombstoning its slot.
    pub fn remove_key(&self, key: &A::Key) -> Result<Option<V>>
    where
        V: Clone,
    {
        let guard = epoch::pin();
        let _writer = self.write.lock();
        let storage_shared = self.storage.load(Ordering::Acquire, &guard);
        let storage = unsafe { storage_shared.deref() };
        match probe(storage, A::hash_of(key), |v| A::equal_key(key, v), &guard)? {
            Resolution::Insert { .. } => Ok(None),
            Resolution::Match { idx, current } => {
                let removed = unsafe { current.deref() }.clone();
                storage.slots[idx].store(Shared::null().with_tag(TOMBSTONE_TAG), Ordering::Release);
                unsafe {
                    guard.defer_destroy(current);
                }
                self.size.fetch_sub(1, Ordering::Relaxed);
                self.generation.fetch_add(1, Ordering::Release);
                Ok(Some(removed))
            }
        }
    }

    /// Removes the entry for `key` only if its current value equals
    /// `expected`.
    pub fn remove(&self, key: &A::Key, expected: &V) -> Result<Option<V>>
    where
        V: Clone + PartialEq,
    {
        let guard = epoch::pin();
        let _writer = self.write.lock();
        let storage_shared = self.storage.load(Ordering::Acquire, &guard);
        let storage = unsafe { storage_shared.deref() };
        match probe(storage, A::hash_of(key), |v| A::equal_key(key, v), &guard)? {
            Resolution::Insert { .. } => Ok(None),
            Resolution::Match { idx, current } => {
                let existing = unsafe { current.deref() };
                if existing != expected {
                    return Ok(None);
                }
                let removed = existing.clone();
                storage.slots[idx].store(Shared::null().with_tag(TOMBSTONE_TAG), Ordering::Release);
                unsafe {
                    guard.defer_destroy(current);
                }
                self.size.fetch_sub(1, Ordering::Relaxed);
                self.generation.fetch_add(1, Ordering::Release);
                Ok(Some(removed))
            }
        }
    }

    /// Atomic find-or-create. `factory` runs at most once, in the thread
    /// that wins the race to the key's slot; it must not call back into
    /// this table.
    pub fn put_if_absent_with<F>(&self, key: A::Key, factory: F) -> Result<V>
    where
        F: FnOnce() -> V,
        V: Clone,
    {
        if let Some(existing) = self.get(&key)? {
            return Ok(existing);
        }

        let guard = epoch::pin();
        let mut writer = self.write.lock();
        let storage_shared = self.storage.load(Ordering::Acquire, &guard);
        let storage = unsafe { storage_shared.deref() };
        let hash = A::hash_of(&key);

        match probe(storage, hash, |v| A::equal_key(&key, v), &guard)? {
            Resolution::Match { current, .. } => Ok(unsafe { current.deref() }.clone()),
            Resolution::Insert { idx } => {
                let value = factory();
                if A::key_of(&value) != key {
                    return Err(KeyedError::KeyInconsistent);
                }
                let was_tombstone =
                    storage.slots[idx].load(Ordering::Acquire, &guard).tag() == TOMBSTONE_TAG;
                storage.slots[idx].store(Owned::new(value.clone()), Ordering::Release);
                if !was_tombstone {
                    writer.free -= 1;
                }
                self.size.fetch_add(1, Ordering::Relaxed);
                self.generation.fetch_add(1, Ordering::Release);
                self.maybe_rehash(&mut writer, &guard);
                Ok(value)
            }
        }
    }

    /// Discards every entry and resets the storage array to a fresh,
    /// all-empty array of the same capacity. Unlike `rehash_to`, this does
    /// not re-insert anything: the retired array (and every live value it
    /// still holds) is dropped once the epoch collector reclaims it.
    pub fn clear(&self) -> Result<()> {
        let guard = epoch::pin();
        let mut writer = self.write.lock();
        let new_storage = Storage::new(writer.capacity);
        let retired = self
            .storage
            .swap(Owned::new(new_storage), Ordering::AcqRel, &guard);
        unsafe {
            guard.defer_destroy(retired);
        }
        writer.free = writer.capacity;
        self.size.store(0, Ordering::Relaxed);
        self.generation.fetch_add(1, Ordering::Release);
        if self.size.load(Ordering::Relaxed) != 0 {
            return Err(KeyedError::InternalInvariantBroken(
                "clear() left a nonzero size".into(),
            ));
        }
        Ok(())
    }

    pub fn ensure_capacity(&self, n: usize) -> Result<()>
    where
        V: Clone,
    {
        let guard = epoch::pin();
        let mut writer = self.write.lock();
        let size = self.size.load(Ordering::Relaxed);
        if n > writer.max_size.saturating_sub(size) {
            let target = (((n + size) as f64) / self.load_factor).ceil() as usize + 1;
            self.rehash_to(target, &mut writer, &guard);
        }
        Ok(())
    }

    /// Shrinks to the smallest prime capacity that keeps the load factor
    /// admissible for the current size, purging tombstones in the process.
    pub fn compact(&self) -> Result<()>
    where
        V: Clone,
    {
        let guard = epoch::pin();
        let mut writer = self.write.lock();
        let size = self.size.load(Ordering::Relaxed);
        let target = ((size as f64) / self.load_factor).ceil() as usize;
        self.rehash_to(target.max(PrimeTable::smallest()), &mut writer, &guard);
        Ok(())
    }

    fn maybe_rehash(&self, writer: &mut WriterState, guard: &Guard)
    where
        V: Clone,
    {
        let size = self.size.load(Ordering::Relaxed);
        if size > writer.max_size {
            self.rehash_to(writer.capacity * 2, writer, guard);
        } else if writer.free == 1 {
            self.rehash_to(writer.capacity, writer, guard);
        }
    }

    /// Builds a fresh array off to the side at (at least) `requested`
    /// capacity, re-inserts every live entry, then swaps it in for the
    /// live `storage` pointer. Concurrent readers holding the old pointer
    /// keep seeing a complete, consistent array until they re-load.
    fn rehash_to(&self, requested: usize, writer: &mut WriterState, guard: &Guard)
    where
        V: Clone,
    {
        let new_capacity = PrimeTable::next_prime(requested.max(PrimeTable::smallest()));
        let old_shared = self.storage.load(Ordering::Acquire, guard);
        let old_storage = unsafe { old_shared.deref() };

        let new_storage = Storage::new(new_capacity);
        let mut live = 0usize;
        for slot in old_storage.slots.iter() {
            let shared = slot.load(Ordering::Acquire, guard);
            if !shared.is_null() {
                let v = unsafe { shared.deref() };
                let key = A::key_of(v);
                insert_fresh(&new_storage, A::hash_of(&key), v.clone());
                live += 1;
            }
        }

        let retired = self
            .storage
            .swap(Owned::new(new_storage), Ordering::AcqRel, guard);
        unsafe {
            guard.defer_destroy(retired);
        }

        writer.capacity = new_capacity;
        writer.free = new_capacity - live;
        writer.max_size = Self::compute_max_size(new_capacity, self.load_factor);
        tracing::debug!(new_capacity, live, "open-addressed table rehashed");
    }
}

impl<V, A: KeyAdapter<V>> Drop for OpenAddressedTable<V, A> {
    fn drop(&mut self) {
        // SAFETY: &mut self means no concurrent access is possible.
        let guard = unsafe { epoch::unprotected() };
        let shared = self.storage.swap(Shared::null(), Ordering::Acquire, guard);
        if !shared.is_null() {
            unsafe {
                drop(shared.into_owned());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::KeyAdapter;

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
        OpenAddressedTable::new(TableConfig::with_capacity(2)).unwrap()
    }

    #[test]
    fn s1_basic_flat_insert_and_replace() {
        let t = table();
        for (id, tag) in [(1, "A"), (2, "B"), (3, "C"), (4, "D")] {
            assert_eq!(t.put(Item { id, tag }).unwrap(), None);
        }
        assert_eq!(t.len(), 4);
        for (id, tag) in [(1, "A"), (2, "B"), (3, "C"), (4, "D")] {
            assert_eq!(t.get(&id).unwrap(), Some(Item { id, tag }));
        }

        let previous = t.put(Item { id: 1, tag: "A2" }).unwrap();
        assert_eq!(previous, Some(Item { id: 1, tag: "A" }));
        assert_eq!(t.get(&1).unwrap(), Some(Item { id: 1, tag: "A2" }));
    }

    #[test]
    fn tombstone_reuse_on_reinsert() {
        let t = table();
        for id in 0..20u64 {
            t.put(Item { id, tag: "x" }).unwrap();
        }
        for id in 0..20u64 {
            t.remove_key(&id).unwrap();
        }
        assert_eq!(t.len(), 0);
        t.put(Item { id: 7, tag: "y" }).unwrap();
        assert_eq!(t.get(&7).unwrap(), Some(Item { id: 7, tag: "y" }));
    }

    #[test]
    fn remove_idempotence() {
        let t = table();
        t.put(Item { id: 1, tag: "A" }).unwrap();
        assert_eq!(t.remove_key(&1).unwrap(), Some(Item { id: 1, tag: "A" }));
        assert_eq!(t.remove_key(&1).unwrap(), None);
    }

    #[test]
    fn key_inconsistent_rejected() {
        let t = table();
        let err = t
            .put_if_match(&99, Item { id: 1, tag: "A" }, Mode::Put)
            .unwrap_err();
        assert_eq!(err, KeyedError::KeyInconsistent);
    }

    #[test]
    fn replace_modes() {
        let t = table();
        assert_eq!(t.replace(Item { id: 1, tag: "A" }).unwrap(), None);
        t.put(Item { id: 1, tag: "A" }).unwrap();
        assert_eq!(
            t.replace(Item { id: 1, tag: "B" }).unwrap(),
            Some(Item { id: 1, tag: "A" })
        );
        assert_eq!(t.get(&1).unwrap(), Some(Item { id: 1, tag: "B" }));

        let wrong = Item { id: 1, tag: "wrong" };
        assert_eq!(
            t.replace_expected(Item { id: 1, tag: "C" }, Some(&wrong)).unwrap(),
            Some(Item { id: 1, tag: "B" })
        );
        assert_eq!(t.get(&1).unwrap(), Some(Item { id: 1, tag: "B" }));

        let right = Item { id: 1, tag: "B" };
        assert_eq!(
            t.replace_expected(Item { id: 1, tag: "C" }, Some(&right)).unwrap(),
            Some(Item { id: 1, tag: "B" })
        );
        assert_eq!(t.get(&1).unwrap(), Some(Item { id: 1, tag: "C" }));
    }

    #[test]
    fn replace_expected_rejects_null_expected() {
        let t = table();
        t.put(Item { id: 1, tag: "A" }).unwrap();
        let err = t
            .replace_expected(Item { id: 1, tag: "B" }, None)
            .unwrap_err();
        assert_eq!(err, KeyedError::NullValueDisallowed);
        assert_eq!(t.get(&1).unwrap(), Some(Item { id: 1, tag: "A" }));
    }

    #[test]
    fn put_if_absent_with_factory_runs_once() {
        use std::sync::atomic::AtomicU32;
        let t = table();
        let calls = AtomicU32::new(0);
        let v = t
            .put_if_absent_with(5, || {
                calls.fetch_add(1, Ordering::SeqCst);
                Item { id: 5, tag: "made" }
            })
            .unwrap();
        assert_eq!(v, Item { id: 5, tag: "made" });
        let v2 = t
            .put_if_absent_with(5, || {
                calls.fetch_add(1, Ordering::SeqCst);
                Item { id: 5, tag: "made-again" }
            })
            .unwrap();
        assert_eq!(v2, Item { id: 5, tag: "made" });
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn clear_resets_table() {
        let t = table();
        for id in 0..10u64 {
            t.put(Item { id, tag: "x" }).unwrap();
        }
        t.clear().unwrap();
        assert_eq!(t.len(), 0);
        assert!(t.is_empty());
        for id in 0..10u64 {
            assert_eq!(t.get(&id).unwrap(), None);
        }
    }

    #[test]
    fn rehash_grows_and_preserves_entries() {
        let t = table();
        for id in 0..500u64 {
            t.put(Item { id, tag: "x" }).unwrap();
        }
        assert_eq!(t.len(), 500);
        for id in 0..500u64 {
            assert_eq!(t.get(&id).unwrap().map(|v| v.id), Some(id));
        }
    }

    #[test]
    fn compact_shrinks_after_removals() {
        let t = table();
        for id in 0..200u64 {
            t.put(Item { id, tag: "x" }).unwrap();
        }
        for id in 0..190u64 {
            t.remove_key(&id).unwrap();
        }
        let before = t.capacity();
        t.compact().unwrap();
        assert!(t.capacity() <= before);
        for id in 190..200u64 {
            assert!(t.get(&id).unwrap().is_some());
        }
    }
}
