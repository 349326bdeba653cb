// Copyright (c) 2025 Keyed Hash Collections Contributors
//
//! The separately-chained table whose link nodes live inside the values
//! themselves, via `LinkAdapter`, instead of a per-entry wrapper node.
//!
//! The bucket array sits behind a `crossbeam_epoch::Atomic<BucketArray<V>>`,
//! the same swap-on-grow shape `open_addressed` uses for its slot array, so
//! a lock-free `get` that has already loaded the array keeps traversing a
//! complete, consistent bucket layout even if a concurrent rehash swaps in
//! a bigger one underneath it. Within one bucket array, chain links are
//! plain `AtomicPtr<V>` published with `Release` and read with `Acquire`:
//! chains never need tombstone tagging, only a head pointer and a per-value
//! next pointer.

use crossbeam_epoch::{self as epoch, Atomic, Guard, Owned};
use parking_lot::Mutex;
use std::marker::PhantomData;
use std::ptr;
use std::sync::atomic::{AtomicPtr, AtomicUsize, Ordering};

use crate::adapter::{KeyAdapter, LinkAdapter};
use crate::config::TableConfig;
use crate::error::{KeyedError, Result};

/// One generation of the bucket array. Its length never changes once
/// constructed; growth replaces the whole array via `Atomic::swap`.
struct BucketArray<V> {
    heads: Box<[AtomicPtr<V>]>,
}

impl<V> BucketArray<V> {
    fn new(bucket_count: usize) -> Self {
        let mut heads = Vec::with_capacity(bucket_count);
        for _ in 0..bucket_count {
            heads.push(AtomicPtr::new(ptr::null_mut()));
        }
        Self {
            heads: heads.into_boxed_slice(),
        }
    }

    fn len(&self) -> usize {
        self.heads.len()
    }
}

struct WriterState {
    bucket_count: usize,
    capacity: usize,
}

/// Separately-chained keyed collection whose chain links are threaded
/// through the values themselves rather than through allocated nodes.
///
/// `L` must back its `LinkAdapter::link` with a real atomic field embedded
/// in `V`; see the safety contract on `LinkAdapter`.
pub struct IntrusiveChainedTable<V, A, L> {
    buckets: Atomic<BucketArray<V>>,
    size: AtomicUsize,
    load_factor: f64,
    rehash_enabled: bool,
    generation: AtomicUsize,
    write: Mutex<WriterState>,
    _adapter: PhantomData<A>,
    _link: PhantomData<L>,
}

unsafe impl<V: Send, A, L> Send for IntrusiveChainedTable<V, A, L> {}
unsafe impl<V: Sync, A, L> Sync for IntrusiveChainedTable<V, A, L> {}

impl<V, A, L> IntrusiveChainedTable<V, A, L>
where
    A: KeyAdapter<V>,
    L: LinkAdapter<V>,
{
    pub fn new(config: TableConfig) -> Result<Self> {
        Self::with_rehash(config, true)
    }

    /// Builds a table with rehashing permanently disabled. Useful when the
    /// caller knows the final size in advance and wants a fixed bucket
    /// array for the table's whole lifetime.
    pub fn with_rehash(config: TableConfig, rehash_enabled: bool) -> Result<Self> {
        config.validate()?;
        let bucket_count = ((config.initial_capacity as f64) * config.load_factor)
            .ceil()
            .max(1.0) as usize;
        let capacity = ((bucket_count as f64) / config.load_factor).floor() as usize;
        Ok(Self {
            buckets: Atomic::new(BucketArray::new(bucket_count)),
            size: AtomicUsize::new(0),
            load_factor: config.load_factor,
            rehash_enabled,
            generation: AtomicUsize::new(0),
            write: Mutex::new(WriterState {
                bucket_count,
                capacity,
            }),
            _adapter: PhantomData,
            _link: PhantomData,
        })
    }

    pub fn len(&self) -> usize {
        self.size.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn bucket_count(&self) -> usize {
        self.write.lock().bucket_count
    }

    pub fn generation(&self) -> usize {
        self.generation.load(Ordering::Acquire)
    }

    fn bucket_index(hash: u64, bucket_count: usize) -> usize {
        (hash as usize) % bucket_count
    }

    /// Lock-free chain walk: pins the epoch, loads the current bucket
    /// array, and follows `next` links with `Acquire`. A concurrent rehash
    /// may swap in a new array underneath this call, but the array this
    /// call loaded stays valid (and its chains stay walkable) until the
    /// guard drops.
    pub fn get(&self, key: &A::Key) -> Option<V>
    where
        V: Clone,
    {
        let guard = epoch::pin();
        let array = unsafe { self.buckets.load(Ordering::Acquire, &guard).deref() };
        let idx = Self::bucket_index(A::hash_of(key), array.len());
        let mut cur = array.heads[idx].load(Ordering::Acquire);
        while !cur.is_null() {
            let value = unsafe { &*cur };
            if A::equal_key(key, value) {
                return Some(value.clone());
            }
            cur = L::link(value).load(Ordering::Acquire);
        }
        None
    }

    pub fn contains_key(&self, key: &A::Key) -> bool
    where
        V: Clone,
    {
        self.get(key).is_some()
    }

    /// O(size) scan across every bucket's chain; allowed per the collection
    /// API contract (mirrors `OpenAddressedTable::contains_value`).
    pub fn contains_value(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        let guard = epoch::pin();
        let array = unsafe { self.buckets.load(Ordering::Acquire, &guard).deref() };
        for bucket in array.heads.iter() {
            let mut cur = bucket.load(Ordering::Acquire);
            while !cur.is_null() {
                let existing = unsafe { &*cur };
                if existing == value {
                    return true;
                }
                cur = L::link(existing).load(Ordering::Acquire);
            }
        }
        false
    }

    /// Inserts `value`, replacing any existing entry with the same derived
    /// key. Splices the new node in place of the old one so `next` chains
    /// stay valid for any reader mid-traversal; the displaced value is
    /// returned and retired through the epoch collector.
    pub fn add(&self, value: V) -> Result<Option<V>>
    where
        V: Clone,
    {
        self.add_impl(value, true)
    }

    pub fn add_if_absent(&self, value: V) -> Result<Option<V>>
    where
        V: Clone,
    {
        self.add_impl(value, false)
    }

    fn add_impl(&self, value: V, replace: bool) -> Result<Option<V>>
    where
        V: Clone,
    {
        let key = A::key_of(&value);
        let guard = epoch::pin();
        let mut writer = self.write.lock();
        let array = unsafe { self.buckets.load(Ordering::Acquire, &guard).deref() };
        let idx = Self::bucket_index(A::hash_of(&key), array.len());

        let mut prev: Option<&AtomicPtr<V>> = None;
        let mut cur = array.heads[idx].load(Ordering::Acquire);
        while !cur.is_null() {
            let existing = unsafe { &*cur };
            if A::equal_key(&key, existing) {
                let previous_value = existing.clone();
                if !replace {
                    return Ok(Some(previous_value));
                }
                let next = L::link(existing).load(Ordering::Acquire);
                let new_box = Box::into_raw(Box::new(value));
                L::link(unsafe { &*new_box }).store(next, Ordering::Release);
                match prev {
                    Some(p) => p.store(new_box, Ordering::Release),
                    None => array.heads[idx].store(new_box, Ordering::Release),
                }
                L::link(existing).store(ptr::null_mut(), Ordering::Release);
                self.retire(cur);
                self.generation.fetch_add(1, Ordering::Release);
                return Ok(Some(previous_value));
            }
            prev = Some(L::link(existing));
            cur = L::link(existing).load(Ordering::Acquire);
        }

        let new_box = Box::into_raw(Box::new(value));
        L::link(unsafe { &*new_box }).store(ptr::null_mut(), Ordering::Release);
        match prev {
            Some(p) => p.store(new_box, Ordering::Release),
            None => array.heads[idx].store(new_box, Ordering::Release),
        }
        self.size.fetch_add(1, Ordering::Relaxed);
        self.generation.fetch_add(1, Ordering::Release);
        self.maybe_rehash(&mut writer, &guard);
        Ok(None)
    }

    /// Atomic find-or-create, mirroring `OpenAddressedTable::put_if_absent_with`.
    pub fn put_if_absent_with<F>(&self, key: A::Key, factory: F) -> Result<V>
    where
        F: FnOnce() -> V,
        V: Clone,
    {
        if let Some(existing) = self.get(&key) {
            return Ok(existing);
        }

        let guard = epoch::pin();
        let mut writer = self.write.lock();
        let array = unsafe { self.buckets.load(Ordering::Acquire, &guard).deref() };
        let idx = Self::bucket_index(A::hash_of(&key), array.len());

        let mut prev: Option<&AtomicPtr<V>> = None;
        let mut cur = array.heads[idx].load(Ordering::Acquire);
        while !cur.is_null() {
            let existing = unsafe { &*cur };
            if A::equal_key(&key, existing) {
                return Ok(existing.clone());
            }
            prev = Some(L::link(existing));
            cur = L::link(existing).load(Ordering::Acquire);
        }

        let value = factory();
        if A::key_of(&value) != key {
            return Err(KeyedError::KeyInconsistent);
        }
        let new_box = Box::into_raw(Box::new(value));
        L::link(unsafe { &*new_box }).store(ptr::null_mut(), Ordering::Release);
        match prev {
            Some(p) => p.store(new_box, Ordering::Release),
            None => array.heads[idx].store(new_box, Ordering::Release),
        }
        self.size.fetch_add(1, Ordering::Relaxed);
        self.generation.fetch_add(1, Ordering::Release);
        self.maybe_rehash(&mut writer, &guard);
        Ok(unsafe { &*new_box }.clone())
    }

    pub fn remove_key(&self, key: &A::Key) -> Option<V>
    where
        V: Clone,
    {
        let guard = epoch::pin();
        let _writer = self.write.lock();
        let array = unsafe { self.buckets.load(Ordering::Acquire, &guard).deref() };
        let idx = Self::bucket_index(A::hash_of(key), array.len());
        self.unlink_matching(array, idx, |existing| A::equal_key(key, existing))
    }

    /// Removes the entry for `key` only if its current value equals
    /// `expected`.
    pub fn remove(&self, key: &A::Key, expected: &V) -> Option<V>
    where
        V: Clone + PartialEq,
    {
        let guard = epoch::pin();
        let _writer = self.write.lock();
        let array = unsafe { self.buckets.load(Ordering::Acquire, &guard).deref() };
        let idx = Self::bucket_index(A::hash_of(key), array.len());
        self.unlink_matching(array, idx, |existing| {
            A::equal_key(key, existing) && existing == expected
        })
    }

    fn unlink_matching(
        &self,
        array: &BucketArray<V>,
        idx: usize,
        mut matches: impl FnMut(&V) -> bool,
    ) -> Option<V>
    where
        V: Clone,
    {
        let mut prev: Option<&AtomicPtr<V>> = None;
        let mut cur = array.heads[idx].load(Ordering::Acquire);
        while !cur.is_null() {
            let existing = unsafe { &*cur };
            if matches(existing) {
                let next = L::link(existing).load(Ordering::Acquire);
                match prev {
                    Some(p) => p.store(next, Ordering::Release),
                    None => array.heads[idx].store(next, Ordering::Release),
                }
                L::link(existing).store(ptr::null_mut(), Ordering::Release);
                let removed = existing.clone();
                self.retire(cur);
                self.size.fetch_sub(1, Ordering::Relaxed);
                self.generation.fetch_add(1, Ordering::Release);
                return Some(removed);
            }
            prev = Some(L::link(existing));
            cur = L::link(existing).load(Ordering::Acquire);
        }
        None
    }

    pub fn clear(&self) -> Result<()> {
        let guard = epoch::pin();
        let _writer = self.write.lock();
        let array = unsafe { self.buckets.load(Ordering::Acquire, &guard).deref() };
        for bucket in array.heads.iter() {
            let mut cur = bucket.swap(ptr::null_mut(), Ordering::AcqRel);
            while !cur.is_null() {
                let value = unsafe { &*cur };
                let next = L::link(value).load(Ordering::Acquire);
                L::link(value).store(ptr::null_mut(), Ordering::Release);
                self.retire(cur);
                cur = next;
            }
        }
        self.size.store(0, Ordering::Relaxed);
        self.generation.fetch_add(1, Ordering::Release);
        if self.size.load(Ordering::Relaxed) != 0 {
            return Err(KeyedError::InternalInvariantBroken(
                "clear() left a nonzero size".into(),
            ));
        }
        Ok(())
    }

    /// A no-op: chains have no tombstones to purge and no backing array to
    /// shrink below its bucket count. Kept so generic callers can call
    /// `compact` on either table kind without matching on which one they
    /// hold.
    pub fn compact(&self) -> Result<()> {
        Ok(())
    }

    fn maybe_rehash(&self, writer: &mut WriterState, guard: &Guard) {
        if !self.rehash_enabled {
            return;
        }
        let size = self.size.load(Ordering::Relaxed);
        if size > writer.capacity {
            self.rehash_locked(writer, guard);
        }
    }

    /// Builds a fresh, double-size `BucketArray` off to the side, rethreads
    /// every chain into it, then swaps the `Atomic<BucketArray<V>>` pointer
    /// under the writer lock. Reverses per-bucket insertion order, which is
    /// fine: iteration order over this table was never specified. The old
    /// array is retired through the epoch guard rather than freed
    /// immediately, so a reader mid-traversal when the swap lands still
    /// sees valid memory; the values themselves move to the new array
    /// without being cloned or reallocated.
    fn rehash_locked(&self, writer: &mut WriterState, guard: &Guard) {
        let old_shared = self.buckets.load(Ordering::Acquire, guard);
        let old_array = unsafe { old_shared.deref() };
        let new_count = old_array.len() * 2;
        let new_array = BucketArray::new(new_count);

        for old_idx in 0..old_array.len() {
            let mut cur = old_array.heads[old_idx].load(Ordering::Acquire);
            while !cur.is_null() {
                let value = unsafe { &*cur };
                let next = L::link(value).load(Ordering::Acquire);
                let key = A::key_of(value);
                let new_idx = Self::bucket_index(A::hash_of(&key), new_count);
                let head = new_array.heads[new_idx].load(Ordering::Relaxed);
                L::link(value).store(head, Ordering::Release);
                new_array.heads[new_idx].store(cur, Ordering::Release);
                cur = next;
            }
        }

        let retired = self
            .buckets
            .swap(Owned::new(new_array), Ordering::AcqRel, guard);
        unsafe {
            guard.defer_destroy(retired);
        }

        writer.bucket_count = new_count;
        writer.capacity = ((new_count as f64) / self.load_factor).floor() as usize;
        tracing::debug!(new_bucket_count = new_count, "intrusive table rehashed");
    }

    fn retire(&self, ptr: *mut V) {
        let guard = epoch::pin();
        unsafe {
            guard.defer_unchecked(move || {
                drop(Box::from_raw(ptr));
            });
        }
    }

    /// Snapshots every live value at the moment of the call, walking each
    /// bucket head-to-tail. Since `add` always appends new entries at the
    /// tail, a bucket's chain order is its insertion order, so a
    /// single-bucket table iterates in insertion order; a multi-bucket
    /// table interleaves buckets in bucket-index order. The snapshot is
    /// frozen the instant `iter()` returns — later writes are invisible to
    /// an iterator already in flight, same as `OpenAddressedTable::snapshot`.
    pub fn iter(&self) -> ChainIterator<'_, V, A, L>
    where
        V: Clone,
    {
        let guard = epoch::pin();
        let array = unsafe { self.buckets.load(Ordering::Acquire, &guard).deref() };
        let mut values = Vec::with_capacity(self.len());
        for bucket in array.heads.iter() {
            let mut cur = bucket.load(Ordering::Acquire);
            while !cur.is_null() {
                let value = unsafe { &*cur };
                values.push(value.clone());
                cur = L::link(value).load(Ordering::Acquire);
            }
        }
        ChainIterator {
            table: self,
            remaining: values.into_iter(),
            last: None,
        }
    }
}

/// An iterator over a snapshot of a table's values, supporting removal of
/// the value most recently yielded.
pub struct ChainIterator<'t, V, A, L> {
    table: &'t IntrusiveChainedTable<V, A, L>,
    remaining: std::vec::IntoIter<V>,
    last: Option<V>,
}

impl<'t, V, A, L> Iterator for ChainIterator<'t, V, A, L>
where
    A: KeyAdapter<V>,
    L: LinkAdapter<V>,
    V: Clone,
{
    type Item = V;

    fn next(&mut self) -> Option<V> {
        let value = self.remaining.next()?;
        self.last = Some(value.clone());
        Some(value)
    }
}

impl<'t, V, A, L> ChainIterator<'t, V, A, L>
where
    A: KeyAdapter<V>,
    L: LinkAdapter<V>,
    V: Clone,
{
    /// Removes the value most recently returned by `next()` from the live
    /// table. `next()` has already advanced past it, so the removal here
    /// cannot invalidate this iterator's own position. Returns `Ok(None)`
    /// if `next()` hasn't been called yet, or if the entry was already
    /// removed by another writer since it was yielded.
    pub fn remove(&mut self) -> Option<V> {
        let value = self.last.take()?;
        self.table.remove_key(&A::key_of(&value))
    }
}

impl<V, A, L> Drop for IntrusiveChainedTable<V, A, L>
where
    L: LinkAdapter<V>,
{
    fn drop(&mut self) {
        // SAFETY: &mut self means no concurrent access is possible.
        let guard = unsafe { epoch::unprotected() };
        let shared = self.buckets.load(Ordering::Acquire, guard);
        if shared.is_null() {
            return;
        }
        let array = unsafe { shared.deref() };
        for bucket in array.heads.iter() {
            let mut cur = bucket.swap(ptr::null_mut(), Ordering::Relaxed);
            while !cur.is_null() {
                let boxed = unsafe { Box::from_raw(cur) };
                let next = L::link(&boxed).load(Ordering::Relaxed);
                drop(boxed);
                cur = next;
            }
        }
        let shared = self.buckets.swap(crossbeam_epoch::Shared::null(), Ordering::Relaxed, guard);
        if !shared.is_null() {
            unsafe {
                drop(shared.into_owned());
            }
        }
    }
}
