// Copyright (c) 2025 Keyed Hash Collections Contributors
//
//! Key and link extraction.
//!
//! A naive design would split key extraction into boxed and unboxed
//! flavours so that primitive keys (`u32`, `u64`, `f64`) could be hashed and
//! compared without allocating a wrapper object on the hot path. Rust
//! generics monomorphise instead: `KeyAdapter<V>::Key = u64` compiles to the
//! same code whether or not some other `impl` in the crate uses
//! `Key = String`. There is nothing left to box, so one generic trait
//! covers both cases.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::AtomicPtr;

/// Masks a hash down to 31 bits so it can be combined with the probe step
/// computation without sign-bit surprises. Changing this mask changes which
/// slot a given key lands in, so it is fixed for the life of a table.
pub const HASH_MASK: u64 = 0x7FFF_FFFF;

/// Extracts and hashes the derived key of a value, and compares a key
/// against a value.
///
/// Implementors are almost always zero-sized marker types: the adapter
/// carries no data of its own, it just names how to pull a `Key` out of a
/// `V`.
pub trait KeyAdapter<V>: Send + Sync + 'static {
    /// The derived key type. Use a primitive (`u32`, `u64`, `F64Key`) to get
    /// an unboxed hot path; use any `Hash + Eq + Clone` type for a generic
    /// reference key.
    type Key: Hash + Eq + Clone;

    /// Extracts the key that `value` is stored under.
    fn key_of(value: &V) -> Self::Key;

    /// Hashes a key. The default uses `std`'s `SipHash` plus the sign mask;
    /// override this when a concrete adapter can hash its primitive key
    /// more cheaply than routing it through `Hash`/`Hasher`.
    fn hash_of(key: &Self::Key) -> u64 {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        hasher.finish() & HASH_MASK
    }

    /// Compares a key against a value's derived key. The default re-derives
    /// the value's key and compares; override if a value carries a cheaper
    /// witness of its own key (e.g. a stored hash).
    fn equal_key(key: &Self::Key, value: &V) -> bool {
        Self::key_of(value) == *key
    }
}

/// Bit-identical wrapper around an `f64`'s key. `+0.0` and `-0.0` compare
/// equal as `f64` but hash to different slots here, because the key is
/// compared and hashed by its raw 64-bit pattern rather than by IEEE-754
/// equality. Kept verbatim rather than "fixed" since changing it would be
/// an observable behavior change for existing callers.
#[derive(Debug, Clone, Copy)]
pub struct F64Key(u64);

impl F64Key {
    pub fn new(value: f64) -> Self {
        Self(value.to_bits())
    }

    pub fn value(&self) -> f64 {
        f64::from_bits(self.0)
    }
}

impl PartialEq for F64Key {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for F64Key {}

impl Hash for F64Key {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

/// Exposes the "next" link threaded through a value by an intrusive table.
/// The link field lives inside `V` itself; the table never observes or
/// modifies any other field of `V`.
///
/// A naive design would split this into separate `get_next`/`set_next`
/// operations; here both collapse into returning a reference to the atomic
/// cell itself, since the table can then `load`/`store` it directly with
/// the ordering it needs (`Acquire` for lock-free reads, `Release` for the
/// single writer's publishes of the head and next pointers).
///
/// # Safety
/// A value may be linked into at most one chain at a time. Implementors
/// must back this with a real atomic field (not a plain `Option<*mut V>`)
/// so that concurrent lock-free readers never observe a torn pointer.
pub unsafe trait LinkAdapter<V>: Send + Sync + 'static {
    /// Returns the atomic "next" pointer cell embedded in `value`. Null
    /// means end-of-chain.
    fn link(value: &V) -> &AtomicPtr<V>;
}
