// Copyright (c) 2025 Keyed Hash Collections Contributors
//
// Crate-wide error type.

use thiserror::Error;

/// Errors surfaced by keyed hash collections.
///
/// Every variant is surfaced to the caller unchanged: the tables never catch,
/// retry, or fall back on their own errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyedError {
    /// A put/replace/factory result's derived key differs from the key the
    /// caller supplied.
    #[error("derived key does not match the supplied key")]
    KeyInconsistent,

    /// `replace`'s expected-value argument was `None` where the API requires
    /// a concrete expected value.
    #[error("null value disallowed where a value is required")]
    NullValueDisallowed,

    /// A probe sequence returned to its starting slot without finding an
    /// empty slot or the target key. Indicates a violated invariant
    /// (concurrent corruption or a bad load factor); never expected in
    /// correct operation.
    #[error("probe sequence cycled back to its origin without resolving")]
    CycleDetected,

    /// An internal consistency check failed, e.g. `clear()` left a nonzero
    /// size, or a rehash computed a shrinking capacity.
    #[error("internal invariant broken: {0}")]
    InternalInvariantBroken(String),

    /// A cursor-style iterator was advanced past its end.
    #[error("no such element")]
    NoSuchElement,
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, KeyedError>;
