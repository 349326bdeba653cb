// Copyright (c) 2025 Keyed Hash Collections Contributors
//
//! Keyed hash collections: tables whose key is derived from the value
//! instead of stored beside it.
//!
//! Two storage strategies are provided, both parameterised by a
//! [`KeyAdapter`] that derives a value's key:
//!
//! - [`OpenAddressedTable`]: flat, double-hash-probed, tombstone-deleted.
//! - [`IntrusiveChainedTable`]: separately chained, with the chain's `next`
//!   link threaded through the value itself via [`LinkAdapter`], so no
//!   per-entry node is allocated.
//!
//! Both tables allow a single writer at a time (serialised under an
//! internal `parking_lot::Mutex`) while reads proceed lock-free against a
//! `crossbeam-epoch`-guarded snapshot of the backing storage.

pub mod adapter;
pub mod config;
pub mod error;
pub mod intrusive;
pub mod open_addressed;
pub mod prime;
pub mod views;

pub use adapter::{F64Key, KeyAdapter, LinkAdapter};
pub use config::TableConfig;
pub use error::{KeyedError, Result};
pub use intrusive::{ChainIterator, IntrusiveChainedTable};
pub use open_addressed::OpenAddressedTable;
pub use prime::PrimeTable;
pub use views::{EntrySetView, KeySetView, ValuesView};
