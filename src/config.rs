// Copyright (c) 2025 Keyed Hash Collections Contributors
//
// Shared construction parameters for both table families.

/// Configuration shared by both table families.
///
/// A small, cloneable, all-public-fields struct that callers build with
/// struct-update syntax rather than a builder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableConfig {
    /// Capacity requested at construction. For `OpenAddressedTable` this is
    /// rounded up to the next tabulated prime; for `IntrusiveChainedTable`
    /// it seeds the initial bucket count.
    pub initial_capacity: usize,
    /// Fraction of capacity above which a rehash is triggered, in `(0, 1)`.
    pub load_factor: f64,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 16,
            load_factor: 0.5,
        }
    }
}

impl TableConfig {
    /// Build a config with the given initial capacity and the default load factor.
    pub fn with_capacity(initial_capacity: usize) -> Self {
        Self {
            initial_capacity,
            ..Self::default()
        }
    }

    /// Build a config with the given load factor and the default capacity.
    pub fn with_load_factor(load_factor: f64) -> Self {
        Self {
            load_factor,
            ..Self::default()
        }
    }

    pub(crate) fn validate(&self) -> crate::error::Result<()> {
        if !(self.load_factor > 0.0 && self.load_factor < 1.0) {
            return Err(crate::error::KeyedError::InternalInvariantBroken(format!(
                "load_factor {} is not in (0, 1)",
                self.load_factor
            )));
        }
        Ok(())
    }
}
