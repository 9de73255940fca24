//! Tracked-Symbol Registry
//!
//! The set of instrument symbols the upstream feed should be delivering
//! ticks for. Written by collaborator request tasks (position create/delete)
//! and read by the feed connector when it re-establishes subscriptions after
//! a reconnect.
//!
//! # Design
//!
//! Membership is a flat set: a symbol is either tracked or it is not.
//! Reference counting across multiple logical owners (several portfolios
//! holding the same symbol) is deliberately a collaborator concern and is
//! not enforced here; removal races with a concurrent add resolve as
//! "present wins" on whichever mutation lands last.

use std::collections::HashSet;

use parking_lot::RwLock;

use crate::domain::pricing::Symbol;

/// Thread-safe set of tracked symbols.
///
/// All operations are total: adding a present symbol or removing an absent
/// one is defined as success, not an error.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    symbols: RwLock<HashSet<Symbol>>,
}

impl SubscriptionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a symbol to the tracked set.
    ///
    /// Returns `true` if the symbol was newly added, `false` if it was
    /// already tracked.
    pub fn insert(&self, symbol: &str) -> bool {
        self.symbols.write().insert(symbol.to_string())
    }

    /// Remove a symbol from the tracked set.
    ///
    /// Returns `true` if the symbol was present.
    pub fn discard(&self, symbol: &str) -> bool {
        self.symbols.write().remove(symbol)
    }

    /// Check whether a symbol is currently tracked.
    #[must_use]
    pub fn contains(&self, symbol: &str) -> bool {
        self.symbols.read().contains(symbol)
    }

    /// Snapshot of the current set, for resubscription after reconnect.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Symbol> {
        self.symbols.read().iter().cloned().collect()
    }

    /// Number of tracked symbols.
    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.read().len()
    }

    /// Check whether no symbol is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.read().is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================
