// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Keyed atomic get-or-create registry.
//!
//! Shared resources keyed by a connection target (sessions by server URL,
//! publishers by broker target) are created at most once per key even under
//! concurrent lookups. Creation for one key never blocks lookups or
//! creation for another key.

use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::OnceCell;

use crate::error::UaResult;

/// A concurrent map of lazily-created shared values.
///
/// Each key owns a [`OnceCell`]; racing initializers for the same key are
/// serialized by the cell, so exactly one future runs and the losers wait
/// for its outcome. A failed initialization leaves the cell empty and the
/// next caller retries.
pub struct KeyedRegistry<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    cells: DashMap<K, Arc<OnceCell<V>>>,
}

impl<K, V> KeyedRegistry<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            cells: DashMap::new(),
        }
    }

    /// Returns the value for `key`, creating it with `init` if absent.
    ///
    /// `init` runs at most once per key per generation; removal starts a
    /// new generation. The map guard is released before awaiting so other
    /// keys stay accessible while `init` runs.
    pub async fn get_or_try_init<F, Fut>(&self, key: &K, init: F) -> UaResult<V>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = UaResult<V>>,
    {
        let cell = {
            let entry = self
                .cells
                .entry(key.clone())
                .or_insert_with(|| Arc::new(OnceCell::new()));
            entry.value().clone()
        };

        let value = cell.get_or_try_init(init).await?;
        Ok(value.clone())
    }

    /// Returns the value for `key` if it has been created.
    pub fn get(&self, key: &K) -> Option<V> {
        self.cells
            .get(key)
            .and_then(|cell| cell.get().cloned())
    }

    /// Removes `key`, returning its value if one was created.
    ///
    /// An initializer already running against the removed cell completes
    /// against that cell; its value is simply no longer reachable here.
    pub fn remove(&self, key: &K) -> Option<V> {
        self.cells
            .remove(key)
            .and_then(|(_, cell)| cell.get().cloned())
    }

    /// Removes every key, returning the created values.
    pub fn take_all(&self) -> Vec<(K, V)> {
        let keys: Vec<K> = self.cells.iter().map(|entry| entry.key().clone()).collect();
        keys.into_iter()
            .filter_map(|key| {
                self.cells
                    .remove(&key)
                    .and_then(|(k, cell)| cell.get().cloned().map(|v| (k, v)))
            })
            .collect()
    }

    /// Returns `true` if a value has been created for `key`.
    pub fn contains(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Number of keys, counting cells still being initialized.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns `true` if the registry holds no keys.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl<K, V> Default for KeyedRegistry<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> std::fmt::Debug for KeyedRegistry<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyedRegistry")
            .field("keys", &self.cells.len())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
