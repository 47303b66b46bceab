//! Entry Index
//!
//! Sorted list of the keys currently stored in a map. Stores rebuild it from
//! scratch after every mutation, while still holding their write lock, which
//! gives listings and filters a stable, deterministic enumeration order.

use std::collections::HashMap;

/// Ascending list of live keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryIndex {
    keys: Vec<String>,
}

impl EntryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the index contents with `keys`, sorted ascending.
    pub fn rebuild<'a, I>(&mut self, keys: I)
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut keys: Vec<String> = keys.into_iter().cloned().collect();
        keys.sort_unstable();
        self.keys = keys;
    }

    /// Rebuild from the keys of a map.
    pub fn rebuild_from<V>(&mut self, map: &HashMap<String, V>) {
        self.rebuild(map.keys());
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.keys.iter()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
