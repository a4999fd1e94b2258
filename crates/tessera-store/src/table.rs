//! Id-keyed table.
//!
//! Rows live in a `BTreeMap` so iteration order is deterministic and
//! matches id allocation order. Ids are never reused.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A table of rows keyed by a monotonically allocated id.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Table<K: Ord, T> {
    rows: BTreeMap<K, T>,
    next_id: u64,
}

impl<K: Ord + Copy, T> Table<K, T> {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: 0,
        }
    }

    /// Reserve the next id. Ids start at zero and only increase.
    pub fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn insert(&mut self, key: K, row: T) {
        self.rows.insert(key, row);
    }

    pub fn get(&self, key: &K) -> Option<&T> {
        self.rows.get(key)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut T> {
        self.rows.get_mut(key)
    }

    pub fn remove(&mut self, key: &K) -> Option<T> {
        self.rows.remove(key)
    }

    /// Keys in ascending order.
    pub fn keys(&self) -> impl Iterator<Item = K> + '_ {
        self.rows.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl<K: Ord + Copy, T> Default for Table<K, T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_not_reused_after_remove() {
        let mut table: Table<u64, &str> = Table::new();
        let a = table.allocate_id();
        table.insert(a, "a");
        table.remove(&a);
        let b = table.allocate_id();
        assert_ne!(a, b);
        assert!(table.is_empty());
    }

    #[test]
    fn test_keys_ascending() {
        let mut table: Table<u64, u8> = Table::new();
        for v in 0..5u8 {
            let id = table.allocate_id();
            table.insert(id, v);
        }
        table.remove(&2);
        let keys: Vec<u64> = table.keys().collect();
        assert_eq!(keys, vec![0, 1, 3, 4]);
        assert_eq!(table.len(), 4);
    }
}
