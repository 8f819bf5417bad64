//! Bounded cache with usefulness-driven purge
//!
//! Insertion-ordered store of tile-keyed entries with a capacity limit.
//! Each entry carries a `useful` flag, rewritten wholesale by `visit`;
//! `purge` evicts down to capacity, not-useful entries first. Iteration
//! always follows insertion order, so eviction and downstream emissions
//! are deterministic.

use std::collections::{HashMap, HashSet};

use crate::tile::{TileBound, TileId};

struct Slot<T> {
    value: T,
    useful: bool,
}

/// Capacity-limited, usefulness-marked store of tile-keyed entries
pub struct Cache<T> {
    entries: HashMap<TileId, Slot<T>>,
    /// Insertion order, oldest first. Re-inserting an id refreshes its position.
    insertion_order: Vec<TileId>,
    capacity: usize,
}

impl<T: TileBound> Cache<T> {
    /// Create a cache with the given capacity
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
            insertion_order: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Add or replace entries. New and replaced entries are marked useful;
    /// a replaced id moves to the back of the insertion order. Inserting
    /// may exceed capacity until the next `purge`.
    pub fn insert(&mut self, items: Vec<T>) {
        for item in items {
            let id = item.tile_id();
            if self.entries.contains_key(&id) {
                self.insertion_order.retain(|other| *other != id);
            }
            self.entries.insert(id, Slot { value: item, useful: true });
            self.insertion_order.push(id);
        }
    }

    pub fn contains(&self, id: TileId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Rewrite every entry's useful flag from the predicate, in insertion
    /// order. Never removes entries.
    pub fn visit<F>(&mut self, mut f: F)
    where
        F: FnMut(&T) -> bool,
    {
        for id in &self.insertion_order {
            if let Some(slot) = self.entries.get_mut(id) {
                slot.useful = f(&slot.value);
            }
        }
    }

    /// Evict entries until size fits the capacity: not-useful entries go
    /// first (oldest insertion first), then useful entries (oldest first).
    /// Returns the evicted entries in eviction order.
    pub fn purge(&mut self) -> Vec<T> {
        if self.entries.len() <= self.capacity {
            return Vec::new();
        }
        let n_to_evict = self.entries.len() - self.capacity;

        let mut victims: Vec<TileId> = Vec::with_capacity(n_to_evict);
        for &id in &self.insertion_order {
            if victims.len() == n_to_evict {
                break;
            }
            if !self.entries[&id].useful {
                victims.push(id);
            }
        }
        if victims.len() < n_to_evict {
            for &id in &self.insertion_order {
                if victims.len() == n_to_evict {
                    break;
                }
                if self.entries[&id].useful {
                    victims.push(id);
                }
            }
        }

        let victim_set: HashSet<TileId> = victims.iter().copied().collect();
        self.insertion_order.retain(|id| !victim_set.contains(id));
        victims
            .into_iter()
            .filter_map(|id| self.entries.remove(&id).map(|slot| slot.value))
            .collect()
    }

    /// Update the capacity target. Takes effect at the next `purge`.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
    }

    pub fn n_cached_objects(&self) -> usize {
        self.entries.len()
    }

    /// Cached ids in insertion order, oldest first
    pub fn ids(&self) -> impl Iterator<Item = TileId> + '_ {
        self.insertion_order.iter().copied()
    }
}
