//! Arena store for port-pair statistics.
//!
//! Each directed pair is interned once to a stable [`PairKey`]; statistics
//! live in a flat table indexed by that key. Entries and the key table are
//! shared between clones and copied on write, so cloning the store is the
//! snapshot operation and an update copies only the pair it touches.

use std::collections::HashMap;
use std::sync::Arc;

use super::stats::PortPairStatistics;

/// Interned key of a directed port pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PairKey(u32);

impl PairKey {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PortPairStore {
    /// origin -> destination -> key
    keys: Arc<HashMap<String, HashMap<String, PairKey>>>,
    entries: Vec<Arc<PortPairStatistics>>,
}

impl PortPairStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(&self, origin: &str, destination: &str) -> Option<PairKey> {
        self.keys.get(origin)?.get(destination).copied()
    }

    /// Key for the pair, allocating an empty entry if the pair is new.
    pub fn intern(&mut self, origin: &str, destination: &str) -> PairKey {
        if let Some(key) = self.key(origin, destination) {
            return key;
        }
        let key = PairKey(self.entries.len() as u32);
        self.entries
            .push(Arc::new(PortPairStatistics::new(origin, destination)));
        Arc::make_mut(&mut self.keys)
            .entry(origin.to_string())
            .or_default()
            .insert(destination.to_string(), key);
        key
    }

    pub fn get(&self, key: PairKey) -> Option<&PortPairStatistics> {
        self.entries.get(key.index()).map(Arc::as_ref)
    }

    pub fn get_mut(&mut self, key: PairKey) -> Option<&mut PortPairStatistics> {
        self.entries.get_mut(key.index()).map(Arc::make_mut)
    }

    pub fn lookup(&self, origin: &str, destination: &str) -> Option<&PortPairStatistics> {
        self.key(origin, destination).and_then(|key| self.get(key))
    }

    /// Entries in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = &PortPairStatistics> {
        self.entries.iter().map(Arc::as_ref)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_is_stable() {
        let mut store = PortPairStore::new();
        let a = store.intern("NLRTM", "GBFXT");
        let b = store.intern("GBFXT", "NLRTM");
        assert_ne!(a, b);
        assert_eq!(store.intern("NLRTM", "GBFXT"), a);
        assert_eq!(store.len(), 2);
        assert_eq!(store.key("NLRTM", "GBFXT"), Some(a));
        assert!(store.lookup("NLRTM", "DEHAM").is_none());
    }

    #[test]
    fn test_clone_copies_only_written_entries() {
        let mut store = PortPairStore::new();
        let a = store.intern("NLRTM", "GBFXT");
        let b = store.intern("GBFXT", "NLRTM");
        let frozen = store.clone();

        store.get_mut(b).unwrap().observations = 3;

        assert!(Arc::ptr_eq(&store.entries[a.index()], &frozen.entries[a.index()]));
        assert!(!Arc::ptr_eq(&store.entries[b.index()], &frozen.entries[b.index()]));
        assert!(Arc::ptr_eq(&store.keys, &frozen.keys));
        assert_eq!(frozen.get(b).unwrap().observations, 0);
        assert_eq!(store.get(b).unwrap().observations, 3);

        store.intern("DEHAM", "NLRTM");
        assert!(!Arc::ptr_eq(&store.keys, &frozen.keys));
        assert_eq!(frozen.len(), 2);
    }
}
