//! Ordered, name-keyed dictionaries.
//!
//! Nearly every subfile owns one or more dictionaries of named children
//! (materials, shapes, fog animations, user data). Iteration order is
//! insertion order, which is also the order entries are laid out in on
//! encode; names are unique per dictionary.

use std::hash::BuildHasherDefault;

use hashbrown::HashMap as FastHashMap;
use rustc_hash::FxHasher;

use crate::{Error, Result};

type FxHashMap<K, V> = FastHashMap<K, V, BuildHasherDefault<FxHasher>>;

/// An insertion-ordered map keyed by entry name.
///
/// Lookups go through a hash index; iteration walks the entries in the
/// order they were inserted (for decoded dictionaries, the file order).
#[derive(Debug, Clone)]
pub struct NameDict<T> {
    entries: Vec<(String, T)>,
    index: FxHashMap<String, usize>,
}

impl<T> NameDict<T> {
    /// Create an empty dictionary.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: FxHashMap::default(),
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check whether the dictionary has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append an entry. Fails if the name is already present.
    pub fn insert(&mut self, name: impl Into<String>, value: T) -> Result<()> {
        let name = name.into();
        if self.index.contains_key(&name) {
            return Err(Error::DuplicateKey { key: name });
        }
        self.index.insert(name.clone(), self.entries.len());
        self.entries.push((name, value));
        Ok(())
    }

    /// Look up an entry by name.
    pub fn get(&self, name: &str) -> Option<&T> {
        self.index.get(name).map(|&i| &self.entries[i].1)
    }

    /// Look up an entry by name, mutably.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut T> {
        match self.index.get(name) {
            Some(&i) => Some(&mut self.entries[i].1),
            None => None,
        }
    }

    /// Check whether a name is present.
    pub fn contains_key(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Iterate values in insertion order.
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|(_, value)| value)
    }

    /// Iterate names in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }
}

impl<T> Default for NameDict<T> {
    fn default() -> Self {
        Self::new()
    }
}

// Order-sensitive: two dictionaries with the same entries in different
// insertion orders are not equal.
impl<T: PartialEq> PartialEq for NameDict<T> {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_order() {
        let mut dict = NameDict::new();
        dict.insert("zeta", 1).unwrap();
        dict.insert("alpha", 2).unwrap();
        dict.insert("mid", 3).unwrap();

        let keys: Vec<_> = dict.keys().collect();
        assert_eq!(keys, ["zeta", "alpha", "mid"]);
        assert_eq!(dict.get("alpha"), Some(&2));
    }

    #[test]
    fn test_duplicate_key() {
        let mut dict = NameDict::new();
        dict.insert("bone", 0).unwrap();

        assert!(matches!(
            dict.insert("bone", 1),
            Err(Error::DuplicateKey { key }) if key == "bone"
        ));
        assert_eq!(dict.len(), 1);
    }

    #[test]
    fn test_order_sensitive_equality() {
        let mut a = NameDict::new();
        a.insert("x", 1).unwrap();
        a.insert("y", 2).unwrap();

        let mut b = NameDict::new();
        b.insert("y", 2).unwrap();
        b.insert("x", 1).unwrap();

        assert_ne!(a, b);
    }
}
