//! Layered persistent map
//!
//! A [`PersistentMap`] is a singly linked chain of immutable layers, each
//! holding exactly one key/value pair. Binding a key prepends a layer and
//! returns a new head; the old head stays valid and unchanged, so any number
//! of maps can share a common tail. Lookup walks from the head and stops at
//! the first layer whose key matches, so the most recent binding wins.
//!
//! Cost model:
//! - `bind` is O(1)
//! - `lookup` is O(depth) in the worst case
//! - `resolved` is O(depth) and is what environment branching copies

use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;
use std::rc::Rc;

use rustc_hash::FxHashSet;
use thiserror::Error;

/// Lookup ran off the end of the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("key not found")]
pub struct KeyNotFound;

struct Layer<K, V> {
    key: K,
    value: V,
    next: Option<Rc<Layer<K, V>>>,
}

/// Immutable, layered key/value map where the newest layer wins.
pub struct PersistentMap<K, V> {
    head: Option<Rc<Layer<K, V>>>,
    depth: usize,
}

impl<K, V> PersistentMap<K, V> {
    /// A map with no bindings
    pub fn empty() -> Self {
        PersistentMap {
            head: None,
            depth: 0,
        }
    }

    /// Return a new map with `(key, value)` as its head layer.
    /// `self` is left untouched.
    pub fn bind(&self, key: K, value: V) -> Self {
        PersistentMap {
            head: Some(Rc::new(Layer {
                key,
                value,
                next: self.head.clone(),
            })),
            depth: self.depth + 1,
        }
    }

    /// Fold `bind` over `pairs`. Later pairs override earlier ones and any
    /// pre-existing binding of the same key.
    pub fn merge_into<I>(&self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
    {
        pairs
            .into_iter()
            .fold(self.clone(), |map, (key, value)| map.bind(key, value))
    }

    /// Number of layers, shadowed ones included
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Key of the most recently added layer
    pub fn head_key(&self) -> Option<&K> {
        self.head.as_ref().map(|layer| &layer.key)
    }

    /// Every layer from newest to oldest, shadowed bindings included
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            next: self.head.as_deref(),
        }
    }

    /// True if both maps share the same head layer
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (&self.head, &other.head) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl<K: Eq, V> PersistentMap<K, V> {
    /// Find the value bound to `key` by the most recent layer
    pub fn lookup<Q>(&self, key: &Q) -> Result<&V, KeyNotFound>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        self.iter()
            .find(|(k, _)| Borrow::<Q>::borrow(*k) == key)
            .map(|(_, v)| v)
            .ok_or(KeyNotFound)
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        self.lookup(key).ok()
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        self.lookup(key).is_ok()
    }
}

impl<K: Eq + Hash + Clone, V: Clone> PersistentMap<K, V> {
    /// One entry per distinct key, holding the visible value.
    ///
    /// Entries come out oldest first, so binding them in order onto an
    /// empty map reproduces the same lookups and the same head key.
    pub fn resolved(&self) -> Vec<(K, V)> {
        let mut seen = FxHashSet::default();
        let mut entries: Vec<(K, V)> = self
            .iter()
            .filter(|(k, _)| seen.insert(*k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        entries.reverse();
        entries
    }

    /// Number of distinct keys
    pub fn len(&self) -> usize {
        let mut seen = FxHashSet::default();
        self.iter().filter(|(k, _)| seen.insert(*k)).count()
    }

    /// A fresh chain holding only the visible bindings, sharing no layers
    /// with `self`.
    pub fn compacted(&self) -> Self {
        Self::empty().merge_into(self.resolved())
    }
}

impl<K, V> Clone for PersistentMap<K, V> {
    fn clone(&self) -> Self {
        PersistentMap {
            head: self.head.clone(),
            depth: self.depth,
        }
    }
}

impl<K, V> Default for PersistentMap<K, V> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<K, V> Drop for PersistentMap<K, V> {
    // Unlink uniquely owned layers one at a time; the default recursive
    // drop overflows the stack on long chains.
    fn drop(&mut self) {
        let mut next = self.head.take();
        while let Some(layer) = next {
            match Rc::try_unwrap(layer) {
                Ok(mut layer) => next = layer.next.take(),
                Err(_) => break,
            }
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for PersistentMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<K, V> FromIterator<(K, V)> for PersistentMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::empty(), |map, (key, value)| map.bind(key, value))
    }
}

/// Iterator over layers, newest first
pub struct Iter<'a, K, V> {
    next: Option<&'a Layer<K, V>>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let layer = self.next?;
        self.next = layer.next.as_deref();
        Some((&layer.key, &layer.value))
    }
}

impl<'a, K, V> IntoIterator for &'a PersistentMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
