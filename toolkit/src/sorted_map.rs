use std::borrow::Borrow;
use std::fmt::{Debug, Formatter};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// A compact, immutable associative container backed by two parallel sorted vectors.
///
/// Construction sorts once, lookups are binary searches. There is no insertion after
/// construction, values can be changed in place.
#[derive(Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct SortedMap<K, V> {
    keys: Vec<K>,
    values: Vec<V>,
}

impl<K, V> Default for SortedMap<K, V> {
    fn default() -> Self {
        Self { keys: Vec::new(), values: Vec::new() }
    }
}

impl<K: Ord, V> SortedMap<K, V> {
    /// Builds the map, for duplicate keys the last value wins.
    pub fn from_unsorted(entries: impl IntoIterator<Item = (K, V)>) -> Self {
        let mut entries = entries.into_iter().collect_vec();
        // stable, so the later duplicate stays behind the earlier one
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        let mut keys: Vec<K> = Vec::with_capacity(entries.len());
        let mut values: Vec<V> = Vec::with_capacity(entries.len());
        for (k, v) in entries {
            if keys.last().is_some_and(|last| *last == k) {
                if let Some(last) = values.last_mut() {
                    *last = v;
                }
            } else {
                keys.push(k);
                values.push(v);
            }
        }
        Self { keys, values }
    }

    fn position<Q>(&self, key: &Q) -> Option<usize> where K: Borrow<Q>, Q: Ord + ?Sized {
        self.keys.binary_search_by(|probe| probe.borrow().cmp(key)).ok()
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V> where K: Borrow<Q>, Q: Ord + ?Sized {
        self.position(key).map(|idx| &self.values[idx])
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V> where K: Borrow<Q>, Q: Ord + ?Sized {
        self.position(key).map(|idx| &mut self.values[idx])
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool where K: Borrow<Q>, Q: Ord + ?Sized {
        self.position(key).is_some()
    }
}

impl<K, V> SortedMap<K, V> {
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn keys(&self) -> std::slice::Iter<'_, K> {
        self.keys.iter()
    }

    pub fn values(&self) -> std::slice::Iter<'_, V> {
        self.values.iter()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.keys.iter().zip(self.values.iter())
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for SortedMap<K, V> {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self::from_unsorted(iter)
    }
}

impl<K, V> IntoIterator for SortedMap<K, V> {
    type Item = (K, V);
    type IntoIter = std::iter::Zip<std::vec::IntoIter<K>, std::vec::IntoIter<V>>;

    fn into_iter(self) -> Self::IntoIter {
        self.keys.into_iter().zip(self.values)
    }
}

impl<K: Debug, V: Debug> Debug for SortedMap<K, V> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
