use std::collections::HashMap;
use arcstr::ArcStr;
use geogrounder_toolkit::sorted_map::SortedMap;
use serde::{Deserialize, Serialize};
use crate::Word;

/// The word counts of a distribution.
///
/// Counts are accumulated in a hash map and compacted into a [SortedMap] once
/// the distribution is frozen, which matters for the many article distributions
/// held in memory at the same time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WordCounts {
    Hashed(HashMap<Word, u64>),
    Sorted(SortedMap<Word, u64>),
}

impl Default for WordCounts {
    fn default() -> Self {
        Self::Hashed(HashMap::new())
    }
}

impl WordCounts {
    pub fn get(&self, word: &str) -> Option<u64> {
        match self {
            WordCounts::Hashed(map) => map.get(word).copied(),
            WordCounts::Sorted(map) => map.get(word).copied(),
        }
    }

    pub fn contains(&self, word: &str) -> bool {
        self.get(word).is_some()
    }

    pub fn len(&self) -> usize {
        match self {
            WordCounts::Hashed(map) => map.len(),
            WordCounts::Sorted(map) => map.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> Box<dyn Iterator<Item = (&Word, u64)> + '_> {
        match self {
            WordCounts::Hashed(map) => Box::new(map.iter().map(|(k, v)| (k, *v))),
            WordCounts::Sorted(map) => Box::new(map.iter().map(|(k, v)| (k, *v))),
        }
    }

    pub fn words(&self) -> impl Iterator<Item = &Word> {
        self.iter().map(|(w, _)| w)
    }

    /// Returns the mutable hash map, expanding a compacted map.
    pub(crate) fn as_hashed_mut(&mut self) -> &mut HashMap<Word, u64> {
        if let WordCounts::Sorted(map) = self {
            let expanded = std::mem::take(map).into_iter().collect();
            *self = WordCounts::Hashed(expanded);
        }
        match self {
            WordCounts::Hashed(map) => map,
            WordCounts::Sorted(_) => unreachable!("expanded above"),
        }
    }

    pub(crate) fn compact(&mut self) {
        if let WordCounts::Hashed(map) = self {
            let sorted = std::mem::take(map).into_iter().collect();
            *self = WordCounts::Sorted(sorted);
        }
    }

    pub fn is_compact(&self) -> bool {
        matches!(self, WordCounts::Sorted(_))
    }
}

impl FromIterator<(Word, u64)> for WordCounts {
    fn from_iter<T: IntoIterator<Item = (Word, u64)>>(iter: T) -> Self {
        let mut map: HashMap<Word, u64> = HashMap::new();
        for (word, count) in iter {
            *map.entry(word).or_default() += count;
        }
        Self::Hashed(map)
    }
}

impl<'a> FromIterator<(&'a str, u64)> for WordCounts {
    fn from_iter<T: IntoIterator<Item = (&'a str, u64)>>(iter: T) -> Self {
        iter.into_iter().map(|(w, c)| (ArcStr::from(w), c)).collect()
    }
}

#[cfg(test)]
mod test {
    use crate::counts::WordCounts;

    #[test]
    fn compact_keeps_counts(){
        let mut counts: WordCounts = vec![("paris", 5), ("france", 3), ("paris", 1)].into_iter().collect();
        assert_eq!(Some(6), counts.get("paris"));
        counts.compact();
        assert!(counts.is_compact());
        assert_eq!(Some(6), counts.get("paris"));
        assert_eq!(Some(3), counts.get("france"));
        *counts.as_hashed_mut().entry("eiffel".into()).or_default() += 1;
        assert!(!counts.is_compact());
        assert_eq!(3, counts.len());
    }
}
