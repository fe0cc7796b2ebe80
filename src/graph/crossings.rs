use super::EdgeKey;
use std::collections::{BTreeMap, BTreeSet};

/// Symmetric edge-crossing relation.
///
/// `e` is in `f`'s set exactly when `f` is in `e`'s set; `pairs` counts each
/// unordered crossing once.
#[derive(Debug, Clone, Default)]
pub(crate) struct CrossingCache {
    by_edge: BTreeMap<EdgeKey, BTreeSet<EdgeKey>>,
    pairs: usize,
}

impl CrossingCache {
    pub(crate) fn pairs(&self) -> usize {
        self.pairs
    }

    /// Records a crossing between `e` and `f`. Returns false if it was known.
    pub(crate) fn insert(&mut self, e: EdgeKey, f: EdgeKey) -> bool {
        if !self.by_edge.entry(e).or_default().insert(f) {
            return false;
        }
        self.by_edge.entry(f).or_default().insert(e);
        self.pairs += 1;
        true
    }

    /// Forgets every crossing involving `edge`; returns how many were dropped.
    pub(crate) fn remove_edge(&mut self, edge: EdgeKey) -> usize {
        let Some(crossed) = self.by_edge.remove(&edge) else {
            return 0;
        };
        for other in &crossed {
            if let Some(set) = self.by_edge.get_mut(other) {
                set.remove(&edge);
                if set.is_empty() {
                    self.by_edge.remove(other);
                }
            }
        }
        self.pairs -= crossed.len();
        crossed.len()
    }

    /// Replaces the crossings of `edge` with `crossed`.
    pub(crate) fn replace(&mut self, edge: EdgeKey, crossed: impl IntoIterator<Item = EdgeKey>) {
        self.remove_edge(edge);
        for other in crossed {
            self.insert(edge, other);
        }
    }

    pub(crate) fn crossed_by(&self, edge: EdgeKey) -> BTreeSet<EdgeKey> {
        self.by_edge.get(&edge).cloned().unwrap_or_default()
    }

    pub(crate) fn contains(&self, e: EdgeKey, f: EdgeKey) -> bool {
        self.by_edge.get(&e).is_some_and(|set| set.contains(&f))
    }

    /// Unordered crossing pairs, each listed once.
    pub(crate) fn iter_pairs(&self) -> impl Iterator<Item = (EdgeKey, EdgeKey)> + '_ {
        self.by_edge.iter().flat_map(|(&e, set)| {
            set.iter()
                .filter(move |&&f| e < f)
                .map(move |&f| (e, f))
        })
    }

    pub(crate) fn clear(&mut self) {
        self.by_edge.clear();
        self.pairs = 0;
    }
}
