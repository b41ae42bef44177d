//! Candidates flowing between pipeline stages.
//!
//! A [`Candidate`] pairs a catalog product with a distance: lower is better.
//! The fusion reranker is the only stage that ranks by a higher-is-better
//! score, and it converts back (`distance = -combined`) on output.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::Serialize;

use crate::catalog::Product;

/// A product with a stage-specific distance (lower = more relevant).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Candidate<'a> {
    pub product: &'a Product,
    pub distance: f32,
}

impl<'a> Candidate<'a> {
    pub fn new(product: &'a Product, distance: f32) -> Self {
        Self { product, distance }
    }

    pub fn id(&self) -> &'a str {
        &self.product.id
    }
}

/// Ascending by distance; NaN sorts last. Stable, so ties keep input order.
pub fn sort_by_distance(candidates: &mut [Candidate<'_>]) {
    candidates.sort_by(|a, b| compare_distance(a.distance, b.distance));
}

pub(crate) fn compare_distance(a: f32, b: f32) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.total_cmp(&b),
    }
}

// ============================================================================
// CandidatePool
// ============================================================================

/// Deduplicating candidate set keeping the minimum distance per product id.
///
/// Iteration follows first-insertion order so results stay deterministic.
#[derive(Debug, Default, Clone)]
pub struct CandidatePool<'a> {
    entries: Vec<Candidate<'a>>,
    positions: HashMap<&'a str, usize>,
}

impl<'a> CandidatePool<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert, or lower the stored distance if this one is smaller.
    ///
    /// Returns `true` if the id was not present before.
    pub fn insert(&mut self, candidate: Candidate<'a>) -> bool {
        match self.positions.get(candidate.id()) {
            Some(&pos) => {
                let existing = &mut self.entries[pos];
                if candidate.distance < existing.distance {
                    existing.distance = candidate.distance;
                }
                false
            }
            None => {
                self.positions.insert(candidate.id(), self.entries.len());
                self.entries.push(candidate);
                true
            }
        }
    }

    pub fn extend(&mut self, candidates: impl IntoIterator<Item = Candidate<'a>>) {
        for candidate in candidates {
            self.insert(candidate);
        }
    }

    /// Drop every candidate whose id satisfies `excluded`.
    pub fn remove_where(&mut self, mut excluded: impl FnMut(&str) -> bool) {
        self.entries.retain(|c| !excluded(c.id()));
        self.positions = self
            .entries
            .iter()
            .enumerate()
            .map(|(pos, c)| (c.id(), pos))
            .collect();
    }

    pub fn get(&self, id: &str) -> Option<&Candidate<'a>> {
        self.positions.get(id).map(|&pos| &self.entries[pos])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_vec(self) -> Vec<Candidate<'a>> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Category, Price};

    fn product(id: &str) -> Product {
        Product::new(id, id, Category::Books, "", Price::from_cents(100))
    }

    #[test]
    fn test_pool_keeps_minimum_distance() {
        let a = product("A");
        let b = product("B");
        let mut pool = CandidatePool::new();

        assert!(pool.insert(Candidate::new(&a, 0.9)));
        assert!(pool.insert(Candidate::new(&b, 0.4)));
        assert!(!pool.insert(Candidate::new(&a, 0.2)));
        assert!(!pool.insert(Candidate::new(&a, 0.7)));

        assert_eq!(pool.len(), 2);
        assert_eq!(pool.get("A").unwrap().distance, 0.2);
        let ids: Vec<_> = pool.into_vec().iter().map(|c| c.id()).collect();
        assert_eq!(ids, vec!["A", "B"]);
    }

    #[test]
    fn test_remove_where_reindexes() {
        let a = product("A");
        let b = product("B");
        let c = product("C");
        let mut pool = CandidatePool::new();
        pool.extend([
            Candidate::new(&a, 0.1),
            Candidate::new(&b, 0.2),
            Candidate::new(&c, 0.3),
        ]);

        pool.remove_where(|id| id == "A");
        assert!(pool.get("A").is_none());
        assert_eq!(pool.get("C").unwrap().distance, 0.3);

        pool.insert(Candidate::new(&c, 0.05));
        assert_eq!(pool.get("C").unwrap().distance, 0.05);
    }

    #[test]
    fn test_sort_by_distance_puts_nan_last() {
        let a = product("A");
        let b = product("B");
        let c = product("C");
        let mut list = vec![
            Candidate::new(&a, f32::NAN),
            Candidate::new(&b, 0.5),
            Candidate::new(&c, -0.1),
        ];
        sort_by_distance(&mut list);
        let ids: Vec<_> = list.iter().map(|c| c.id()).collect();
        assert_eq!(ids, vec!["C", "B", "A"]);
    }
}
