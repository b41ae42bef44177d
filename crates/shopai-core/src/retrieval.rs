//! Embedding retrieval over expanded queries.
//!
//! Every expansion is embedded in one batch and searched independently. Hits
//! are resolved to catalog products through the index's positional id list
//! and merged into a [`CandidatePool`] keeping the smallest distance per
//! product.

use crate::candidate::{Candidate, CandidatePool};
use crate::catalog::Catalog;
use crate::embedding::{check_embeddings, EmbeddingBackend};
use crate::errors::ShopResult;
use crate::index::ProductIndex;

/// Searches the embedding index for each expanded query.
pub struct EmbeddingRetriever<'a> {
    catalog: &'a Catalog,
    embedder: &'a dyn EmbeddingBackend,
    index: &'a dyn ProductIndex,
    neighbor_k: usize,
}

impl<'a> EmbeddingRetriever<'a> {
    pub fn new(
        catalog: &'a Catalog,
        embedder: &'a dyn EmbeddingBackend,
        index: &'a dyn ProductIndex,
        neighbor_k: usize,
    ) -> Self {
        Self {
            catalog,
            embedder,
            index,
            neighbor_k,
        }
    }

    /// Neighbors requested per query: `min(neighbor_k, index size)`.
    pub fn effective_k(&self) -> usize {
        self.neighbor_k.min(self.index.len())
    }

    /// Retrieve and merge candidates for all `queries`.
    ///
    /// Positions outside the id list and ids missing from the catalog are
    /// skipped. Embedding and search failures are returned to the caller.
    pub fn retrieve(&self, queries: &[String]) -> ShopResult<CandidatePool<'a>> {
        let mut pool = CandidatePool::new();
        let k = self.effective_k();
        if k == 0 || queries.is_empty() {
            return Ok(pool);
        }

        let vectors = self.embedder.embed_batch(queries)?;
        check_embeddings(self.embedder, queries.len(), &vectors)?;

        for (query, vector) in queries.iter().zip(&vectors) {
            let hits = self.index.search(vector, k)?;
            tracing::trace!("Query '{}' returned {} hits", query, hits.len());

            for hit in hits {
                let Some(id) = self.index.product_id_at(hit.position) else {
                    tracing::warn!(
                        "Index returned out-of-range position {} (size {}), skipping",
                        hit.position,
                        self.index.len()
                    );
                    continue;
                };
                let Some(product) = self.catalog.get(id) else {
                    tracing::warn!("Indexed product '{}' is not in the catalog, skipping", id);
                    continue;
                };
                pool.insert(Candidate::new(product, hit.distance));
            }
        }

        tracing::debug!(
            "Retrieved {} unique candidates from {} queries (k={})",
            pool.len(),
            queries.len(),
            k
        );
        Ok(pool)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexHit;
    use crate::testing::{sample_catalog, FailingBackend, MemoryIndex, MockEmbeddingBackend};

    fn queries(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn index() -> MemoryIndex {
        MemoryIndex::new(vec![
            ("ELEC001", vec![0.0, 0.0]),
            ("ELEC002", vec![1.0, 0.0]),
            ("SPORTS001", vec![0.0, 2.0]),
        ])
    }

    #[test]
    fn test_effective_k_capped_by_index_size() {
        let catalog = sample_catalog();
        let embedder = MockEmbeddingBackend::new(vec![0.0, 0.0]);
        let index = index();
        let retriever = EmbeddingRetriever::new(&catalog, &embedder, &index, 20);
        assert_eq!(retriever.effective_k(), 3);
    }

    #[test]
    fn test_merge_keeps_minimum_distance_across_expansions() {
        let catalog = sample_catalog();
        // "a" sits on ELEC001, "b" sits on ELEC002
        let embedder = MockEmbeddingBackend::new(vec![9.0, 9.0])
            .with_rule("a", vec![0.0, 0.0])
            .with_rule("b", vec![1.0, 0.0]);
        let index = index();
        let retriever = EmbeddingRetriever::new(&catalog, &embedder, &index, 20);

        let pool = retriever.retrieve(&queries(&["a", "b"])).unwrap();
        assert_eq!(pool.len(), 3);
        // ELEC001: 0.0 from "a", 1.0 from "b"
        assert_eq!(pool.get("ELEC001").unwrap().distance, 0.0);
        // ELEC002: 1.0 from "a", 0.0 from "b"
        assert_eq!(pool.get("ELEC002").unwrap().distance, 0.0);
        // SPORTS001: 4.0 from "a", 5.0 from "b"
        assert_eq!(pool.get("SPORTS001").unwrap().distance, 4.0);
    }

    #[test]
    fn test_out_of_range_positions_are_skipped() {
        let catalog = sample_catalog();
        let embedder = MockEmbeddingBackend::new(vec![0.0, 0.0]);
        let index = index().with_extra_hit(IndexHit::new(0.0, 99));
        let retriever = EmbeddingRetriever::new(&catalog, &embedder, &index, 2);

        let pool = retriever.retrieve(&queries(&["耳机"])).unwrap();
        let ids: Vec<_> = pool.into_vec().iter().map(|c| c.id()).collect();
        assert_eq!(ids, vec!["ELEC001", "ELEC002"]);
    }

    #[test]
    fn test_ids_missing_from_catalog_are_skipped() {
        let catalog = sample_catalog();
        let embedder = MockEmbeddingBackend::new(vec![0.0, 0.0]);
        let index = MemoryIndex::new(vec![("GONE001", vec![0.0, 0.0]), ("ELEC001", vec![1.0, 1.0])]);
        let retriever = EmbeddingRetriever::new(&catalog, &embedder, &index, 20);

        let pool = retriever.retrieve(&queries(&["耳机"])).unwrap();
        assert_eq!(pool.len(), 1);
        assert!(pool.get("ELEC001").is_some());
    }

    #[test]
    fn test_embedding_failure_propagates() {
        let catalog = sample_catalog();
        let index = index();
        let retriever = EmbeddingRetriever::new(&catalog, &FailingBackend, &index, 20);
        let err = retriever.retrieve(&queries(&["耳机"])).unwrap_err();
        assert!(err.is_capability_failure());
    }

    #[test]
    fn test_empty_index_searches_nothing() {
        let catalog = sample_catalog();
        let index = MemoryIndex::new(vec![]);
        // a failing embedder proves no embedding call is made
        let retriever = EmbeddingRetriever::new(&catalog, &FailingBackend, &index, 20);
        assert!(retriever.retrieve(&queries(&["耳机"])).unwrap().is_empty());
    }
}
