//! Recommendation service over the assessment catalog.
//!
//! Owns the corpus, the pinned embedder and the embedding index:
//! - The index is built at most once, from the full corpus
//! - Concurrent first callers wait for that single build
//! - After the build every request reads the index without locking

use once_cell::sync::OnceCell;

use crate::catalog::Corpus;
use crate::semantic::embeddings::{Embedder, EmbeddingError};
use crate::semantic::index::EmbeddingIndex;
use crate::semantic::ranker::{rank, RankedResult};

pub struct RecommenderService {
    corpus: Corpus,
    embedder: Box<dyn Embedder>,
    index: OnceCell<EmbeddingIndex>,
}

impl RecommenderService {
    /// Create a service in the unbuilt state.
    ///
    /// Call [`RecommenderService::ensure_built`] before serving to avoid
    /// charging the build to the first request.
    pub fn new(corpus: Corpus, embedder: Box<dyn Embedder>) -> Self {
        Self {
            corpus,
            embedder,
            index: OnceCell::new(),
        }
    }

    /// Number of recommendable assessments. Never triggers a build.
    pub fn assessments_loaded(&self) -> usize {
        self.corpus.len()
    }

    pub fn is_built(&self) -> bool {
        self.index.get().is_some()
    }

    pub fn model_name(&self) -> &str {
        self.embedder.name()
    }

    /// Return the index, building it on first use.
    ///
    /// Exactly one build runs even under concurrent callers. A failed build
    /// leaves the service unbuilt.
    pub fn ensure_built(&self) -> Result<&EmbeddingIndex, EmbeddingError> {
        self.index.get_or_try_init(|| {
            log::info!(
                "embedding {} assessments with '{}'",
                self.corpus.len(),
                self.embedder.name()
            );
            let index = EmbeddingIndex::build(&self.corpus, self.embedder.as_ref())?;
            log::info!(
                "index ready: {} vectors, {} dimensions",
                index.len(),
                index.dimensions()
            );
            Ok(index)
        })
    }

    /// Embed query text with the embedder that built the index.
    pub fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let index = self.ensure_built()?;
        let vector = self.embedder.embed(text)?;

        if !index.is_empty() && vector.len() != index.dimensions() {
            return Err(EmbeddingError::DimensionMismatch {
                expected: index.dimensions(),
                got: vector.len(),
            });
        }

        Ok(vector)
    }

    /// Top `k` assessments for `text`, best first.
    pub fn recommend(&self, text: &str, k: usize) -> Result<Vec<RankedResult>, EmbeddingError> {
        let index = self.ensure_built()?;
        if self.corpus.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let query = self.embed_query(text)?;
        let results = rank(&query, index, &self.corpus, k);

        log::debug!(
            "ranked {} of {} assessments, top score {:?}",
            results.len(),
            self.corpus.len(),
            results.first().map(|r| r.score)
        );

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{DedupPolicy, RawRecord};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Embeds a text as `[len, 1]` and counts batch calls.
    struct CountingEmbedder {
        batches: Arc<AtomicUsize>,
        fail: bool,
    }

    impl Embedder for CountingEmbedder {
        fn name(&self) -> &str {
            "counting"
        }

        fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            self.batches.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(EmbeddingError::EmbeddingFailed("backend down".to_string()));
            }
            std::thread::sleep(std::time::Duration::from_millis(20));
            Ok(texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect())
        }
    }

    fn service(fail: bool) -> (RecommenderService, Arc<AtomicUsize>) {
        let raw = vec![
            RawRecord::new("Numerical Test", "u1", "numbers"),
            RawRecord::new("Verbal Test", "u2", "words"),
        ];
        let batches = Arc::new(AtomicUsize::new(0));
        let embedder = CountingEmbedder {
            batches: batches.clone(),
            fail,
        };
        let service = RecommenderService::new(
            Corpus::load(&raw, DedupPolicy::Keep),
            Box::new(embedder),
        );
        (service, batches)
    }

    #[test]
    fn test_not_built_initially() {
        let (service, batches) = service(false);
        assert!(!service.is_built());
        assert_eq!(service.assessments_loaded(), 2);
        assert_eq!(batches.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_ensure_built_is_idempotent() {
        let (service, batches) = service(false);

        let first = service.ensure_built().unwrap() as *const EmbeddingIndex;
        let second = service.ensure_built().unwrap() as *const EmbeddingIndex;

        assert_eq!(first, second);
        assert_eq!(batches.load(Ordering::SeqCst), 1);
        assert!(service.is_built());
    }

    #[test]
    fn test_concurrent_first_callers_build_once() {
        let (service, batches) = service(false);
        let service = Arc::new(service);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let service = service.clone();
                std::thread::spawn(move || service.ensure_built().map(|i| i.len()).unwrap())
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 2);
        }
        assert_eq!(batches.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_build_is_reported_and_not_cached() {
        let (service, batches) = service(true);

        assert!(matches!(
            service.ensure_built(),
            Err(EmbeddingError::EmbeddingFailed(_))
        ));
        assert!(!service.is_built());

        assert!(service.recommend("anything", 3).is_err());
        assert_eq!(batches.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_recommend_builds_lazily() {
        let (service, _) = service(false);

        let results = service.recommend("abcdefghijklmnopqrstuvwxyz", 1).unwrap();

        assert!(service.is_built());
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_recommend_k_zero() {
        let (service, _) = service(false);
        assert!(service.recommend("query", 0).unwrap().is_empty());
    }

    #[test]
    fn test_empty_corpus_recommends_nothing() {
        let embedder = CountingEmbedder {
            batches: Arc::new(AtomicUsize::new(0)),
            fail: false,
        };
        let service = RecommenderService::new(Corpus::default(), Box::new(embedder));

        assert!(service.recommend("query", 10).unwrap().is_empty());
        assert!(service.is_built());
    }
}
