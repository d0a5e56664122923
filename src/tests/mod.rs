//! Scenario tests across the recommender.
//!
//! A bag-of-words hashing embedder stands in for the model so these run
//! without a download. Tests marked `#[ignore]` need the real model.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::{
    app::AppContext,
    catalog::{Corpus, DedupPolicy, RawRecord},
    resolver::TextExtractor,
    semantic::{Embedder, EmbeddingError, RecommenderService},
};


const HASHING_DIMENSIONS: usize = 256;

/// Deterministic embedder: each lowercased word adds 1 to a hashed bucket.
pub struct HashingEmbedder;

impl Embedder for HashingEmbedder {
    fn name(&self) -> &str {
        "hashing-bow"
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts
            .iter()
            .map(|text| {
                let mut vector = vec![0.0; HASHING_DIMENSIONS];
                for word in text
                    .split(|c: char| !c.is_alphanumeric())
                    .filter(|w| !w.is_empty())
                {
                    let mut hasher = std::collections::hash_map::DefaultHasher::new();
                    word.to_lowercase().hash(&mut hasher);
                    vector[(hasher.finish() % HASHING_DIMENSIONS as u64) as usize] += 1.0;
                }
                vector
            })
            .collect())
    }
}

/// Builds the index fine, then fails every query.
pub struct BrokenQueryEmbedder;

impl Embedder for BrokenQueryEmbedder {
    fn name(&self) -> &str {
        "broken"
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.len() == 1 {
            return Err(EmbeddingError::EmbeddingFailed("backend unavailable".to_string()));
        }
        Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
    }
}

/// Returns a fixed page text for every URL.
pub struct StubExtractor(pub String);

impl TextExtractor for StubExtractor {
    fn extract(&self, _url: &str) -> String {
        self.0.clone()
    }
}

pub fn reasoning_catalog() -> Vec<RawRecord> {
    vec![
        RawRecord::new(
            "Numerical Reasoning Test",
            "https://example.com/view/numerical/",
            "Measures how well candidates work with numbers, math and data tables.",
        ),
        RawRecord::new(
            "Verbal Reasoning Test",
            "https://example.com/view/verbal/",
            "Measures understanding of written passages.",
        ),
        RawRecord::new(
            "Logical Reasoning Test",
            "https://example.com/view/logical/",
            "Measures deductive thinking with abstract patterns.",
        ),
    ]
}

pub fn test_service(raw: &[RawRecord]) -> RecommenderService {
    RecommenderService::new(Corpus::load(raw, DedupPolicy::Keep), Box::new(HashingEmbedder))
}

pub fn test_app(extracted_text: &str) -> Arc<AppContext> {
    Arc::new(AppContext::new(
        test_service(&reasoning_catalog()),
        Box::new(StubExtractor(extracted_text.to_string())),
        10,
    ))
}
