//! Top-k ranking by cosine similarity.

use serde::Serialize;

use crate::catalog::Corpus;
use crate::semantic::index::{cosine_similarity, EmbeddingIndex};

/// A recommended assessment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedResult {
    pub assessment_name: String,
    pub url: String,
    /// Cosine similarity with the query.
    pub score: f32,
}

/// Score every indexed record against `query` and return the best `k`.
///
/// Results are ordered by descending score. Equal scores keep corpus order,
/// which relies on `sort_by` being stable. `k` larger than the corpus returns
/// the whole corpus.
pub fn rank(query: &[f32], index: &EmbeddingIndex, corpus: &Corpus, k: usize) -> Vec<RankedResult> {
    let k = k.min(corpus.len()).min(index.len());
    if k == 0 {
        return Vec::new();
    }

    let mut scored: Vec<(usize, f32)> = index
        .iter()
        .enumerate()
        .map(|(position, vector)| (position, cosine_similarity(query, vector)))
        .collect();

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(k);

    scored
        .into_iter()
        .filter_map(|(position, score)| {
            corpus.get(position).map(|record| RankedResult {
                assessment_name: record.name.clone(),
                url: record.url.clone(),
                score,
            })
        })
        .collect()
}
