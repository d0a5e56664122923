//! In-memory embedding index aligned with the corpus.
//!
//! Vector `i` is the embedding of corpus record `i`. The index is built once
//! from the full corpus and never modified afterwards.

use crate::catalog::Corpus;
use crate::semantic::embeddings::{Embedder, EmbeddingError};

pub struct EmbeddingIndex {
    vectors: Vec<Vec<f32>>,
    /// Expected embedding dimensions
    dimensions: usize,
}

impl EmbeddingIndex {
    /// Embed every corpus text, in corpus order, with `embedder`.
    pub fn build(corpus: &Corpus, embedder: &dyn Embedder) -> Result<Self, EmbeddingError> {
        let texts = corpus.texts();
        let vectors = embedder.embed_batch(&texts)?;

        if vectors.len() != texts.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: texts.len(),
                got: vectors.len(),
            });
        }

        Self::from_vectors(vectors)
    }

    /// Wrap precomputed vectors; all of them must share one length.
    pub fn from_vectors(vectors: Vec<Vec<f32>>) -> Result<Self, EmbeddingError> {
        let dimensions = vectors.first().map(Vec::len).unwrap_or(0);

        if let Some(bad) = vectors.iter().find(|v| v.len() != dimensions) {
            return Err(EmbeddingError::DimensionMismatch {
                expected: dimensions,
                got: bad.len(),
            });
        }

        let degenerate = vectors.iter().filter(|v| l2_norm(v) < f32::EPSILON).count();
        if degenerate > 0 {
            log::warn!("{degenerate} catalog embeddings have zero magnitude and will score 0");
        }

        Ok(Self {
            vectors,
            dimensions,
        })
    }

    /// Get the embedding dimensions (0 for an empty index).
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Iterate over vectors in corpus order.
    pub fn iter(&self) -> impl Iterator<Item = &[f32]> {
        self.vectors.iter().map(Vec::as_slice)
    }
}

/// Compute L2 norm of a vector.
pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Cosine similarity of two vectors.
///
/// A zero-magnitude vector on either side, or any non-finite result, scores 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let a_norm = l2_norm(a);
    let b_norm = l2_norm(b);
    if a_norm < f32::EPSILON || b_norm < f32::EPSILON {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let score = dot_product / (a_norm * b_norm);

    if score.is_finite() {
        score
    } else {
        0.0
    }
}
