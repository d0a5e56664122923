//! Semantic retrieval over the assessment catalog.
//!
//! This module provides embedding-based recommendation using fastembed-rs
//! for generating embeddings and in-memory cosine similarity ranking.
//!
//! # Architecture
//!
//! - `embeddings`: The `Embedder` seam and its fastembed implementation
//! - `index`: Corpus-aligned vectors and cosine similarity
//! - `ranker`: Stable top-k selection
//! - `service`: Build-once index and query entry point

pub mod embeddings;
mod index;
mod ranker;
mod service;

pub use embeddings::{Embedder, EmbeddingError, EmbeddingModel};
pub use index::EmbeddingIndex;
pub use ranker::{rank, RankedResult};
pub use service::RecommenderService;

/// Default embedding model, pinned for the lifetime of the index
pub const DEFAULT_MODEL: &str = "all-MiniLM-L6-v2";

/// Default number of recommendations per query
pub const DEFAULT_TOP_K: usize = 10;
