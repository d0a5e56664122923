use crate::{resolver::ResolutionError, semantic::EmbeddingError};

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("{0}")]
    BadRequest(String),
}
