//! Text embedding backends.
//!
//! Every vector in the index and every query vector must come from the same
//! [`Embedder`] instance, otherwise their similarities are meaningless.
//! The production backend wraps fastembed:
//! - Model download with timeout on first use
//! - Batch embedding generation for the catalog

use fastembed::{InitOptions, TextEmbedding};
use std::path::PathBuf;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

/// Default download timeout for model files (5 minutes)
const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// Error type for embedding operations
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("Model initialization failed: {0}")]
    InitFailed(String),

    #[error("Embedding generation failed: {0}")]
    EmbeddingFailed(String),

    #[error("Model download timed out after {0}s")]
    DownloadTimeout(u64),

    #[error("Invalid model name: {0}")]
    InvalidModel(String),

    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Embedder returned {got} vectors for {expected} texts")]
    CountMismatch { expected: usize, got: usize },
}

/// A deterministic text vectorizer.
pub trait Embedder: Send + Sync {
    /// Identifier of the pinned model.
    fn name(&self) -> &str;

    /// Generate embeddings for multiple texts, in input order.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Generate an embedding for a single text.
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.embed_batch(&[text.to_string()])?
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::EmbeddingFailed("No embedding returned".to_string()))
    }
}

/// Wrapper around fastembed's TextEmbedding model.
/// Uses a Mutex because fastembed's embed() requires &mut self.
pub struct EmbeddingModel {
    model: Mutex<TextEmbedding>,
    model_name: String,
    dimensions: usize,
}

impl EmbeddingModel {
    /// Load a model by name, downloading it into `cache_dir/models` if needed.
    ///
    /// # Arguments
    /// * `model_name` - Name of the model (e.g., "all-MiniLM-L6-v2")
    /// * `cache_dir` - Directory to cache downloaded models
    /// * `download_timeout` - Optional timeout for model download
    pub fn new(
        model_name: &str,
        cache_dir: PathBuf,
        download_timeout: Option<Duration>,
    ) -> Result<Self, EmbeddingError> {
        let model_enum = Self::parse_model_name(model_name)?;
        let timeout = download_timeout.unwrap_or(DEFAULT_DOWNLOAD_TIMEOUT);

        let models_dir = cache_dir.join("models");
        std::fs::create_dir_all(&models_dir).map_err(|e| {
            EmbeddingError::InitFailed(format!("Failed to create models directory: {}", e))
        })?;

        log::info!(
            "loading embedding model '{model_name}' from {} (download timeout {}s)",
            models_dir.display(),
            timeout.as_secs()
        );

        let mut model = with_deadline(timeout, move || {
            let options = InitOptions::new(model_enum)
                .with_cache_dir(models_dir)
                .with_show_download_progress(true);

            TextEmbedding::try_new(options).map_err(|e| EmbeddingError::InitFailed(e.to_string()))
        })?;

        let dimensions = Self::probe_dimensions(&mut model)?;

        Ok(Self {
            model: Mutex::new(model),
            model_name: model_name.to_string(),
            dimensions,
        })
    }

    /// Get the embedding dimensions for this model
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Parse model name string to fastembed enum.
    fn parse_model_name(name: &str) -> Result<fastembed::EmbeddingModel, EmbeddingError> {
        match name.to_lowercase().as_str() {
            "all-minilm-l6-v2" | "allminiml6v2" => Ok(fastembed::EmbeddingModel::AllMiniLML6V2),
            "all-minilm-l6-v2-q" | "allminiml6v2q" => {
                Ok(fastembed::EmbeddingModel::AllMiniLML6V2Q)
            }
            "bge-small-en-v1.5" | "bgesmallenv15" => Ok(fastembed::EmbeddingModel::BGESmallENV15),
            "bge-small-en-v1.5-q" | "bgesmallenv15q" => {
                Ok(fastembed::EmbeddingModel::BGESmallENV15Q)
            }
            "bge-base-en-v1.5" | "bgebaseenv15" => Ok(fastembed::EmbeddingModel::BGEBaseENV15),
            "bge-base-en-v1.5-q" | "bgebaseenv15q" => {
                Ok(fastembed::EmbeddingModel::BGEBaseENV15Q)
            }
            "bge-large-en-v1.5" | "bgelargeenv15" => Ok(fastembed::EmbeddingModel::BGELargeENV15),
            "bge-large-en-v1.5-q" | "bgelargeenv15q" => {
                Ok(fastembed::EmbeddingModel::BGELargeENV15Q)
            }
            _ => Err(EmbeddingError::InvalidModel(format!(
                "Unknown model: {}. Supported models: all-MiniLM-L6-v2, bge-small-en-v1.5, bge-base-en-v1.5, bge-large-en-v1.5 (add -q suffix for quantized)",
                name
            ))),
        }
    }

    /// Probe the model to determine embedding dimensions.
    fn probe_dimensions(model: &mut TextEmbedding) -> Result<usize, EmbeddingError> {
        let test_embeddings = model
            .embed(vec!["test"], None)
            .map_err(|e| EmbeddingError::InitFailed(format!("Failed to probe dimensions: {}", e)))?;

        test_embeddings
            .first()
            .map(|v| v.len())
            .ok_or_else(|| EmbeddingError::InitFailed("Model returned no embedding".to_string()))
    }
}

/// Run `load` on its own thread and give up once `timeout` has elapsed.
///
/// An abandoned loader keeps running in the background until it finishes.
fn with_deadline<T, F>(timeout: Duration, load: F) -> Result<T, EmbeddingError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, EmbeddingError> + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        // The receiver is gone when the deadline already passed.
        let _ = tx.send(load());
    });

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => Err(EmbeddingError::DownloadTimeout(timeout.as_secs())),
        Err(RecvTimeoutError::Disconnected) => Err(EmbeddingError::InitFailed(
            "model loader exited without a result".to_string(),
        )),
    }
}

impl Embedder for EmbeddingModel {
    fn name(&self) -> &str {
        &self.model_name
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let mut model = self.model.lock().map_err(|e| {
            EmbeddingError::EmbeddingFailed(format!("Failed to acquire model lock: {}", e))
        })?;

        model
            .embed(texts.to_vec(), None)
            .map_err(|e| EmbeddingError::EmbeddingFailed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Integration tests require model download - run with --ignored
    #[test]
    #[ignore = "requires model download"]
    fn test_model_creation() {
        let temp_dir = tempfile::tempdir().unwrap();
        let model =
            EmbeddingModel::new("all-MiniLM-L6-v2", temp_dir.path().to_path_buf(), None).unwrap();

        assert_eq!(model.name(), "all-MiniLM-L6-v2");
        assert_eq!(model.dimensions(), 384);
    }

    #[test]
    #[ignore = "requires model download"]
    fn test_batch_matches_single() {
        let temp_dir = tempfile::tempdir().unwrap();
        let model =
            EmbeddingModel::new("all-MiniLM-L6-v2", temp_dir.path().to_path_buf(), None).unwrap();

        let texts = vec![
            "Numerical Reasoning Test. Work with numbers".to_string(),
            "Verbal Reasoning Test. Read passages".to_string(),
        ];
        let batch = model.embed_batch(&texts).unwrap();
        let single = model.embed(&texts[1]).unwrap();

        assert_eq!(batch.len(), 2);
        for (a, b) in batch[1].iter().zip(single.iter()) {
            assert!((a - b).abs() < 1e-4);
        }
    }

    #[test]
    fn test_invalid_model_name() {
        let temp_dir = tempfile::tempdir().unwrap();
        let result = EmbeddingModel::new("nonexistent-model", temp_dir.path().to_path_buf(), None);
        assert!(matches!(result, Err(EmbeddingError::InvalidModel(_))));
    }

    #[test]
    fn test_slow_load_times_out() {
        let start = std::time::Instant::now();
        let result = with_deadline(Duration::from_millis(100), || {
            thread::sleep(Duration::from_secs(5));
            Ok(())
        });

        assert!(matches!(result, Err(EmbeddingError::DownloadTimeout(_))));
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_load_within_deadline() {
        assert_eq!(with_deadline(Duration::from_secs(5), || Ok(384)).unwrap(), 384);

        let failed: Result<(), _> = with_deadline(Duration::from_secs(5), || {
            Err(EmbeddingError::InitFailed("no network".to_string()))
        });
        assert!(matches!(failed, Err(EmbeddingError::InitFailed(_))));
    }

    #[test]
    fn test_panicking_loader_is_init_failure() {
        let result: Result<(), _> = with_deadline(Duration::from_secs(5), || panic!("loader crashed"));
        assert!(matches!(result, Err(EmbeddingError::InitFailed(_))));
    }

    #[test]
    fn test_model_names_are_case_insensitive() {
        assert!(EmbeddingModel::parse_model_name("All-MiniLM-L6-v2").is_ok());
        assert!(EmbeddingModel::parse_model_name("BGE-SMALL-EN-V1.5-Q").is_ok());
        assert!(EmbeddingModel::parse_model_name("text-embedding-3-small").is_err());
    }
}
