use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use serde::Serialize;

use crate::{
    app::errors::AppError,
    catalog::Corpus,
    config::Config,
    extract::HttpTextExtractor,
    resolver::{self, QueryPayload, TextExtractor},
    semantic::{EmbeddingModel, RankedResult, RecommenderService},
};

const SERVICE_NAME: &str = "Assessment Recommender API";

/// Health report. Reading it never builds the index.
#[derive(Debug, Clone, Serialize)]
pub struct Health {
    pub message: String,
    pub status: String,
    pub assessments_loaded: usize,
}

/// Application context shared by every request handler.
///
/// Built once at startup and handed out behind an `Arc`; nothing in it is
/// mutated after construction apart from the one-time index build.
pub struct AppContext {
    recommender: RecommenderService,
    extractor: Box<dyn TextExtractor>,
    top_k: usize,
}

impl AppContext {
    pub fn new(
        recommender: RecommenderService,
        extractor: Box<dyn TextExtractor>,
        top_k: usize,
    ) -> Self {
        Self {
            recommender,
            extractor,
            top_k,
        }
    }

    /// Load the catalog and the embedding model described by `config`.
    ///
    /// Blocking: may download the model. Must run outside the async runtime.
    pub fn from_config(config: &Config) -> anyhow::Result<Arc<Self>> {
        let corpus = Corpus::load_file(&config.data_path, config.dedup)
            .context("failed to load assessment catalog")?;

        let model = EmbeddingModel::new(
            &config.model,
            config.cache_dir.clone(),
            Some(Duration::from_secs(config.download_timeout_secs)),
        )
        .context("failed to load embedding model")?;
        log::info!("loaded '{}' ({} dimensions)", config.model, model.dimensions());

        let extractor = HttpTextExtractor::new(Duration::from_secs(config.extract_timeout_secs))?;

        Ok(Arc::new(Self::new(
            RecommenderService::new(corpus, Box::new(model)),
            Box::new(extractor),
            config.top_k,
        )))
    }

    pub fn recommender(&self) -> &RecommenderService {
        &self.recommender
    }

    /// Build the index now rather than on the first request.
    pub fn warm_up(&self) -> Result<(), AppError> {
        self.recommender.ensure_built()?;
        Ok(())
    }

    pub fn health(&self) -> Health {
        let status = if self.recommender.is_built() {
            "ready"
        } else {
            "initializing"
        };

        Health {
            message: SERVICE_NAME.to_string(),
            status: status.to_string(),
            assessments_loaded: self.recommender.assessments_loaded(),
        }
    }

    /// Query text for a payload; may fetch the payload's URL.
    pub fn resolve(&self, payload: &QueryPayload) -> Result<String, AppError> {
        Ok(resolver::resolve(payload, self.extractor.as_ref())?)
    }

    /// Resolve the payload and rank the catalog against it.
    pub fn recommend(&self, payload: &QueryPayload) -> Result<Vec<RankedResult>, AppError> {
        let text = self.resolve(payload)?;
        self.recommend_text(&text, self.top_k)
    }

    pub fn recommend_text(&self, text: &str, k: usize) -> Result<Vec<RankedResult>, AppError> {
        Ok(self.recommender.recommend(text, k)?)
    }
}
