use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use crate::catalog::DedupPolicy;
use crate::semantic::{DEFAULT_MODEL, DEFAULT_TOP_K};

/// Config file read when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

const DEFAULT_DATA_PATH: &str = "assessments_all.json";
const DEFAULT_CACHE_DIR: &str = ".fastembed_cache";
const DEFAULT_BIND: &str = "0.0.0.0:8080";
/// URL extraction timeout in seconds
const DEFAULT_EXTRACT_TIMEOUT_SECS: u64 = 10;
/// Default model download timeout in seconds
const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 300;

const DEFAULT_CATALOG_URL: &str = "https://www.shl.com/products/product-catalog/";
/// Offset of the last catalog listing page
const DEFAULT_LAST_START: u32 = 372;
const DEFAULT_PAGE_SIZE: u32 = 12;

/// Catalog crawler settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// Listing page, paginated with `?start=N&type=T`
    #[serde(default = "default_catalog_url")]
    pub base_url: String,

    #[serde(default = "default_last_start")]
    pub last_start: u32,

    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Catalog `type` filters to walk
    #[serde(default = "default_catalog_types")]
    pub types: Vec<u32>,

    #[serde(default = "default_extract_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            base_url: default_catalog_url(),
            last_start: DEFAULT_LAST_START,
            page_size: DEFAULT_PAGE_SIZE,
            types: default_catalog_types(),
            timeout_secs: DEFAULT_EXTRACT_TIMEOUT_SECS,
            user_agent: default_user_agent(),
        }
    }
}

fn default_catalog_url() -> String {
    DEFAULT_CATALOG_URL.to_string()
}

fn default_last_start() -> u32 {
    DEFAULT_LAST_START
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_catalog_types() -> Vec<u32> {
    vec![1, 2]
}

fn default_user_agent() -> String {
    crate::extract::USER_AGENT_DEFAULT.to_string()
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Crawler output consumed as the catalog
    #[serde(default = "default_data_path")]
    pub data_path: PathBuf,

    /// Model name for embeddings (e.g., "all-MiniLM-L6-v2")
    #[serde(default = "default_model")]
    pub model: String,

    /// Where downloaded models are cached
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Recommendations per request
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    #[serde(default = "default_bind")]
    pub bind: String,

    /// Timeout for fetching a job-description URL in seconds
    #[serde(default = "default_extract_timeout_secs")]
    pub extract_timeout_secs: u64,

    /// Timeout for model download in seconds
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,

    #[serde(default)]
    pub dedup: DedupPolicy,

    #[serde(default)]
    pub crawler: CrawlerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_path: default_data_path(),
            model: default_model(),
            cache_dir: default_cache_dir(),
            top_k: DEFAULT_TOP_K,
            bind: default_bind(),
            extract_timeout_secs: DEFAULT_EXTRACT_TIMEOUT_SECS,
            download_timeout_secs: DEFAULT_DOWNLOAD_TIMEOUT_SECS,
            dedup: DedupPolicy::default(),
            crawler: CrawlerConfig::default(),
        }
    }
}

fn default_data_path() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_PATH)
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(DEFAULT_CACHE_DIR)
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

fn default_extract_timeout_secs() -> u64 {
    DEFAULT_EXTRACT_TIMEOUT_SECS
}

fn default_download_timeout_secs() -> u64 {
    DEFAULT_DOWNLOAD_TIMEOUT_SECS
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.model.trim().is_empty() {
            bail!("model must not be empty");
        }

        if self.top_k == 0 {
            bail!("top_k must be greater than 0");
        }

        if self.extract_timeout_secs == 0 {
            bail!("extract_timeout_secs must be greater than 0");
        }

        if self.download_timeout_secs == 0 {
            bail!("download_timeout_secs must be greater than 0");
        }

        let crawler = &self.crawler;
        if crawler.page_size == 0 {
            bail!("crawler.page_size must be greater than 0");
        }

        if crawler.types.is_empty() {
            bail!("crawler.types must list at least one catalog type");
        }

        if crawler.timeout_secs == 0 {
            bail!("crawler.timeout_secs must be greater than 0");
        }

        Ok(())
    }

    /// Load the YAML config at `path`, or `config.yaml` when `path` is `None`.
    ///
    /// A missing default file yields the defaults; a missing explicit file is
    /// an error.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let (path, explicit) = match path {
            Some(path) => (path, true),
            None => (Path::new(DEFAULT_CONFIG_PATH), false),
        };

        if !explicit && !path.exists() {
            log::debug!("no {} found, using defaults", path.display());
            let config = Self::default();
            config.validate()?;
            return Ok(config);
        }

        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;

        Self::from_yaml(&config_str).with_context(|| format!("config {} is malformed", path.display()))
    }

    pub fn from_yaml(config_str: &str) -> anyhow::Result<Self> {
        let config: Self = serde_yml::from_str(config_str)?;
        config.validate()?;
        Ok(config)
    }
}
