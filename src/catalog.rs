//! Assessment catalog ingestion.
//!
//! Turns the crawler's raw `{name, url, description}` records into the ordered
//! set of canonical records that can be recommended. Corpus order is what the
//! embedding index is aligned to, so nothing here may reorder records.

use std::{collections::HashSet, path::Path};

use serde::{Deserialize, Serialize};

/// Products whose name contains this word are bundles, not individual assessments.
const EXCLUDED_NAME_TERM: &str = "solution";

/// A record as written by the crawler. Missing or `null` fields read as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[cfg(test)]
impl RawRecord {
    pub fn new(name: &str, url: &str, description: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            url: Some(url.to_string()),
            description: Some(description.to_string()),
        }
    }
}

/// A record eligible for recommendation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalRecord {
    pub name: String,
    pub url: String,
    /// Embedding input, `"{name}. {description}"`.
    pub text: String,
}

impl CanonicalRecord {
    /// Apply the canonical rules to a raw record.
    ///
    /// Returns `None` when any of name, url or description is blank after
    /// trimming, or when the name mentions a "solution" bundle.
    pub fn from_raw(raw: &RawRecord) -> Option<Self> {
        let name = raw.name.as_deref().unwrap_or_default().trim();
        if name.to_lowercase().contains(EXCLUDED_NAME_TERM) {
            return None;
        }

        let url = raw.url.as_deref().unwrap_or_default().trim();
        let description = raw.description.as_deref().unwrap_or_default().trim();

        if name.is_empty() || url.is_empty() || description.is_empty() {
            return None;
        }

        Some(Self {
            name: name.to_string(),
            url: url.to_string(),
            text: format!("{name}. {description}"),
        })
    }
}

/// How repeated catalog entries are treated while loading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum DedupPolicy {
    /// Keep every record, duplicates included.
    #[default]
    Keep,
    /// Drop a record whose url was already accepted.
    Url,
    /// Drop a record whose url or name was already accepted.
    UrlOrName,
}

#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("catalog file {path} could not be read: {source}")]
    Missing {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("catalog is not a JSON array of records: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Ordered, immutable set of canonical records.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    records: Vec<CanonicalRecord>,
}

impl Corpus {
    /// Build a corpus from raw records, keeping input order.
    pub fn load(raw: &[RawRecord], dedup: DedupPolicy) -> Self {
        let mut seen_urls = HashSet::new();
        let mut seen_names = HashSet::new();
        let mut rejected = 0usize;
        let mut duplicates = 0usize;

        let mut records = Vec::with_capacity(raw.len());
        for record in raw {
            let Some(record) = CanonicalRecord::from_raw(record) else {
                rejected += 1;
                continue;
            };

            let is_duplicate = match dedup {
                DedupPolicy::Keep => false,
                DedupPolicy::Url => seen_urls.contains(&record.url),
                DedupPolicy::UrlOrName => {
                    seen_urls.contains(&record.url) || seen_names.contains(&record.name)
                }
            };

            if is_duplicate {
                log::debug!("skipping duplicate catalog entry {:?}", record.url);
                duplicates += 1;
                continue;
            }

            if dedup != DedupPolicy::Keep {
                seen_urls.insert(record.url.clone());
                seen_names.insert(record.name.clone());
            }

            records.push(record);
        }

        log::info!(
            "loaded {} assessments ({rejected} rejected, {duplicates} duplicates)",
            records.len()
        );

        Self { records }
    }

    /// Parse the crawler's JSON output.
    pub fn from_json(json: &str, dedup: DedupPolicy) -> Result<Self, DataError> {
        let raw: Vec<RawRecord> = serde_json::from_str(json)?;
        Ok(Self::load(&raw, dedup))
    }

    pub fn load_file(path: &Path, dedup: DedupPolicy) -> Result<Self, DataError> {
        let json = std::fs::read_to_string(path).map_err(|source| DataError::Missing {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_json(&json, dedup)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&CanonicalRecord> {
        self.records.get(position)
    }

    /// Embedding inputs in corpus order.
    pub fn texts(&self) -> Vec<String> {
        self.records.iter().map(|r| r.text.clone()).collect()
    }
}
