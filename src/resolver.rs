//! Turns a recommendation request into the text to embed.

use serde::{Deserialize, Serialize};

/// Source of plain text for a job-description URL.
pub trait TextExtractor: Send + Sync {
    /// Visible text of the page, or an empty string when it cannot be fetched.
    fn extract(&self, url: &str) -> String;
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct QueryPayload {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[cfg(test)]
impl QueryPayload {
    pub fn from_query(query: &str) -> Self {
        Self {
            query: Some(query.to_string()),
            url: None,
        }
    }

    pub fn from_url(url: &str) -> Self {
        Self {
            query: None,
            url: Some(url.to_string()),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("Provide either query or url")]
    MissingInput,

    #[error("Unable to extract text from URL")]
    EmptyExtraction,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Resolve the query text for a payload.
///
/// A non-blank `url` always wins over `query`; its page is fetched once with
/// no retry.
pub fn resolve(
    payload: &QueryPayload,
    extractor: &dyn TextExtractor,
) -> Result<String, ResolutionError> {
    if let Some(url) = non_blank(&payload.url) {
        log::debug!("resolving query from {url}");
        let text = extractor.extract(url);
        let text = text.trim();
        if text.is_empty() {
            log::warn!("no text extracted from {url}");
            return Err(ResolutionError::EmptyExtraction);
        }
        return Ok(text.to_string());
    }

    non_blank(&payload.query)
        .map(str::to_string)
        .ok_or(ResolutionError::MissingInput)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct StubExtractor {
        text: String,
        calls: Mutex<Vec<String>>,
    }

    impl StubExtractor {
        fn new(text: &str) -> Self {
            Self {
                text: text.to_string(),
                calls: Mutex::new(vec![]),
            }
        }
    }

    impl TextExtractor for StubExtractor {
        fn extract(&self, url: &str) -> String {
            self.calls.lock().unwrap().push(url.to_string());
            self.text.clone()
        }
    }

    #[test]
    fn test_url_takes_precedence_over_query() {
        let extractor = StubExtractor::new("Data analyst with numerical skills");
        let payload = QueryPayload {
            query: Some("y".to_string()),
            url: Some("http://x".to_string()),
        };

        let text = resolve(&payload, &extractor).unwrap();

        assert_eq!(text, "Data analyst with numerical skills");
        assert_eq!(*extractor.calls.lock().unwrap(), vec!["http://x".to_string()]);
    }

    #[test]
    fn test_missing_input() {
        let extractor = StubExtractor::new("unused");
        assert_eq!(
            resolve(&QueryPayload::default(), &extractor),
            Err(ResolutionError::MissingInput)
        );
        assert!(extractor.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_blank_fields_count_as_missing() {
        let extractor = StubExtractor::new("unused");
        let payload = QueryPayload {
            query: Some("   ".to_string()),
            url: Some("\t".to_string()),
        };
        assert_eq!(resolve(&payload, &extractor), Err(ResolutionError::MissingInput));
    }

    #[test]
    fn test_empty_extraction() {
        let extractor = StubExtractor::new("");
        assert_eq!(
            resolve(&QueryPayload::from_url("http://bad"), &extractor),
            Err(ResolutionError::EmptyExtraction)
        );

        let extractor = StubExtractor::new("  \n ");
        assert_eq!(
            resolve(&QueryPayload::from_url("http://bad"), &extractor),
            Err(ResolutionError::EmptyExtraction)
        );
    }

    #[test]
    fn test_empty_extraction_does_not_fall_back_to_query() {
        let extractor = StubExtractor::new("");
        let payload = QueryPayload {
            query: Some("java developer".to_string()),
            url: Some("http://bad".to_string()),
        };
        assert_eq!(resolve(&payload, &extractor), Err(ResolutionError::EmptyExtraction));
    }

    #[test]
    fn test_blank_url_falls_back_to_query() {
        let extractor = StubExtractor::new("unused");
        let payload = QueryPayload {
            query: Some("  java developer ".to_string()),
            url: Some("  ".to_string()),
        };
        assert_eq!(resolve(&payload, &extractor).unwrap(), "java developer");
        assert!(extractor.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            ResolutionError::MissingInput.to_string(),
            "Provide either query or url"
        );
        assert_eq!(
            ResolutionError::EmptyExtraction.to_string(),
            "Unable to extract text from URL"
        );
    }
}
