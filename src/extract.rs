use std::time::Duration;

use anyhow::Context;
use scraper::{Html, Node};

use crate::resolver::TextExtractor;

pub const USER_AGENT_DEFAULT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:124.0) Gecko/20100101 Firefox/124.0";

/// Elements whose text is never shown to a reader.
const HIDDEN_TAGS: [&str; 3] = ["script", "style", "noscript"];

/// Fetches job-description pages with a single bounded GET.
pub struct HttpTextExtractor {
    client: reqwest::blocking::Client,
}

impl HttpTextExtractor {
    /// Must be called outside of an async context: the blocking client owns
    /// its own runtime.
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT_DEFAULT)
            .timeout(timeout)
            .pool_idle_timeout(timeout)
            .build()
            .context("failed to build http client")?;

        Ok(Self { client })
    }

    fn fetch(&self, url: &str) -> Result<String, reqwest::Error> {
        let resp = self.client.get(url).send()?;

        if !resp.status().is_success() {
            log::debug!("{url}: {:?}", resp.status().to_string());
        }

        resp.text()
    }
}

impl TextExtractor for HttpTextExtractor {
    fn extract(&self, url: &str) -> String {
        match self.fetch(url) {
            Ok(html) => visible_text(&html),
            Err(err) => {
                log::error!("{url}: {err}");
                String::new()
            }
        }
    }
}

/// Text nodes of an HTML document outside script/style/noscript,
/// trimmed and joined with single spaces.
pub fn visible_text(html: &str) -> String {
    let document = Html::parse_document(html);

    let parts: Vec<&str> = document
        .tree
        .root()
        .descendants()
        .filter_map(|node| match node.value() {
            Node::Text(text) => {
                let hidden = node.ancestors().any(|ancestor| {
                    ancestor
                        .value()
                        .as_element()
                        .is_some_and(|el| HIDDEN_TAGS.contains(&el.name()))
                });
                (!hidden).then_some(text.trim())
            }
            _ => None,
        })
        .filter(|text| !text.is_empty())
        .collect();

    parts.join(" ")
}
