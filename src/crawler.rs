//! Offline catalog crawler.
//!
//! Walks the paginated product catalog, follows every assessment detail link
//! and writes the `{name, url, description, title}` records the corpus loader
//! reads.

use std::{collections::HashSet, path::Path, time::Duration};

use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use reqwest::StatusCode;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

use crate::config::CrawlerConfig;

/// Detail pages are recognised by this path segment.
const DETAIL_PATH_MARKER: &str = "/view/";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawledAssessment {
    pub name: String,
    pub url: String,
    pub description: String,
    pub title: String,
}

pub struct CatalogCrawler {
    client: reqwest::blocking::Client,
    config: CrawlerConfig,
}

impl CatalogCrawler {
    pub fn new(config: CrawlerConfig) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build http client")?;

        Ok(Self { client, config })
    }

    /// Every listing page, `type` filters outermost.
    pub fn listing_urls(&self) -> Vec<String> {
        let step = self.config.page_size.max(1) as usize;
        self.config
            .types
            .iter()
            .flat_map(|kind| {
                (0..=self.config.last_start)
                    .step_by(step)
                    .map(move |start| format!("{}?start={start}&type={kind}", self.config.base_url))
            })
            .collect()
    }

    /// Crawl the whole catalog.
    pub fn crawl(&self) -> Vec<CrawledAssessment> {
        let pages = self.listing_urls();
        log::info!("crawling {} catalog pages", pages.len());

        let links = self.discover_links(&pages);
        log::info!("found {} assessment pages", links.len());

        let progress = ProgressBar::new(links.len() as u64);
        if let Ok(style) =
            ProgressStyle::with_template("{bar:40} {pos}/{len} assessments [{elapsed_precise}]")
        {
            progress.set_style(style);
        }

        let records: Vec<CrawledAssessment> = links
            .par_iter()
            .filter_map(|link| {
                let record = self
                    .fetch(link)
                    .map(|html| parse_assessment(&html, link));
                progress.inc(1);
                record
            })
            .collect();

        progress.finish_and_clear();
        log::info!("scraped {} assessments", records.len());

        records
    }

    /// Detail links from all listing pages, deduplicated in first-seen order.
    fn discover_links(&self, pages: &[String]) -> Vec<String> {
        let per_page: Vec<Vec<String>> = pages
            .par_iter()
            .map(|page| match self.fetch(page) {
                Some(html) => {
                    let links = assessment_links(&html, page);
                    if links.is_empty() {
                        log::warn!("no assessment links found on {page}");
                    } else {
                        log::debug!("{page}: {} assessment links", links.len());
                    }
                    links
                }
                None => vec![],
            })
            .collect();

        let mut seen = HashSet::new();
        per_page
            .into_iter()
            .flatten()
            .filter(|link| seen.insert(link.clone()))
            .collect()
    }

    fn fetch(&self, url: &str) -> Option<String> {
        let resp = match self.client.get(url).send() {
            Ok(resp) => resp,
            Err(err) => {
                log::error!("{url}: {err}");
                return None;
            }
        };

        if resp.status() != StatusCode::OK {
            log::error!("failed to load page: {url} (status: {})", resp.status());
            return None;
        }

        match resp.text() {
            Ok(text) => Some(text),
            Err(err) => {
                log::error!("{url}: {err}");
                None
            }
        }
    }
}

/// Absolute detail-page links on a listing page, deduplicated in page order.
pub fn assessment_links(html: &str, page_url: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(anchor_selector) = Selector::parse("a[href]") else {
        return vec![];
    };
    let base = url::Url::parse(page_url).ok();

    let mut seen = HashSet::new();
    document
        .select(&anchor_selector)
        .filter_map(|anchor| anchor.attr("href"))
        .filter(|href| href.contains(DETAIL_PATH_MARKER))
        .filter_map(|href| match &base {
            Some(base) => base.join(href).ok().map(|u| u.to_string()),
            None => Some(href.to_string()),
        })
        .filter(|link| seen.insert(link.clone()))
        .collect()
}

/// Direct text children of an element, trimmed, non-empty.
fn own_text<'a>(element: ElementRef<'a>) -> impl Iterator<Item = &'a str> {
    element
        .children()
        .filter_map(|child| child.value().as_text())
        .map(|text| text.trim())
        .filter(|text| !text.is_empty())
}

fn first_text(document: &Html, selectors: &str) -> Option<String> {
    let selector = Selector::parse(selectors).ok()?;
    document
        .select(&selector)
        .filter_map(|element| own_text(element).next())
        .next()
        .map(str::to_string)
}

/// Extract an assessment record from its detail page.
pub fn parse_assessment(html: &str, url: &str) -> CrawledAssessment {
    let document = Html::parse_document(html);

    let name = first_text(&document, "h1")
        .or_else(|| first_text(&document, ".page-title, .assessment-title, title"))
        .unwrap_or_default();

    let description = Selector::parse("p, .description")
        .map(|selector| {
            document
                .select(&selector)
                .flat_map(own_text)
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default();

    let title = first_text(&document, "title").unwrap_or_default();

    log::debug!("scraped assessment: {name}");

    CrawledAssessment {
        name,
        url: url.to_string(),
        description,
        title,
    }
}

/// Write records as the pretty-printed JSON array the corpus loader reads.
pub fn write_catalog(records: &[CrawledAssessment], path: &Path) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(records)?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    log::info!("wrote {} records to {}", records.len(), path.display());
    Ok(())
}
