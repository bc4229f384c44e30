// ============================================================
// Layer 6 — arXiv Discovery
// ============================================================
// Paper discovery over the public arXiv Atom API:
//
//   GET {base}/query?search_query=all:<q>&max_results=<n>
//                   &sortBy=relevance&sortOrder=descending
//
// The feed is deserialised with quick-xml's serde support. Only
// the fields a PaperRef needs are mapped; everything else in the
// feed is ignored.
//
//   <entry>
//     <id>http://arxiv.org/abs/2402.01234v1</id>   → id "2402.01234v1"
//     <published>2024-02-02T18:00:00Z</published>  → published
//     <title>…</title>  <summary>…</summary>       → whitespace-collapsed
//     <author><name>…</name></author>*             → authors
//     <link title="pdf" href="…"/>                 → locator
//   </entry>
//
// Entries with a DOI carry a `<link title="doi">` that is separated
// from the alternate and pdf links by `<arxiv:comment>` and
// `<arxiv:journal_ref>`. Collecting those split `link` runs into one
// Vec needs quick-xml's `overlapped-lists` feature.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::Duration;

use crate::domain::error::{CollaboratorError, CollaboratorResult};
use crate::domain::paper::PaperRef;
use crate::domain::traits::PaperSource;

pub const DEFAULT_BASE_URL: &str = "https://export.arxiv.org/api";

#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(rename = "entry", default)]
    entries: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    id: String,
    #[serde(default)]
    published: Option<String>,
    title: String,
    #[serde(default)]
    summary: String,
    #[serde(rename = "author", default)]
    authors: Vec<Author>,
    #[serde(rename = "link", default)]
    links: Vec<Link>,
}

#[derive(Debug, Deserialize)]
struct Author {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Link {
    #[serde(rename = "@href")]
    href: String,
    #[serde(rename = "@title", default)]
    title: Option<String>,
    #[serde(rename = "@type", default)]
    kind: Option<String>,
}

impl Entry {
    fn into_paper(self) -> PaperRef {
        let id = self
            .id
            .rsplit("/abs/")
            .next()
            .unwrap_or(&self.id)
            .trim()
            .to_string();

        let locator = self
            .links
            .iter()
            .find(|l| l.title.as_deref() == Some("pdf") || l.kind.as_deref() == Some("application/pdf"))
            .map(|l| l.href.clone())
            .unwrap_or_else(|| self.id.replace("/abs/", "/pdf/"));

        let mut paper = PaperRef::new(id, collapse(&self.title), locator)
            .with_abstract(collapse(&self.summary))
            .with_authors(self.authors.into_iter().map(|a| collapse(&a.name)).collect());

        if let Some(published) = self.published.as_deref().and_then(parse_date) {
            paper = paper.with_published(published);
        }
        paper
    }
}

fn collapse(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim()).ok().map(|d| d.with_timezone(&Utc))
}

/// Parse an Atom feed body into papers, in feed order.
pub fn parse_feed(xml: &str) -> CollaboratorResult<Vec<PaperRef>> {
    let feed: Feed = quick_xml::de::from_str(xml)
        .map_err(|e| CollaboratorError::invalid_response(format!("malformed arXiv feed: {e}")))?;
    Ok(feed.entries.into_iter().map(Entry::into_paper).collect())
}

pub struct ArxivClient {
    client: reqwest::Client,
    base_url: String,
}

impl ArxivClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("evidence-qa/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Cannot build HTTP client for arXiv")?;
        Ok(Self { client, base_url: DEFAULT_BASE_URL.to_string() })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl PaperSource for ArxivClient {
    async fn discover(&self, query: &str, max_results: usize) -> CollaboratorResult<Vec<PaperRef>> {
        let url    = format!("{}/query", self.base_url.trim_end_matches('/'));
        let search = format!("all:{query}");
        let max    = max_results.to_string();

        tracing::debug!("arXiv query '{}' (max {})", query, max_results);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("search_query", search.as_str()),
                ("start", "0"),
                ("max_results", max.as_str()),
                ("sortBy", "relevance"),
                ("sortOrder", "descending"),
            ])
            .send()
            .await
            .map_err(|e| CollaboratorError::source_unavailable(format!("arXiv request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CollaboratorError::source_unavailable(format!("arXiv returned HTTP {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| CollaboratorError::source_unavailable(format!("arXiv body unreadable: {e}")))?;

        let papers = parse_feed(&body)?;
        tracing::info!("arXiv returned {} papers for '{}'", papers.len(), query);
        Ok(papers)
    }
}
