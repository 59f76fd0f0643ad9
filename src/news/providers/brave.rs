// src/news/providers/brave.rs
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;

use super::{check_status, http_client};
use crate::error::{DigestError, Result};
use crate::news::{NewsItem, NewsProvider, NewsQuery};

pub const BRAVE_NEWS_ENDPOINT: &str = "https://api.search.brave.com/res/v1/news/search";

#[derive(Debug, Deserialize)]
struct Resp {
    #[serde(default)]
    results: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    title: Option<String>,
    url: Option<String>,
    description: Option<String>,
    page_age: Option<String>,
    meta_url: Option<MetaUrl>,
}

#[derive(Debug, Deserialize)]
struct MetaUrl {
    hostname: Option<String>,
}

// Brave sends `page_age` without an offset; treat it as UTC.
fn parse_page_age(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|n| n.and_utc())
}

/// Brave Search news vertical.
pub struct BraveSearchProvider {
    endpoint: String,
    api_key: String,
    client: reqwest::Client,
}

impl BraveSearchProvider {
    pub fn new(api_key: String) -> Result<Self> {
        Ok(Self {
            endpoint: BRAVE_NEWS_ENDPOINT.to_string(),
            api_key,
            client: http_client()?,
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn parse(body: Resp) -> Vec<NewsItem> {
        body.results
            .into_iter()
            .filter_map(|h| {
                Some(NewsItem {
                    title: h.title?,
                    url: h.url?,
                    summary: h.description.unwrap_or_default(),
                    published_at: h.page_age.as_deref().and_then(parse_page_age),
                    source: h
                        .meta_url
                        .and_then(|m| m.hostname)
                        .unwrap_or_else(|| "Brave".to_string()),
                })
            })
            .collect()
    }
}

#[async_trait]
impl NewsProvider for BraveSearchProvider {
    async fn fetch_latest(&self, query: &NewsQuery) -> Result<Vec<NewsItem>> {
        let count = query.limit.clamp(1, 50).to_string();
        let resp = self
            .client
            .get(&self.endpoint)
            .header("X-Subscription-Token", &self.api_key)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(&[
                ("q", query.query.as_str()),
                ("search_lang", query.language.as_str()),
                ("count", count.as_str()),
                ("freshness", "pd"),
            ])
            .send()
            .await
            .map_err(|e| DigestError::transport("brave get", e))?;
        check_status(self.name(), &resp)?;
        let body: Resp = resp
            .json()
            .await
            .map_err(|e| DigestError::transport("brave json", e))?;
        Ok(Self::parse(body))
    }

    fn name(&self) -> &'static str {
        "brave"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_results() {
        let raw = r#"{
          "type": "news",
          "results": [
            {"title": "AI agents", "url": "https://n.test/1", "description": "desc",
             "page_age": "2025-03-01T09:30:00", "meta_url": {"hostname": "n.test"}},
            {"title": "missing url"}
          ]
        }"#;
        let items = BraveSearchProvider::parse(serde_json::from_str(raw).unwrap());
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].source, "n.test");
        assert_eq!(
            items[0].published_at.unwrap().to_rfc3339(),
            "2025-03-01T09:30:00+00:00"
        );
    }
}
