// src/news/providers/newsapi.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::{check_status, http_client};
use crate::error::{DigestError, Result};
use crate::news::{NewsItem, NewsProvider, NewsQuery};

pub const NEWSAPI_ENDPOINT: &str = "https://newsapi.org/v2/everything";

#[derive(Debug, Deserialize)]
struct Resp {
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Article {
    title: Option<String>,
    url: Option<String>,
    description: Option<String>,
    published_at: Option<DateTime<Utc>>,
    source: Option<Source>,
}

#[derive(Debug, Deserialize)]
struct Source {
    name: Option<String>,
}

/// NewsAPI.org `everything` search, newest first.
pub struct NewsApiProvider {
    endpoint: String,
    api_key: String,
    client: reqwest::Client,
}

impl NewsApiProvider {
    pub fn new(api_key: String) -> Result<Self> {
        Ok(Self {
            endpoint: NEWSAPI_ENDPOINT.to_string(),
            api_key,
            client: http_client()?,
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn parse(body: Resp) -> Vec<NewsItem> {
        body.articles
            .into_iter()
            .filter_map(|a| {
                Some(NewsItem {
                    title: a.title?,
                    url: a.url?,
                    summary: a.description.unwrap_or_default(),
                    published_at: a.published_at,
                    source: a
                        .source
                        .and_then(|s| s.name)
                        .unwrap_or_else(|| "NewsAPI".to_string()),
                })
            })
            .collect()
    }
}

#[async_trait]
impl NewsProvider for NewsApiProvider {
    async fn fetch_latest(&self, query: &NewsQuery) -> Result<Vec<NewsItem>> {
        let page_size = query.limit.clamp(1, 100).to_string();
        let resp = self
            .client
            .get(&self.endpoint)
            .header("X-Api-Key", &self.api_key)
            .query(&[
                ("q", query.query.as_str()),
                ("language", query.language.as_str()),
                ("pageSize", page_size.as_str()),
                ("sortBy", "publishedAt"),
            ])
            .send()
            .await
            .map_err(|e| DigestError::transport("newsapi get", e))?;
        check_status(self.name(), &resp)?;
        let body: Resp = resp
            .json()
            .await
            .map_err(|e| DigestError::transport("newsapi json", e))?;
        Ok(Self::parse(body))
    }

    fn name(&self) -> &'static str {
        "newsapi"
    }
}
