// src/news/mod.rs
//! AI news sources and the fallback chain over them.

pub mod providers;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::counter;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::config::NewsConfig;
use crate::error::Result;
use crate::ledger::{filter_unseen, SeenUrls};
use providers::{brave::BraveSearchProvider, google_rss::GoogleNewsRssProvider, newsapi::NewsApiProvider};

/// One article. `url` is the de-duplication key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewsItem {
    pub title: String,
    pub url: String,
    pub summary: String,
    pub published_at: Option<DateTime<Utc>>,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsQuery {
    pub query: String,
    pub language: String,
    pub limit: usize,
}

#[async_trait]
pub trait NewsProvider: Send + Sync {
    async fn fetch_latest(&self, query: &NewsQuery) -> Result<Vec<NewsItem>>;
    fn name(&self) -> &'static str;
}

/// Title/summary cleanup: decode entities, strip tags, collapse whitespace, cap length.
pub fn normalize_text(s: &str, max_chars: usize) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").expect("tag regex"));
    out = re_tags.replace_all(&out, " ").to_string();

    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").expect("ws regex"));
    out = re_ws.replace_all(&out, " ").trim().to_string();

    if out.chars().count() > max_chars {
        out = out.chars().take(max_chars).collect();
        out.push('…');
    }
    out
}

/// Drop items without title or URL, normalize text fields.
pub fn clean_items(items: Vec<NewsItem>) -> Vec<NewsItem> {
    items
        .into_iter()
        .filter_map(|mut it| {
            it.title = normalize_text(&it.title, 200);
            it.summary = normalize_text(&it.summary, 300);
            it.url = it.url.trim().to_string();
            if it.title.is_empty() || it.url.is_empty() {
                None
            } else {
                Some(it)
            }
        })
        .collect()
}

/// Ordered providers; the first one yielding items wins.
pub struct NewsChain {
    providers: Vec<Box<dyn NewsProvider>>,
}

impl NewsChain {
    pub fn new(providers: Vec<Box<dyn NewsProvider>>) -> Self {
        Self { providers }
    }

    /// NewsAPI and Brave only when their keys are set; Google News RSS always last.
    pub fn from_config(cfg: &NewsConfig) -> Result<Self> {
        let mut providers: Vec<Box<dyn NewsProvider>> = Vec::new();
        if let Some(key) = &cfg.news_api_key {
            providers.push(Box::new(NewsApiProvider::new(key.clone())?));
        }
        if let Some(key) = &cfg.brave_api_key {
            providers.push(Box::new(BraveSearchProvider::new(key.clone())?));
        }
        providers.push(Box::new(GoogleNewsRssProvider::new()?));
        Ok(Self { providers })
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Never fails: every provider erroring or coming back empty yields `[]`.
    pub async fn fetch(&self, query: &NewsQuery) -> Vec<NewsItem> {
        self.fetch_unseen(query, &SeenUrls::new()).await
    }

    /// Like [`fetch`](Self::fetch), but a provider whose items are all in `seen`
    /// counts as empty, so the next provider gets a turn.
    pub async fn fetch_unseen(&self, query: &NewsQuery, seen: &SeenUrls) -> Vec<NewsItem> {
        for p in &self.providers {
            match p.fetch_latest(query).await {
                Ok(items) => {
                    let cleaned = clean_items(items);
                    let returned = cleaned.len();
                    let items = filter_unseen(cleaned, seen);
                    if items.is_empty() {
                        tracing::info!(
                            provider = p.name(),
                            returned,
                            "news provider had nothing new, trying next"
                        );
                        continue;
                    }
                    counter!("news_items_fetched_total").increment(items.len() as u64);
                    tracing::info!(provider = p.name(), count = items.len(), "news fetched");
                    return items;
                }
                Err(e) => {
                    tracing::warn!(provider = p.name(), error = %e, "news provider failed");
                    counter!("news_provider_errors_total").increment(1);
                }
            }
        }
        Vec::new()
    }
}
