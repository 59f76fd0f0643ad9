// src/news/providers/google_rss.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quick_xml::de::from_str;
use serde::Deserialize;
use time::{format_description::well_known::Rfc2822, OffsetDateTime};

use super::{check_status, http_client};
use crate::error::{DigestError, Result};
use crate::news::{NewsItem, NewsProvider, NewsQuery};

pub const GOOGLE_NEWS_RSS_ENDPOINT: &str = "https://news.google.com/rss/search";

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
    source: Option<SourceTag>,
}

#[derive(Debug, Deserialize)]
struct SourceTag {
    #[serde(rename = "$text", default)]
    name: String,
}

fn parse_rfc2822(ts: &str) -> Option<DateTime<Utc>> {
    if let Some(dt) = OffsetDateTime::parse(ts, &Rfc2822)
        .ok()
        .and_then(|dt| DateTime::from_timestamp(dt.unix_timestamp(), 0))
    {
        return Some(dt);
    }
    // `time` rejects some obsolete zone names ("GMT") that feeds still use.
    DateTime::parse_from_rfc2822(ts)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Keyless fallback: Google News search RSS.
pub struct GoogleNewsRssProvider {
    endpoint: String,
    client: reqwest::Client,
}

impl GoogleNewsRssProvider {
    pub fn new() -> Result<Self> {
        Ok(Self {
            endpoint: GOOGLE_NEWS_RSS_ENDPOINT.to_string(),
            client: http_client()?,
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn parse_feed(xml: &str, limit: usize) -> Result<Vec<NewsItem>> {
        let rss: Rss = from_str(xml).map_err(|e| DigestError::UpstreamMalformed {
            source_name: "google-news-rss".into(),
            detail: e.to_string(),
        })?;
        Ok(rss
            .channel
            .item
            .into_iter()
            .filter_map(|it| {
                Some(NewsItem {
                    title: it.title?,
                    url: it.link?,
                    summary: it.description.unwrap_or_default(),
                    published_at: it.pub_date.as_deref().and_then(parse_rfc2822),
                    source: it
                        .source
                        .map(|s| s.name)
                        .filter(|n| !n.trim().is_empty())
                        .unwrap_or_else(|| "Google News".to_string()),
                })
            })
            .take(limit)
            .collect())
    }
}

#[async_trait]
impl NewsProvider for GoogleNewsRssProvider {
    async fn fetch_latest(&self, query: &NewsQuery) -> Result<Vec<NewsItem>> {
        let (hl, gl, ceid) = match query.language.as_str() {
            "ja" => ("ja", "JP", "JP:ja"),
            _ => ("en-US", "US", "US:en"),
        };
        let resp = self
            .client
            .get(&self.endpoint)
            .query(&[("q", query.query.as_str()), ("hl", hl), ("gl", gl), ("ceid", ceid)])
            .send()
            .await
            .map_err(|e| DigestError::transport("google news get", e))?;
        check_status(self.name(), &resp)?;
        let body = resp
            .text()
            .await
            .map_err(|e| DigestError::transport("google news body", e))?;
        Self::parse_feed(&body, query.limit)
    }

    fn name(&self) -> &'static str {
        "google-news-rss"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:media="http://search.yahoo.com/mrss/">
  <channel>
    <title>"生成AI" - Google ニュース</title>
    <link>https://news.google.com/search?q=AI</link>
    <item>
      <title>OpenAIが新モデルを発表 - 日経</title>
      <link>https://news.google.com/rss/articles/abc?oc=5</link>
      <guid isPermaLink="false">abc</guid>
      <pubDate>Sat, 01 Mar 2025 09:00:00 GMT</pubDate>
      <description>&lt;a href="https://x"&gt;OpenAIが新モデル&lt;/a&gt;</description>
      <source url="https://www.nikkei.com">日経</source>
    </item>
    <item>
      <title>2本目</title>
      <link>https://news.google.com/rss/articles/def</link>
      <pubDate>Fri, 28 Feb 2025 21:00:00 +0900</pubDate>
    </item>
    <item>
      <title>3本目</title>
      <link>https://news.google.com/rss/articles/ghi</link>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn parses_feed_items() {
        let items = GoogleNewsRssProvider::parse_feed(FEED, 10).unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].source, "日経");
        assert_eq!(
            items[0].published_at.unwrap().to_rfc3339(),
            "2025-03-01T09:00:00+00:00"
        );
        assert_eq!(
            items[1].published_at.unwrap().to_rfc3339(),
            "2025-02-28T12:00:00+00:00"
        );
        assert_eq!(items[2].source, "Google News");
        assert!(items[2].published_at.is_none());
    }

    #[test]
    fn limit_applies() {
        assert_eq!(GoogleNewsRssProvider::parse_feed(FEED, 2).unwrap().len(), 2);
    }

    #[test]
    fn empty_channel_is_ok() {
        let xml = "<rss><channel><title>t</title></channel></rss>";
        assert!(GoogleNewsRssProvider::parse_feed(xml, 5).unwrap().is_empty());
    }
}
