// tests/common/mod.rs
// Shared fakes for integration tests.
#![allow(dead_code)]

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use dejiryu_digest::config::{Config, FileConfig};
use dejiryu_digest::discord::{Author, ChannelApi, Message};
use dejiryu_digest::error::{DigestError, Result};

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 1, 0, 0).unwrap()
}

pub fn msg(id: u64, author: &str, bot: bool, content: &str, age: Duration) -> Message {
    Message {
        id: id.to_string(),
        author: Author {
            id: author.to_string(),
            username: format!("user{author}"),
            global_name: None,
            bot,
        },
        content: content.to_string(),
        timestamp: now() - age,
    }
}

/// `count` human messages one hour apart, newest first, ids descending.
pub fn hourly_history(count: u64) -> Vec<Message> {
    (0..count)
        .map(|i| msg(10_000 - i, "7", false, &format!("m{i}"), Duration::hours(i as i64)))
        .collect()
}

pub fn config_with(pairs: &[(&str, &str)]) -> Config {
    config_from(FileConfig::default(), pairs)
}

pub fn config_from(file: FileConfig, pairs: &[(&str, &str)]) -> Config {
    let owned: Vec<(String, String)> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Config::resolve(file, move |k| {
        owned.iter().find(|(key, _)| key == k).map(|(_, v)| v.clone())
    })
    .expect("test config resolves")
}

/// In-memory channel: serves `history` (newest first) with before-cursor paging.
#[derive(Default)]
pub struct FakeChannel {
    pub history: Vec<Message>,
    pub fail_list: Option<u16>,
    pub fail_post: Option<u16>,
    pub list_calls: Mutex<Vec<Option<String>>>,
    pub posted: Mutex<Vec<(String, String)>>,
}

impl FakeChannel {
    pub fn with_history(history: Vec<Message>) -> Self {
        Self {
            history,
            ..Self::default()
        }
    }

    pub fn posted(&self) -> Vec<(String, String)> {
        self.posted.lock().unwrap().clone()
    }

    pub fn list_calls(&self) -> Vec<Option<String>> {
        self.list_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChannelApi for FakeChannel {
    async fn list_messages(
        &self,
        _channel: &str,
        before: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Message>> {
        self.list_calls
            .lock()
            .unwrap()
            .push(before.map(str::to_owned));
        if let Some(status) = self.fail_list {
            return Err(DigestError::UpstreamFetchFailed {
                source_name: "discord".into(),
                status,
            });
        }
        let start = match before {
            None => 0,
            Some(id) => match self.history.iter().position(|m| m.id == id) {
                Some(pos) => pos + 1,
                None => self.history.len(),
            },
        };
        Ok(self.history.iter().skip(start).take(limit).cloned().collect())
    }

    async fn post_message(&self, channel: &str, content: &str) -> Result<()> {
        if let Some(status) = self.fail_post {
            return Err(DigestError::PostFailed {
                channel: channel.to_string(),
                status,
            });
        }
        self.posted
            .lock()
            .unwrap()
            .push((channel.to_string(), content.to_string()));
        Ok(())
    }
}

/// Serve `router` on an ephemeral local port; returns the base URL.
pub async fn serve(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}
