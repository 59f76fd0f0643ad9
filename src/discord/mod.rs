// src/discord/mod.rs
//! Discord REST surface used by the jobs: read channel history, post a message.

pub mod client;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use client::DiscordClient;

/// Discord refuses message bodies above this many characters.
pub const MESSAGE_CHAR_LIMIT: usize = 2000;

/// Page size requested from `GET /channels/{id}/messages` (Discord's maximum).
pub const PAGE_LIMIT: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Author {
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub global_name: Option<String>,
    #[serde(default)]
    pub bot: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub id: String,
    pub author: Author,
    #[serde(default)]
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// `<@id>` renders as a mention inside Discord.
    pub fn author_mention(&self) -> String {
        format!("<@{}>", self.author.id)
    }
}

/// The two channel operations the jobs need. `DiscordClient` is the real one;
/// tests plug in in-memory fakes.
#[async_trait]
pub trait ChannelApi: Send + Sync {
    /// One page of history, newest first, strictly older than `before` when given.
    async fn list_messages(
        &self,
        channel: &str,
        before: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Message>>;

    /// Post `content` as-is. Callers split long bodies with [`split_message`].
    async fn post_message(&self, channel: &str, content: &str) -> Result<()>;
}

/// Split `text` into chunks of at most `limit` characters, preferring line breaks.
/// A single line longer than `limit` is hard-split on char boundaries.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    if text.chars().count() <= limit {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for line in text.split('\n') {
        let line_len = line.chars().count();
        let sep = usize::from(!current.is_empty());

        if current_len + sep + line_len <= limit {
            if sep == 1 {
                current.push('\n');
            }
            current.push_str(line);
            current_len += sep + line_len;
            continue;
        }

        if !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if line_len <= limit {
            current.push_str(line);
            current_len = line_len;
        } else {
            let chars: Vec<char> = line.chars().collect();
            for piece in chars.chunks(limit) {
                chunks.push(piece.iter().collect());
            }
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_parses_discord_payload() {
        let raw = r#"{
            "id": "1234567890",
            "channel_id": "42",
            "author": {"id": "7", "username": "ryu", "global_name": null},
            "content": "できた！",
            "timestamp": "2025-03-01T12:00:00.000000+00:00",
            "edited_timestamp": null
        }"#;
        let m: Message = serde_json::from_str(raw).unwrap();
        assert_eq!(m.id, "1234567890");
        assert!(!m.author.bot, "missing bot flag means human");
        assert_eq!(m.author_mention(), "<@7>");
        assert_eq!(m.timestamp.to_rfc3339(), "2025-03-01T12:00:00+00:00");
    }

    #[test]
    fn short_text_is_one_chunk() {
        assert_eq!(split_message("hello", 2000), vec!["hello".to_string()]);
    }

    #[test]
    fn splits_on_line_boundaries() {
        let text = "aaaa\nbbbb\ncccc";
        assert_eq!(
            split_message(text, 9),
            vec!["aaaa\nbbbb".to_string(), "cccc".to_string()]
        );
    }

    #[test]
    fn hard_splits_overlong_line_by_chars() {
        let text = "あいうえおかきくけ";
        let chunks = split_message(text, 4);
        assert_eq!(chunks, vec!["あいうえ", "おかきく", "け"]);
        assert!(chunks.iter().all(|c| c.chars().count() <= 4));
    }
}
