// src/discord/client.rs
use async_trait::async_trait;
use metrics::counter;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use super::{ChannelApi, Message};
use crate::error::{DigestError, Result};

const USER_AGENT: &str = concat!("DiscordBot (dejiryu-digest, ", env!("CARGO_PKG_VERSION"), ")");

/// Bot-token REST client. No retries: a failed call surfaces immediately.
#[derive(Clone)]
pub struct DiscordClient {
    base: String,
    token: String,
    client: Client,
}

impl DiscordClient {
    pub fn new(base: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| DigestError::transport("building discord http client", e))?;
        Ok(Self {
            base: base.into().trim_end_matches('/').to_string(),
            token: token.into(),
            client,
        })
    }

    fn messages_url(&self, channel: &str) -> String {
        format!("{}/channels/{}/messages", self.base, channel)
    }

    fn auth(&self) -> String {
        format!("Bot {}", self.token)
    }
}

#[derive(Serialize)]
struct CreateMessage<'a> {
    content: &'a str,
}

#[async_trait]
impl ChannelApi for DiscordClient {
    async fn list_messages(
        &self,
        channel: &str,
        before: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Message>> {
        let mut query: Vec<(&str, String)> = vec![("limit", limit.to_string())];
        if let Some(b) = before {
            query.push(("before", b.to_string()));
        }

        let resp = self
            .client
            .get(self.messages_url(channel))
            .header(reqwest::header::AUTHORIZATION, self.auth())
            .query(&query)
            .send()
            .await
            .map_err(|e| DigestError::transport("discord list messages", e))?;

        let status = resp.status();
        if !status.is_success() {
            tracing::warn!(channel, status = status.as_u16(), "discord history request failed");
            return Err(DigestError::UpstreamFetchFailed {
                source_name: "discord".into(),
                status: status.as_u16(),
            });
        }

        counter!("discord_pages_fetched_total").increment(1);
        resp.json::<Vec<Message>>()
            .await
            .map_err(|e| DigestError::transport("decoding discord messages", e))
    }

    async fn post_message(&self, channel: &str, content: &str) -> Result<()> {
        let resp = self
            .client
            .post(self.messages_url(channel))
            .header(reqwest::header::AUTHORIZATION, self.auth())
            .json(&CreateMessage { content })
            .send()
            .await
            .map_err(|e| DigestError::transport("discord post message", e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::error!(channel, status = status.as_u16(), body = %body, "discord rejected message");
            return Err(DigestError::PostFailed {
                channel: channel.to_string(),
                status: status.as_u16(),
            });
        }
        counter!("discord_posts_total").increment(1);
        Ok(())
    }
}
