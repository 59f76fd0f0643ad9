// src/summarize.rs
//! Optional AI enrichment. Every attempt ends in `Ready` or `Unavailable`;
//! callers fall back to the template on `Unavailable`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;
use serde::{Deserialize, Serialize};

use crate::config::OpenAiConfig;
use crate::error::DigestError;

/// Longest summary we accept; leaves room for a header inside one Discord message.
pub const MAX_SUMMARY_CHARS: usize = 1800;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Enrichment {
    Ready(String),
    Unavailable(String),
}

impl Enrichment {
    pub fn map(self, f: impl FnOnce(String) -> String) -> Self {
        match self {
            Self::Ready(text) => Self::Ready(f(text)),
            other => other,
        }
    }

    /// The enriched text, or the template when enrichment was unavailable.
    pub fn or_template(self, template: impl FnOnce() -> String) -> (String, bool) {
        match self {
            Self::Ready(text) => (text, true),
            Self::Unavailable(reason) => {
                tracing::info!(%reason, "using template digest");
                counter!("enrichment_fallbacks_total").increment(1);
                (template(), false)
            }
        }
    }
}

impl From<DigestError> for Enrichment {
    fn from(e: DigestError) -> Self {
        Self::Unavailable(e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, prompt: &Prompt) -> Enrichment;
    fn name(&self) -> &'static str;
}

pub type DynSummarizer = Arc<dyn Summarizer>;

/// OpenAI when a key is configured, otherwise a summarizer that always declines.
pub fn build_summarizer(cfg: &OpenAiConfig) -> DynSummarizer {
    match &cfg.api_key {
        Some(key) => match OpenAiSummarizer::new(key.clone(), &cfg.model, &cfg.base_url) {
            Ok(s) => Arc::new(s),
            Err(e) => {
                tracing::warn!(error = %e, "openai client unavailable");
                Arc::new(DisabledSummarizer)
            }
        },
        None => Arc::new(DisabledSummarizer),
    }
}

/// Chat Completions client.
pub struct OpenAiSummarizer {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiSummarizer {
    pub fn new(api_key: String, model: &str, base_url: &str) -> Result<Self, DigestError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("dejiryu-digest/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| DigestError::transport("building openai client", e))?;
        Ok(Self {
            http,
            api_key,
            model: model.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn call(&self, prompt: &Prompt) -> Result<String, DigestError> {
        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
            max_tokens: u32,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            #[serde(default)]
            content: Option<String>,
        }

        let req = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: &prompt.system,
                },
                Msg {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            temperature: 0.7,
            max_tokens: 900,
        };

        let resp = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .map_err(|e| DigestError::transport("openai request", e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(DigestError::EnrichmentFailed(format!(
                "openai returned HTTP {}",
                status.as_u16()
            )));
        }
        let body: Resp = resp
            .json()
            .await
            .map_err(|e| DigestError::transport("openai json", e))?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        let cleaned = sanitize_summary(&content);
        if cleaned.is_empty() {
            return Err(DigestError::EnrichmentFailed("empty completion".into()));
        }
        Ok(cleaned)
    }
}

#[async_trait]
impl Summarizer for OpenAiSummarizer {
    async fn summarize(&self, prompt: &Prompt) -> Enrichment {
        match self.call(prompt).await {
            Ok(text) => Enrichment::Ready(text),
            Err(e) => {
                tracing::warn!(error = %e, "openai summary failed");
                e.into()
            }
        }
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

/// Used when no API key is configured.
pub struct DisabledSummarizer;

#[async_trait]
impl Summarizer for DisabledSummarizer {
    async fn summarize(&self, _prompt: &Prompt) -> Enrichment {
        Enrichment::Unavailable("no summarizer configured".into())
    }

    fn name(&self) -> &'static str {
        "disabled"
    }
}

/// Returns the same text for every prompt; for dry runs and tests.
#[derive(Clone)]
pub struct FixedSummarizer {
    pub text: String,
}

#[async_trait]
impl Summarizer for FixedSummarizer {
    async fn summarize(&self, _prompt: &Prompt) -> Enrichment {
        let cleaned = sanitize_summary(&self.text);
        if cleaned.is_empty() {
            Enrichment::Unavailable("empty fixed text".into())
        } else {
            Enrichment::Ready(cleaned)
        }
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}

/// Trim, squeeze runs of blank lines, cap at [`MAX_SUMMARY_CHARS`].
pub fn sanitize_summary(input: &str) -> String {
    let mut out = String::with_capacity(input.len().min(MAX_SUMMARY_CHARS * 4));
    let mut blank_run = 0usize;
    for line in input.trim().lines() {
        let line = line.trim_end();
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(line);
    }
    if out.chars().count() > MAX_SUMMARY_CHARS {
        out = out.chars().take(MAX_SUMMARY_CHARS - 1).collect();
        out.push('…');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt() -> Prompt {
        Prompt {
            system: "s".into(),
            user: "u".into(),
        }
    }

    #[tokio::test]
    async fn disabled_is_unavailable() {
        let out = DisabledSummarizer.summarize(&prompt()).await;
        assert!(matches!(out, Enrichment::Unavailable(_)));
    }

    #[tokio::test]
    async fn blank_fixed_text_is_unavailable() {
        let s = FixedSummarizer { text: " \n ".into() };
        assert!(matches!(s.summarize(&prompt()).await, Enrichment::Unavailable(_)));
    }

    #[test]
    fn or_template_picks_branch() {
        let (t, ai) = Enrichment::Ready("ai".into()).or_template(|| "tpl".into());
        assert_eq!((t.as_str(), ai), ("ai", true));
        let (t, ai) = Enrichment::Unavailable("x".into()).or_template(|| "tpl".into());
        assert_eq!((t.as_str(), ai), ("tpl", false));
    }

    #[test]
    fn sanitize_squeezes_blank_lines_and_caps() {
        assert_eq!(sanitize_summary("\n a\n\n\n\nb  \n"), "a\n\nb");
        let long = "x".repeat(MAX_SUMMARY_CHARS + 50);
        assert_eq!(sanitize_summary(&long).chars().count(), MAX_SUMMARY_CHARS);
    }

    #[test]
    fn no_key_builds_disabled() {
        let cfg = OpenAiConfig {
            api_key: None,
            model: "gpt-4o-mini".into(),
            base_url: "https://api.openai.com/v1".into(),
        };
        assert_eq!(build_summarizer(&cfg).name(), "disabled");
    }
}
