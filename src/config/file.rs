// src/config/file.rs
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_CONFIG_PATH: &str = "DEJIRYU_CONFIG_PATH";

/// On-disk settings. Every field is optional; the environment fills or overrides.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct FileConfig {
    pub discord_token_env: Option<String>,
    pub discord_api_base: Option<String>,
    pub utc_offset_hours: Option<i32>,
    pub max_items: Option<usize>,
    pub ledger_path: Option<PathBuf>,
    pub log_path: Option<PathBuf>,
    pub channels: FileChannels,
    pub consultation: FileConsultation,
    pub ai_news: FileAiNews,
    pub openai: FileOpenAi,
    pub exclusive_content: FileExclusive,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct FileChannels {
    #[serde(deserialize_with = "de_opt_id")]
    pub achievements: Option<String>,
    #[serde(deserialize_with = "de_opt_id")]
    pub self_intro: Option<String>,
    #[serde(deserialize_with = "de_opt_id")]
    pub consultation: Option<String>,
    #[serde(deserialize_with = "de_opt_id")]
    pub ai_news: Option<String>,
    #[serde(deserialize_with = "de_opt_id")]
    pub exclusive: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct FileConsultation {
    #[serde(deserialize_with = "de_opt_id")]
    pub ping_role_id: Option<String>,
    pub message_variations: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct FileAiNews {
    pub query: Option<String>,
    pub language: Option<String>,
    pub articles_per_day: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct FileOpenAi {
    pub model: Option<String>,
    pub base_url: Option<String>,
}

/// `[exclusive_content]`: members-only drops rotated every `content_rotation_days`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct FileExclusive {
    pub content_rotation_days: Option<u32>,
    pub items: Vec<FileExclusiveItem>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct FileExclusiveItem {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// Discord ids show up both as JSON numbers and as strings.
fn de_opt_id<'de, D>(de: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Num(u64),
        Str(String),
    }
    Ok(match Option::<Id>::deserialize(de)? {
        Some(Id::Num(n)) => Some(n.to_string()),
        Some(Id::Str(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    })
}

/// Load settings from an explicit path. Supports TOML or JSON.
pub fn load_from(path: &Path) -> Result<FileConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading config from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse(&content, ext.as_str()).with_context(|| format!("parsing {}", path.display()))
}

/// Resolve the config file:
/// 1) `explicit` (CLI flag or $DEJIRYU_CONFIG_PATH), which must exist
/// 2) config/dejiryu.toml
/// 3) config/dejiryu.json
/// 4) defaults
pub fn load_default(explicit: Option<&Path>) -> Result<FileConfig> {
    if let Some(p) = explicit {
        if p.exists() {
            return load_from(p);
        }
        return Err(anyhow!("config path {} does not exist", p.display()));
    }
    let toml_p = PathBuf::from("config/dejiryu.toml");
    if toml_p.exists() {
        return load_from(&toml_p);
    }
    let json_p = PathBuf::from("config/dejiryu.json");
    if json_p.exists() {
        return load_from(&json_p);
    }
    Ok(FileConfig::default())
}

/// Where env vars came from after [`load_env_fallbacks`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvSource {
    /// The token was already set (process env or `.env`).
    Present,
    EnvLocal,
    /// Only `env.example` provided it; callers should warn.
    EnvExample,
    Missing,
}

/// `env.local`, then `env.example` in `dir`, each only while `token_env` is unset.
/// Existing variables are never overridden.
pub fn load_env_fallbacks(dir: &Path, token_env: &str) -> EnvSource {
    let has_token = || std::env::var(token_env).is_ok_and(|v| !v.trim().is_empty());
    if has_token() {
        return EnvSource::Present;
    }
    if dotenvy::from_path(dir.join("env.local")).is_ok() && has_token() {
        return EnvSource::EnvLocal;
    }
    if dotenvy::from_path(dir.join("env.example")).is_ok() && has_token() {
        return EnvSource::EnvExample;
    }
    EnvSource::Missing
}

fn parse(s: &str, hint_ext: &str) -> Result<FileConfig> {
    let looks_json = s.trim_start().starts_with('{');
    if hint_ext == "json" || (hint_ext != "toml" && looks_json) {
        if let Ok(v) = serde_json::from_str(s) {
            return Ok(v);
        }
    }
    match toml::from_str(s) {
        Ok(v) => Ok(v),
        Err(toml_err) => serde_json::from_str(s)
            .map_err(|_| anyhow!("unsupported config format: {toml_err}")),
    }
}
