// src/config/mod.rs
//! Run configuration, resolved once at startup and handed to each job.
//!
//! Precedence per key: process environment, then the config file, then the
//! built-in default. Nothing else in the crate reads the environment.

pub mod file;

use std::path::PathBuf;

use chrono::FixedOffset;

use crate::error::{DigestError, Result};
pub use file::FileConfig;

pub const DEFAULT_TOKEN_ENV: &str = "DISCORD_BOT_TOKEN";
pub const DEFAULT_DISCORD_API_BASE: &str = "https://discord.com/api/v10";
pub const DEFAULT_OPENAI_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_LEDGER_PATH: &str = "data/sent_news.json";
pub const DEFAULT_LOG_PATH: &str = "logs/dejiryu.log";
pub const DEFAULT_UTC_OFFSET_HOURS: i32 = 9;
pub const DEFAULT_MAX_ITEMS: usize = 1000;
pub const DEFAULT_ARTICLES_PER_DAY: usize = 3;
pub const DEFAULT_EXCLUSIVE_ROTATION_DAYS: u32 = 7;

/// Which configured channel a job talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Achievements,
    SelfIntro,
    Consultation,
    AiNews,
    Exclusive,
}

impl ChannelKind {
    pub fn env_key(self) -> &'static str {
        match self {
            Self::Achievements => "ACHIEVEMENT_CHANNEL_ID",
            Self::SelfIntro => "SELF_INTRO_CHANNEL_ID",
            Self::Consultation => "CONSULTATION_CHANNEL_ID",
            Self::AiNews => "AI_NEWS_CHANNEL_ID",
            Self::Exclusive => "EXCLUSIVE_CHANNEL_ID",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Channels {
    pub achievements: Option<String>,
    pub self_intro: Option<String>,
    pub consultation: Option<String>,
    pub ai_news: Option<String>,
    pub exclusive: Option<String>,
}

impl Channels {
    pub fn get(&self, kind: ChannelKind) -> Option<&str> {
        match kind {
            ChannelKind::Achievements => self.achievements.as_deref(),
            ChannelKind::SelfIntro => self.self_intro.as_deref(),
            ChannelKind::Consultation => self.consultation.as_deref(),
            ChannelKind::AiNews => self.ai_news.as_deref(),
            ChannelKind::Exclusive => self.exclusive.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsultationConfig {
    pub ping_role_id: Option<String>,
    pub message_variations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsConfig {
    pub news_api_key: Option<String>,
    pub brave_api_key: Option<String>,
    pub query: String,
    pub language: String,
    pub articles_per_day: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExclusiveItem {
    pub title: String,
    pub description: String,
    pub url: Option<String>,
}

/// Rotating members-only content. `items` may be empty; the job then refuses to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExclusiveConfig {
    pub rotation_days: u32,
    pub items: Vec<ExclusiveItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Name of the env var the token was read from (for error messages).
    pub token_env: String,
    pub discord_token: Option<String>,
    pub discord_api_base: String,
    pub channels: Channels,
    pub consultation: ConsultationConfig,
    pub news: NewsConfig,
    pub openai: OpenAiConfig,
    pub exclusive: ExclusiveConfig,
    pub ledger_path: PathBuf,
    pub log_path: PathBuf,
    pub utc_offset: FixedOffset,
    pub max_items: usize,
}

fn default_variations() -> Vec<String> {
    vec![
        "質問はないか？デジリューの診察時間だぞ。遠慮なく呼んでくれよな！".to_string(),
        "困ったらデジリューがいる。相談室でみんなの知恵を借りていこうぜ！".to_string(),
        "つまずいてるところ、ひとりで抱えてないか？ここで吐き出してくれ！".to_string(),
    ]
}

impl Config {
    /// Resolve against the real process environment.
    pub fn from_env(file: FileConfig) -> Result<Self> {
        Self::resolve(file, |k| std::env::var(k).ok())
    }

    /// Resolve with an arbitrary lookup; blank values count as unset.
    pub fn resolve<F>(file: FileConfig, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |k: &str| {
            lookup(k)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let token_env = file
            .discord_token_env
            .clone()
            .unwrap_or_else(|| DEFAULT_TOKEN_ENV.to_string());

        let channel = |kind: ChannelKind, from_file: Option<String>| -> Result<Option<String>> {
            let v = get(kind.env_key()).or(from_file);
            match v {
                Some(id) => parse_snowflake(kind.env_key(), &id).map(Some),
                None => Ok(None),
            }
        };
        let channels = Channels {
            achievements: channel(ChannelKind::Achievements, file.channels.achievements)?,
            self_intro: channel(ChannelKind::SelfIntro, file.channels.self_intro)?,
            consultation: channel(ChannelKind::Consultation, file.channels.consultation)?,
            ai_news: channel(ChannelKind::AiNews, file.channels.ai_news)?,
            exclusive: channel(ChannelKind::Exclusive, file.channels.exclusive)?,
        };

        let ping_role_id = match get("CONSULTATION_ROLE_ID").or(file.consultation.ping_role_id) {
            Some(id) => Some(parse_snowflake("CONSULTATION_ROLE_ID", &id)?),
            None => None,
        };
        let message_variations: Vec<String> = file
            .consultation
            .message_variations
            .unwrap_or_else(default_variations)
            .into_iter()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect();
        if message_variations.is_empty() {
            return Err(DigestError::ConfigInvalid(
                "at least one consultation message variation is required".into(),
            ));
        }

        let articles_per_day = match get("AI_NEWS_ARTICLES_PER_DAY") {
            Some(v) => parse_number("AI_NEWS_ARTICLES_PER_DAY", &v)?,
            None => file
                .ai_news
                .articles_per_day
                .unwrap_or(DEFAULT_ARTICLES_PER_DAY),
        };
        if articles_per_day == 0 {
            return Err(DigestError::ConfigInvalid(
                "AI_NEWS_ARTICLES_PER_DAY must be >= 1".into(),
            ));
        }

        let max_items = match get("DEJIRYU_MAX_ITEMS") {
            Some(v) => parse_number("DEJIRYU_MAX_ITEMS", &v)?,
            None => file.max_items.unwrap_or(DEFAULT_MAX_ITEMS),
        };
        if max_items == 0 {
            return Err(DigestError::ConfigInvalid(
                "DEJIRYU_MAX_ITEMS must be >= 1".into(),
            ));
        }

        let offset_hours: i32 = match get("DEJIRYU_UTC_OFFSET_HOURS") {
            Some(v) => v.parse().map_err(|_| {
                DigestError::ConfigInvalid(format!("DEJIRYU_UTC_OFFSET_HOURS: {v:?}"))
            })?,
            None => file.utc_offset_hours.unwrap_or(DEFAULT_UTC_OFFSET_HOURS),
        };
        let utc_offset = offset_hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                DigestError::ConfigInvalid(format!("utc offset out of range: {offset_hours}h"))
            })?;

        let rotation_days = match get("EXCLUSIVE_ROTATION_DAYS") {
            Some(v) => v.parse::<u32>().map_err(|_| {
                DigestError::ConfigInvalid(format!("EXCLUSIVE_ROTATION_DAYS is not a number: {v:?}"))
            })?,
            None => file
                .exclusive_content
                .content_rotation_days
                .unwrap_or(DEFAULT_EXCLUSIVE_ROTATION_DAYS),
        };
        if rotation_days == 0 {
            return Err(DigestError::ConfigInvalid(
                "exclusive content rotation days must be >= 1".into(),
            ));
        }
        let exclusive_items = file
            .exclusive_content
            .items
            .into_iter()
            .filter(|it| !it.title.trim().is_empty())
            .map(|it| ExclusiveItem {
                title: it.title.trim().to_string(),
                description: it.description.trim().to_string(),
                url: it.url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty()),
            })
            .collect();

        Ok(Self {
            discord_token: get(&token_env),
            token_env,
            discord_api_base: get("DISCORD_API_BASE")
                .or(file.discord_api_base)
                .unwrap_or_else(|| DEFAULT_DISCORD_API_BASE.to_string()),
            channels,
            consultation: ConsultationConfig {
                ping_role_id,
                message_variations,
            },
            news: NewsConfig {
                news_api_key: get("NEWS_API_KEY"),
                brave_api_key: get("BRAVE_API_KEY"),
                query: get("AI_NEWS_QUERY")
                    .or(file.ai_news.query)
                    .unwrap_or_else(|| "生成AI OR ChatGPT OR OpenAI".to_string()),
                language: get("AI_NEWS_LANGUAGE")
                    .or(file.ai_news.language)
                    .unwrap_or_else(|| "ja".to_string()),
                articles_per_day,
            },
            openai: OpenAiConfig {
                api_key: get("OPENAI_API_KEY"),
                model: get("OPENAI_MODEL")
                    .or(file.openai.model)
                    .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
                base_url: get("OPENAI_API_BASE")
                    .or(file.openai.base_url)
                    .unwrap_or_else(|| DEFAULT_OPENAI_BASE.to_string()),
            },
            exclusive: ExclusiveConfig {
                rotation_days,
                items: exclusive_items,
            },
            ledger_path: get("DEJIRYU_LEDGER_PATH")
                .map(PathBuf::from)
                .or(file.ledger_path)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LEDGER_PATH)),
            log_path: get("DEJIRYU_LOG_PATH")
                .map(PathBuf::from)
                .or(file.log_path)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_PATH)),
            utc_offset,
            max_items,
        })
    }

    pub fn require_token(&self) -> Result<&str> {
        self.discord_token
            .as_deref()
            .ok_or_else(|| DigestError::ConfigMissing(self.token_env.clone()))
    }

    pub fn require_channel(&self, kind: ChannelKind) -> Result<&str> {
        self.channels
            .get(kind)
            .ok_or_else(|| DigestError::ConfigMissing(kind.env_key().to_string()))
    }
}

fn parse_snowflake(key: &str, v: &str) -> Result<String> {
    v.parse::<u64>()
        .map(|n| n.to_string())
        .map_err(|_| DigestError::ConfigInvalid(format!("{key} is not a Discord id: {v:?}")))
}

fn parse_number(key: &str, v: &str) -> Result<usize> {
    v.parse()
        .map_err(|_| DigestError::ConfigInvalid(format!("{key} is not a number: {v:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_without_anything() {
        let cfg = Config::resolve(FileConfig::default(), lookup(&[])).unwrap();
        assert!(cfg.discord_token.is_none());
        assert_eq!(cfg.discord_api_base, DEFAULT_DISCORD_API_BASE);
        assert_eq!(cfg.utc_offset.local_minus_utc(), 9 * 3600);
        assert_eq!(cfg.max_items, DEFAULT_MAX_ITEMS);
        assert_eq!(cfg.news.articles_per_day, 3);
        assert!(!cfg.consultation.message_variations.is_empty());
        assert!(matches!(
            cfg.require_token(),
            Err(DigestError::ConfigMissing(k)) if k == "DISCORD_BOT_TOKEN"
        ));
        assert!(matches!(
            cfg.require_channel(ChannelKind::AiNews),
            Err(DigestError::ConfigMissing(k)) if k == "AI_NEWS_CHANNEL_ID"
        ));
    }

    #[test]
    fn env_overrides_file() {
        let mut file = FileConfig::default();
        file.channels.achievements = Some("100".into());
        file.channels.ai_news = Some("200".into());
        file.max_items = Some(10);
        let cfg = Config::resolve(
            file,
            lookup(&[
                ("ACHIEVEMENT_CHANNEL_ID", "300"),
                ("DISCORD_BOT_TOKEN", " tok "),
                ("OPENAI_API_KEY", ""),
            ]),
        )
        .unwrap();
        assert_eq!(cfg.require_channel(ChannelKind::Achievements).unwrap(), "300");
        assert_eq!(cfg.require_channel(ChannelKind::AiNews).unwrap(), "200");
        assert_eq!(cfg.require_token().unwrap(), "tok");
        assert_eq!(cfg.max_items, 10);
        assert!(cfg.openai.api_key.is_none(), "blank key disables enrichment");
    }

    #[test]
    fn custom_token_env_name() {
        let file = FileConfig {
            discord_token_env: Some("DEJIRYU_TOKEN".into()),
            ..FileConfig::default()
        };
        let cfg = Config::resolve(file, lookup(&[("DEJIRYU_TOKEN", "abc")])).unwrap();
        assert_eq!(cfg.require_token().unwrap(), "abc");
    }

    #[test]
    fn rejects_bad_values() {
        let bad_channel = Config::resolve(
            FileConfig::default(),
            lookup(&[("SELF_INTRO_CHANNEL_ID", "general")]),
        );
        assert!(matches!(bad_channel, Err(DigestError::ConfigInvalid(_))));

        let mut file = FileConfig::default();
        file.consultation.message_variations = Some(vec!["  ".into()]);
        assert!(matches!(
            Config::resolve(file, lookup(&[])),
            Err(DigestError::ConfigInvalid(_))
        ));

        let zero = Config::resolve(
            FileConfig::default(),
            lookup(&[("AI_NEWS_ARTICLES_PER_DAY", "0")]),
        );
        assert!(matches!(zero, Err(DigestError::ConfigInvalid(_))));

        for hours in ["1000000", "-1000000", "24", "nine"] {
            let off = Config::resolve(
                FileConfig::default(),
                lookup(&[("DEJIRYU_UTC_OFFSET_HOURS", hours)]),
            );
            assert!(
                matches!(off, Err(DigestError::ConfigInvalid(_))),
                "offset {hours} accepted"
            );
        }

        let no_rotation = Config::resolve(
            FileConfig::default(),
            lookup(&[("EXCLUSIVE_ROTATION_DAYS", "0")]),
        );
        assert!(matches!(no_rotation, Err(DigestError::ConfigInvalid(_))));
    }

    #[test]
    fn exclusive_items_come_from_the_file() {
        let mut file = FileConfig::default();
        file.channels.exclusive = Some("555".into());
        file.exclusive_content.content_rotation_days = Some(3);
        file.exclusive_content.items = vec![
            file::FileExclusiveItem {
                title: " 資料 ".into(),
                description: String::new(),
                url: Some("  ".into()),
            },
            file::FileExclusiveItem {
                title: "  ".into(),
                ..Default::default()
            },
        ];
        let cfg = Config::resolve(file, lookup(&[])).unwrap();
        assert_eq!(cfg.require_channel(ChannelKind::Exclusive).unwrap(), "555");
        assert_eq!(cfg.exclusive.rotation_days, 3);
        assert_eq!(
            cfg.exclusive.items,
            vec![ExclusiveItem {
                title: "資料".into(),
                description: String::new(),
                url: None,
            }]
        );

        let defaults = Config::resolve(FileConfig::default(), lookup(&[])).unwrap();
        assert_eq!(defaults.exclusive.rotation_days, DEFAULT_EXCLUSIVE_ROTATION_DAYS);
        assert!(defaults.exclusive.items.is_empty());
    }
}
