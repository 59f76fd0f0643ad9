// src/jobs.rs
//! One pipeline per scheduled script:
//! fetch → filter → digest (AI or template) → post → ledger → run log line.

use chrono::{DateTime, Duration, Utc};

use crate::config::{ChannelKind, Config};
use crate::digest::{self, prompts};
use crate::discord::{split_message, ChannelApi, Message, MESSAGE_CHAR_LIMIT};
use crate::error::{DigestError, Result};
use crate::fetch::fetch_since;
use crate::ledger::{Ledger, SeenUrls};
use crate::news::{NewsChain, NewsItem, NewsQuery};
use crate::summarize::Summarizer;
use crate::telemetry::RUN_TARGET;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    Achievements,
    SelfIntros,
    Consultation,
    AiNews,
    Exclusive,
}

impl Job {
    pub fn name(self) -> &'static str {
        match self {
            Self::Achievements => "achievements",
            Self::SelfIntros => "self-intros",
            Self::Consultation => "consultation",
            Self::AiNews => "ai-news",
            Self::Exclusive => "exclusive",
        }
    }

    pub fn channel_kind(self) -> ChannelKind {
        match self {
            Self::Achievements => ChannelKind::Achievements,
            Self::SelfIntros => ChannelKind::SelfIntro,
            Self::Consultation => ChannelKind::Consultation,
            Self::AiNews => ChannelKind::AiNews,
            Self::Exclusive => ChannelKind::Exclusive,
        }
    }

    /// Look-back window for jobs that read channel history.
    pub fn default_window_days(self) -> Option<i64> {
        match self {
            Self::Achievements => Some(7),
            Self::SelfIntros => Some(4),
            Self::Consultation | Self::AiNews | Self::Exclusive => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub now: DateTime<Utc>,
    pub dry_run: bool,
    /// Overrides [`Job::default_window_days`].
    pub window_days: Option<i64>,
}

impl RunOptions {
    pub fn now() -> Self {
        Self {
            now: Utc::now(),
            dry_run: false,
            window_days: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub job: Job,
    /// Messages or news items the digest was built from.
    pub items: usize,
    pub digest: String,
    pub enriched: bool,
    pub posted: bool,
    /// `Some(saved)` when the job touched the ledger.
    pub ledger_saved: Option<bool>,
}

/// Collaborators for a run. The config is resolved once by the caller.
pub struct JobContext<'a> {
    pub config: &'a Config,
    pub api: &'a dyn ChannelApi,
    pub summarizer: &'a dyn Summarizer,
    pub news: &'a NewsChain,
}

/// Run `job` and write the run summary line, success or failure.
pub async fn run(job: Job, ctx: &JobContext<'_>, opts: &RunOptions) -> Result<RunReport> {
    let result = match job {
        Job::Achievements => achievements(ctx, opts).await,
        Job::SelfIntros => self_intros(ctx, opts).await,
        Job::Consultation => consultation(ctx, opts).await,
        Job::AiNews => ai_news(ctx, opts).await,
        Job::Exclusive => exclusive(ctx, opts).await,
    };
    match &result {
        Ok(r) => tracing::info!(
            target: RUN_TARGET,
            job = job.name(),
            status = "ok",
            items = r.items,
            enriched = r.enriched,
            posted = r.posted,
            ledger_saved = ?r.ledger_saved,
            "run finished"
        ),
        Err(e) => tracing::error!(
            target: RUN_TARGET,
            job = job.name(),
            status = "failed",
            error = %e,
            "run failed"
        ),
    }
    result
}

/// Start of the look-back window; an override too large to represent is a config error.
fn window_start(job: Job, opts: &RunOptions) -> Result<DateTime<Utc>> {
    let days = opts
        .window_days
        .or(job.default_window_days())
        .unwrap_or(7)
        .max(0);
    Duration::try_days(days)
        .and_then(|d| opts.now.checked_sub_signed(d))
        .ok_or_else(|| DigestError::ConfigInvalid(format!("window of {days} days is out of range")))
}

/// Human messages in the window, oldest first.
async fn recent_human_messages(
    ctx: &JobContext<'_>,
    channel: &str,
    since: DateTime<Utc>,
) -> Result<Vec<Message>> {
    let mut msgs = fetch_since(ctx.api, channel, since, ctx.config.max_items).await?;
    msgs.retain(|m| !m.author.bot);
    msgs.reverse();
    Ok(msgs)
}

async fn publish(ctx: &JobContext<'_>, channel: &str, text: &str, dry_run: bool) -> Result<bool> {
    if dry_run {
        tracing::info!(channel, "dry run, not posting");
        return Ok(false);
    }
    for chunk in split_message(text, MESSAGE_CHAR_LIMIT) {
        ctx.api.post_message(channel, &chunk).await?;
    }
    Ok(true)
}

async fn achievements(ctx: &JobContext<'_>, opts: &RunOptions) -> Result<RunReport> {
    let job = Job::Achievements;
    let channel = ctx.config.require_channel(job.channel_kind())?;
    let off = ctx.config.utc_offset;
    let since = window_start(job, opts)?;

    let msgs = recent_human_messages(ctx, channel, since).await?;
    let template = || digest::achievement_digest(&msgs, since, opts.now, off);

    let (text, enriched) = if msgs.is_empty() {
        (template(), false)
    } else {
        let header = digest::achievement_header(since, opts.now, off);
        ctx.summarizer
            .summarize(&prompts::achievements(&msgs))
            .await
            .map(|body| digest::with_ai_body(&header, &body, &[]))
            .or_template(template)
    };

    let posted = publish(ctx, channel, &text, opts.dry_run).await?;
    Ok(RunReport {
        job,
        items: msgs.len(),
        digest: text,
        enriched,
        posted,
        ledger_saved: None,
    })
}

async fn self_intros(ctx: &JobContext<'_>, opts: &RunOptions) -> Result<RunReport> {
    let job = Job::SelfIntros;
    let channel = ctx.config.require_channel(job.channel_kind())?;
    let off = ctx.config.utc_offset;
    let since = window_start(job, opts)?;

    let msgs = recent_human_messages(ctx, channel, since).await?;
    let template = || digest::intro_digest(&msgs, since, opts.now, off);

    let (text, enriched) = if msgs.is_empty() {
        (template(), false)
    } else {
        let header = digest::intro_header(since, opts.now, off);
        ctx.summarizer
            .summarize(&prompts::self_intros(&msgs))
            .await
            .map(|body| digest::with_ai_body(&header, &body, &[]))
            .or_template(template)
    };

    let posted = publish(ctx, channel, &text, opts.dry_run).await?;
    Ok(RunReport {
        job,
        items: digest::latest_per_author(&msgs).len(),
        digest: text,
        enriched,
        posted,
        ledger_saved: None,
    })
}

async fn consultation(ctx: &JobContext<'_>, opts: &RunOptions) -> Result<RunReport> {
    let job = Job::Consultation;
    let channel = ctx.config.require_channel(job.channel_kind())?;
    let text = digest::consultation_message(&ctx.config.consultation, opts.now, ctx.config.utc_offset);
    let posted = publish(ctx, channel, &text, opts.dry_run).await?;
    Ok(RunReport {
        job,
        items: 0,
        digest: text,
        enriched: false,
        posted,
        ledger_saved: None,
    })
}

/// Request a wider page than we post so already-sent items can be skipped.
fn news_fetch_limit(articles_per_day: usize) -> usize {
    (articles_per_day * 4).clamp(10, 50)
}

/// First `n` items with distinct URLs.
fn pick_unique(items: Vec<NewsItem>, n: usize) -> Vec<NewsItem> {
    let mut local = SeenUrls::new();
    items
        .into_iter()
        .filter(|it| local.insert(it.url.clone()))
        .take(n)
        .collect()
}

async fn ai_news(ctx: &JobContext<'_>, opts: &RunOptions) -> Result<RunReport> {
    let job = Job::AiNews;
    let channel = ctx.config.require_channel(job.channel_kind())?;
    let off = ctx.config.utc_offset;
    let news_cfg = &ctx.config.news;

    let ledger = Ledger::new(&ctx.config.ledger_path);
    let mut seen = ledger.load();

    let query = NewsQuery {
        query: news_cfg.query.clone(),
        language: news_cfg.language.clone(),
        limit: news_fetch_limit(news_cfg.articles_per_day),
    };
    let fresh = ctx.news.fetch_unseen(&query, &seen).await;
    let fresh_count = fresh.len();
    let picked = pick_unique(fresh, news_cfg.articles_per_day);
    tracing::info!(
        fresh = fresh_count,
        picked = picked.len(),
        known = seen.len(),
        "news filtered through ledger"
    );

    let template = || digest::news_digest(&picked, opts.now, off);
    let (text, enriched) = if picked.is_empty() {
        (template(), false)
    } else {
        let header = digest::news_header(opts.now, off);
        let links: Vec<&str> = picked.iter().map(|it| it.url.as_str()).collect();
        ctx.summarizer
            .summarize(&prompts::news(&picked))
            .await
            .map(|body| digest::with_ai_body(&header, &body, &links))
            .or_template(template)
    };

    let posted = publish(ctx, channel, &text, opts.dry_run).await?;

    let ledger_saved = if posted && !picked.is_empty() {
        seen.extend(picked.iter().map(|it| it.url.clone()));
        Some(ledger.save(&seen))
    } else {
        None
    };

    Ok(RunReport {
        job,
        items: picked.len(),
        digest: text,
        enriched,
        posted,
        ledger_saved,
    })
}

async fn exclusive(ctx: &JobContext<'_>, opts: &RunOptions) -> Result<RunReport> {
    let job = Job::Exclusive;
    let channel = ctx.config.require_channel(job.channel_kind())?;
    let cfg = &ctx.config.exclusive;
    let item = digest::pick_exclusive(&cfg.items, cfg.rotation_days, opts.now, ctx.config.utc_offset)
        .ok_or_else(|| DigestError::ConfigMissing("exclusive_content.items".into()))?;
    tracing::info!(title = %item.title, rotation_days = cfg.rotation_days, "exclusive item selected");

    let text = digest::exclusive_message(item);
    let posted = publish(ctx, channel, &text, opts.dry_run).await?;
    Ok(RunReport {
        job,
        items: 1,
        digest: text,
        enriched: false,
        posted,
        ledger_saved: None,
    })
}
