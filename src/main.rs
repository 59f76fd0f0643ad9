//! `dejiryu`: run one scheduled community digest and exit.
//!
//! Meant to be invoked by cron / a CI scheduler, one job per invocation.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};

use dejiryu_digest::config::file::{self, EnvSource, ENV_CONFIG_PATH};
use dejiryu_digest::config::{self, Config};
use dejiryu_digest::news::NewsChain;
use dejiryu_digest::summarize::{build_summarizer, FixedSummarizer, Summarizer};
use dejiryu_digest::{jobs, telemetry, DiscordClient, Job, JobContext, RunOptions};

#[derive(Parser, Debug)]
#[command(name = "dejiryu", version, about = "DejiRyu scheduled Discord digests")]
struct Cli {
    /// Config file (TOML or JSON). Defaults to $DEJIRYU_CONFIG_PATH, then config/dejiryu.{toml,json}.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Build the digest and print it instead of posting.
    #[arg(long, global = true)]
    dry_run: bool,

    /// Skip the summarizer and use this text as the AI body (dry runs, demos).
    #[arg(long, global = true, hide = true)]
    fixed_summary: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Weekly "できた！" digest of the achievements channel.
    Achievements {
        #[arg(long)]
        window_days: Option<i64>,
    },
    /// Self-introduction digest (latest intro per member).
    SelfIntros {
        #[arg(long)]
        window_days: Option<i64>,
    },
    /// Nudge the consultation channel.
    Consultation,
    /// Morning AI news digest, de-duplicated against the sent-URL ledger.
    AiNews,
    /// Members-only content drop, rotated every `content_rotation_days`.
    Exclusive,
}

impl Command {
    fn job(&self) -> (Job, Option<i64>) {
        match self {
            Self::Achievements { window_days } => (Job::Achievements, *window_days),
            Self::SelfIntros { window_days } => (Job::SelfIntros, *window_days),
            Self::Consultation => (Job::Consultation, None),
            Self::AiNews => (Job::AiNews, None),
            Self::Exclusive => (Job::Exclusive, None),
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let explicit = cli
        .config
        .clone()
        .or_else(|| std::env::var(ENV_CONFIG_PATH).ok().map(PathBuf::from));
    let file_cfg = file::load_default(explicit.as_deref()).context("loading config file")?;

    // `.env` was applied in main; the fallbacks look for the configured token name.
    let token_env = file_cfg
        .discord_token_env
        .clone()
        .unwrap_or_else(|| config::DEFAULT_TOKEN_ENV.to_string());
    let env_source = file::load_env_fallbacks(Path::new("."), &token_env);
    let cfg = Config::from_env(file_cfg)?;

    telemetry::init(&cfg.log_path);
    if env_source == EnvSource::EnvExample {
        tracing::warn!("loaded variables from env.example; do not commit real secrets there");
    }

    let (job, window_days) = cli.command.job();
    // Fail on missing channel/token before any network call.
    cfg.require_channel(job.channel_kind())?;
    let token = cfg.require_token()?;

    let api = DiscordClient::new(&cfg.discord_api_base, token)?;
    let summarizer: std::sync::Arc<dyn Summarizer> = match &cli.fixed_summary {
        Some(text) => std::sync::Arc::new(FixedSummarizer { text: text.clone() }),
        None => build_summarizer(&cfg.openai),
    };
    let news = NewsChain::from_config(&cfg.news)?;
    tracing::info!(
        job = job.name(),
        summarizer = summarizer.name(),
        dry_run = cli.dry_run,
        "starting"
    );

    let ctx = JobContext {
        config: &cfg,
        api: &api,
        summarizer: summarizer.as_ref(),
        news: &news,
    };
    let opts = RunOptions {
        dry_run: cli.dry_run,
        window_days,
        ..RunOptions::now()
    };

    let report = jobs::run(job, &ctx, &opts).await?;
    if cli.dry_run {
        println!("{}", report.digest);
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // May set DEJIRYU_CONFIG_PATH, so it runs before the config file is located.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // Tracing may not be initialised if config loading failed.
            eprintln!("dejiryu: {e:#}");
            ExitCode::FAILURE
        }
    }
}
