// src/lib.rs
// Public library surface for the `dejiryu` binary and integration tests.

pub mod config;
pub mod digest;
pub mod discord;
pub mod error;
pub mod fetch;
pub mod jobs;
pub mod ledger;
pub mod news;
pub mod summarize;
pub mod telemetry;

// ---- Re-exports for stable public API ----
pub use crate::config::Config;
pub use crate::discord::{ChannelApi, DiscordClient, Message};
pub use crate::error::DigestError;
pub use crate::fetch::{fetch_since, FetchState, WindowedFetch};
pub use crate::jobs::{Job, JobContext, RunOptions, RunReport};
pub use crate::ledger::{filter_unseen, Ledger, SeenUrls, LEDGER_CAP};
pub use crate::news::{NewsChain, NewsItem};
pub use crate::summarize::{Enrichment, Summarizer};
