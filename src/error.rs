// src/error.rs
//! Failure taxonomy shared by every job.
//!
//! Fatal vs. degradable is decided by the caller: `ConfigMissing`, `ConfigInvalid`
//! and `PostFailed` end the run, the rest usually fall back to something simpler.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DigestError {
    /// A credential or channel id the selected job needs is not configured.
    #[error("missing required configuration: {0}")]
    ConfigMissing(String),

    /// Configuration exists but cannot be used (bad number, unreadable file, ...).
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    /// Message or news source answered with a non-success status.
    #[error("{source_name} fetch failed with HTTP {status}")]
    UpstreamFetchFailed { source_name: String, status: u16 },

    /// Source answered 2xx but the body could not be understood.
    #[error("{source_name} returned an unreadable body: {detail}")]
    UpstreamMalformed { source_name: String, detail: String },

    /// Request never produced a status (DNS, TLS, body decode, ...).
    #[error("{context}: {source}")]
    Transport {
        context: String,
        #[source]
        source: reqwest::Error,
    },

    /// Summarizer errored or returned nothing usable.
    #[error("enrichment unavailable: {0}")]
    EnrichmentFailed(String),

    /// Ledger could not be read or written.
    #[error("ledger persistence failed: {0}")]
    PersistenceFailed(String),

    /// The final publish call was rejected.
    #[error("posting to channel {channel} failed with HTTP {status}")]
    PostFailed { channel: String, status: u16 },
}

impl DigestError {
    pub fn transport(context: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Transport {
            context: context.into(),
            source,
        }
    }

    /// Whether this error should end the run with a non-zero exit status.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::EnrichmentFailed(_) | Self::PersistenceFailed(_)
        )
    }
}

pub type Result<T, E = DigestError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degradable_errors_are_not_fatal() {
        assert!(!DigestError::EnrichmentFailed("no key".into()).is_fatal());
        assert!(!DigestError::PersistenceFailed("disk full".into()).is_fatal());
        assert!(DigestError::ConfigMissing("DISCORD_BOT_TOKEN".into()).is_fatal());
        assert!(DigestError::PostFailed {
            channel: "1".into(),
            status: 403
        }
        .is_fatal());
    }

    #[test]
    fn upstream_message_carries_status() {
        let e = DigestError::UpstreamFetchFailed {
            source_name: "discord".into(),
            status: 429,
        };
        assert_eq!(e.to_string(), "discord fetch failed with HTTP 429");
    }
}
