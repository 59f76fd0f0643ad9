// src/news/providers/mod.rs
pub mod brave;
pub mod google_rss;
pub mod newsapi;

use std::time::Duration;

use crate::error::{DigestError, Result};

pub(crate) fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("dejiryu-digest/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(5))
        .timeout(Duration::from_secs(20))
        .build()
        .map_err(|e| DigestError::transport("building news http client", e))
}

/// Map a non-2xx response to `UpstreamFetchFailed`.
pub(crate) fn check_status(name: &str, resp: &reqwest::Response) -> Result<()> {
    let status = resp.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(DigestError::UpstreamFetchFailed {
            source_name: name.to_string(),
            status: status.as_u16(),
        })
    }
}
