// src/ledger.rs
//! Seen-URL ledger: the only state that survives between runs.
//!
//! On disk it is a single JSON object `{"sent_urls": [...]}` holding at most
//! [`LEDGER_CAP`] URLs, oldest first. URLs are compared as raw strings.

use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use metrics::counter;
use serde::{Deserialize, Serialize};

use crate::error::{DigestError, Result};
use crate::news::NewsItem;

pub const LEDGER_CAP: usize = 100;

/// Insertion-ordered set of URLs. Re-inserting a known URL keeps its original slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeenUrls {
    order: Vec<String>,
    index: HashSet<String>,
}

impl SeenUrls {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.index.contains(url)
    }

    /// Returns false when the URL was already present.
    pub fn insert(&mut self, url: impl Into<String>) -> bool {
        let url = url.into();
        if self.index.contains(&url) {
            return false;
        }
        self.index.insert(url.clone());
        self.order.push(url);
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// The newest `cap` entries, oldest first.
    pub fn newest(&self, cap: usize) -> &[String] {
        let start = self.order.len().saturating_sub(cap);
        &self.order[start..]
    }
}

impl<S: Into<String>> FromIterator<S> for SeenUrls {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = SeenUrls::new();
        set.extend(iter);
        set
    }
}

impl<S: Into<String>> Extend<S> for SeenUrls {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        for url in iter {
            self.insert(url);
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct LedgerFile {
    sent_urls: Vec<String>,
}

/// File-backed ledger. Single writer assumed; there is no locking.
#[derive(Debug, Clone)]
pub struct Ledger {
    path: PathBuf,
}

impl Ledger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing, unreadable or malformed files all mean "no history".
    pub fn load(&self) -> SeenUrls {
        let raw = match fs::read_to_string(&self.path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return SeenUrls::new(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "ledger unreadable, starting empty");
                return SeenUrls::new();
            }
        };
        match serde_json::from_str::<LedgerFile>(&raw) {
            Ok(f) => f.sent_urls.into_iter().collect(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "ledger corrupt, starting empty");
                SeenUrls::new()
            }
        }
    }

    /// Persist the newest [`LEDGER_CAP`] URLs, replacing the previous file.
    pub fn try_save(&self, seen: &SeenUrls) -> Result<()> {
        let body = LedgerFile {
            sent_urls: seen.newest(LEDGER_CAP).to_vec(),
        };
        let json = serde_json::to_string_pretty(&body)
            .map_err(|e| DigestError::PersistenceFailed(e.to_string()))?;
        write_atomic(&self.path, json.as_bytes()).map_err(|e| {
            DigestError::PersistenceFailed(format!("{}: {e}", self.path.display()))
        })
    }

    /// Best-effort save: failures are logged and reported as `false`.
    pub fn save(&self, seen: &SeenUrls) -> bool {
        match self.try_save(seen) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "ledger not saved; next run may repeat items");
                false
            }
        }
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let tmp = path.with_extension("json.tmp");
    let mut f = fs::File::create(&tmp)?;
    f.write_all(bytes)?;
    f.sync_all()?;
    fs::rename(tmp, path)
}

/// Keep items whose URL is not in `seen`, in input order.
pub fn filter_unseen(items: Vec<NewsItem>, seen: &SeenUrls) -> Vec<NewsItem> {
    let before = items.len();
    let kept: Vec<NewsItem> = items
        .into_iter()
        .filter(|it| !seen.contains(&it.url))
        .collect();
    counter!("ledger_suppressed_total").increment((before - kept.len()) as u64);
    kept
}
