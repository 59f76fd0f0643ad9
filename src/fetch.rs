// src/fetch.rs
//! Windowed message fetch over Discord's "before cursor" pagination.
//!
//! The API only answers "give me N messages older than X", so the time window
//! is enforced client-side: pages arrive newest first and the first message
//! older than `since` ends the whole fetch, including the rest of its page.

use chrono::{DateTime, Utc};
use metrics::counter;

use crate::discord::{ChannelApi, Message, PAGE_LIMIT};
use crate::error::{DigestError, Result};

/// Where a windowed fetch currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchState {
    /// Another page is needed; `cursor` is `None` for the first (most recent) page.
    Fetching { cursor: Option<String> },
    /// A message older than the window start was seen.
    BoundaryReached,
    /// The channel returned an empty page.
    Exhausted,
    /// `max_items` messages have been collected.
    CapReached,
    /// The upstream call failed; nothing collected is returned.
    Failed,
}

impl FetchState {
    pub fn is_done(&self) -> bool {
        !matches!(self, Self::Fetching { .. })
    }
}

/// Pure pagination state: feed it pages, read back the messages.
#[derive(Debug)]
pub struct WindowedFetch {
    since: DateTime<Utc>,
    max_items: usize,
    collected: Vec<Message>,
    state: FetchState,
}

impl WindowedFetch {
    pub fn new(since: DateTime<Utc>, max_items: usize) -> Self {
        let state = if max_items == 0 {
            FetchState::CapReached
        } else {
            FetchState::Fetching { cursor: None }
        };
        Self {
            since,
            max_items,
            collected: Vec::new(),
            state,
        }
    }

    pub fn state(&self) -> &FetchState {
        &self.state
    }

    /// Cursor for the next request, or `None` once the fetch is finished.
    pub fn next_cursor(&self) -> Option<Option<&str>> {
        match &self.state {
            FetchState::Fetching { cursor } => Some(cursor.as_deref()),
            _ => None,
        }
    }

    /// Apply one newest-first page. Pages offered after a terminal state are ignored.
    pub fn absorb(&mut self, page: Vec<Message>) -> &FetchState {
        if self.state.is_done() {
            return &self.state;
        }
        let Some(oldest_id) = page.last().map(|m| m.id.clone()) else {
            self.state = FetchState::Exhausted;
            return &self.state;
        };

        for msg in page {
            if msg.timestamp < self.since {
                self.state = FetchState::BoundaryReached;
                return &self.state;
            }
            self.collected.push(msg);
            if self.collected.len() >= self.max_items {
                self.state = FetchState::CapReached;
                return &self.state;
            }
        }

        self.state = FetchState::Fetching {
            cursor: Some(oldest_id),
        };
        &self.state
    }

    pub fn fail(&mut self) {
        self.collected.clear();
        self.state = FetchState::Failed;
    }

    pub fn len(&self) -> usize {
        self.collected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collected.is_empty()
    }

    /// Collected messages, newest first.
    pub fn into_messages(self) -> Vec<Message> {
        self.collected
    }
}

/// All messages in `channel` with `timestamp >= since`, newest first, at most `max_items`.
///
/// A non-success page aborts the whole fetch; no partial result is returned.
pub async fn fetch_since(
    api: &dyn ChannelApi,
    channel: &str,
    since: DateTime<Utc>,
    max_items: usize,
) -> Result<Vec<Message>> {
    if channel.trim().is_empty() {
        return Err(DigestError::ConfigInvalid("channel id must not be empty".into()));
    }

    let mut fetch = WindowedFetch::new(since, max_items);
    while let Some(cursor) = fetch.next_cursor() {
        let cursor = cursor.map(str::to_owned);
        match api.list_messages(channel, cursor.as_deref(), PAGE_LIMIT).await {
            Ok(page) => {
                counter!("fetch_messages_seen_total").increment(page.len() as u64);
                fetch.absorb(page);
            }
            Err(e) => {
                fetch.fail();
                tracing::warn!(channel, error = %e, "windowed fetch aborted");
                return Err(e);
            }
        }
    }

    tracing::debug!(
        channel,
        collected = fetch.len(),
        state = ?fetch.state(),
        "windowed fetch finished"
    );
    Ok(fetch.into_messages())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discord::Author;
    use chrono::{Duration, TimeZone};

    fn msg(id: u64, ts: DateTime<Utc>) -> Message {
        Message {
            id: id.to_string(),
            author: Author {
                id: "1".into(),
                username: "u".into(),
                global_name: None,
                bot: false,
            },
            content: format!("m{id}"),
            timestamp: ts,
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 0, 0, 0).unwrap()
    }

    #[test]
    fn full_page_in_window_advances_cursor_to_oldest() {
        let mut f = WindowedFetch::new(t0(), 1000);
        let page = vec![
            msg(30, t0() + Duration::hours(3)),
            msg(20, t0() + Duration::hours(2)),
            msg(10, t0() + Duration::hours(1)),
        ];
        let st = f.absorb(page).clone();
        assert_eq!(
            st,
            FetchState::Fetching {
                cursor: Some("10".into())
            }
        );
        assert_eq!(f.next_cursor(), Some(Some("10")));
        assert_eq!(f.len(), 3);
    }

    #[test]
    fn boundary_cuts_remainder_of_page() {
        let mut f = WindowedFetch::new(t0(), 1000);
        // A later in-window message after an out-of-window one is still dropped.
        let page = vec![
            msg(4, t0() + Duration::hours(1)),
            msg(3, t0() - Duration::seconds(1)),
            msg(2, t0() + Duration::hours(5)),
        ];
        assert_eq!(f.absorb(page), &FetchState::BoundaryReached);
        let ids: Vec<_> = f.into_messages().into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec!["4"]);
    }

    #[test]
    fn message_exactly_at_since_is_kept() {
        let mut f = WindowedFetch::new(t0(), 1000);
        f.absorb(vec![msg(1, t0())]);
        assert_eq!(f.len(), 1);
    }

    #[test]
    fn empty_page_means_exhausted() {
        let mut f = WindowedFetch::new(t0(), 1000);
        assert_eq!(f.absorb(vec![]), &FetchState::Exhausted);
        assert!(f.next_cursor().is_none());
    }

    #[test]
    fn cap_stops_mid_page() {
        let mut f = WindowedFetch::new(t0(), 2);
        let page = vec![
            msg(3, t0() + Duration::hours(3)),
            msg(2, t0() + Duration::hours(2)),
            msg(1, t0() + Duration::hours(1)),
        ];
        assert_eq!(f.absorb(page), &FetchState::CapReached);
        assert_eq!(f.len(), 2);
    }

    #[test]
    fn zero_cap_never_fetches() {
        let f = WindowedFetch::new(t0(), 0);
        assert_eq!(f.state(), &FetchState::CapReached);
        assert!(f.next_cursor().is_none());
    }

    #[test]
    fn terminal_state_ignores_more_pages() {
        let mut f = WindowedFetch::new(t0(), 10);
        f.absorb(vec![]);
        f.absorb(vec![msg(9, t0() + Duration::hours(1))]);
        assert_eq!(f.state(), &FetchState::Exhausted);
        assert!(f.is_empty());
    }

    #[test]
    fn fail_discards_partial_result() {
        let mut f = WindowedFetch::new(t0(), 10);
        f.absorb(vec![msg(9, t0() + Duration::hours(1))]);
        f.fail();
        assert_eq!(f.state(), &FetchState::Failed);
        assert!(f.into_messages().is_empty());
    }
}
