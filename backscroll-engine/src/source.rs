//! The data-source contract the engine paginates over, plus the item model.
//!
//! A [`DataSource`] returns one page per call, newest item first, and a
//! continuation [`Cursor`] while more pages exist. Provider adapters live in
//! `backscroll-social`; the engine never sees provider types.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Identifier of a tracked entity (account handle, ticker, ...).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Opaque continuation token handed back by a source.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(pub String);

impl Cursor {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Engagement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub likes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reposts: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replies: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub views: Option<u64>,
}

/// One fetched post/article. Never mutated after the source builds it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub author: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub engagement: Engagement,
}

/// One page of results; `next_cursor == None` means the feed is exhausted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Page {
    pub items: Vec<Item>,
    pub next_cursor: Option<Cursor>,
}

impl Page {
    pub fn new(items: Vec<Item>, next_cursor: Option<Cursor>) -> Self {
        Self { items, next_cursor }
    }

    pub fn last(items: Vec<Item>) -> Self {
        Self::new(items, None)
    }

    pub fn is_last(&self) -> bool {
        self.next_cursor.is_none()
    }
}

/// Outcome tags a source reports instead of a page.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    /// The provider throttled us. The source has already refreshed its
    /// credentials; the same cursor may be retried once.
    #[error("rate limited by provider (retry_after={retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    /// The response arrived but lacked the fields a page needs.
    #[error("malformed page: {0}")]
    Malformed(String),

    /// Network or HTTP failure unrelated to throttling.
    #[error("transport failure: {0}")]
    Transport(String),
}

/// A paginated, newest-first feed keyed by entity.
///
/// Implementations must be safe to call from several workers at once.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &str;

    /// Fetch the page at `cursor` (`None` = newest page) for `entity`.
    async fn fetch(&self, entity: &EntityId, cursor: Option<&Cursor>)
        -> Result<Page, SourceError>;
}
