//! Common types and utilities shared across Backscroll crates.
//!
//! This crate holds the engine tuning knobs and the observability helpers that
//! every other crate (and the CLI) relies on. It stays dependency-light so the
//! engine, the provider adapters and the config loader can all depend on it.
//!
//! # Overview
//!
//! - [`EngineSettings`]: worker budget, pacing and paging limits for the scrape engine
//! - [`observability`]: centralised tracing/logging initialisation
//!
//! # Examples
//!
//! ```rust
//! use backscroll_common::EngineSettings;
//!
//! let settings = EngineSettings::default();
//! assert_eq!(settings.workers, 3);
//! assert_eq!(settings.page_delay().as_millis(), 1000);
//! ```
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub mod observability;

/// Default number of entities scraped concurrently.
pub const DEFAULT_WORKERS: usize = 3;
/// Default pause between two page fetches for the same entity.
pub const DEFAULT_PAGE_DELAY_MS: u64 = 1_000;
/// Default cap on pages fetched for one entity in one scrape.
pub const DEFAULT_MAX_PAGES: usize = 10_000;
/// Default lookback used when no checkpoint is known.
pub const DEFAULT_LOOKBACK_DAYS: i64 = 7;
/// Upper bound on a configured lookback, roughly a century.
pub const MAX_LOOKBACK_DAYS: i64 = 36_500;

/// Tuning for the paginated fetch engine.
///
/// Every field has a default so partial YAML sections deserialize cleanly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Maximum number of entity scrapes running at once.
    pub workers: usize,
    /// Minimum spacing between consecutive page fetches of one entity.
    pub page_delay_ms: u64,
    /// Page fetches allowed per entity before the source is declared misbehaving.
    pub max_pages: usize,
    /// How far back a "since" scrape looks when the caller has no checkpoint.
    pub lookback_days: i64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            page_delay_ms: DEFAULT_PAGE_DELAY_MS,
            max_pages: DEFAULT_MAX_PAGES,
            lookback_days: DEFAULT_LOOKBACK_DAYS,
        }
    }
}

impl EngineSettings {
    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    /// Clamp values that would stall or disable the engine.
    ///
    /// ```
    /// use backscroll_common::EngineSettings;
    ///
    /// let s = EngineSettings { workers: 0, max_pages: 0, ..Default::default() }.sanitized();
    /// assert_eq!(s.workers, 1);
    /// assert_eq!(s.max_pages, 1);
    /// ```
    pub fn sanitized(mut self) -> Self {
        self.workers = self.workers.max(1);
        self.max_pages = self.max_pages.max(1);
        self.lookback_days = self.lookback_days.clamp(0, MAX_LOOKBACK_DAYS);
        self
    }
}
