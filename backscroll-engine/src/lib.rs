//! Time-windowed paginated fetch engine.
//!
//! The engine pulls newest-first pages from a [`DataSource`], keeps the items
//! that fall inside a [`Boundary`] and stops paging as soon as nothing older can
//! qualify. [`Scraper`] is the caller-facing entry point:
//!
//! - [`Scraper::scrape_window`]: one entity, explicit inclusive `[start, end]`
//! - [`Scraper::scrape_since`]: many entities, everything newer than a checkpoint
//! - [`Scraper::scrape_window_many`]: many entities, explicit window
//!
//! Fan-out scrapes never fail as a whole; per-entity failures are reported in
//! [`FanoutReport::failures`].
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use backscroll_engine::{Checkpoint, DataSource, EntityId, Scraper};
//! # async fn demo(source: Arc<dyn DataSource>) {
//! let scraper = Scraper::new(source).with_workers(3);
//! let report = scraper
//!     .scrape_since(
//!         vec![EntityId::from("alice"), EntityId::from("bob")],
//!         Checkpoint::lookback(7),
//!     )
//!     .await;
//! for (entity, err) in &report.failures {
//!     eprintln!("{entity}: {err}");
//! }
//! # }
//! ```
use backscroll_common::EngineSettings;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub mod error;
pub mod fanout;
pub mod pacing;
pub mod paginator;
pub mod source;
pub mod window;

pub use error::ScrapeError;
pub use fanout::{FanoutReport, FanoutRunner};
pub use pacing::{FixedDelay, NoDelay, PacingPolicy};
pub use paginator::Paginator;
pub use source::{Cursor, DataSource, Engagement, EntityId, Item, Page, SourceError};
pub use window::{classify, Boundary, Checkpoint, Decision, Window};

/// Paginator + fan-out wired to one data source.
#[derive(Clone)]
pub struct Scraper {
    paginator: Paginator,
    workers: usize,
}

impl Scraper {
    pub fn new(source: Arc<dyn DataSource>) -> Self {
        Self {
            paginator: Paginator::new(source),
            workers: backscroll_common::DEFAULT_WORKERS,
        }
    }

    /// Apply worker budget, fixed page delay and page cap from settings.
    pub fn from_settings(source: Arc<dyn DataSource>, settings: &EngineSettings) -> Self {
        Self::new(source)
            .with_pacing(Arc::new(FixedDelay::new(settings.page_delay())))
            .with_max_pages(settings.max_pages)
            .with_workers(settings.workers)
    }

    pub fn with_pacing(mut self, pacing: Arc<dyn PacingPolicy>) -> Self {
        self.paginator = self.paginator.with_pacing(pacing);
        self
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.paginator = self.paginator.with_max_pages(max_pages);
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Every blocking point of every scrape gives up once `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.paginator = self.paginator.with_cancellation(cancel);
        self
    }

    pub fn paginator(&self) -> &Paginator {
        &self.paginator
    }

    /// All items of `entity` with `start <= created_at <= end`, newest first.
    pub async fn scrape_window(
        &self,
        entity: &EntityId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Item>, ScrapeError> {
        let window = Window::new(start, end)?;
        self.paginator.scrape(entity, window.into()).await
    }

    /// Items newer than `checkpoint` for every entity, under the worker budget.
    pub async fn scrape_since<I>(&self, entities: I, checkpoint: Checkpoint) -> FanoutReport
    where
        I: IntoIterator<Item = EntityId>,
    {
        self.fanout().run(entities, checkpoint.into()).await
    }

    pub async fn scrape_window_many<I>(&self, entities: I, window: Window) -> FanoutReport
    where
        I: IntoIterator<Item = EntityId>,
    {
        self.fanout().run(entities, window.into()).await
    }

    fn fanout(&self) -> FanoutRunner {
        FanoutRunner::new(self.paginator.clone()).with_workers(self.workers)
    }
}
