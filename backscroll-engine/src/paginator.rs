//! Cursor-following loop for one entity.
//!
//! Pages are fetched strictly one after another (the next cursor only exists
//! once the previous response is in). Every item goes through
//! [`classify`](crate::window::classify); the first `Stop` ends the scrape
//! without looking at the rest of the page or asking for another one.
//!
//! Termination:
//! - `Stop` decision, or a page without a continuation cursor: `Ok(items)`
//! - malformed page: logged, `Ok(items so far)`
//! - transport failure, second rate limit on one cursor, page cap: `Err`
//! - cancellation at any blocking point: `Err(Cancelled)`
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::ScrapeError;
use crate::pacing::{pause, FixedDelay, PacingPolicy};
use crate::source::{Cursor, DataSource, EntityId, Item, Page, SourceError};
use crate::window::{classify, Boundary, Decision};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Termination {
    Boundary,
    Exhausted,
    Malformed,
}

impl Termination {
    fn as_str(self) -> &'static str {
        match self {
            Termination::Boundary => "boundary",
            Termination::Exhausted => "exhausted",
            Termination::Malformed => "malformed",
        }
    }
}

/// Per-call scratch state, owned by a single scrape.
#[derive(Debug, Default)]
struct FetchState {
    cursor: Option<Cursor>,
    accumulated: Vec<Item>,
    pages: usize,
    last_seen: Option<DateTime<Utc>>,
    out_of_order: usize,
}

impl FetchState {
    /// Filter one page into the accumulator. `Some` means the scrape is over.
    fn absorb(&mut self, entity: &EntityId, page: Page, boundary: &Boundary) -> Option<Termination> {
        let Page { items, next_cursor } = page;

        for item in items {
            if let Some(prev) = self.last_seen {
                if item.created_at > prev {
                    self.out_of_order += 1;
                    tracing::warn!(
                        entity=%entity,
                        item_id=%item.id,
                        created_at=%item.created_at,
                        previous=%prev,
                        "scrape.order_violation"
                    );
                }
            }
            self.last_seen = Some(item.created_at);

            match classify(item.created_at, boundary) {
                Decision::Keep => self.accumulated.push(item),
                Decision::Skip => continue,
                Decision::Stop => return Some(Termination::Boundary),
            }
        }

        match next_cursor {
            Some(next) => {
                self.cursor = Some(next);
                None
            }
            None => Some(Termination::Exhausted),
        }
    }
}

#[derive(Clone)]
pub struct Paginator {
    source: Arc<dyn DataSource>,
    pacing: Arc<dyn PacingPolicy>,
    max_pages: usize,
    cancel: CancellationToken,
}

impl Paginator {
    pub fn new(source: Arc<dyn DataSource>) -> Self {
        Self {
            source,
            pacing: Arc::new(FixedDelay::default()),
            max_pages: backscroll_common::DEFAULT_MAX_PAGES,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_pacing(mut self, pacing: Arc<dyn PacingPolicy>) -> Self {
        self.pacing = pacing;
        self
    }

    /// Cap on fetches per scrape; needing more is a protocol violation.
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Collect every item of `entity` inside `boundary`, newest first.
    pub async fn scrape(
        &self,
        entity: &EntityId,
        boundary: Boundary,
    ) -> Result<Vec<Item>, ScrapeError> {
        let started = Instant::now();
        let mut state = FetchState::default();

        tracing::debug!(
            source=%self.source.name(),
            entity=%entity,
            boundary=%boundary,
            "scrape.start"
        );

        let termination = loop {
            if state.pages >= self.max_pages {
                tracing::warn!(
                    source=%self.source.name(),
                    entity=%entity,
                    pages=state.pages,
                    cursor=?state.cursor,
                    "scrape.page_cap_reached"
                );
                return Err(ScrapeError::ProtocolViolation {
                    entity: entity.clone(),
                    pages: state.pages,
                });
            }

            if state.pages > 0 {
                pause(self.pacing.page_delay(state.pages), &self.cancel)
                    .await
                    .map_err(|_| cancelled(entity))?;
            }

            let Some(page) = self.fetch_page(entity, state.cursor.as_ref()).await? else {
                break Termination::Malformed;
            };
            state.pages += 1;

            tracing::debug!(
                entity=%entity,
                page=state.pages,
                items=page.items.len(),
                has_next=!page.is_last(),
                "scrape.page"
            );

            if let Some(done) = state.absorb(entity, page, &boundary) {
                break done;
            }
        };

        tracing::info!(
            source=%self.source.name(),
            entity=%entity,
            pages=state.pages,
            kept=state.accumulated.len(),
            out_of_order=state.out_of_order,
            termination=termination.as_str(),
            elapsed_ms=started.elapsed().as_millis() as u64,
            "scrape.done"
        );

        Ok(state.accumulated)
    }

    /// One page, with the single rate-limit retry. `Ok(None)` = malformed page.
    async fn fetch_page(
        &self,
        entity: &EntityId,
        cursor: Option<&Cursor>,
    ) -> Result<Option<Page>, ScrapeError> {
        let mut retried = false;

        loop {
            let outcome = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(cancelled(entity)),
                res = self.source.fetch(entity, cursor) => res,
            };

            match outcome {
                Ok(page) => return Ok(Some(page)),
                Err(SourceError::Malformed(reason)) => {
                    tracing::warn!(
                        source=%self.source.name(),
                        entity=%entity,
                        cursor=?cursor,
                        reason=%reason,
                        "scrape.malformed_page"
                    );
                    return Ok(None);
                }
                Err(SourceError::Transport(reason)) => {
                    return Err(ScrapeError::Transport {
                        entity: entity.clone(),
                        reason,
                    });
                }
                Err(SourceError::RateLimited { retry_after }) if !retried => {
                    retried = true;
                    let delay = self.pacing.retry_delay(retry_after);
                    tracing::warn!(
                        source=%self.source.name(),
                        entity=%entity,
                        cursor=?cursor,
                        backoff_ms=delay.as_millis() as u64,
                        "scrape.rate_limited.retrying"
                    );
                    pause(delay, &self.cancel)
                        .await
                        .map_err(|_| cancelled(entity))?;
                }
                Err(SourceError::RateLimited { .. }) => {
                    return Err(ScrapeError::RateLimited {
                        entity: entity.clone(),
                    });
                }
            }
        }
    }
}

fn cancelled(entity: &EntityId) -> ScrapeError {
    ScrapeError::Cancelled {
        entity: entity.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::{Checkpoint, Window};
    use chrono::TimeZone;

    fn item(secs: i64) -> Item {
        Item {
            id: secs.to_string(),
            author: "a".into(),
            text: String::new(),
            created_at: Utc.timestamp_opt(secs, 0).unwrap(),
            engagement: Default::default(),
        }
    }

    fn entity() -> EntityId {
        EntityId::from("e")
    }

    #[test]
    fn absorb_stops_mid_page() {
        let mut st = FetchState::default();
        let b = Boundary::Window(
            Window::new(Utc.timestamp_opt(7, 0).unwrap(), Utc.timestamp_opt(10, 0).unwrap()).unwrap(),
        );
        let page = Page::new(
            vec![item(12), item(9), item(6), item(8)],
            Some(Cursor::new("next")),
        );
        assert_eq!(st.absorb(&entity(), page, &b), Some(Termination::Boundary));
        let ids: Vec<_> = st.accumulated.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["9"]);
        assert!(st.cursor.is_none());
    }

    #[test]
    fn absorb_follows_cursor() {
        let mut st = FetchState::default();
        let b = Boundary::Since(Checkpoint::new(Utc.timestamp_opt(0, 0).unwrap()));
        let page = Page::new(vec![item(5), item(4)], Some(Cursor::new("c2")));
        assert_eq!(st.absorb(&entity(), page, &b), None);
        assert_eq!(st.cursor, Some(Cursor::new("c2")));
        assert_eq!(st.accumulated.len(), 2);

        assert_eq!(
            st.absorb(&entity(), Page::last(vec![item(3)]), &b),
            Some(Termination::Exhausted)
        );
        assert_eq!(st.accumulated.len(), 3);
    }

    #[test]
    fn absorb_counts_order_violations_across_pages() {
        let mut st = FetchState::default();
        let b = Boundary::Since(Checkpoint::new(Utc.timestamp_opt(0, 0).unwrap()));
        st.absorb(&entity(), Page::new(vec![item(5), item(4)], Some(Cursor::new("c"))), &b);
        st.absorb(&entity(), Page::last(vec![item(9)]), &b);
        assert_eq!(st.out_of_order, 1);
        assert_eq!(st.accumulated.len(), 3);
    }
}
