//! Run one paginated scrape per entity under a fixed worker budget.
//!
//! Every entity gets its own task in a `JoinSet`; a semaphore caps how many run
//! at once. Outcomes are collected in completion order and split into
//! `items` and `failures`, so a failing (or panicking) entity never touches its
//! siblings' results.
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::error::ScrapeError;
use crate::paginator::Paginator;
use crate::source::{EntityId, Item};
use crate::window::Boundary;

/// Per-entity results of a fan-out. Each requested entity lands in exactly one map.
#[derive(Debug, Default)]
pub struct FanoutReport {
    pub items: HashMap<EntityId, Vec<Item>>,
    pub failures: HashMap<EntityId, ScrapeError>,
}

impl FanoutReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn total_items(&self) -> usize {
        self.items.values().map(Vec::len).sum()
    }

    pub fn entity_count(&self) -> usize {
        self.items.len() + self.failures.len()
    }
}

#[derive(Clone)]
pub struct FanoutRunner {
    paginator: Paginator,
    workers: usize,
}

impl FanoutRunner {
    pub fn new(paginator: Paginator) -> Self {
        Self {
            paginator,
            workers: backscroll_common::DEFAULT_WORKERS,
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub async fn run<I>(&self, entities: I, boundary: Boundary) -> FanoutReport
    where
        I: IntoIterator<Item = EntityId>,
    {
        let unique: BTreeSet<EntityId> = entities.into_iter().collect();
        let permits = Arc::new(Semaphore::new(self.workers));
        let cancel = self.paginator.cancellation().clone();

        tracing::info!(
            source=%self.paginator.source_name(),
            entities=unique.len(),
            workers=self.workers,
            boundary=%boundary,
            "fanout.start"
        );

        let mut tasks = JoinSet::new();
        let mut owners = HashMap::with_capacity(unique.len());

        for entity in unique {
            let paginator = self.paginator.clone();
            let permits = Arc::clone(&permits);
            let cancel = cancel.clone();
            let task_entity = entity.clone();

            let handle = tasks.spawn(async move {
                let permit = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    p = permits.acquire_owned() => p.ok(),
                };
                let Some(_permit) = permit else {
                    let err = ScrapeError::Cancelled {
                        entity: task_entity.clone(),
                    };
                    return (task_entity, Err(err));
                };
                let res = paginator.scrape(&task_entity, boundary).await;
                (task_entity, res)
            });
            owners.insert(handle.id(), entity);
        }

        let mut report = FanoutReport::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((entity, Ok(items))) => {
                    tracing::debug!(entity=%entity, kept=items.len(), "fanout.entity_done");
                    report.items.insert(entity, items);
                }
                Ok((entity, Err(err))) => {
                    tracing::warn!(entity=%entity, error=%err, "fanout.entity_failed");
                    report.failures.insert(entity, err);
                }
                Err(join_err) => {
                    let Some(entity) = owners.get(&join_err.id()).cloned() else {
                        tracing::error!(error=%join_err, "fanout.unknown_task_failed");
                        continue;
                    };
                    let reason = if join_err.is_panic() {
                        panic_message(join_err.into_panic())
                    } else {
                        join_err.to_string()
                    };
                    tracing::error!(entity=%entity, reason=%reason, "fanout.worker_panicked");
                    report
                        .failures
                        .insert(entity.clone(), ScrapeError::WorkerPanicked { entity, reason });
                }
            }
        }

        tracing::info!(
            source=%self.paginator.source_name(),
            ok=report.items.len(),
            failed=report.failures.len(),
            items=report.total_items(),
            "fanout.done"
        );

        report
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
