#![allow(dead_code)]

use async_trait::async_trait;
use backscroll_engine::{Cursor, DataSource, EntityId, Item, Page, SourceError};
use chrono::{DateTime, TimeZone, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

pub fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

pub fn item(entity: &str, secs: i64) -> Item {
    Item {
        id: format!("{entity}-{secs}"),
        author: entity.to_string(),
        text: format!("post at {secs}"),
        created_at: ts(secs),
        engagement: Default::default(),
    }
}

pub fn times(items: &[Item]) -> Vec<i64> {
    items.iter().map(|i| i.created_at.timestamp()).collect()
}

/// One scripted response.
#[derive(Clone, Debug)]
pub enum Step {
    Page(Vec<i64>, Option<&'static str>),
    RateLimited,
    Malformed,
    Transport(&'static str),
    Panic,
}

#[derive(Clone, Debug)]
pub struct Call {
    pub entity: EntityId,
    pub cursor: Option<Cursor>,
    pub at: Instant,
}

/// Replays a fixed sequence of responses per entity and records every call.
#[derive(Default)]
pub struct ScriptedSource {
    scripts: Mutex<HashMap<EntityId, VecDeque<Step>>>,
    calls: Mutex<Vec<Call>>,
    latency: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn script(self, entity: &str, steps: Vec<Step>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(EntityId::from(entity), steps.into());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, entity: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.entity.as_str() == entity)
            .collect()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DataSource for ScriptedSource {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn fetch(&self, entity: &EntityId, cursor: Option<&Cursor>) -> Result<Page, SourceError> {
        self.calls.lock().unwrap().push(Call {
            entity: entity.clone(),
            cursor: cursor.cloned(),
            at: Instant::now(),
        });

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let step = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(entity)
            .and_then(VecDeque::pop_front);

        match step {
            Some(Step::Page(secs, next)) => Ok(Page::new(
                secs.into_iter().map(|s| item(entity.as_str(), s)).collect(),
                next.map(Cursor::new),
            )),
            Some(Step::RateLimited) => Err(SourceError::RateLimited { retry_after: None }),
            Some(Step::Malformed) => Err(SourceError::Malformed("missing results".into())),
            Some(Step::Transport(reason)) => Err(SourceError::Transport(reason.into())),
            Some(Step::Panic) => panic!("scripted panic for {entity}"),
            None => Err(SourceError::Transport(format!("script exhausted for {entity}"))),
        }
    }
}
