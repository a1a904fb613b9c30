//! Wires config, sources, the engine and shutdown together for one CLI run.
use anyhow::Result;
use backscroll_config::BackscrollConfig;
use backscroll_engine::{Checkpoint, EntityId, Scraper};
use chrono::{DateTime, Utc};
use std::io::Write;
use std::process::ExitCode;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::output;
use crate::sources;

pub struct Tether {
    cfg: BackscrollConfig,
    cancel: CancellationToken,
}

impl Tether {
    pub fn new(cfg: BackscrollConfig) -> Self {
        Self {
            cfg,
            cancel: CancellationToken::new(),
        }
    }

    /// Cancel every scrape on ctrl-c or once `timeout` elapses.
    pub fn spawn_shutdown(&self, timeout: Option<Duration>) {
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            let deadline = async {
                match timeout {
                    Some(d) => tokio::time::sleep(d).await,
                    None => std::future::pending().await,
                }
            };
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::signal::ctrl_c() => tracing::warn!("shutdown.ctrl_c"),
                _ = deadline => {
                    tracing::warn!(timeout_secs = ?timeout.map(|d| d.as_secs()), "shutdown.timeout")
                }
            }
            cancel.cancel();
        });
    }

    fn scraper(&self, source_id: &str) -> Result<Scraper> {
        let spec = sources::find(&self.cfg, source_id)?;
        let source = sources::build_source(spec)?;
        Ok(Scraper::from_settings(source, &self.cfg.engine)
            .with_cancellation(self.cancel.clone()))
    }

    pub async fn window<W: Write>(
        &self,
        out: &mut W,
        source_id: &str,
        entity: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<ExitCode> {
        let scraper = self.scraper(source_id)?;
        window(&scraper, out, &EntityId::from(entity), start, end).await
    }

    pub async fn since<W: Write>(
        &self,
        out: &mut W,
        source_id: &str,
        requested: Vec<String>,
        since: Option<DateTime<Utc>>,
        lookback_days: Option<i64>,
    ) -> Result<ExitCode> {
        let spec = sources::find(&self.cfg, source_id)?;
        let entities = sources::entities_for(spec, requested)?;
        let checkpoint = match since {
            Some(t) => Checkpoint::new(t),
            None => Checkpoint::lookback(lookback_days.unwrap_or(self.cfg.engine.lookback_days)),
        };
        let scraper = self.scraper(source_id)?;
        since_many(&scraper, out, entities, checkpoint).await
    }
}

pub async fn window<W: Write>(
    scraper: &Scraper,
    out: &mut W,
    entity: &EntityId,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<ExitCode> {
    match scraper.scrape_window(entity, start, end).await {
        Ok(items) => {
            output::write_items(out, entity, &items)?;
            out.flush()?;
            tracing::info!(entity=%entity, items=items.len(), "cli.window.done");
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            tracing::error!(entity=%entity, error=%err, "cli.window.failed");
            eprintln!("{err}");
            Ok(ExitCode::FAILURE)
        }
    }
}

pub async fn since_many<W: Write>(
    scraper: &Scraper,
    out: &mut W,
    entities: Vec<EntityId>,
    checkpoint: Checkpoint,
) -> Result<ExitCode> {
    let report = scraper.scrape_since(entities, checkpoint).await;
    output::write_report(out, &report)?;

    let mut failed: Vec<_> = report.failures.values().collect();
    failed.sort_by_key(|err| err.entity().cloned());
    for err in failed {
        eprintln!("{err}");
    }
    eprintln!(
        "{} ok, {} failed, {} items",
        report.items.len(),
        report.failures.len(),
        report.total_items()
    );

    if report.items.is_empty() && !report.failures.is_empty() {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use backscroll_engine::{Cursor, DataSource, Item, NoDelay, Page, SourceError};
    use chrono::TimeZone;
    use std::sync::Arc;

    /// One page per entity; entity "down" fails.
    struct OnePage;

    #[async_trait]
    impl DataSource for OnePage {
        fn name(&self) -> &str {
            "one-page"
        }

        async fn fetch(&self, entity: &EntityId, _: Option<&Cursor>) -> Result<Page, SourceError> {
            if entity.as_str() == "down" {
                return Err(SourceError::Transport("unreachable".into()));
            }
            Ok(Page::last(vec![Item {
                id: format!("{entity}-1"),
                author: entity.to_string(),
                text: "x".into(),
                created_at: Utc.with_ymd_and_hms(2024, 9, 2, 12, 0, 0).unwrap(),
                engagement: Default::default(),
            }]))
        }
    }

    fn scraper() -> Scraper {
        Scraper::new(Arc::new(OnePage)).with_pacing(Arc::new(NoDelay))
    }

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, d, 0, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn window_prints_items() {
        let mut out = Vec::new();
        let code = window(&scraper(), &mut out, &"alice".into(), day(1), day(3))
            .await
            .unwrap();
        assert_eq!(code, ExitCode::SUCCESS);
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 1);
    }

    #[tokio::test]
    async fn failed_window_exits_non_zero() {
        let mut out = Vec::new();
        let code = window(&scraper(), &mut out, &"down".into(), day(1), day(3))
            .await
            .unwrap();
        assert_eq!(code, ExitCode::FAILURE);
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn inverted_window_exits_non_zero() {
        let mut out = Vec::new();
        let code = window(&scraper(), &mut out, &"alice".into(), day(3), day(1))
            .await
            .unwrap();
        assert_eq!(code, ExitCode::FAILURE);
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn partial_fanout_failure_still_succeeds() {
        let mut out = Vec::new();
        let code = since_many(
            &scraper(),
            &mut out,
            vec!["alice".into(), "down".into()],
            Checkpoint::new(day(1)),
        )
        .await
        .unwrap();
        assert_eq!(code, ExitCode::SUCCESS);
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 1);
    }

    #[tokio::test]
    async fn total_fanout_failure_exits_non_zero() {
        let mut out = Vec::new();
        let code = since_many(&scraper(), &mut out, vec!["down".into()], Checkpoint::new(day(1)))
            .await
            .unwrap();
        assert_eq!(code, ExitCode::FAILURE);
    }
}
