use chrono::{DateTime, Utc};

use crate::source::EntityId;

/// Errors surfaced by a scrape. In a fan-out each one is confined to its entity.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScrapeError {
    #[error("invalid window: start {start} is after end {end}")]
    InvalidWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("{entity}: still rate limited after credential refresh and retry")]
    RateLimited { entity: EntityId },

    #[error("{entity}: transport failure: {reason}")]
    Transport { entity: EntityId, reason: String },

    /// The source kept handing out cursors past the page cap.
    #[error("{entity}: source still paginating after {pages} pages")]
    ProtocolViolation { entity: EntityId, pages: usize },

    #[error("{entity}: cancelled")]
    Cancelled { entity: EntityId },

    #[error("{entity}: worker panicked: {reason}")]
    WorkerPanicked { entity: EntityId, reason: String },
}

impl ScrapeError {
    pub fn entity(&self) -> Option<&EntityId> {
        match self {
            ScrapeError::InvalidWindow { .. } => None,
            ScrapeError::RateLimited { entity }
            | ScrapeError::Transport { entity, .. }
            | ScrapeError::ProtocolViolation { entity, .. }
            | ScrapeError::Cancelled { entity }
            | ScrapeError::WorkerPanicked { entity, .. } => Some(entity),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ScrapeError::Cancelled { .. })
    }
}
