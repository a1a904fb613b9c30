//! Time boundaries and the per-item keep/skip/stop decision.
//!
//! Feeds are newest-first, so once an item falls below the lower bound every
//! later item does too and paging can end. [`classify`] is pure and total.
use chrono::{DateTime, TimeDelta, Utc};
use std::fmt;

use crate::error::ScrapeError;

/// Inclusive `[start, end]` range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Window {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl Window {
    /// ```
    /// use backscroll_engine::window::Window;
    /// use chrono::{TimeZone, Utc};
    ///
    /// let a = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    /// let b = Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap();
    /// assert!(Window::new(a, b).is_ok());
    /// assert!(Window::new(b, a).is_err());
    /// ```
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, ScrapeError> {
        if start > end {
            return Err(ScrapeError::InvalidWindow { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t <= self.end
    }
}

/// "Everything strictly newer than `since`".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Checkpoint {
    pub since: DateTime<Utc>,
}

impl Checkpoint {
    pub fn new(since: DateTime<Utc>) -> Self {
        Self { since }
    }

    /// Checkpoint `days` before now, for callers with no previous run.
    pub fn lookback(days: i64) -> Self {
        Self::lookback_from(Utc::now(), days)
    }

    /// Saturates at the earliest representable instant.
    pub fn lookback_from(now: DateTime<Utc>, days: i64) -> Self {
        let since = TimeDelta::try_days(days.max(0))
            .and_then(|d| now.checked_sub_signed(d))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Self { since }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Boundary {
    Window(Window),
    Since(Checkpoint),
}

impl From<Window> for Boundary {
    fn from(w: Window) -> Self {
        Boundary::Window(w)
    }
}

impl From<Checkpoint> for Boundary {
    fn from(c: Checkpoint) -> Self {
        Boundary::Since(c)
    }
}

impl fmt::Display for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Boundary::Window(w) => write!(f, "[{}, {}]", w.start.to_rfc3339(), w.end.to_rfc3339()),
            Boundary::Since(c) => write!(f, "(>{})", c.since.to_rfc3339()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    Keep,
    /// Too new for the window; older items may still qualify.
    Skip,
    /// Nothing at or after this point can qualify.
    Stop,
}

pub fn classify(created_at: DateTime<Utc>, boundary: &Boundary) -> Decision {
    match boundary {
        Boundary::Window(w) if created_at < w.start => Decision::Stop,
        Boundary::Window(w) if created_at > w.end => Decision::Skip,
        Boundary::Window(_) => Decision::Keep,
        Boundary::Since(c) if created_at > c.since => Decision::Keep,
        Boundary::Since(_) => Decision::Stop,
    }
}
