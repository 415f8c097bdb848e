//! The fixed fetch window policy.

use chrono::{DateTime, Months, Utc};

/// Months of history fetched behind now.
const WINDOW_MONTHS_BACK: u32 = 3;
/// Months of future fetched ahead of now.
const WINDOW_MONTHS_AHEAD: u32 = 6;

/// Single-page cap per calendar; no further pagination is attempted.
pub const DEFAULT_MAX_RESULTS: u32 = 2500;

/// The time window events are fetched within, recomputed fresh for every
/// run. There is no incremental/delta cursor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl SyncWindow {
    /// `[now − 3 months, now + 6 months]`.
    pub fn current() -> Self {
        Self::around(Utc::now())
    }

    pub fn around(now: DateTime<Utc>) -> Self {
        let start = now
            .checked_sub_months(Months::new(WINDOW_MONTHS_BACK))
            .unwrap_or(now);
        let end = now
            .checked_add_months(Months::new(WINDOW_MONTHS_AHEAD))
            .unwrap_or(now);
        SyncWindow { start, end }
    }

    pub fn start_rfc3339(&self) -> String {
        self.start.to_rfc3339()
    }

    pub fn end_rfc3339(&self) -> String {
        self.end.to_rfc3339()
    }

    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        t >= self.start && t <= self.end
    }
}
