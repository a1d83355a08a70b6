// History window normalization
use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::error::ApiError;

/// Longest window a single request may cover; longer requests are truncated
/// from the start.
pub const MAX_WINDOW_DAYS: i64 = 30;

/// Shortest window (0.1 day); shorter requests get their start pushed back.
pub const MIN_WINDOW_MINUTES: i64 = 144;

const FULL_DETAIL_MAX_DAYS: i64 = 2;
const MINIMAL_SHAPE_MIN_DAYS: i64 = 14;

/// Advisory downsampling hint forwarded to upstream to bound payload size.
/// Not a filter applied locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Full,
    SignificantOnly,
    Minimal,
}

impl Granularity {
    fn for_span(span: Duration) -> Self {
        if span > Duration::days(MINIMAL_SHAPE_MIN_DAYS) {
            Granularity::Minimal
        } else if span > Duration::days(FULL_DETAIL_MAX_DAYS) {
            Granularity::SignificantOnly
        } else {
            Granularity::Full
        }
    }
}

/// Effective time window for a history request, normalized from whatever the
/// client supplied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub granularity: Granularity,
}

impl HistoryWindow {
    /// Normalize raw request parameters into a usable window.
    ///
    /// Explicit parse-valid `start`+`end` win; otherwise the window is the
    /// trailing `days` (default 1) before `now`. An unparseable supplied
    /// timestamp falls back to the default window rather than failing the
    /// request. `offset` pages backwards by whole window-lengths. The result
    /// is clamped to [0.1, 30] days.
    pub fn resolve(
        raw_start: Option<&str>,
        raw_end: Option<&str>,
        days: Option<i64>,
        offset: Option<i64>,
        now: DateTime<Utc>,
    ) -> Self {
        let days = days.unwrap_or(1).max(1);
        let (mut start, mut end) = match (raw_start, raw_end) {
            (Some(raw_start), Some(raw_end)) => {
                match explicit_bounds(raw_start, raw_end) {
                    Ok(bounds) => bounds,
                    Err(err) => {
                        tracing::warn!(%err, "falling back to default history window");
                        (now - Duration::days(1), now)
                    }
                }
            }
            _ => (now - Duration::days(days), now),
        };

        if let Some(offset) = offset.filter(|o| *o > 0) {
            let shift = (end - start) * offset as i32;
            start -= shift;
            end -= shift;
        }

        if end - start > Duration::days(MAX_WINDOW_DAYS) {
            start = end - Duration::days(MAX_WINDOW_DAYS);
        }
        if end - start < Duration::minutes(MIN_WINDOW_MINUTES) {
            start = end - Duration::minutes(MIN_WINDOW_MINUTES);
        }

        let granularity = Granularity::for_span(end - start);
        Self { start, end, granularity }
    }

    pub fn span(&self) -> Duration {
        self.end - self.start
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant <= self.end
    }
}

fn explicit_bounds(
    raw_start: &str,
    raw_end: &str,
) -> Result<(DateTime<Utc>, DateTime<Utc>), ApiError> {
    Ok((parse_timestamp(raw_start)?, parse_timestamp(raw_end)?))
}

/// Accepts RFC 3339 or a bare `YYYY-MM-DD` date (taken as midnight UTC).
fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, ApiError> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Ok(instant.with_timezone(&Utc));
    }
    if let Some(instant) = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return Ok(instant.and_utc());
    }
    Err(ApiError::InvalidRange(format!("unparseable timestamp: {raw}")))
}
