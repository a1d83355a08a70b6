// Visit analytics ledger
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Hour-bucket key, e.g. "2026-08-08T14". Fixed width, so lexicographic
/// order matches chronological order.
fn hour_key(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H").to_string()
}

/// Persistent visit counters. Serialized wholesale to durable storage and
/// reloaded on startup; mutated only behind the analytics service lock.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VisitLedger {
    pub total_visits: u64,
    pub unique_origins: HashSet<String>,
    pub hourly_visits: BTreeMap<String, u64>,
    pub series_requests: BTreeMap<String, u64>,
}

impl VisitLedger {
    /// Count one session-scoped visit and prune buckets that fell out of the
    /// trailing 24 hours.
    pub fn record_visit(&mut self, origin: &str, at: DateTime<Utc>) {
        self.total_visits += 1;
        self.unique_origins.insert(origin.to_string());
        *self.hourly_visits.entry(hour_key(at)).or_insert(0) += 1;
        self.prune_hourly(at);
    }

    pub fn record_series_request(&mut self, series_id: &str) {
        *self.series_requests.entry(series_id.to_string()).or_insert(0) += 1;
    }

    /// Full-map rebuild keeping only buckets inside the trailing 24 hours.
    pub fn prune_hourly(&mut self, at: DateTime<Utc>) {
        let cutoff = hour_key(at - Duration::hours(24));
        self.hourly_visits = std::mem::take(&mut self.hourly_visits)
            .into_iter()
            .filter(|(key, _)| key.as_str() >= cutoff.as_str())
            .collect();
    }

    /// Derived at read time, never stored.
    pub fn visits_last_24h(&self, at: DateTime<Utc>) -> u64 {
        let cutoff = hour_key(at - Duration::hours(24));
        self.hourly_visits
            .iter()
            .filter(|(key, _)| key.as_str() >= cutoff.as_str())
            .map(|(_, count)| count)
            .sum()
    }
}

/// Read-time analytics report.
#[derive(Debug, Clone, Serialize)]
pub struct SiteStats {
    pub total_visits: u64,
    pub unique_visitors: usize,
    pub last_24h_visits: u64,
    pub active_sessions: usize,
    pub series_requests: BTreeMap<String, u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn total_matches_bucket_sum_within_window() {
        let mut ledger = VisitLedger::default();
        let now = Utc.with_ymd_and_hms(2026, 8, 8, 12, 0, 0).unwrap();

        ledger.record_visit("10.0.0.1", now - Duration::hours(3));
        ledger.record_visit("10.0.0.2", now - Duration::hours(1));
        ledger.record_visit("10.0.0.1", now);

        assert_eq!(ledger.total_visits, 3);
        assert_eq!(ledger.total_visits, ledger.hourly_visits.values().sum::<u64>());
        assert_eq!(ledger.visits_last_24h(now), 3);
        assert_eq!(ledger.unique_origins.len(), 2);
    }

    #[test]
    fn prune_drops_stale_buckets() {
        let mut ledger = VisitLedger::default();
        let now = Utc.with_ymd_and_hms(2026, 8, 8, 12, 0, 0).unwrap();

        ledger.record_visit("10.0.0.1", now - Duration::hours(30));
        assert_eq!(ledger.hourly_visits.len(), 1);

        ledger.record_visit("10.0.0.1", now);
        assert_eq!(ledger.hourly_visits.len(), 1);
        assert_eq!(ledger.visits_last_24h(now), 1);
        // the lifetime total is untouched by pruning
        assert_eq!(ledger.total_visits, 2);
    }

    #[test]
    fn series_requests_count_unconditionally() {
        let mut ledger = VisitLedger::default();
        ledger.record_series_request("sensor.phase_a");
        ledger.record_series_request("sensor.phase_a");
        assert_eq!(ledger.series_requests["sensor.phase_a"], 2);
    }

    #[test]
    fn ledger_round_trips_through_json() {
        let mut ledger = VisitLedger::default();
        let now = Utc.with_ymd_and_hms(2026, 8, 8, 12, 0, 0).unwrap();
        ledger.record_visit("10.0.0.1", now);
        ledger.record_series_request("sensor.phase_a");

        let json = serde_json::to_string(&ledger).unwrap();
        let restored: VisitLedger = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.total_visits, 1);
        assert!(restored.unique_origins.contains("10.0.0.1"));
        assert_eq!(restored.visits_last_24h(now), 1);
    }
}
