// Visit analytics - session-gated counting with periodic persistence
use chrono::Utc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::domain::analytics::{SiteStats, VisitLedger};
use crate::infrastructure::analytics_store::AnalyticsStore;
use crate::infrastructure::session_tracker::SessionTracker;

/// Every Kth counted visit flushes the ledger to storage.
const FLUSH_EVERY: u64 = 10;

/// Owns the visit ledger behind one async lock; holding it across the flush
/// keeps storage writes single-writer.
pub struct AnalyticsService {
    sessions: SessionTracker,
    store: AnalyticsStore,
    ledger: Mutex<VisitLedger>,
}

impl AnalyticsService {
    /// Load persisted state; absent or corrupt storage starts from zero.
    pub async fn load(store: AnalyticsStore, session_window: Duration) -> Self {
        let ledger = store.load().await;
        if ledger.total_visits > 0 {
            tracing::info!(total_visits = ledger.total_visits, "restored analytics state");
        }
        Self { sessions: SessionTracker::new(session_window), store, ledger: Mutex::new(ledger) }
    }

    /// Count a visit unless the origin is inside an active session. A failed
    /// flush is logged and the visit still counts.
    pub async fn record_visit(&self, origin: &str) {
        if !self.sessions.is_new_session(origin) {
            return;
        }
        let mut ledger = self.ledger.lock().await;
        ledger.record_visit(origin, Utc::now());
        if ledger.total_visits % FLUSH_EVERY == 0 {
            if let Err(err) = self.store.save(&ledger).await {
                tracing::warn!(%err, "failed to persist analytics state");
            }
        }
    }

    /// Not session-gated: every request for a series counts.
    pub async fn record_series_request(&self, series_id: &str) {
        self.ledger.lock().await.record_series_request(series_id);
    }

    pub async fn site_stats(&self) -> SiteStats {
        let ledger = self.ledger.lock().await;
        SiteStats {
            total_visits: ledger.total_visits,
            unique_visitors: ledger.unique_origins.len(),
            last_24h_visits: ledger.visits_last_24h(Utc::now()),
            active_sessions: self.sessions.active_sessions(),
            series_requests: ledger.series_requests.clone(),
        }
    }
}
