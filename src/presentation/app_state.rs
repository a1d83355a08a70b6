// Application state for HTTP handlers
use std::sync::Arc;

use crate::application::analytics_service::AnalyticsService;
use crate::application::history_service::HistoryService;
use crate::application::snapshot_service::SnapshotService;
use crate::application::stats_service::StatsService;

pub struct AppState {
    pub snapshots: SnapshotService,
    pub history: Arc<HistoryService>,
    pub stats: StatsService,
    pub analytics: AnalyticsService,
}
