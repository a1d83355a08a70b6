// Voltage-quality statistics service
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::application::history_service::HistoryService;
use crate::domain::history::HistoryWindow;
use crate::domain::stats::{filtered_points, AcceptableRange, RangeStats};
use crate::error::ApiError;

/// One series' statistics plus the raw chart points behind them.
#[derive(Debug, Clone, Serialize)]
pub struct SeriesRangeStats {
    #[serde(flatten)]
    pub stats: RangeStats,
    pub voltage_data: Vec<(DateTime<Utc>, f64)>,
}

pub struct StatsService {
    history: Arc<HistoryService>,
    power_series: Vec<String>,
    range: AcceptableRange,
}

impl StatsService {
    pub fn new(
        history: Arc<HistoryService>,
        power_series: Vec<String>,
        range: AcceptableRange,
    ) -> Self {
        Self { history, power_series, range }
    }

    /// Per-series range statistics over the trailing `days`. Statistics are
    /// recomputed on every call; only the underlying history fetch is cached.
    pub async fn range_stats(
        &self,
        days: Option<i64>,
    ) -> Result<BTreeMap<String, SeriesRangeStats>, ApiError> {
        let window = HistoryWindow::resolve(None, None, days, None, Utc::now());
        let readings = self.history.fetch_range(&self.power_series, &window).await?;

        let mut by_series = BTreeMap::new();
        for id in &self.power_series {
            let series = readings.get(id).map(Vec::as_slice).unwrap_or(&[]);
            let stats = RangeStats::aggregate(series, self.range);
            if stats.valid_readings == 0 {
                tracing::debug!(%id, "no valid readings for series");
            }
            let voltage_data = filtered_points(series);
            by_series.insert(id.clone(), SeriesRangeStats { stats, voltage_data });
        }

        if by_series.values().all(|series| series.stats.valid_readings == 0) {
            return Err(ApiError::NoValidData);
        }
        Ok(by_series)
    }
}
