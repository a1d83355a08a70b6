// HTTP request handlers
use axum::extract::{ConnectInfo, Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::application::stats_service::SeriesRangeStats;
use crate::domain::analytics::SiteStats;
use crate::domain::history::{HistoryWindow, MAX_WINDOW_DAYS};
use crate::domain::sensor::{Reading, SensorSnapshot};
use crate::domain::stats::filtered_points;
use crate::error::ApiError;
use crate::presentation::app_state::AppState;

#[derive(Deserialize)]
pub struct HistoryParams {
    pub start: Option<String>,
    pub end: Option<String>,
    pub days: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Deserialize)]
pub struct StatsParams {
    pub days: Option<i64>,
}

#[derive(Serialize)]
pub struct HistoryResponse {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub current: Option<f64>,
    pub history: Vec<Reading>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub has_more: bool,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Current snapshots for every tracked series.
pub async fn list_sensors(
    headers: HeaderMap,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<SensorSnapshot>>, ApiError> {
    state.analytics.record_visit(&resolve_origin(&headers, addr)).await;

    let batch = state.snapshots.current_snapshots().await?;
    Ok(Json(batch.as_ref().clone()))
}

/// Historical readings for one series, with a window summary and a pager.
pub async fn sensor_history(
    Path(id): Path<String>,
    Query(params): Query<HistoryParams>,
    headers: HeaderMap,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<HistoryResponse>, ApiError> {
    state.analytics.record_visit(&resolve_origin(&headers, addr)).await;
    state.analytics.record_series_request(&id).await;

    let now = Utc::now();
    let window = HistoryWindow::resolve(
        params.start.as_deref(),
        params.end.as_deref(),
        params.days,
        params.offset,
        now,
    );
    let ids = vec![id.clone()];
    let by_series = state.history.fetch_range(&ids, &window).await?;
    let history = by_series.get(&id).cloned().unwrap_or_default();

    let points = filtered_points(&history);
    let values = points.iter().map(|(_, value)| *value);
    let min = values.clone().reduce(f64::min);
    let max = values.clone().reduce(f64::max);
    let current = points.last().map(|(_, value)| *value);
    // another page back must still start inside the retention horizon
    let has_more = window.start - window.span() > now - Duration::days(MAX_WINDOW_DAYS);

    Ok(Json(HistoryResponse {
        min,
        max,
        current,
        history,
        start_time: window.start,
        end_time: window.end,
        has_more,
    }))
}

/// Per-phase voltage quality statistics over the requested day count.
pub async fn power_stats(
    Query(params): Query<StatsParams>,
    headers: HeaderMap,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<BTreeMap<String, SeriesRangeStats>>, ApiError> {
    state.analytics.record_visit(&resolve_origin(&headers, addr)).await;

    let stats = state.stats.range_stats(params.days).await?;
    Ok(Json(stats))
}

/// Visit analytics. Reading the counters does not count as a visit.
pub async fn site_stats(State(state): State<Arc<AppState>>) -> Json<SiteStats> {
    Json(state.analytics.site_stats().await)
}

/// First non-empty proxy header wins; the peer address is the fallback.
fn resolve_origin(headers: &HeaderMap, addr: SocketAddr) -> String {
    for header in ["x-forwarded-for", "x-real-ip"] {
        let Some(value) = headers.get(header).and_then(|v| v.to_str().ok()) else {
            continue;
        };
        if let Some(first) = value.split(',').map(str::trim).find(|part| !part.is_empty()) {
            return first.to_string();
        }
    }
    addr.ip().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn peer() -> SocketAddr {
        "192.0.2.7:55555".parse().unwrap()
    }

    #[test]
    fn forwarded_header_wins_over_peer_address() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.9, 10.0.0.1"));
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));
        assert_eq!(resolve_origin(&headers, peer()), "203.0.113.9");
    }

    #[test]
    fn real_ip_is_second_choice() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));
        assert_eq!(resolve_origin(&headers, peer()), "10.0.0.2");
    }

    #[test]
    fn empty_headers_fall_back_to_peer() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("  ,  "));
        assert_eq!(resolve_origin(&headers, peer()), "192.0.2.7");
    }
}
