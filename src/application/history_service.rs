// History service - coarse per-window caching and item re-validation
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::application::state_provider::StateProvider;
use crate::domain::history::HistoryWindow;
use crate::domain::sensor::{HistoryItem, Reading};
use crate::error::ApiError;
use crate::infrastructure::ttl_cache::TtlCache;

pub struct HistoryService {
    provider: Arc<dyn StateProvider>,
    cache: TtlCache<String, Arc<HashMap<String, Vec<Reading>>>>,
}

impl HistoryService {
    pub fn new(provider: Arc<dyn StateProvider>, ttl: Duration) -> Self {
        Self { provider, cache: TtlCache::new(ttl) }
    }

    /// Validated readings for the given series inside the window, keyed by
    /// series id. Whole windows are cached; distinct windows get distinct
    /// keys so they never collide.
    pub async fn fetch_range(
        &self,
        entity_ids: &[String],
        window: &HistoryWindow,
    ) -> Result<Arc<HashMap<String, Vec<Reading>>>, ApiError> {
        let key = cache_key(entity_ids, window);
        if let Some(cached) = self.cache.get(&key) {
            tracing::debug!(%key, "history cache hit");
            return Ok(cached);
        }

        let raw = self.provider.fetch_history(entity_ids, window).await?;
        let validated: HashMap<String, Vec<Reading>> = raw
            .into_iter()
            .map(|(id, items)| {
                let readings = validate_items(items, window);
                (id, readings)
            })
            .collect();

        let validated = Arc::new(validated);
        self.cache.insert(key, validated.clone());
        Ok(validated)
    }
}

fn cache_key(entity_ids: &[String], window: &HistoryWindow) -> String {
    format!("{}:{}:{}", window.start.timestamp(), window.end.timestamp(), entity_ids.join(","))
}

/// Re-validate upstream items: a usable item carries a state and a parseable
/// timestamp (`last_changed` preferred over `last_updated`) that falls inside
/// the window. Duplicate timestamps within a series are dropped. Failures
/// are dropped, never fatal.
fn validate_items(items: Vec<HistoryItem>, window: &HistoryWindow) -> Vec<Reading> {
    let total = items.len();
    let mut readings: Vec<Reading> = items
        .into_iter()
        .filter_map(|item| {
            let state = item.state?;
            let raw_timestamp = item.last_changed.or(item.last_updated)?;
            let timestamp =
                DateTime::parse_from_rfc3339(&raw_timestamp).ok()?.with_timezone(&Utc);
            if !window.contains(timestamp) {
                return None;
            }
            Some(Reading { state, timestamp, attributes: item.attributes })
        })
        .collect();

    readings.sort_by_key(|reading| reading.timestamp);
    readings.dedup_by(|a, b| a.timestamp == b.timestamp);

    if readings.len() < total {
        tracing::debug!(dropped = total - readings.len(), "dropped invalid history items");
    }
    readings
}
