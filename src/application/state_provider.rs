// Provider trait for upstream sensor state access
use async_trait::async_trait;
use std::collections::HashMap;

use crate::domain::history::HistoryWindow;
use crate::domain::sensor::{HistoryItem, SensorSnapshot};
use crate::error::ApiError;

#[async_trait]
pub trait StateProvider: Send + Sync {
    /// Fetch the current state of one tracked series.
    async fn fetch_state(&self, entity_id: &str) -> Result<SensorSnapshot, ApiError>;

    /// Fetch raw history items for the given series within the window,
    /// grouped by series id. The window's granularity is forwarded as a
    /// downsampling hint; callers re-validate every returned item.
    async fn fetch_history(
        &self,
        entity_ids: &[String],
        window: &HistoryWindow,
    ) -> Result<HashMap<String, Vec<HistoryItem>>, ApiError>;
}
