// Home Assistant REST adapter
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::time::Duration;

use crate::application::state_provider::StateProvider;
use crate::domain::history::{Granularity, HistoryWindow};
use crate::domain::sensor::{HistoryItem, SensorSnapshot};
use crate::error::ApiError;

pub struct HassClient {
    base_url: String,
    token: String,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct RawState {
    entity_id: String,
    state: String,
    #[serde(default)]
    attributes: Map<String, Value>,
    last_updated: Option<DateTime<Utc>>,
    last_changed: Option<DateTime<Utc>>,
}

impl HassClient {
    pub fn new(base_url: String, token: String, timeout: Duration) -> anyhow::Result<Self> {
        // a bounded timeout converts a hung upstream into a reported failure
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { base_url: base_url.trim_end_matches('/').to_string(), token, http })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        let response = self
            .http
            .get(url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|err| ApiError::upstream(format!("request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Upstream {
                status: Some(status.as_u16()),
                message: format!("upstream returned {status}: {body}"),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|err| ApiError::upstream(format!("unparseable upstream response: {err}")))
    }
}

#[async_trait]
impl StateProvider for HassClient {
    async fn fetch_state(&self, entity_id: &str) -> Result<SensorSnapshot, ApiError> {
        let url = format!("{}/api/states/{}", self.base_url, entity_id);
        let raw: RawState = self.get_json(&url).await?;

        let last_updated = raw.last_updated.or(raw.last_changed).unwrap_or_else(Utc::now);
        Ok(SensorSnapshot {
            entity_id: raw.entity_id,
            state: raw.state,
            attributes: raw.attributes,
            last_updated,
        })
    }

    async fn fetch_history(
        &self,
        entity_ids: &[String],
        window: &HistoryWindow,
    ) -> Result<HashMap<String, Vec<HistoryItem>>, ApiError> {
        let mut url = format!(
            "{}/api/history/period/{}?end_time={}&filter_entity_id={}",
            self.base_url,
            urlencoding::encode(&window.start.to_rfc3339()),
            urlencoding::encode(&window.end.to_rfc3339()),
            urlencoding::encode(&entity_ids.join(",")),
        );
        match window.granularity {
            Granularity::Full => {}
            Granularity::SignificantOnly => url.push_str("&significant_changes_only=1"),
            Granularity::Minimal => {
                url.push_str("&significant_changes_only=1&minimal_response");
            }
        }

        tracing::debug!(%url, "fetching history window");
        // upstream answers one item list per series; minimal responses carry
        // the entity id only on the first item of each list
        let raw: Vec<Vec<HistoryItem>> = self.get_json(&url).await?;

        let mut by_series: HashMap<String, Vec<HistoryItem>> = HashMap::new();
        for items in raw {
            let Some(id) = items.iter().find_map(|item| item.entity_id.clone()) else {
                continue;
            };
            by_series.entry(id).or_default().extend(items);
        }
        Ok(by_series)
    }
}
