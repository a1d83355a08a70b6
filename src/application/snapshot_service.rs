// Snapshot service - cached current-state batches
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;

use crate::application::state_provider::StateProvider;
use crate::domain::sensor::{plausible_range, SensorSnapshot};
use crate::domain::stats::{sea_level_pressure, DEFAULT_TEMPERATURE_C};
use crate::error::ApiError;
use crate::infrastructure::ttl_cache::TtlCache;

const BATCH_KEY: &str = "tracked";

pub struct SnapshotService {
    provider: Arc<dyn StateProvider>,
    cache: TtlCache<String, Arc<Vec<SensorSnapshot>>>,
    tracked: Vec<String>,
    station_altitude_m: f64,
}

impl SnapshotService {
    pub fn new(
        provider: Arc<dyn StateProvider>,
        tracked: Vec<String>,
        station_altitude_m: f64,
        ttl: Duration,
    ) -> Self {
        Self { provider, cache: TtlCache::new(ttl), tracked, station_altitude_m }
    }

    /// The assembled snapshot batch for every tracked series.
    ///
    /// Series that fail upstream or plausibility checks are dropped from the
    /// batch; the batch itself fails only when nothing succeeded. No lock is
    /// held while the upstream calls are in flight, so simultaneous misses
    /// may fetch in parallel; the last insert wins.
    pub async fn current_snapshots(&self) -> Result<Arc<Vec<SensorSnapshot>>, ApiError> {
        if let Some(batch) = self.cache.get(&BATCH_KEY.to_string()) {
            tracing::debug!("snapshot cache hit");
            return Ok(batch);
        }

        let fetches = self.tracked.iter().map(|id| self.provider.fetch_state(id));
        let results = join_all(fetches).await;

        let mut snapshots = Vec::with_capacity(self.tracked.len());
        let mut first_error = None;
        for (id, result) in self.tracked.iter().zip(results) {
            match result {
                Ok(snapshot) => match validate_snapshot(&snapshot) {
                    Ok(()) => snapshots.push(snapshot),
                    Err(err) => {
                        tracing::warn!(%id, %err, "dropping implausible reading");
                        first_error.get_or_insert(err);
                    }
                },
                Err(err) => {
                    tracing::warn!(%id, %err, "dropping series after upstream failure");
                    first_error.get_or_insert(err);
                }
            }
        }

        if snapshots.is_empty() {
            if let Some(err) = first_error {
                return Err(err);
            }
            return Ok(Arc::new(snapshots));
        }

        apply_pressure_conversion(&mut snapshots, self.station_altitude_m);

        let batch = Arc::new(snapshots);
        self.cache.insert(BATCH_KEY.to_string(), batch.clone());
        Ok(batch)
    }
}

fn validate_snapshot(snapshot: &SensorSnapshot) -> Result<(), ApiError> {
    let Some(class) = snapshot.device_class() else { return Ok(()) };
    let Some((lo, hi)) = plausible_range(class) else { return Ok(()) };
    let Some(value) = snapshot.numeric_state() else { return Ok(()) };
    if value < lo || value > hi {
        return Err(ApiError::Validation {
            series: snapshot.entity_id.clone(),
            reason: format!("value {value} outside plausible range {lo}..{hi}"),
        });
    }
    Ok(())
}

/// Replace absolute pressure states with their sea-level equivalent. The
/// ambient temperature comes from the first temperature series in the batch
/// whose state parses; the raw reading is kept as an attribute.
fn apply_pressure_conversion(snapshots: &mut [SensorSnapshot], altitude_m: f64) {
    let temperature = snapshots
        .iter()
        .filter(|snapshot| snapshot.is_temperature())
        .find_map(SensorSnapshot::numeric_state)
        .unwrap_or(DEFAULT_TEMPERATURE_C);

    for snapshot in snapshots.iter_mut() {
        if !snapshot.is_pressure() {
            continue;
        }
        let Some(raw) = snapshot.numeric_state() else { continue };
        let converted = sea_level_pressure(raw, altitude_m, temperature);
        snapshot.attributes.insert("absolute_pressure".to_string(), raw.into());
        snapshot.state = format!("{converted:.1}");
        tracing::debug!(
            entity_id = %snapshot.entity_id,
            raw,
            converted,
            "reduced pressure to sea level"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use serde_json::{Map, Value};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::domain::history::HistoryWindow;
    use crate::domain::sensor::HistoryItem;

    struct FakeProvider {
        states: HashMap<String, SensorSnapshot>,
        calls: AtomicUsize,
    }

    impl FakeProvider {
        fn new(states: Vec<SensorSnapshot>) -> Self {
            Self {
                states: states.into_iter().map(|s| (s.entity_id.clone(), s)).collect(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl StateProvider for FakeProvider {
        async fn fetch_state(&self, entity_id: &str) -> Result<SensorSnapshot, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.states.get(entity_id).cloned().ok_or(ApiError::Upstream {
                status: Some(404),
                message: format!("unknown entity {entity_id}"),
            })
        }

        async fn fetch_history(
            &self,
            _entity_ids: &[String],
            _window: &HistoryWindow,
        ) -> Result<HashMap<String, Vec<HistoryItem>>, ApiError> {
            unimplemented!("not used by snapshot tests")
        }
    }

    fn snapshot(entity_id: &str, state: &str) -> SensorSnapshot {
        SensorSnapshot {
            entity_id: entity_id.to_string(),
            state: state.to_string(),
            attributes: Map::new(),
            last_updated: Utc::now(),
        }
    }

    fn snapshot_with_class(entity_id: &str, state: &str, class: &str) -> SensorSnapshot {
        let mut snapshot = snapshot(entity_id, state);
        snapshot.attributes.insert("device_class".to_string(), class.into());
        snapshot
    }

    fn service(provider: Arc<FakeProvider>, tracked: &[&str]) -> SnapshotService {
        SnapshotService::new(
            provider,
            tracked.iter().map(|id| id.to_string()).collect(),
            230.0,
            Duration::from_secs(60),
        )
    }

    #[tokio::test]
    async fn unknown_series_does_not_abort_the_batch() {
        let provider = Arc::new(FakeProvider::new(vec![snapshot("sensor.known", "21.0")]));
        let service = service(provider, &["sensor.known", "sensor.unknown"]);

        let batch = service.current_snapshots().await.unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].entity_id, "sensor.known");
    }

    #[tokio::test]
    async fn batch_fails_only_when_nothing_succeeds() {
        let provider = Arc::new(FakeProvider::new(vec![]));
        let service = service(provider, &["sensor.a", "sensor.b"]);

        let err = service.current_snapshots().await.unwrap_err();
        assert!(matches!(err, ApiError::Upstream { status: Some(404), .. }));
    }

    #[tokio::test]
    async fn second_call_within_ttl_hits_the_cache() {
        let provider = Arc::new(FakeProvider::new(vec![snapshot("sensor.a", "1.0")]));
        let service = service(provider.clone(), &["sensor.a"]);

        service.current_snapshots().await.unwrap();
        service.current_snapshots().await.unwrap();
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn implausible_humidity_is_dropped() {
        let provider = Arc::new(FakeProvider::new(vec![
            snapshot_with_class("sensor.humidity", "120.0", "humidity"),
            snapshot("sensor.temp", "21.0"),
        ]));
        let service = service(provider, &["sensor.humidity", "sensor.temp"]);

        let batch = service.current_snapshots().await.unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].entity_id, "sensor.temp");
    }

    #[tokio::test]
    async fn pressure_uses_batch_temperature_and_keeps_raw_value() {
        let provider = Arc::new(FakeProvider::new(vec![
            snapshot_with_class("sensor.outdoor_temperature", "15.0", "temperature"),
            snapshot_with_class("sensor.relative_pressure", "1013.25", "pressure"),
        ]));
        let service =
            service(provider, &["sensor.outdoor_temperature", "sensor.relative_pressure"]);

        let batch = service.current_snapshots().await.unwrap();
        let pressure = batch.iter().find(|s| s.entity_id == "sensor.relative_pressure").unwrap();
        assert_eq!(pressure.state, "1041.2");
        assert_eq!(
            pressure.attributes.get("absolute_pressure").and_then(Value::as_f64),
            Some(1013.25)
        );
    }

    #[tokio::test]
    async fn pressure_falls_back_to_default_temperature() {
        let provider = Arc::new(FakeProvider::new(vec![snapshot_with_class(
            "sensor.relative_pressure",
            "1013.25",
            "pressure",
        )]));
        let service = service(provider, &["sensor.relative_pressure"]);

        let batch = service.current_snapshots().await.unwrap();
        // no temperature in the batch, so the 15 °C default applies
        assert_eq!(batch[0].state, "1041.2");
    }
}
