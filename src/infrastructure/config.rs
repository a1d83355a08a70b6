// Service configuration
use serde::{Deserialize, Deserializer};
use std::path::PathBuf;

use crate::domain::stats::AcceptableRange;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub upstream: UpstreamSettings,
    pub sensors: SensorSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub range: AcceptableRange,
    #[serde(default)]
    pub analytics: AnalyticsSettings,
    #[serde(default)]
    pub server: ServerSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UpstreamSettings {
    pub base_url: String,
    pub token: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SensorSettings {
    /// Series served by the snapshot endpoint.
    #[serde(deserialize_with = "id_list")]
    pub tracked: Vec<String>,
    /// Series covered by the voltage-quality statistics.
    #[serde(default, deserialize_with = "id_list")]
    pub power_series: Vec<String>,
    #[serde(default = "default_altitude_m")]
    pub station_altitude_m: f64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CacheSettings {
    pub snapshot_ttl_secs: u64,
    pub history_ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self { snapshot_ttl_secs: 60, history_ttl_secs: 3600 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AnalyticsSettings {
    pub storage_path: PathBuf,
}

impl Default for AnalyticsSettings {
    fn default() -> Self {
        Self { storage_path: PathBuf::from("data/analytics.json") }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { bind: "0.0.0.0:8000".to_string() }
    }
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_altitude_m() -> f64 {
    230.0
}

/// Accept either a native list or a comma-separated string; downstream code
/// only ever sees the list form.
fn id_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        List(Vec<String>),
        Csv(String),
    }

    let ids = match Raw::deserialize(deserializer)? {
        Raw::List(ids) => ids,
        Raw::Csv(csv) => csv.split(',').map(String::from).collect(),
    };
    Ok(ids.into_iter().map(|id| id.trim().to_string()).filter(|id| !id.is_empty()).collect())
}

/// File config (optional) layered under `STATION_*` environment variables,
/// e.g. `STATION_UPSTREAM__TOKEN` or `STATION_SENSORS__TRACKED=a,b,c`.
pub fn load_settings() -> anyhow::Result<Settings> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/default").required(false))
        .add_source(config::Environment::with_prefix("STATION").separator("__"))
        .build()?;

    Ok(settings.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sensor_ids_accept_native_list() {
        let settings: SensorSettings = serde_json::from_value(serde_json::json!({
            "tracked": ["sensor.outdoor_temperature", "sensor.relative_pressure"],
        }))
        .unwrap();
        assert_eq!(settings.tracked.len(), 2);
        assert!(settings.power_series.is_empty());
        assert_eq!(settings.station_altitude_m, 230.0);
    }

    #[test]
    fn sensor_ids_accept_comma_separated_string() {
        let settings: SensorSettings = serde_json::from_value(serde_json::json!({
            "tracked": " sensor.a , sensor.b ,, sensor.c",
            "power_series": "sensor.phase_a,sensor.phase_b",
        }))
        .unwrap();
        assert_eq!(settings.tracked, vec!["sensor.a", "sensor.b", "sensor.c"]);
        assert_eq!(settings.power_series, vec!["sensor.phase_a", "sensor.phase_b"]);
    }

    #[test]
    fn defaults_fill_optional_sections() {
        let settings: Settings = serde_json::from_value(serde_json::json!({
            "upstream": { "base_url": "http://hass:8123", "token": "secret" },
            "sensors": { "tracked": "sensor.a" },
        }))
        .unwrap();
        assert_eq!(settings.upstream.timeout_secs, 10);
        assert_eq!(settings.cache.snapshot_ttl_secs, 60);
        assert_eq!(settings.cache.history_ttl_secs, 3600);
        assert_eq!(settings.range.min, 207.0);
        assert_eq!(settings.range.nominal, 230.0);
        assert_eq!(settings.server.bind, "0.0.0.0:8000");
    }
}
