// Sensor domain models - snapshots and historical readings
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Point-in-time state of one tracked series, as served to clients.
#[derive(Debug, Clone, Serialize)]
pub struct SensorSnapshot {
    pub entity_id: String,
    pub state: String,
    pub attributes: Map<String, Value>,
    pub last_updated: DateTime<Utc>,
}

impl SensorSnapshot {
    /// The state as a finite number, if it parses as one.
    pub fn numeric_state(&self) -> Option<f64> {
        parse_finite(&self.state)
    }

    pub fn device_class(&self) -> Option<&str> {
        self.attributes.get("device_class").and_then(Value::as_str)
    }

    pub fn is_pressure(&self) -> bool {
        self.device_class() == Some("pressure") || self.entity_id.contains("pressure")
    }

    pub fn is_temperature(&self) -> bool {
        self.device_class() == Some("temperature") || self.entity_id.contains("temperature")
    }
}

/// A raw history item exactly as upstream returns it. Minimal responses omit
/// `entity_id` and `last_updated` on all but the first item of a series, so
/// every field except the attributes is optional until validated.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryItem {
    pub entity_id: Option<String>,
    pub state: Option<String>,
    #[serde(default)]
    pub attributes: Map<String, Value>,
    pub last_changed: Option<String>,
    pub last_updated: Option<String>,
}

/// A validated history item: it carried a state and a parseable timestamp.
#[derive(Debug, Clone, Serialize)]
pub struct Reading {
    pub state: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, Value>,
}

impl Reading {
    pub fn numeric_value(&self) -> Option<f64> {
        parse_finite(&self.state)
    }
}

fn parse_finite(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Plausibility band for a device class. A fetched value outside this band is
/// a bad reading, not a quality classification.
pub fn plausible_range(device_class: &str) -> Option<(f64, f64)> {
    match device_class {
        "humidity" => Some((0.0, 100.0)),
        "temperature" => Some((-60.0, 60.0)),
        "pressure" => Some((800.0, 1100.0)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(entity_id: &str, state: &str, attributes: Map<String, Value>) -> SensorSnapshot {
        SensorSnapshot {
            entity_id: entity_id.to_string(),
            state: state.to_string(),
            attributes,
            last_updated: Utc::now(),
        }
    }

    #[test]
    fn numeric_state_rejects_non_finite() {
        assert_eq!(snapshot("sensor.a", "231.4", Map::new()).numeric_state(), Some(231.4));
        assert_eq!(snapshot("sensor.a", "unavailable", Map::new()).numeric_state(), None);
        assert_eq!(snapshot("sensor.a", "NaN", Map::new()).numeric_state(), None);
        assert_eq!(snapshot("sensor.a", "inf", Map::new()).numeric_state(), None);
    }

    #[test]
    fn series_kind_prefers_device_class() {
        let mut attributes = Map::new();
        attributes.insert("device_class".to_string(), "pressure".into());
        assert!(snapshot("sensor.ambient", "1013", attributes).is_pressure());
        assert!(snapshot("sensor.ws_relative_pressure", "1013", Map::new()).is_pressure());
        assert!(snapshot("sensor.ws_outdoor_temperature", "21", Map::new()).is_temperature());
        assert!(!snapshot("sensor.ws_humidity", "55", Map::new()).is_pressure());
    }

    #[test]
    fn plausibility_bands() {
        assert_eq!(plausible_range("humidity"), Some((0.0, 100.0)));
        assert_eq!(plausible_range("power"), None);
    }
}
