// Range statistics and barometric conversion
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::sensor::Reading;

/// Readings below this are sensor faults (raw faults report implausibly low
/// magnitudes), dropped before any statistics. Not the acceptable-range test.
pub const HARD_ERROR_FLOOR: f64 = 100.0;

/// Assumed ambient temperature for the sea-level reduction when no
/// temperature reading is available in the batch.
pub const DEFAULT_TEMPERATURE_C: f64 = 15.0;

/// Acceptable band for a monitored series, e.g. 230 V ±10% for mains voltage.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AcceptableRange {
    pub min: f64,
    pub max: f64,
    pub nominal: f64,
}

impl Default for AcceptableRange {
    fn default() -> Self {
        Self { min: 207.0, max: 253.0, nominal: 230.0 }
    }
}

/// Per-series quality summary over a history window. Recomputed per request,
/// never cached.
#[derive(Debug, Clone, Serialize)]
pub struct RangeStats {
    pub total_readings: usize,
    pub valid_readings: usize,
    pub in_range_count: usize,
    pub below_range_count: usize,
    pub above_range_count: usize,
    pub in_range_percentage: f64,
    pub below_range_percentage: f64,
    pub above_range_percentage: f64,
    pub min_voltage: Option<f64>,
    pub max_voltage: Option<f64>,
    pub avg_voltage: Option<f64>,
    pub acceptable_range: AcceptableRange,
}

impl RangeStats {
    /// Reduce a series of readings against an acceptable band.
    ///
    /// First pass drops non-numeric values and sensor faults below the error
    /// floor; the second pass classifies and summarizes what survived. Zero
    /// surviving readings yield all-zero percentages and absent extremes
    /// rather than a division by zero.
    pub fn aggregate(readings: &[Reading], acceptable_range: AcceptableRange) -> Self {
        let points = filtered_points(readings);
        let valid_readings = points.len();

        let mut in_range_count = 0;
        let mut below_range_count = 0;
        let mut above_range_count = 0;
        let mut min_voltage: Option<f64> = None;
        let mut max_voltage: Option<f64> = None;
        let mut sum = 0.0;

        for (_, value) in &points {
            if *value < acceptable_range.min {
                below_range_count += 1;
            } else if *value > acceptable_range.max {
                above_range_count += 1;
            } else {
                in_range_count += 1;
            }
            min_voltage = Some(min_voltage.map_or(*value, |m| m.min(*value)));
            max_voltage = Some(max_voltage.map_or(*value, |m| m.max(*value)));
            sum += *value;
        }

        let percentage = |count: usize| {
            if valid_readings == 0 {
                0.0
            } else {
                count as f64 / valid_readings as f64 * 100.0
            }
        };

        Self {
            total_readings: readings.len(),
            valid_readings,
            in_range_count,
            below_range_count,
            above_range_count,
            in_range_percentage: percentage(in_range_count),
            below_range_percentage: percentage(below_range_count),
            above_range_percentage: percentage(above_range_count),
            min_voltage,
            max_voltage,
            avg_voltage: (valid_readings > 0).then(|| sum / valid_readings as f64),
            acceptable_range,
        }
    }
}

/// Readings that survive the fault filter, as chronological (time, value)
/// points. Shared by the aggregator and the raw chart payload so both see
/// the same data.
pub fn filtered_points(readings: &[Reading]) -> Vec<(DateTime<Utc>, f64)> {
    readings
        .iter()
        .filter_map(|reading| reading.numeric_value().map(|value| (reading.timestamp, value)))
        .filter(|(_, value)| *value >= HARD_ERROR_FLOOR)
        .collect()
}

/// Sea-level equivalent of a station-altitude absolute pressure, via the
/// barometric formula. `P0 = P1 * (1 - 0.0065h/(T + 0.0065h + 273.15))^-5.257`
pub fn sea_level_pressure(absolute_hpa: f64, altitude_m: f64, temperature_c: f64) -> f64 {
    let lapse = 0.0065 * altitude_m;
    absolute_hpa * (1.0 - lapse / (temperature_c + lapse + 273.15)).powf(-5.257)
}
