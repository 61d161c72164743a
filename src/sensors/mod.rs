//! Environmental sensor model and driver seam
//!
//! ## Responsibilities
//!
//! - Raw reading model and physical-range validation
//! - Snapshot type served to clients
//! - `SensorDriver` trait: the narrow interface the sensor hardware is behind

pub mod synthetic;

pub use synthetic::SyntheticSensor;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Physical range the temperature probe can report, in Celsius
const TEMPERATURE_RANGE_C: std::ops::RangeInclusive<f32> = -40.0..=85.0;

/// One raw reading from the sensor driver, unvalidated
#[derive(Debug, Clone, Copy)]
pub struct SensorReading {
    pub temperature_c: f32,
    pub humidity_pct: f32,
    pub soil_moisture_pct: i32,
}

impl SensorReading {
    /// Validity check: NaN or physically impossible values mean the read
    /// was corrupt and must not overwrite the previous snapshot.
    pub fn is_valid(&self) -> bool {
        !self.temperature_c.is_nan()
            && !self.humidity_pct.is_nan()
            && TEMPERATURE_RANGE_C.contains(&self.temperature_c)
            && (0.0..=100.0).contains(&self.humidity_pct)
            && (0..=100).contains(&self.soil_moisture_pct)
    }
}

/// Latest validated sensor state, plus staleness marker
///
/// Written only by the sampler; `sampled_at_ms` never regresses.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SensorSnapshot {
    pub temperature_c: f32,
    pub humidity_pct: f32,
    pub soil_moisture_pct: u8,
    pub sampled_at_ms: u64,
    pub valid: bool,
}

impl Default for SensorSnapshot {
    fn default() -> Self {
        Self {
            temperature_c: 0.0,
            humidity_pct: 0.0,
            soil_moisture_pct: 0,
            sampled_at_ms: 0,
            valid: false,
        }
    }
}

impl SensorSnapshot {
    /// Build a snapshot from a reading that already passed validation.
    pub fn from_reading(reading: &SensorReading, sampled_at_ms: u64) -> Self {
        Self {
            temperature_c: reading.temperature_c,
            humidity_pct: reading.humidity_pct,
            soil_moisture_pct: reading.soil_moisture_pct as u8,
            sampled_at_ms,
            valid: true,
        }
    }
}

/// Narrow interface to the environmental sensor hardware
#[async_trait]
pub trait SensorDriver: Send + Sync {
    /// Read temperature, humidity and soil moisture once.
    async fn read(&self) -> Result<SensorReading>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(t: f32, h: f32, soil: i32) -> SensorReading {
        SensorReading {
            temperature_c: t,
            humidity_pct: h,
            soil_moisture_pct: soil,
        }
    }

    #[test]
    fn plausible_reading_is_valid() {
        assert!(reading(22.5, 45.0, 60).is_valid());
        assert!(reading(-40.0, 0.0, 0).is_valid());
        assert!(reading(85.0, 100.0, 100).is_valid());
    }

    #[test]
    fn nan_is_invalid() {
        assert!(!reading(f32::NAN, 45.0, 60).is_valid());
        assert!(!reading(22.5, f32::NAN, 60).is_valid());
    }

    #[test]
    fn out_of_physical_range_is_invalid() {
        assert!(!reading(120.0, 45.0, 60).is_valid());
        assert!(!reading(22.5, 101.0, 60).is_valid());
        assert!(!reading(22.5, 45.0, -1).is_valid());
        assert!(!reading(22.5, 45.0, 101).is_valid());
    }

    #[test]
    fn snapshot_carries_timestamp_and_validity() {
        let snap = SensorSnapshot::from_reading(&reading(22.5, 45.0, 60), 1234);
        assert!(snap.valid);
        assert_eq!(snap.sampled_at_ms, 1234);
        assert_eq!(snap.soil_moisture_pct, 60);
    }
}
