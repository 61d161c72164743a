//! Synthetic sensor backend
//!
//! Produces plausible drifting greenhouse readings in place of the real
//! probe hardware. Tests script failures and corrupt readings through it.

use crate::error::{Error, Result};
use crate::sensors::{SensorDriver, SensorReading};
use async_trait::async_trait;
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};

/// Drifting fake probe implementing the sensor seam
pub struct SyntheticSensor {
    fail_next: AtomicBool,
    corrupt_next: AtomicBool,
}

impl SyntheticSensor {
    pub fn new() -> Self {
        Self {
            fail_next: AtomicBool::new(false),
            corrupt_next: AtomicBool::new(false),
        }
    }

    /// Script the next read to fail outright.
    pub fn fail_next_read(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// Script the next read to return a physically impossible value.
    pub fn corrupt_next_read(&self) {
        self.corrupt_next.store(true, Ordering::SeqCst);
    }
}

impl Default for SyntheticSensor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SensorDriver for SyntheticSensor {
    async fn read(&self) -> Result<SensorReading> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(Error::SensorRead("probe did not respond".into()));
        }
        if self.corrupt_next.swap(false, Ordering::SeqCst) {
            return Ok(SensorReading {
                temperature_c: f32::NAN,
                humidity_pct: -3.0,
                soil_moisture_pct: 400,
            });
        }

        let mut rng = rand::thread_rng();
        Ok(SensorReading {
            temperature_c: 22.0 + rng.gen_range(-1.5..1.5),
            humidity_pct: 48.0 + rng.gen_range(-4.0..4.0),
            soil_moisture_pct: 55 + rng.gen_range(-5..5),
        })
    }
}
