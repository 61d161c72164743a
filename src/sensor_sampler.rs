//! Sensor Sampler
//!
//! Single periodic task reading the environmental sensor and feeding the
//! Device State Store. Runs independently of request handling: a stuck
//! probe read is cut off by a timeout and can never stall the server.
//!
//! Failed or corrupt reads keep the previous snapshot; the snapshot is
//! only marked stale once no valid sample has landed within the
//! staleness window. Staleness is preferred over corruption.

use crate::device_state::DeviceStateStore;
use crate::sensors::{SensorDriver, SensorSnapshot};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Periodic sensor sampling task
pub struct SensorSampler {
    driver: Arc<dyn SensorDriver>,
    store: Arc<DeviceStateStore>,
    /// Tick interval
    interval: Duration,
    /// Cap on a single driver read
    read_timeout: Duration,
    /// Age of the last valid sample after which the snapshot goes stale
    stale_after: Duration,
    last_valid: RwLock<Option<Instant>>,
}

impl SensorSampler {
    pub fn new(driver: Arc<dyn SensorDriver>, store: Arc<DeviceStateStore>) -> Self {
        Self {
            driver,
            store,
            interval: Duration::from_secs(5),
            read_timeout: Duration::from_secs(2),
            stale_after: Duration::from_secs(15),
            last_valid: RwLock::new(None),
        }
    }

    /// Override the tick interval; staleness follows at three intervals.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self.stale_after = interval * 3;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Spawn the background sampling loop.
    pub fn start(self: Arc<Self>) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            stale_after_secs = self.stale_after.as_secs(),
            "Sensor sampler started"
        );

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            loop {
                ticker.tick().await;
                self.tick().await;
            }
        });
    }

    /// One sampling pass. Errors are contained here; nothing propagates.
    pub async fn tick(&self) {
        let read = tokio::time::timeout(self.read_timeout, self.driver.read()).await;

        match read {
            Ok(Ok(reading)) if reading.is_valid() => {
                let sampled_at_ms = chrono::Utc::now().timestamp_millis() as u64;
                self.store
                    .set_sensor_snapshot(SensorSnapshot::from_reading(&reading, sampled_at_ms))
                    .await;
                *self.last_valid.write().await = Some(Instant::now());
                debug!(
                    temperature_c = reading.temperature_c,
                    humidity_pct = reading.humidity_pct,
                    soil_moisture_pct = reading.soil_moisture_pct,
                    "Sensor snapshot updated"
                );
            }
            Ok(Ok(reading)) => {
                warn!(
                    temperature_c = reading.temperature_c,
                    humidity_pct = reading.humidity_pct,
                    soil_moisture_pct = reading.soil_moisture_pct,
                    "Discarding sensor reading that failed validation"
                );
                self.mark_stale_if_overdue().await;
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Sensor read failed");
                self.mark_stale_if_overdue().await;
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.read_timeout.as_millis() as u64,
                    "Sensor read timed out"
                );
                self.mark_stale_if_overdue().await;
            }
        }
    }

    async fn mark_stale_if_overdue(&self) {
        let overdue = match *self.last_valid.read().await {
            Some(at) => at.elapsed() > self.stale_after,
            // Never had a valid sample; the default snapshot is already invalid.
            None => false,
        };
        if overdue {
            self.store.mark_sensors_stale().await;
        }
    }
}
