//! Device State Store
//!
//! Single owner of mutable device state: camera settings and the latest
//! sensor snapshot. Handlers never touch shared variables directly; all
//! reads and writes go through the accessors here. Settings and the
//! snapshot are independently lockable so sensor updates never contend
//! with control-path reads.

use crate::camera::{CameraDriver, CameraSettings, FrameSize, Setting};
use crate::error::{Error, Result};
use crate::sensors::SensorSnapshot;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Quality values accepted by the data model; the sensor itself may
/// refuse part of this range (reported as `DeviceRejected`).
const QUALITY_RANGE: std::ops::RangeInclusive<i32> = 2..=63;
const LEVEL_RANGE: std::ops::RangeInclusive<i32> = -2..=2;
const FLASH_RANGE: std::ops::RangeInclusive<i32> = 0..=255;

/// Owns current camera settings and the latest sensor snapshot
pub struct DeviceStateStore {
    driver: Arc<dyn CameraDriver>,
    settings: RwLock<CameraSettings>,
    snapshot: RwLock<SensorSnapshot>,
}

impl DeviceStateStore {
    pub fn new(driver: Arc<dyn CameraDriver>) -> Self {
        Self {
            driver,
            settings: RwLock::new(CameraSettings::default()),
            snapshot: RwLock::new(SensorSnapshot::default()),
        }
    }

    pub async fn settings(&self) -> CameraSettings {
        *self.settings.read().await
    }

    pub async fn sensor_snapshot(&self) -> SensorSnapshot {
        *self.snapshot.read().await
    }

    /// Validate a setting change, push it to the hardware, and store it.
    ///
    /// Only a driver-accepted value is stored, so a failed apply leaves
    /// the previous settings fully intact. Frame size and quality require
    /// a JPEG-capable sensor format. A successful flash change drives the
    /// indicator output immediately.
    pub async fn apply_setting(&self, setting: Setting, value: i32) -> Result<()> {
        let mut settings = self.settings.write().await;

        match setting {
            Setting::FrameSize => {
                self.require_jpeg(setting, value)?;
                let frame_size = FrameSize::try_from(value)?;
                self.driver.apply(setting, value)?;
                settings.frame_size = frame_size;
            }
            Setting::Quality => {
                self.require_jpeg(setting, value)?;
                if !QUALITY_RANGE.contains(&value) {
                    return Err(Error::InvalidValue {
                        setting: setting.wire_name(),
                        value,
                    });
                }
                self.driver.apply(setting, value)?;
                settings.quality = value as u8;
            }
            Setting::Brightness => {
                if !LEVEL_RANGE.contains(&value) {
                    return Err(Error::InvalidValue {
                        setting: setting.wire_name(),
                        value,
                    });
                }
                self.driver.apply(setting, value)?;
                settings.brightness = value as i8;
            }
            Setting::Contrast => {
                if !LEVEL_RANGE.contains(&value) {
                    return Err(Error::InvalidValue {
                        setting: setting.wire_name(),
                        value,
                    });
                }
                self.driver.apply(setting, value)?;
                settings.contrast = value as i8;
            }
            Setting::Flash => {
                if !FLASH_RANGE.contains(&value) {
                    return Err(Error::InvalidValue {
                        setting: setting.wire_name(),
                        value,
                    });
                }
                self.driver.set_flash_level(value as u8);
                settings.flash_level = value as u8;
            }
        }

        tracing::info!(
            setting = setting.wire_name(),
            value,
            "Camera setting applied"
        );
        Ok(())
    }

    /// Replace the snapshot with a newer one. An older timestamp is
    /// dropped so readers never observe time going backwards.
    pub async fn set_sensor_snapshot(&self, snapshot: SensorSnapshot) {
        let mut current = self.snapshot.write().await;
        if snapshot.sampled_at_ms < current.sampled_at_ms {
            tracing::warn!(
                incoming_ms = snapshot.sampled_at_ms,
                current_ms = current.sampled_at_ms,
                "Dropping sensor snapshot older than stored one"
            );
            return;
        }
        *current = snapshot;
    }

    /// Flip the staleness marker while keeping the last valid values.
    pub async fn mark_sensors_stale(&self) {
        let mut current = self.snapshot.write().await;
        if current.valid {
            tracing::warn!(
                sampled_at_ms = current.sampled_at_ms,
                "Sensor snapshot marked stale"
            );
            current.valid = false;
        }
    }

    fn require_jpeg(&self, setting: Setting, value: i32) -> Result<()> {
        if self.driver.pixel_format().is_jpeg() {
            Ok(())
        } else {
            Err(Error::DeviceRejected {
                setting: setting.wire_name(),
                value,
            })
        }
    }
}
