//! Synthetic camera backend
//!
//! Stand-in for the hardware driver: generates a moving test pattern and
//! models the sensor's behavior (quality floor, JPEG output, frame-buffer
//! accounting). Real hardware drivers implement [`CameraDriver`] in its
//! place. Tests use the acquire/release counters and scripted failures.

use crate::camera::{
    CameraDriver, Frame, FrameEncoder, FrameSize, ImageJpegEncoder, PixelFormat, Setting,
};
use crate::error::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Quality values below this are refused by the sensor, matching the
/// OV-series floor observed on the source hardware.
const SENSOR_QUALITY_FLOOR: u8 = 10;

#[derive(Debug)]
struct SensorState {
    frame_size: FrameSize,
    quality: u8,
    brightness: i8,
    contrast: i8,
    sequence: u64,
}

/// Test-pattern camera implementing the driver seam
pub struct SyntheticCamera {
    state: Mutex<SensorState>,
    format: PixelFormat,
    flash_level: AtomicU8,
    acquired: AtomicUsize,
    released: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    fail_next: AtomicBool,
}

impl SyntheticCamera {
    /// JPEG-producing camera, the sensor's native mode.
    pub fn new() -> Self {
        Self::with_format(PixelFormat::Jpeg)
    }

    /// Camera emitting raw frames so the server-side encoder is exercised.
    pub fn with_format(format: PixelFormat) -> Self {
        Self {
            state: Mutex::new(SensorState {
                frame_size: FrameSize::Qvga,
                quality: 10,
                brightness: 0,
                contrast: 0,
                sequence: 0,
            }),
            format,
            flash_level: AtomicU8::new(0),
            acquired: AtomicUsize::new(0),
            released: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            fail_next: AtomicBool::new(false),
        }
    }

    /// Script the next acquire to fail with `CaptureUnavailable`.
    pub fn fail_next_acquire(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// Frames handed out so far.
    pub fn acquire_count(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    /// Frames returned so far.
    pub fn release_count(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    /// Frames currently held by handlers.
    pub fn outstanding_frames(&self) -> usize {
        self.acquire_count() - self.release_count()
    }

    /// Highest number of simultaneous acquire calls observed.
    pub fn max_concurrent_acquires(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Level last written to the flash output.
    pub fn flash_output(&self) -> u8 {
        self.flash_level.load(Ordering::SeqCst)
    }

    fn render(&self) -> Result<Frame> {
        let (width, height, quality, sequence) = {
            let mut state = self.state.lock().expect("sensor state lock");
            state.sequence = state.sequence.wrapping_add(1);
            let (w, h) = state.frame_size.dimensions();
            (w, h, state.quality, state.sequence)
        };

        let mut data = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                data.push((x.wrapping_add(y).wrapping_add((sequence as u32).wrapping_mul(3)) % 256) as u8);
            }
        }

        let raw = Frame {
            data: Bytes::from(data),
            format: PixelFormat::Grayscale,
            width,
            height,
            acquired_at: Instant::now(),
        };

        match self.format {
            PixelFormat::Jpeg => {
                // The sensor compresses in hardware at its own quality.
                let jpeg = ImageJpegEncoder.encode(&raw, quality)?;
                Ok(Frame {
                    data: jpeg,
                    format: PixelFormat::Jpeg,
                    width,
                    height,
                    acquired_at: raw.acquired_at,
                })
            }
            _ => Ok(raw),
        }
    }
}

impl Default for SyntheticCamera {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CameraDriver for SyntheticCamera {
    async fn acquire(&self) -> Result<Frame> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        // Sensor readout latency; this is the natural frame pacing.
        tokio::time::sleep(Duration::from_millis(2)).await;

        let result = if self.fail_next.swap(false, Ordering::SeqCst) {
            Err(Error::CaptureUnavailable("sensor returned no frame".into()))
        } else {
            self.render().inspect(|_| {
                self.acquired.fetch_add(1, Ordering::SeqCst);
            })
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn release(&self, frame: Frame) {
        drop(frame);
        self.released.fetch_add(1, Ordering::SeqCst);
    }

    fn pixel_format(&self) -> PixelFormat {
        self.format
    }

    fn apply(&self, setting: Setting, value: i32) -> Result<()> {
        let mut state = self.state.lock().expect("sensor state lock");
        match setting {
            Setting::FrameSize => {
                state.frame_size = FrameSize::try_from(value)?;
            }
            Setting::Quality => {
                if value < SENSOR_QUALITY_FLOOR as i32 {
                    return Err(Error::DeviceRejected {
                        setting: setting.wire_name(),
                        value,
                    });
                }
                state.quality = value as u8;
            }
            Setting::Brightness => {
                state.brightness = value as i8;
            }
            Setting::Contrast => {
                state.contrast = value as i8;
            }
            Setting::Flash => {
                // Flash is not a sensor register; handled by set_flash_level.
            }
        }
        Ok(())
    }

    fn set_flash_level(&self, level: u8) {
        self.flash_level.store(level, Ordering::SeqCst);
        tracing::debug!(level, "Flash output updated");
    }
}
