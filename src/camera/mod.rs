//! Camera model and driver seam
//!
//! ## Responsibilities
//!
//! - Frame and pixel-format model
//! - Camera parameter model (frame size, quality, brightness, contrast, flash)
//! - `CameraDriver` trait: the narrow interface the physical camera is behind
//! - `FrameGuard`: scoped frame ownership, released exactly once on every exit path

mod encoder;
mod service;
pub mod synthetic;

pub use encoder::{FrameEncoder, ImageJpegEncoder};
pub use service::{CameraService, FrameGuard};

use crate::error::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Pixel format of a captured frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// Hardware-compressed JPEG
    Jpeg,
    /// 8-bit grayscale
    Grayscale,
    /// 16-bit RGB565
    Rgb565,
}

impl PixelFormat {
    pub fn is_jpeg(&self) -> bool {
        matches!(self, PixelFormat::Jpeg)
    }
}

/// One captured image buffer, raw or JPEG
///
/// Exclusively owned by whichever handler holds it; returned to the driver
/// exactly once per acquisition via [`FrameGuard`].
#[derive(Debug)]
pub struct Frame {
    pub data: Bytes,
    pub format: PixelFormat,
    pub width: u32,
    pub height: u32,
    pub acquired_at: Instant,
}

impl Frame {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Frame size presets, numbered the way the sensor registers them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum FrameSize {
    Square96 = 0,
    Qqvga = 1,
    Qcif = 2,
    Hqvga = 3,
    Square240 = 4,
    Qvga = 5,
    Cif = 6,
    Hvga = 7,
    Vga = 8,
    Svga = 9,
    Xga = 10,
    Hd = 11,
    Sxga = 12,
    Uxga = 13,
}

impl FrameSize {
    /// Pixel dimensions (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            FrameSize::Square96 => (96, 96),
            FrameSize::Qqvga => (160, 120),
            FrameSize::Qcif => (176, 144),
            FrameSize::Hqvga => (240, 176),
            FrameSize::Square240 => (240, 240),
            FrameSize::Qvga => (320, 240),
            FrameSize::Cif => (400, 296),
            FrameSize::Hvga => (480, 320),
            FrameSize::Vga => (640, 480),
            FrameSize::Svga => (800, 600),
            FrameSize::Xga => (1024, 768),
            FrameSize::Hd => (1280, 720),
            FrameSize::Sxga => (1280, 1024),
            FrameSize::Uxga => (1600, 1200),
        }
    }
}

impl TryFrom<i32> for FrameSize {
    type Error = Error;

    fn try_from(value: i32) -> Result<Self> {
        let size = match value {
            0 => FrameSize::Square96,
            1 => FrameSize::Qqvga,
            2 => FrameSize::Qcif,
            3 => FrameSize::Hqvga,
            4 => FrameSize::Square240,
            5 => FrameSize::Qvga,
            6 => FrameSize::Cif,
            7 => FrameSize::Hvga,
            8 => FrameSize::Vga,
            9 => FrameSize::Svga,
            10 => FrameSize::Xga,
            11 => FrameSize::Hd,
            12 => FrameSize::Sxga,
            13 => FrameSize::Uxga,
            _ => {
                return Err(Error::InvalidValue {
                    setting: Setting::FrameSize.wire_name(),
                    value,
                })
            }
        };
        Ok(size)
    }
}

/// Runtime camera parameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CameraSettings {
    pub frame_size: FrameSize,
    /// Sensor quality scale, 2..=63, lower is better
    pub quality: u8,
    pub brightness: i8,
    pub contrast: i8,
    pub flash_level: u8,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            frame_size: FrameSize::Qvga,
            quality: 10,
            brightness: 0,
            contrast: 0,
            flash_level: 0,
        }
    }
}

/// The fixed table of controllable settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Setting {
    FrameSize,
    Quality,
    Brightness,
    Contrast,
    Flash,
}

impl Setting {
    /// Parse the wire name used by the `/control` endpoint
    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "framesize" => Some(Setting::FrameSize),
            "quality" => Some(Setting::Quality),
            "brightness" => Some(Setting::Brightness),
            "contrast" => Some(Setting::Contrast),
            "flash" => Some(Setting::Flash),
            _ => None,
        }
    }

    pub fn wire_name(&self) -> &'static str {
        match self {
            Setting::FrameSize => "framesize",
            Setting::Quality => "quality",
            Setting::Brightness => "brightness",
            Setting::Contrast => "contrast",
            Setting::Flash => "flash",
        }
    }
}

/// Narrow interface to the physical camera
///
/// Acquire and release are paired: every frame handed out by `acquire`
/// must come back through `release` exactly once. Handlers never call
/// these directly; [`CameraService`] wraps acquisition in a guard.
#[async_trait]
pub trait CameraDriver: Send + Sync {
    /// Acquire one frame. Fails with `CaptureUnavailable` when the
    /// hardware has nothing to give.
    async fn acquire(&self) -> Result<Frame>;

    /// Return a frame to the driver's buffer pool.
    fn release(&self, frame: Frame);

    /// Pixel format the sensor is currently configured for.
    fn pixel_format(&self) -> PixelFormat;

    /// Push a validated setting to the hardware. Fails with
    /// `DeviceRejected` when the sensor refuses the value.
    fn apply(&self, setting: Setting, value: i32) -> Result<()>;

    /// Drive the flash indicator output. The hardware PWM write cannot fail.
    fn set_flash_level(&self, level: u8);
}
