//! Camera service
//!
//! Owns the driver and encoder and serializes frame acquisition: the
//! camera is a single exclusive resource, so only one acquisition may be
//! in flight at a time across capture and all stream connections.

use crate::camera::{CameraDriver, Frame, FrameEncoder, PixelFormat};
use crate::error::Result;
use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Scoped ownership of one acquired frame
///
/// Returns the frame to the driver on drop, so every exit path (success,
/// encode failure, client disconnect) releases exactly once.
pub struct FrameGuard {
    driver: Arc<dyn CameraDriver>,
    frame: Option<Frame>,
}

impl FrameGuard {
    fn new(driver: Arc<dyn CameraDriver>, frame: Frame) -> Self {
        Self {
            driver,
            frame: Some(frame),
        }
    }

    pub fn frame(&self) -> &Frame {
        self.frame
            .as_ref()
            .expect("frame present until guard drops")
    }

    pub fn format(&self) -> PixelFormat {
        self.frame().format
    }
}

impl Drop for FrameGuard {
    fn drop(&mut self) {
        if let Some(frame) = self.frame.take() {
            self.driver.release(frame);
        }
    }
}

/// Shared camera front: exclusive acquisition plus JPEG conversion
pub struct CameraService {
    driver: Arc<dyn CameraDriver>,
    encoder: Arc<dyn FrameEncoder>,
    acquire_lock: Mutex<()>,
}

impl CameraService {
    pub fn new(driver: Arc<dyn CameraDriver>, encoder: Arc<dyn FrameEncoder>) -> Self {
        Self {
            driver,
            encoder,
            acquire_lock: Mutex::new(()),
        }
    }

    /// Acquire one frame under the exclusive acquisition lock.
    ///
    /// The lock spans only the driver call; slow clients holding a guard
    /// do not starve other connections.
    pub async fn acquire_frame(&self) -> Result<FrameGuard> {
        let frame = {
            let _exclusive = self.acquire_lock.lock().await;
            self.driver.acquire().await?
        };
        Ok(FrameGuard::new(self.driver.clone(), frame))
    }

    /// Convert a held frame to JPEG bytes. JPEG frames are passed through;
    /// raw frames go through the encoder at the given sensor quality.
    pub fn frame_to_jpeg(&self, guard: &FrameGuard, quality: u8) -> Result<Bytes> {
        let frame = guard.frame();
        if frame.format.is_jpeg() {
            Ok(frame.data.clone())
        } else {
            self.encoder.encode(frame, quality)
        }
    }

    /// One-shot capture: acquire, convert, release.
    pub async fn capture_jpeg(&self, quality: u8) -> Result<Bytes> {
        let guard = self.acquire_frame().await?;
        self.frame_to_jpeg(&guard, quality)
    }
}
