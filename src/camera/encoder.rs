//! JPEG frame encoder
//!
//! Converts a raw frame to a JPEG byte buffer. Already-JPEG frames pass
//! through untouched. The encoder is a seam so hardware-assisted
//! implementations can replace the software one.

use crate::camera::{Frame, PixelFormat};
use crate::error::{Error, Result};
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::{GrayImage, ImageBuffer, ImageEncoder, RgbImage};

/// Converts a non-JPEG frame to a JPEG byte buffer
pub trait FrameEncoder: Send + Sync {
    /// Encode at the given sensor-scale quality (2..=63, lower is better).
    fn encode(&self, frame: &Frame, quality: u8) -> Result<Bytes>;
}

/// Software encoder backed by the `image` crate
pub struct ImageJpegEncoder;

/// Map the sensor quality scale (2..=63, lower is better) onto the
/// encoder's percentage scale (1..=100, higher is better).
pub fn jpeg_quality_from_sensor(quality: u8) -> u8 {
    let q = quality.clamp(2, 63) as u16;
    (((63 - q) * 100) / 61).clamp(1, 100) as u8
}

impl FrameEncoder for ImageJpegEncoder {
    fn encode(&self, frame: &Frame, quality: u8) -> Result<Bytes> {
        if frame.format.is_jpeg() {
            return Ok(frame.data.clone());
        }

        let mut jpeg = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut jpeg, jpeg_quality_from_sensor(quality));

        match frame.format {
            PixelFormat::Jpeg => unreachable!("handled above"),
            PixelFormat::Grayscale => {
                let img: GrayImage =
                    ImageBuffer::from_raw(frame.width, frame.height, frame.data.to_vec())
                        .ok_or_else(|| {
                            Error::EncodeFailure(format!(
                                "grayscale buffer of {} bytes does not fit {}x{}",
                                frame.len(),
                                frame.width,
                                frame.height
                            ))
                        })?;
                encoder
                    .write_image(
                        img.as_raw(),
                        frame.width,
                        frame.height,
                        image::ExtendedColorType::L8,
                    )
                    .map_err(|e| Error::EncodeFailure(e.to_string()))?;
            }
            PixelFormat::Rgb565 => {
                let img = rgb565_to_rgb(frame)?;
                encoder
                    .write_image(
                        img.as_raw(),
                        frame.width,
                        frame.height,
                        image::ExtendedColorType::Rgb8,
                    )
                    .map_err(|e| Error::EncodeFailure(e.to_string()))?;
            }
        }

        Ok(Bytes::from(jpeg))
    }
}

/// Expand big-endian RGB565 pixels to 8-bit RGB
fn rgb565_to_rgb(frame: &Frame) -> Result<RgbImage> {
    let expected = (frame.width * frame.height * 2) as usize;
    if frame.len() != expected {
        return Err(Error::EncodeFailure(format!(
            "rgb565 buffer of {} bytes does not fit {}x{}",
            frame.len(),
            frame.width,
            frame.height
        )));
    }

    let mut rgb = Vec::with_capacity((frame.width * frame.height * 3) as usize);
    for px in frame.data.chunks_exact(2) {
        let v = u16::from_be_bytes([px[0], px[1]]);
        let r = ((v >> 11) & 0x1f) as u8;
        let g = ((v >> 5) & 0x3f) as u8;
        let b = (v & 0x1f) as u8;
        rgb.push((r << 3) | (r >> 2));
        rgb.push((g << 2) | (g >> 4));
        rgb.push((b << 3) | (b >> 2));
    }

    ImageBuffer::from_raw(frame.width, frame.height, rgb)
        .ok_or_else(|| Error::EncodeFailure("rgb565 conversion produced short buffer".into()))
}
