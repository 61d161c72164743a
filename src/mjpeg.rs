//! MJPEG streaming over multipart/x-mixed-replace
//!
//! The response body never ends while the connection is open: each part
//! carries one JPEG frame behind a small header declaring its exact byte
//! length, followed by the boundary delimiter. Declaring a fresh
//! `Content-Length` per frame lets clients split frames by length instead
//! of scanning payload bytes for the delimiter. The length is recomputed
//! every frame; encoder output varies call to call.
//!
//! Each connection runs its own acquire/encode/send loop, paced purely by
//! camera latency and serialized at the camera's acquisition lock. The
//! loop ends only when the client goes away (the body stream is dropped)
//! or a frame fails to materialize.

use crate::camera::CameraService;
use crate::device_state::DeviceStateStore;
use crate::error::Result;
use axum::body::Body;
use bytes::Bytes;
use futures::stream;
use std::convert::Infallible;
use std::sync::Arc;

/// Part delimiter; long enough that no JPEG scan-data run mimics it.
pub const BOUNDARY: &str = "plantcam_frame_boundary";

/// Content type for the streaming response
pub fn content_type() -> String {
    format!("multipart/x-mixed-replace; boundary={BOUNDARY}")
}

/// Frame one JPEG payload as a stream part: header block, payload, then
/// the boundary that precedes the next part.
pub fn encode_part(jpeg: &[u8]) -> Bytes {
    let header = format!(
        "Content-Type: image/jpeg\r\nContent-Length: {}\r\n\r\n",
        jpeg.len()
    );
    let boundary = format!("\r\n--{BOUNDARY}\r\n");

    let mut part = Vec::with_capacity(header.len() + jpeg.len() + boundary.len());
    part.extend_from_slice(header.as_bytes());
    part.extend_from_slice(jpeg);
    part.extend_from_slice(boundary.as_bytes());
    Bytes::from(part)
}

/// Per-connection stream state; logs its tally when the viewer leaves.
struct StreamSession {
    sequence: u64,
    last_frame_len: usize,
}

impl StreamSession {
    fn new() -> Self {
        tracing::info!("Stream viewer connected");
        Self {
            sequence: 0,
            last_frame_len: 0,
        }
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        tracing::info!(
            frames = self.sequence,
            last_frame_len = self.last_frame_len,
            "Stream viewer disconnected"
        );
    }
}

/// Produce one part: acquire under the exclusive lock, convert at the
/// current quality, release via the guard on every path.
async fn next_part(
    camera: &CameraService,
    store: &DeviceStateStore,
    session: &mut StreamSession,
) -> Result<Bytes> {
    let guard = camera.acquire_frame().await?;
    let quality = store.settings().await.quality;
    let jpeg = camera.frame_to_jpeg(&guard, quality)?;
    drop(guard);

    session.sequence += 1;
    session.last_frame_len = jpeg.len();
    Ok(encode_part(&jpeg))
}

/// Build the unbounded streaming body for one viewer.
pub fn stream_body(camera: Arc<CameraService>, store: Arc<DeviceStateStore>) -> Body {
    let session = StreamSession::new();

    let parts = stream::unfold(
        (camera, store, session),
        |(camera, store, mut session)| async move {
            match next_part(&camera, &store, &mut session).await {
                Ok(bytes) => Some((Ok::<_, Infallible>(bytes), (camera, store, session))),
                Err(e) => {
                    tracing::warn!(error = %e, frames = session.sequence, "Stream aborted");
                    None
                }
            }
        },
    );

    Body::from_stream(parts)
}
