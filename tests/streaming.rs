//! MJPEG stream protocol tests: part framing, termination, concurrent
//! viewers across a mid-stream control update.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use futures::StreamExt;
use plantcam::camera::synthetic::SyntheticCamera;
use plantcam::camera::{CameraService, ImageJpegEncoder, Setting};
use plantcam::device_state::DeviceStateStore;
use plantcam::mjpeg;
use plantcam::state::{AppConfig, AppState};
use plantcam::web_api;
use std::sync::Arc;
use tower::ServiceExt;

fn make_state() -> (Arc<SyntheticCamera>, AppState) {
    let driver = Arc::new(SyntheticCamera::new());
    let camera = Arc::new(CameraService::new(
        driver.clone(),
        Arc::new(ImageJpegEncoder),
    ));
    let store = Arc::new(DeviceStateStore::new(driver.clone()));
    (driver, AppState::new(AppConfig::default(), camera, store))
}

async fn open_stream(state: &AppState) -> axum::response::Response {
    web_api::stream_router(state.clone())
        .oneshot(Request::get("/stream").body(Body::empty()).unwrap())
        .await
        .unwrap()
}

/// Incremental parser over the raw stream bytes: splits parts by the
/// declared Content-Length, the way a length-based client would.
struct PartReader {
    body: axum::body::BodyDataStream,
    buffer: Vec<u8>,
}

impl PartReader {
    fn new(response: axum::response::Response) -> Self {
        Self {
            body: response.into_body().into_data_stream(),
            buffer: Vec::new(),
        }
    }

    /// Read the next (declared length, payload) pair, or None at stream end.
    async fn next_part(&mut self) -> Option<(usize, Vec<u8>)> {
        let trailer = format!("\r\n--{}\r\n", mjpeg::BOUNDARY).into_bytes();

        loop {
            if let Some(header_end) = find(&self.buffer, b"\r\n\r\n") {
                let header = String::from_utf8(self.buffer[..header_end].to_vec()).unwrap();
                assert!(header.contains("Content-Type: image/jpeg"));
                let declared: usize = header
                    .lines()
                    .find_map(|l| l.strip_prefix("Content-Length: "))
                    .expect("declared length")
                    .parse()
                    .unwrap();

                let payload_start = header_end + 4;
                let part_end = payload_start + declared + trailer.len();
                if self.buffer.len() >= part_end {
                    let payload = self.buffer[payload_start..payload_start + declared].to_vec();
                    assert_eq!(
                        &self.buffer[payload_start + declared..part_end],
                        &trailer[..]
                    );
                    self.buffer.drain(..part_end);
                    return Some((declared, payload));
                }
            }

            let chunk = self.body.next().await?.unwrap();
            self.buffer.extend_from_slice(&chunk);
        }
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[tokio::test]
async fn stream_response_declares_multipart_content_type() {
    let (_, state) = make_state();
    let response = open_stream(&state).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE].to_str().unwrap(),
        mjpeg::content_type()
    );
    let cache = response.headers()[header::CACHE_CONTROL].to_str().unwrap();
    assert!(cache.contains("no-cache"));
}

#[tokio::test]
async fn parts_declare_exact_payload_length() {
    let (driver, state) = make_state();
    let mut reader = PartReader::new(open_stream(&state).await);

    for _ in 0..5 {
        let (declared, payload) = reader.next_part().await.expect("stream is unbounded");
        assert_eq!(declared, payload.len());
        assert_eq!(&payload[0..2], &[0xff, 0xd8]);
    }

    drop(reader);
    assert_eq!(driver.outstanding_frames(), 0);
    assert_eq!(driver.acquire_count(), driver.release_count());
}

#[tokio::test]
async fn stream_ends_when_capture_fails() {
    let (driver, state) = make_state();
    driver.fail_next_acquire();

    let mut reader = PartReader::new(open_stream(&state).await);
    assert!(reader.next_part().await.is_none());
    assert_eq!(driver.outstanding_frames(), 0);
}

#[tokio::test]
async fn viewer_disconnect_stops_acquisition() {
    let (driver, state) = make_state();
    let mut reader = PartReader::new(open_stream(&state).await);

    reader.next_part().await.unwrap();
    reader.next_part().await.unwrap();
    let acquired_while_connected = driver.acquire_count();
    drop(reader);

    // Nothing polls the body anymore; the loop is gone with it.
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    assert_eq!(driver.acquire_count(), acquired_while_connected);
    assert_eq!(driver.outstanding_frames(), 0);
}

#[tokio::test]
async fn concurrent_viewers_survive_a_mid_stream_quality_change() {
    let (driver, state) = make_state();

    let mut viewers = Vec::new();
    for _ in 0..3 {
        viewers.push(PartReader::new(open_stream(&state).await));
    }

    let mut before = Vec::new();
    for viewer in &mut viewers {
        let (len, _) = viewer.next_part().await.expect("part before update");
        before.push(len);
    }

    // Control update mid-playback; only subsequent frames are affected.
    state
        .store
        .apply_setting(Setting::Quality, 60)
        .await
        .unwrap();

    for (viewer, &before_len) in viewers.iter_mut().zip(&before) {
        // The very next part may predate the update on a busy schedule;
        // the one after it must reflect the coarser quality.
        viewer.next_part().await.expect("stream survives update");
        let (after_len, payload) = viewer.next_part().await.expect("stream survives update");
        assert_eq!(&payload[0..2], &[0xff, 0xd8]);
        assert!(
            after_len < before_len,
            "coarser quality should shrink frames: {after_len} vs {before_len}"
        );
    }

    drop(viewers);
    assert_eq!(driver.outstanding_frames(), 0);
}
