// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Decoding and display of the backend's camera stream.
//!
//! Architecture:
//! - `FrameFeed` streams JPEG bytes on the tokio runtime
//! - A decode task turns each new JPEG into RGBA on the blocking pool
//! - Latest decoded frame stored in `Arc<Mutex<Option<VideoFrame>>>`
//! - UI thread takes the frame and uploads it to the GPU texture

use std::sync::{Arc, Mutex};
use std::time::Instant;

use adherence_client::{Client, FrameFeed};
use log::{debug, warn};
use tokio_util::sync::CancellationToken;

/// A decoded video frame ready for rendering
#[derive(Clone)]
pub struct VideoFrame {
    /// Raw RGBA pixel data
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl std::fmt::Debug for VideoFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl VideoFrame {
    /// Convert this frame to an egui `ColorImage` for texture upload
    #[must_use]
    pub fn to_color_image(&self) -> egui::ColorImage {
        egui::ColorImage::from_rgba_unmultiplied([self.width as usize, self.height as usize], &self.data)
    }
}

/// Decode one JPEG into RGBA pixels.
pub fn decode_jpeg(bytes: &[u8]) -> Result<VideoFrame, image::ImageError> {
    let rgba = image::load_from_memory_with_format(bytes, image::ImageFormat::Jpeg)?.to_rgba8();
    Ok(VideoFrame {
        width: rgba.width(),
        height: rgba.height(),
        data: rgba.into_raw(),
    })
}

/// Live camera feed bound to one egui texture.
///
/// Dropping it stops both the stream and the decode task.
pub struct LiveFeed {
    feed: FrameFeed,
    /// Newest decoded frame not yet uploaded
    pending_frame: Arc<Mutex<Option<VideoFrame>>>,
    last_error: Arc<Mutex<Option<String>>>,
    cancel_token: CancellationToken,
    texture: Option<egui::TextureHandle>,
    last_upload: Option<Instant>,
}

impl std::fmt::Debug for LiveFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveFeed")
            .field("url", &self.feed.url())
            .field("has_texture", &self.texture.is_some())
            .finish_non_exhaustive()
    }
}

impl LiveFeed {
    /// Open the client's video feed and start decoding frames.
    #[must_use]
    pub fn start(client: &Client, ctx: egui::Context) -> Self {
        let feed = client.video_feed();
        let pending_frame = Arc::new(Mutex::new(None));
        let last_error = Arc::new(Mutex::new(None));
        let cancel_token = CancellationToken::new();

        let mut frames = feed.subscribe();
        let task_frame = Arc::clone(&pending_frame);
        let task_error = Arc::clone(&last_error);
        let task_cancel = cancel_token.clone();

        client.runtime().spawn(async move {
            loop {
                tokio::select! {
                    changed = frames.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    () = task_cancel.cancelled() => break,
                }

                let Some(jpeg) = frames.borrow_and_update().clone() else {
                    continue;
                };

                let decoded = tokio::task::spawn_blocking(move || decode_jpeg(&jpeg)).await;
                match decoded {
                    Ok(Ok(frame)) => {
                        if let Ok(mut slot) = task_frame.lock() {
                            *slot = Some(frame);
                        }
                        if let Ok(mut error) = task_error.lock() {
                            *error = None;
                        }
                        ctx.request_repaint();
                    }
                    Ok(Err(e)) => {
                        warn!("Dropping undecodable video frame: {}", e);
                        if let Ok(mut error) = task_error.lock() {
                            *error = Some(e.to_string());
                        }
                    }
                    Err(e) => {
                        warn!("Video decode task failed: {}", e);
                        break;
                    }
                }
            }
            debug!("Video decode task stopped");
        });

        Self {
            feed,
            pending_frame,
            last_error,
            cancel_token,
            texture: None,
            last_upload: None,
        }
    }

    #[must_use]
    pub fn url(&self) -> &str {
        self.feed.url()
    }

    /// Last decode error, cleared by the next good frame.
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().ok().and_then(|error| error.clone())
    }

    /// Time since the texture last changed.
    #[must_use]
    pub fn frame_age(&self) -> Option<std::time::Duration> {
        self.last_upload.map(|at| at.elapsed())
    }

    /// Upload the newest frame, if any, and return the texture to draw.
    pub fn texture(&mut self, ctx: &egui::Context) -> Option<&egui::TextureHandle> {
        let frame = self.pending_frame.lock().ok().and_then(|mut slot| slot.take());

        if let Some(frame) = frame {
            let color_image = frame.to_color_image();
            if let Some(texture) = self.texture.as_mut() {
                texture.set(color_image, egui::TextureOptions::LINEAR);
            } else {
                self.texture = Some(ctx.load_texture("medadhere_video_feed", color_image, egui::TextureOptions::LINEAR));
            }
            self.last_upload = Some(Instant::now());
        }

        self.texture.as_ref()
    }
}

impl Drop for LiveFeed {
    fn drop(&mut self) {
        self.cancel_token.cancel();
        self.feed.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::codecs::jpeg::JpegEncoder;
    use image::{Rgb, RgbImage};

    fn tiny_jpeg(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([40, 160, 90]));
        let mut bytes = Vec::new();
        JpegEncoder::new_with_quality(&mut bytes, 90).encode_image(&img).unwrap();
        bytes
    }

    #[test]
    fn test_decode_jpeg() {
        let frame = decode_jpeg(&tiny_jpeg(8, 4)).unwrap();
        assert_eq!((frame.width, frame.height), (8, 4));
        assert_eq!(frame.data.len(), 8 * 4 * 4);

        let image = frame.to_color_image();
        assert_eq!(image.size, [8, 4]);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_jpeg(b"definitely not a jpeg").is_err());
    }
}
