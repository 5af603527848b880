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

//! MJPEG video feed reader.
//!
//! Streams `/video_feed` in a background task and keeps only the newest JPEG
//! frame in a `watch` channel. Decoding is left to the consumer.

use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::protocol::mjpeg::{boundary_from_content_type, DEFAULT_BOUNDARY};
use crate::protocol::MjpegParser;

/// Encoded JPEG bytes of one frame.
pub type JpegFrame = Arc<[u8]>;

/// Errors that end one streaming attempt.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("backend responded with {0}")]
    Status(StatusCode),

    #[error("unexpected content type: {0}")]
    ContentType(String),
}

/// Handle to a running feed reader. Dropping it stops the task.
#[derive(Debug)]
pub struct FrameFeed {
    url: String,
    frames: watch::Receiver<Option<JpegFrame>>,
    cancel_token: CancellationToken,
}

impl FrameFeed {
    /// Start streaming `url` on the given runtime.
    #[must_use]
    pub fn spawn(runtime: &Handle, http: reqwest::Client, url: String, retry_delay: Duration) -> Self {
        let (frame_tx, frame_rx) = watch::channel(None);
        let cancel_token = CancellationToken::new();

        let task_cancel = cancel_token.clone();
        let task_url = url.clone();
        runtime.spawn(async move {
            feed_loop(http, task_url, frame_tx, task_cancel, retry_delay).await;
        });

        Self {
            url,
            frames: frame_rx,
            cancel_token,
        }
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// A receiver that observes every new frame.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<JpegFrame>> {
        self.frames.clone()
    }

    /// The most recent frame, if any has arrived.
    #[must_use]
    pub fn latest(&self) -> Option<JpegFrame> {
        self.frames.borrow().clone()
    }

    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }
}

impl Drop for FrameFeed {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

async fn feed_loop(
    http: reqwest::Client,
    url: String,
    frame_tx: watch::Sender<Option<JpegFrame>>,
    cancel_token: CancellationToken,
    retry_delay: Duration,
) {
    loop {
        info!("Opening video feed {}", url);

        tokio::select! {
            result = stream_frames(&http, &url, &frame_tx) => match result {
                Ok(()) => info!("Video feed {} ended", url),
                Err(e) => warn!("Video feed {} failed: {}", url, e),
            },
            () = cancel_token.cancelled() => {
                info!("Video feed {} closed", url);
                return;
            }
        }

        if frame_tx.is_closed() {
            return;
        }

        tokio::select! {
            () = sleep(retry_delay) => {}
            () = cancel_token.cancelled() => return,
        }
    }
}

async fn stream_frames(
    http: &reqwest::Client,
    url: &str,
    frame_tx: &watch::Sender<Option<JpegFrame>>,
) -> Result<(), FeedError> {
    let mut response = http.get(url).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(FeedError::Status(status));
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    if !content_type.is_empty() && !content_type.starts_with("multipart/") {
        return Err(FeedError::ContentType(content_type));
    }

    let boundary = boundary_from_content_type(&content_type).unwrap_or_else(|| DEFAULT_BOUNDARY.to_string());
    let mut parser = MjpegParser::new(&boundary);

    while let Some(chunk) = response.chunk().await? {
        for frame in parser.push(&chunk) {
            frame_tx.send_replace(Some(frame.into()));
        }
        if frame_tx.is_closed() {
            break;
        }
    }

    Ok(())
}
