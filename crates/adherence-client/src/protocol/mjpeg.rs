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

//! Incremental parser for `multipart/x-mixed-replace` MJPEG streams.
//!
//! The backend writes each frame as
//!
//! ```text
//! --frame\r\n
//! Content-Type: image/jpeg\r\n
//! \r\n
//! <jpeg bytes>\r\n
//! ```
//!
//! without a `Content-Length` header, so a part ends where the next boundary
//! begins. When a part does carry `Content-Length` it is trusted instead,
//! unless it is larger than the buffer cap.

use log::warn;

/// Boundary used when the response does not name one.
pub const DEFAULT_BOUNDARY: &str = "frame";

/// Upper bound on buffered bytes before the parser gives up on the backlog.
pub const MAX_BUFFER_BYTES: usize = 8 * 1024 * 1024;

const HEADER_END: &[u8] = b"\r\n\r\n";

/// Extract the multipart boundary from a `Content-Type` header value.
#[must_use]
pub fn boundary_from_content_type(content_type: &str) -> Option<String> {
    content_type
        .split(';')
        .map(str::trim)
        .find_map(|param| {
            let (name, value) = param.split_once('=')?;
            name.trim().eq_ignore_ascii_case("boundary").then(|| value.trim())
        })
        .map(|value| value.trim_matches('"').trim_start_matches("--").to_string())
        .filter(|value| !value.is_empty())
}

/// Splits a byte stream into JPEG frames.
#[derive(Debug)]
pub struct MjpegParser {
    delimiter: Vec<u8>,
    buffer: Vec<u8>,
    max_buffer: usize,
}

impl MjpegParser {
    #[must_use]
    pub fn new(boundary: &str) -> Self {
        Self::with_max_buffer(boundary, MAX_BUFFER_BYTES)
    }

    #[must_use]
    pub fn with_max_buffer(boundary: &str, max_buffer: usize) -> Self {
        Self {
            delimiter: format!("--{boundary}").into_bytes(),
            buffer: Vec::new(),
            max_buffer,
        }
    }

    /// Number of bytes waiting for the rest of a part.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Feed a chunk from the network and return every frame it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some(frame) = self.next_frame() {
            if !frame.is_empty() {
                frames.push(frame);
            }
        }

        if self.buffer.len() > self.max_buffer {
            warn!(
                "MJPEG buffer exceeded {} bytes without a complete frame, discarding",
                self.max_buffer
            );
            self.buffer.clear();
        }

        frames
    }

    fn next_frame(&mut self) -> Option<Vec<u8>> {
        let start = find(&self.buffer, &self.delimiter, 0)?;
        let headers_start = start + self.delimiter.len();
        let headers_end = find(&self.buffer, HEADER_END, headers_start)?;
        let body_start = headers_end + HEADER_END.len();

        let headers = String::from_utf8_lossy(&self.buffer[headers_start..headers_end]);
        let declared = content_length(&headers);
        let declared_end = declared
            .filter(|length| *length <= self.max_buffer)
            .and_then(|length| body_start.checked_add(length));
        if let (Some(length), None) = (declared, declared_end) {
            warn!("Ignoring MJPEG Content-Length {}, framing by boundary instead", length);
        }

        let (body_end, consumed) = match declared_end {
            Some(end) => {
                if self.buffer.len() < end {
                    return None;
                }
                (end, end)
            }
            None => {
                let next = find(&self.buffer, &self.delimiter, body_start)?;
                (trim_crlf(&self.buffer, body_start, next), next)
            }
        };

        let frame = self.buffer[body_start..body_end].to_vec();
        self.buffer.drain(..consumed);
        Some(frame)
    }
}

fn content_length(headers: &str) -> Option<usize> {
    headers.lines().find_map(|line| {
        let (name, value) = line.split_once(':')?;
        if name.trim().eq_ignore_ascii_case("content-length") {
            value.trim().parse().ok()
        } else {
            None
        }
    })
}

/// End index of `buffer[start..end]` with one trailing CRLF removed.
fn trim_crlf(buffer: &[u8], start: usize, end: usize) -> usize {
    if end >= start + 2 && &buffer[end - 2..end] == b"\r\n" {
        end - 2
    } else {
        end
    }
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from >= haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| pos + from)
}
