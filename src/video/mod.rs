//! Live camera view.
//!
//! This module decodes the backend's MJPEG frames and uploads them as egui
//! textures.

pub mod feed;

pub use feed::{decode_jpeg, LiveFeed, VideoFrame};
