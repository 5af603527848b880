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

//! Client library for the medication-adherence verification backend.
//!
//! The backend runs the camera and the verification protocol; this crate
//! only watches it. It is split into layers that can be used on their own:
//!
//! - **Protocol layer**: the `/status_update` document, phase normalization
//!   and MJPEG framing
//! - **Monitor layer**: displayed state, connection debouncing and status
//!   classification, all synchronous and free of I/O
//! - **HTTP layer**: the poll loop, reset requests and the video feed reader
//!
//! # Quick Start
//!
//! ```no_run
//! use adherence_client::{Client, ClientConfig, MonitorEvent};
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = Client::spawn(ClientConfig {
//!         backend_url: "http://localhost:5000".to_string(),
//!         ..Default::default()
//!     })
//!     .expect("client");
//!
//!     let mut events = client.subscribe();
//!     while let Ok(event) = events.recv().await {
//!         if let MonitorEvent::Notify(notification) = event {
//!             println!("{}: {}", notification.title, notification.description);
//!         }
//!         println!("status: {}", client.state().protocol_status);
//!     }
//! }
//! ```
//!
//! # Monitor Layer Only
//!
//! ```
//! use adherence_client::monitor::{present, StatusTone};
//!
//! let presentation = present("FATAL FAILURE (PILL REAPPEARED)");
//! assert_eq!(presentation.tone, StatusTone::Destructive);
//! assert!(presentation.terminated);
//! ```

pub mod http;
pub mod monitor;
pub mod protocol;

use std::sync::{Arc, RwLock};
use std::time::Duration;

use log::{info, warn};
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;

pub use http::{FeedError, FrameFeed, JpegFrame, PollError, PollTarget, ResetError};
pub use monitor::{
    MonitorEvent, MonitorSession, MonitorState, Notification, NotificationVariant, PollStats, Presentation,
    StabilizerConfig, StatusIcon, StatusTone,
};
pub use protocol::{Endpoints, ProtocolError, StatusSnapshot, PHASE_TOTAL};

/// Default backend address.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:5000";

/// Default delay between status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

const EVENT_CAPACITY: usize = 64;

/// Errors that prevent a client from starting.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),

    #[error("no tokio runtime available; spawn the client from within a runtime")]
    NoRuntime,
}

/// Configuration for the full-stack client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend base URL, e.g. `http://localhost:5000`.
    pub backend_url: String,
    /// Delay between status polls.
    pub poll_interval: Duration,
    /// Upper bound on one status or reset request.
    pub request_timeout: Duration,
    /// TCP connect timeout, also applied to the video feed.
    pub connect_timeout: Duration,
    /// Delay before reopening a dropped video feed.
    pub feed_retry_delay: Duration,
    /// Connection debouncing thresholds.
    pub stabilizer: StabilizerConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            request_timeout: Duration::from_secs(2),
            connect_timeout: Duration::from_secs(2),
            feed_retry_delay: Duration::from_secs(1),
            stabilizer: StabilizerConfig::default(),
        }
    }
}

/// Full-stack client that polls the backend and tracks what to display.
///
/// Spawning starts the poll task on the current tokio runtime. The handle is
/// cheap to query from a UI thread: [`state`](Self::state) clones the view
/// model and [`subscribe`](Self::subscribe) yields notifications.
pub struct Client {
    session: Arc<RwLock<MonitorSession>>,
    http: reqwest::Client,
    target_tx: watch::Sender<PollTarget>,
    events: broadcast::Sender<MonitorEvent>,
    cancel_token: CancellationToken,
    runtime: Handle,
    request_timeout: Duration,
    feed_retry_delay: Duration,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("target", &*self.target_tx.borrow())
            .field("cancel_token", &self.cancel_token)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Spawn a new client with the given configuration.
    pub fn spawn(config: ClientConfig) -> Result<Self, ClientError> {
        let runtime = Handle::try_current().map_err(|_| ClientError::NoRuntime)?;

        // No overall timeout here: it would cut off the video stream
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()?;

        let session = Arc::new(RwLock::new(MonitorSession::new(config.stabilizer)));
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (target_tx, target_rx) = watch::channel(PollTarget {
            backend_url: config.backend_url,
            interval: config.poll_interval,
        });
        let cancel_token = CancellationToken::new();

        runtime.spawn(http::poll_loop(
            http.clone(),
            target_rx,
            Arc::clone(&session),
            events.clone(),
            cancel_token.clone(),
            config.request_timeout,
        ));

        Ok(Self {
            session,
            http,
            target_tx,
            events,
            cancel_token,
            runtime,
            request_timeout: config.request_timeout,
            feed_retry_delay: config.feed_retry_delay,
        })
    }

    /// Snapshot of the displayed state.
    #[must_use]
    pub fn state(&self) -> MonitorState {
        self.session
            .read()
            .map(|session| session.state().clone())
            .unwrap_or_default()
    }

    /// Subscribe to monitor events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.events.subscribe()
    }

    /// Current poll target.
    #[must_use]
    pub fn target(&self) -> PollTarget {
        self.target_tx.borrow().clone()
    }

    #[must_use]
    pub fn endpoints(&self) -> Endpoints {
        Endpoints::new(&self.target_tx.borrow().backend_url)
    }

    /// Point the poller at a different backend or change its cadence.
    ///
    /// Takes effect on the next tick without restarting the client.
    pub fn set_target(&self, target: PollTarget) {
        self.target_tx.send_if_modified(|current| {
            if *current == target {
                false
            } else {
                *current = target;
                true
            }
        });
    }

    /// Ask the backend to restart the protocol.
    ///
    /// Runs in the background; the outcome arrives as a notification. A
    /// request made while another reset is in flight is ignored.
    pub fn request_reset(&self) {
        let started = self
            .session
            .write()
            .map(|mut session| session.begin_reset())
            .unwrap_or(false);
        if !started {
            warn!("{}", ResetError::InProgress);
            return;
        }

        let http = self.http.clone();
        let endpoints = self.endpoints();
        let session = Arc::clone(&self.session);
        let events = self.events.clone();
        let timeout = self.request_timeout;
        let cancel_token = self.cancel_token.clone();

        self.runtime.spawn(async move {
            info!("Requesting protocol reset at {}", endpoints.reset());
            let result = tokio::select! {
                result = http::trigger_reset(&http, &endpoints, timeout) => result,
                () = cancel_token.cancelled() => return,
            };

            let result = result.map_err(|e| {
                warn!("Protocol reset failed: {}", e);
                e.to_string()
            });
            let produced = session
                .write()
                .map(|mut session| session.finish_reset(result))
                .unwrap_or_default();
            http::publish(&events, produced);
        });
    }

    /// Probe `backend_url` once without touching the displayed state.
    ///
    /// The result arrives as [`MonitorEvent::ConnectionTest`].
    pub fn test_connection(&self, backend_url: String) {
        let http = self.http.clone();
        let events = self.events.clone();
        let timeout = self.request_timeout;

        self.runtime.spawn(async move {
            let endpoints = Endpoints::new(&backend_url);
            let outcome = http::fetch_status(&http, &endpoints, timeout)
                .await
                .map(|snapshot| format!("Backend reports {}", snapshot.status()))
                .map_err(|e| e.to_string());
            info!("Connection test against {}: {:?}", endpoints.base(), outcome);
            let _ = events.send(MonitorEvent::ConnectionTest {
                url: backend_url,
                outcome,
            });
        });
    }

    /// Start reading the backend's video feed.
    #[must_use]
    pub fn video_feed(&self) -> FrameFeed {
        FrameFeed::spawn(
            &self.runtime,
            self.http.clone(),
            self.endpoints().video_feed(),
            self.feed_retry_delay,
        )
    }

    /// The runtime this client spawns onto.
    #[must_use]
    pub fn runtime(&self) -> &Handle {
        &self.runtime
    }

    /// Stop polling.
    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_config(backend_url: String) -> ClientConfig {
        ClientConfig {
            backend_url,
            poll_interval: Duration::from_millis(10),
            request_timeout: Duration::from_millis(500),
            ..Default::default()
        }
    }

    async fn next_notification(events: &mut broadcast::Receiver<MonitorEvent>) -> Notification {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if let MonitorEvent::Notify(notification) = events.recv().await.unwrap() {
                    return notification;
                }
            }
        })
        .await
        .unwrap()
    }

    #[test]
    fn test_spawn_requires_runtime() {
        assert!(matches!(
            Client::spawn(ClientConfig::default()),
            Err(ClientError::NoRuntime)
        ));
    }

    #[tokio::test]
    async fn test_connects_then_loses_backend() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status_update"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"{"result_status":"RUNNING","current_phase":3}"#,
                "application/json",
            ))
            .up_to_n_times(2)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/status_update"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = Client::spawn(fast_config(server.uri())).unwrap();
        let mut events = client.subscribe();

        assert_eq!(next_notification(&mut events).await, Notification::connected());
        assert_eq!(next_notification(&mut events).await, Notification::connection_lost());

        let state = client.state();
        assert!(!state.connected);
        assert_eq!(state.protocol_status, monitor::DISCONNECTED_STATUS);
        assert_eq!(state.phase_count, 3);
        assert!(state.stats.failed >= 3);
    }

    #[tokio::test]
    async fn test_reset_round_trip() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status_update"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"{"result_status":"VERIFIED (PASS)","current_phase":6}"#,
                "application/json",
            ))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/reset"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = Client::spawn(fast_config(server.uri())).unwrap();
        let mut events = client.subscribe();
        assert_eq!(next_notification(&mut events).await, Notification::connected());
        assert!(client.state().can_reset());

        client.request_reset();
        assert_eq!(next_notification(&mut events).await, Notification::reset_started());
    }

    #[tokio::test]
    async fn test_set_target_switches_backend() {
        let first = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status_update"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"{"result_status":"RUNNING","current_phase":1}"#,
                "application/json",
            ))
            .mount(&first)
            .await;

        let second = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status_update"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"{"result_status":"FAIL: Pill not detected","current_phase":"Phase 4 (Swallow)"}"#,
                "application/json",
            ))
            .expect(1..)
            .mount(&second)
            .await;

        let client = Client::spawn(fast_config(first.uri())).unwrap();
        let mut events = client.subscribe();
        assert_eq!(next_notification(&mut events).await, Notification::connected());
        assert_eq!(client.state().protocol_status, "RUNNING");

        let target = PollTarget {
            backend_url: second.uri(),
            interval: Duration::from_millis(20),
        };
        client.set_target(target.clone());
        assert_eq!(client.target(), target);
        assert_eq!(client.endpoints().status(), format!("{}/status_update", second.uri()));

        let ended = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if let MonitorEvent::SessionEnded { status, passed } = events.recv().await.unwrap() {
                    return (status, passed);
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(ended, ("FAIL: Pill not detected".to_string(), false));

        let state = client.state();
        assert_eq!(state.protocol_status, "FAIL: Pill not detected");
        assert_eq!(state.phase_count, 4);
        assert!(state.connected);
        assert!(!second.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_connection_probe_reports_failure() {
        let client = Client::spawn(fast_config("http://127.0.0.1:9".to_string())).unwrap();
        let mut events = client.subscribe();

        client.test_connection("http://127.0.0.1:9".to_string());
        let outcome = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if let MonitorEvent::ConnectionTest { outcome, .. } = events.recv().await.unwrap() {
                    return outcome;
                }
            }
        })
        .await
        .unwrap();
        assert!(outcome.is_err());
    }
}
