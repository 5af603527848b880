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

//! HTTP layer: status polling, protocol reset and the video feed.
//!
//! The poll loop follows the same shape as a reconnecting socket client: one
//! task, a `watch` channel for hot-reloading the target and a
//! `CancellationToken` for shutdown.

mod feed;

pub use feed::{FeedError, FrameFeed, JpegFrame};

use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use reqwest::StatusCode;
use thiserror::Error;
use tokio::sync::{broadcast, watch};
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::monitor::{MonitorEvent, MonitorSession};
use crate::protocol::{Endpoints, ProtocolError, StatusSnapshot};

/// Errors from a single status poll.
#[derive(Debug, Error)]
pub enum PollError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("backend responded with {0}")]
    Status(StatusCode),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Errors from a reset request.
#[derive(Debug, Error)]
pub enum ResetError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("backend responded with {0}")]
    Status(StatusCode),

    #[error("a reset is already in progress")]
    InProgress,
}

/// Where and how often to poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollTarget {
    pub backend_url: String,
    pub interval: Duration,
}

pub(crate) type SharedSession = Arc<RwLock<MonitorSession>>;

/// Fetch and decode one `/status_update` document.
pub async fn fetch_status(
    http: &reqwest::Client,
    endpoints: &Endpoints,
    timeout: Duration,
) -> Result<StatusSnapshot, PollError> {
    let response = http.get(endpoints.status()).timeout(timeout).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(PollError::Status(status));
    }

    let body = response.bytes().await?;
    Ok(StatusSnapshot::from_slice(&body)?)
}

/// Ask the backend to restart the protocol.
pub async fn trigger_reset(
    http: &reqwest::Client,
    endpoints: &Endpoints,
    timeout: Duration,
) -> Result<(), ResetError> {
    let response = http.post(endpoints.reset()).timeout(timeout).send().await?;

    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(ResetError::Status(status))
    }
}

pub(crate) fn publish(events: &broadcast::Sender<MonitorEvent>, produced: Vec<MonitorEvent>) {
    for event in produced {
        // No subscribers is fine; the UI may not have attached yet
        let _ = events.send(event);
    }
}

pub(crate) async fn poll_loop(
    http: reqwest::Client,
    mut target_rx: watch::Receiver<PollTarget>,
    session: SharedSession,
    events: broadcast::Sender<MonitorEvent>,
    cancel_token: CancellationToken,
    request_timeout: Duration,
) {
    let mut target = target_rx.borrow_and_update().clone();
    let mut endpoints = Endpoints::new(&target.backend_url);
    let mut ticker = interval(target.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!("Polling {} every {} ms", endpoints.status(), target.interval.as_millis());

    loop {
        tokio::select! {
            _ = ticker.tick() => {}

            changed = target_rx.changed() => {
                if changed.is_err() {
                    info!("Poll target channel closed, stopping");
                    return;
                }
                let new_target = target_rx.borrow_and_update().clone();
                if new_target != target {
                    info!(
                        "Poll target changed to {} every {} ms",
                        new_target.backend_url,
                        new_target.interval.as_millis()
                    );
                    if new_target.interval != target.interval {
                        ticker = interval(new_target.interval);
                        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                    } else {
                        ticker.reset_immediately();
                    }
                    endpoints = Endpoints::new(&new_target.backend_url);
                    target = new_target;
                }
                continue;
            }

            () = cancel_token.cancelled() => {
                info!("Status polling cancelled");
                return;
            }
        }

        let started = Instant::now();
        let result = tokio::select! {
            result = fetch_status(&http, &endpoints, request_timeout) => result,
            () = cancel_token.cancelled() => {
                info!("Status polling cancelled");
                return;
            }
        };

        let produced = match session.write() {
            Ok(mut session) => match result {
                Ok(snapshot) => session.on_poll_success(&snapshot, started.elapsed()),
                Err(e) => {
                    debug!("Status poll failed: {}", e);
                    session.on_poll_failure(&e.to_string())
                }
            },
            Err(_) => {
                warn!("Monitor session lock poisoned, skipping poll result");
                Vec::new()
            }
        };

        for event in &produced {
            if let MonitorEvent::ConnectionChanged { connected } = event {
                if *connected {
                    info!("Backend at {} is reachable", endpoints.base());
                } else {
                    warn!("Backend at {} stopped responding", endpoints.base());
                }
            }
        }
        publish(&events, produced);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TIMEOUT: Duration = Duration::from_secs(2);

    #[tokio::test]
    async fn test_fetch_status_decodes_snapshot() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status_update"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"{"result_status":"RUNNING","current_phase":"Phase 2 (Awaiting Action)"}"#,
                "application/json",
            ))
            .mount(&server)
            .await;

        let http = reqwest::Client::new();
        let snapshot = fetch_status(&http, &Endpoints::new(&server.uri()), TIMEOUT)
            .await
            .unwrap();
        assert_eq!(snapshot.status(), "RUNNING");
        assert_eq!(snapshot.phase().count, Some(2));
    }

    #[tokio::test]
    async fn test_fetch_status_rejects_server_error() {
        let server = MockServer::start().await;
        Mock::given(path("/status_update"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let http = reqwest::Client::new();
        let err = fetch_status(&http, &Endpoints::new(&server.uri()), TIMEOUT)
            .await
            .unwrap_err();
        assert!(matches!(err, PollError::Status(StatusCode::SERVICE_UNAVAILABLE)));
    }

    #[tokio::test]
    async fn test_fetch_status_rejects_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(path("/status_update"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let http = reqwest::Client::new();
        let err = fetch_status(&http, &Endpoints::new(&server.uri()), TIMEOUT)
            .await
            .unwrap_err();
        assert!(matches!(err, PollError::Protocol(_)));
    }

    #[tokio::test]
    async fn test_trigger_reset() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/reset"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"status":"success"}"#))
            .expect(1)
            .mount(&server)
            .await;

        let http = reqwest::Client::new();
        trigger_reset(&http, &Endpoints::new(&server.uri()), TIMEOUT)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_trigger_reset_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/reset"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let http = reqwest::Client::new();
        let err = trigger_reset(&http, &Endpoints::new(&server.uri()), TIMEOUT)
            .await
            .unwrap_err();
        assert!(matches!(err, ResetError::Status(StatusCode::INTERNAL_SERVER_ERROR)));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_request_error() {
        let http = reqwest::Client::new();
        // Port 9 (discard) is essentially never listening on loopback
        let err = fetch_status(&http, &Endpoints::new("http://127.0.0.1:9"), TIMEOUT)
            .await
            .unwrap_err();
        assert!(matches!(err, PollError::Request(_)));
    }
}
