//! Status stream watcher
//!
//! Reads the server-sent status stream of a run until every expected service
//! reached a terminal state, the server closes the stream, or the caller
//! cancels. Frames are full snapshots and are handled one at a time in
//! arrival order.

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;

use lifecycle_api::models::{ServiceStatus, StatusMap};
use reqwest::StatusCode;
use tracing::{debug, info, warn};

use crate::deploy::sse::SseDecoder;
use crate::deploy::status::{self, ServiceState, StatusFrame};
use crate::errors::CliError;
use crate::http::client::HttpClient;

/// How a watch ended
#[derive(Debug, Clone, PartialEq)]
pub enum WatchOutcome {
    /// Every expected service reached a terminal state
    Completed(StatusMap),
    /// The stream closed after some services completed
    Partial(StatusMap),
    /// The stream closed before any service completed
    Closed,
    /// The server does not know the run
    NotFound,
    Cancelled,
}

impl WatchOutcome {
    /// Process exit status for the outcome
    pub fn exit_code(&self) -> u8 {
        match self {
            WatchOutcome::Completed(services) if status::all_succeeded(services) => 0,
            WatchOutcome::Completed(_) | WatchOutcome::NotFound => 1,
            WatchOutcome::Partial(_) | WatchOutcome::Closed => 3,
            WatchOutcome::Cancelled => 130,
        }
    }

    /// Final status map, when the watch produced one
    pub fn services(&self) -> Option<&StatusMap> {
        match self {
            WatchOutcome::Completed(services) | WatchOutcome::Partial(services) => Some(services),
            _ => None,
        }
    }
}

/// Completion bookkeeping over successive snapshots
#[derive(Debug, Default)]
pub struct StatusTracker {
    expected: BTreeSet<String>,
    completed: BTreeSet<String>,
    reported_terminal: BTreeSet<String>,
    last_pending: BTreeMap<String, String>,
    snapshot: StatusMap,
}

impl StatusTracker {
    /// Track the given services; an empty list adopts the services of the
    /// first snapshot
    pub fn new<I, S>(expected: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            expected: expected.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn completed(&self) -> &BTreeSet<String> {
        &self.completed
    }

    pub fn snapshot(&self) -> &StatusMap {
        &self.snapshot
    }

    /// Handle one event payload
    ///
    /// `on_update` sees each terminal service once and pending services when
    /// their status changes. Returns the outcome once the watch is over.
    pub fn handle<F>(&mut self, data: &str, on_update: &mut F) -> Option<WatchOutcome>
    where
        F: FnMut(&str, &ServiceStatus),
    {
        if data.trim().is_empty() {
            return None;
        }

        let frame = match StatusFrame::parse(data) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Error parsing status update: {} ({})", data, e);
                return None;
            }
        };

        match frame {
            StatusFrame::Services(services) => self.apply_snapshot(services, on_update),
            frame @ StatusFrame::Info(_) if frame.is_idle_marker() => {
                info!("Status stream closed by server");
                Some(self.close())
            }
            StatusFrame::Info(message) => {
                info!("Status stream: {}", message);
                None
            }
            frame @ StatusFrame::Error(_) if frame.is_not_found() => Some(WatchOutcome::NotFound),
            StatusFrame::Error(message) => {
                warn!("Status stream error: {}", message);
                None
            }
            StatusFrame::Unrecognized(value) => {
                debug!("Ignoring status frame {}", value);
                None
            }
        }
    }

    fn apply_snapshot<F>(&mut self, services: StatusMap, on_update: &mut F) -> Option<WatchOutcome>
    where
        F: FnMut(&str, &ServiceStatus),
    {
        if services.is_empty() {
            debug!("Status frame without services");
            return None;
        }
        if self.expected.is_empty() {
            self.expected = services.keys().cloned().collect();
        }

        for (name, service) in &services {
            if self.reported_terminal.contains(name) {
                continue;
            }
            let state = ServiceState::classify(&service.deployment_status);
            if state.is_terminal() {
                self.reported_terminal.insert(name.clone());
                self.last_pending.remove(name);
                if self.expected.contains(name) {
                    self.completed.insert(name.clone());
                }
                on_update(name, service);
            } else if self.last_pending.get(name) != Some(&service.deployment_status) {
                self.last_pending
                    .insert(name.clone(), service.deployment_status.clone());
                on_update(name, service);
            }
        }

        self.snapshot.extend(services);

        if self.completed.len() >= self.expected.len() {
            info!("All {} services reached a final state", self.expected.len());
            return Some(WatchOutcome::Completed(self.snapshot.clone()));
        }
        None
    }

    /// Outcome when the stream ends without completing
    pub fn close(&self) -> WatchOutcome {
        if self.completed.is_empty() {
            WatchOutcome::Closed
        } else {
            WatchOutcome::Partial(self.snapshot.clone())
        }
    }
}

/// Watch the status stream of a run
pub async fn watch_run<C, F>(
    client: &HttpClient,
    run_id: &str,
    expected: &[String],
    cancel: C,
    mut on_update: F,
) -> Result<WatchOutcome, CliError>
where
    C: Future<Output = ()>,
    F: FnMut(&str, &ServiceStatus),
{
    info!("Watching status of run {}", run_id);
    tokio::pin!(cancel);

    let mut response = tokio::select! {
        _ = &mut cancel => return Ok(WatchOutcome::Cancelled),
        response = client.status_stream(run_id) => match response {
            Ok(response) => response,
            Err(CliError::Api { status: StatusCode::NOT_FOUND, .. }) => {
                return Ok(WatchOutcome::NotFound)
            }
            Err(e) => return Err(e),
        },
    };

    let mut tracker = StatusTracker::new(expected.iter().cloned());
    let mut decoder = SseDecoder::new();

    loop {
        let chunk = tokio::select! {
            _ = &mut cancel => {
                info!("Stopped watching run {}", run_id);
                return Ok(WatchOutcome::Cancelled);
            }
            chunk = response.chunk() => chunk?,
        };

        let Some(bytes) = chunk else {
            if let Some(event) = decoder.finish() {
                if let Some(outcome) = tracker.handle(&event.data, &mut on_update) {
                    return Ok(outcome);
                }
            }
            info!("Status stream ended");
            return Ok(tracker.close());
        };

        for event in decoder.push(&bytes) {
            if let Some(outcome) = tracker.handle(&event.data, &mut on_update) {
                return Ok(outcome);
            }
        }
    }
}
