//! Per-frame situation report cache.
//!
//! # Entry Lifecycle
//!
//! ```text
//!   IDLE ──ensure──▶ LOADING ──ok──▶ READY ──refresh──▶ LOADING (payload kept)
//!                       │                                  │
//!                       └──err──▶ FAILED ◀──────err────────┘
//! ```
//!
//! At most one request per frame index is in flight. A second `ensure` or
//! `refresh` while one is pending attaches to it instead of issuing another.
//! A refresh keeps serving the previous payload (flagged stale) until the new
//! response arrives. A failure clears the payload.
//!
//! Responses are written back only if the cache generation and the request
//! id still match. [`ReportCache::clear`] starts a new generation, so
//! responses for a replaced series are dropped on arrival.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use pw_common::Frame;
use pw_config::ReportConfig;
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, warn};

use super::requester::{EnrichmentError, FrameRiskAttributes, ReportRequester, SituationReport};
use crate::events::{EngineEvent, EventBus};

/// Request status for one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    #[default]
    Idle,
    Loading,
    Ready,
    Failed,
}

/// Point-in-time view of one cache entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSnapshot {
    pub frame_index: usize,
    pub status: ReportStatus,
    pub payload: Option<SituationReport>,
    pub last_error: Option<String>,
    /// The payload is from an earlier request and a refresh is pending.
    pub is_stale: bool,
    pub requests_issued: u64,
}

impl ReportSnapshot {
    fn idle(frame_index: usize) -> Self {
        Self {
            frame_index,
            status: ReportStatus::Idle,
            payload: None,
            last_error: None,
            is_stale: false,
            requests_issued: 0,
        }
    }
}

type Settled = watch::Receiver<Option<ReportStatus>>;

#[derive(Debug)]
struct InFlight {
    request_id: u64,
    settled: Settled,
}

#[derive(Debug, Default)]
struct ReportEntry {
    status: ReportStatus,
    payload: Option<SituationReport>,
    last_error: Option<String>,
    in_flight: Option<InFlight>,
    requests_issued: u64,
}

impl ReportEntry {
    fn snapshot(&self, frame_index: usize) -> ReportSnapshot {
        ReportSnapshot {
            frame_index,
            status: self.status,
            payload: self.payload.clone(),
            last_error: self.last_error.clone(),
            is_stale: self.status == ReportStatus::Loading && self.payload.is_some(),
            requests_issued: self.requests_issued,
        }
    }
}

#[derive(Debug, Default)]
struct ReportTable {
    generation: u64,
    next_request_id: u64,
    entries: HashMap<usize, ReportEntry>,
}

struct CacheInner {
    requester: Arc<dyn ReportRequester>,
    context: ReportConfig,
    events: Option<EventBus>,
    runtime: Handle,
    table: Mutex<ReportTable>,
}

/// Shared handle to the report table.
#[derive(Clone)]
pub struct ReportCache {
    inner: Arc<CacheInner>,
}

/// Handle to the outcome of an `ensure` or `refresh` call.
pub struct ReportTicket {
    frame_index: usize,
    issued: bool,
    settled: Option<Settled>,
    cache: ReportCache,
}

impl ReportTicket {
    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    /// Whether this call started a new request (as opposed to attaching to
    /// one in flight or hitting a ready entry).
    pub fn issued_request(&self) -> bool {
        self.issued
    }

    /// Wait until the request this ticket refers to settles, then snapshot
    /// the entry.
    pub async fn settled(self) -> ReportSnapshot {
        if let Some(mut rx) = self.settled {
            // A closed channel means the request task was aborted; the entry
            // is reported as it stands.
            let _ = rx.wait_for(Option::is_some).await;
        }
        self.cache.snapshot(self.frame_index)
    }
}

impl ReportCache {
    pub fn new(
        requester: Arc<dyn ReportRequester>,
        context: ReportConfig,
        events: Option<EventBus>,
        runtime: Handle,
    ) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                requester,
                context,
                events,
                runtime,
                table: Mutex::new(ReportTable::default()),
            }),
        }
    }

    /// Make sure a report for `frame` exists or is being fetched.
    ///
    /// No request is issued if the entry is ready or already loading.
    pub fn ensure(&self, frame: &Frame) -> ReportTicket {
        self.request(frame, false, None)
    }

    /// Re-fetch the report for `frame`, keeping any existing payload visible
    /// until the new one arrives.
    pub fn refresh(&self, frame: &Frame) -> ReportTicket {
        self.request(frame, true, None)
    }

    /// Current cache generation. Bumped by [`ReportCache::clear`].
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// [`ReportCache::ensure`] for a frame read under `generation`.
    ///
    /// If the cache has been cleared since, `frame` belongs to a replaced
    /// series: nothing is requested and the ticket settles immediately.
    pub fn ensure_in(&self, generation: u64, frame: &Frame) -> ReportTicket {
        self.request(frame, false, Some(generation))
    }

    /// [`ReportCache::refresh`] for a frame read under `generation`.
    pub fn refresh_in(&self, generation: u64, frame: &Frame) -> ReportTicket {
        self.request(frame, true, Some(generation))
    }

    pub fn snapshot(&self, frame_index: usize) -> ReportSnapshot {
        let table = self.lock();
        table
            .entries
            .get(&frame_index)
            .map_or_else(|| ReportSnapshot::idle(frame_index), |e| e.snapshot(frame_index))
    }

    pub fn status(&self, frame_index: usize) -> ReportStatus {
        self.snapshot(frame_index).status
    }

    /// Drop every entry and start a new generation.
    pub fn clear(&self) {
        let mut table = self.lock();
        table.generation += 1;
        let dropped = table.entries.len();
        table.entries.clear();
        debug!(generation = table.generation, dropped, "report cache cleared");
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, ReportTable> {
        lock_table(&self.inner.table)
    }

    fn request(&self, frame: &Frame, force: bool, expected: Option<u64>) -> ReportTicket {
        let frame_index = frame.index;
        let mut table = self.lock();
        let generation = table.generation;
        if expected.is_some_and(|g| g != generation) {
            debug!(frame_index, generation, "frame is from a replaced series; not requesting");
            return self.ticket(frame_index, false, None);
        }
        table.next_request_id += 1;
        let request_id = table.next_request_id;

        let entry = table.entries.entry(frame_index).or_default();
        if let Some(in_flight) = &entry.in_flight {
            debug!(frame_index, request_id = in_flight.request_id, "attaching to in-flight report");
            return self.ticket(frame_index, false, Some(in_flight.settled.clone()));
        }
        if !force && entry.status == ReportStatus::Ready {
            return self.ticket(frame_index, false, None);
        }

        let (tx, rx) = watch::channel(None);
        entry.status = ReportStatus::Loading;
        entry.last_error = None;
        entry.requests_issued += 1;
        entry.in_flight = Some(InFlight {
            request_id,
            settled: rx.clone(),
        });
        drop(table);

        debug!(frame_index, request_id, refresh = force, "requesting situation report");
        let attributes = FrameRiskAttributes::from_frame(frame, &self.inner.context);
        let inner = Arc::clone(&self.inner);
        self.inner.runtime.spawn(async move {
            let result = inner.requester.request_situation_report(&attributes).await;
            let status = inner.settle(frame_index, generation, request_id, result);
            let _ = tx.send(Some(status));
        });

        self.ticket(frame_index, true, Some(rx))
    }

    fn ticket(&self, frame_index: usize, issued: bool, settled: Option<Settled>) -> ReportTicket {
        ReportTicket {
            frame_index,
            issued,
            settled,
            cache: self.clone(),
        }
    }
}

impl CacheInner {
    fn settle(
        &self,
        frame_index: usize,
        generation: u64,
        request_id: u64,
        result: Result<SituationReport, EnrichmentError>,
    ) -> ReportStatus {
        let outcome = match &result {
            Ok(_) => ReportStatus::Ready,
            Err(_) => ReportStatus::Failed,
        };

        let mut table = lock_table(&self.table);
        if table.generation != generation {
            debug!(frame_index, request_id, "discarding report for a replaced series");
            return outcome;
        }
        let Some(entry) = table.entries.get_mut(&frame_index) else {
            return outcome;
        };
        if entry.in_flight.as_ref().map(|f| f.request_id) != Some(request_id) {
            debug!(frame_index, request_id, "discarding superseded report");
            return outcome;
        }

        entry.in_flight = None;
        entry.status = outcome;
        match result {
            Ok(report) => {
                entry.payload = Some(report);
                entry.last_error = None;
            }
            Err(err) => {
                warn!(frame_index, error = %err, "situation report request failed");
                entry.payload = None;
                entry.last_error = Some(err.to_string());
            }
        }
        drop(table);

        if let Some(events) = &self.events {
            events.emit(EngineEvent::ReportSettled {
                frame_index,
                status: outcome,
            });
        }
        outcome
    }
}

fn lock_table(table: &Mutex<ReportTable>) -> MutexGuard<'_, ReportTable> {
    // Entries are plain data, so a poisoned lock is still usable.
    table.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
