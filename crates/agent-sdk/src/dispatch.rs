//! Dispatch core: the connection state machine.
//!
//! Owns the request registry, the queue of requests issued while
//! disconnected, and the timeout supervisor. Everything here is synchronous
//! and driven by the worker task (or a test) feeding it socket events and
//! the current time; frames go out through a [`FrameSink`].
//!
//! ```text
//! Uninitialized ──► Connecting ──► Connected ◄──► Disconnected
//!                        ▲                              │
//!                        └───────── reconnect ──────────┘
//! ```

use std::collections::VecDeque;
use std::time::Instant;

use al_domain::TraceEvent;
use al_protocol::{Envelope, InboundFrame, RequestFrame, ResponseFrame, GET_CLOCK};
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::events::{EventBus, SdkEvent};
use crate::registry::{RequestOptions, RequestRegistry};
use crate::supervisor::TimeoutSupervisor;
use crate::transport::{FrameSink, TransportError};
use crate::types::{ClientStats, ConnectionState, RequestError, SdkError};

/// A request built while disconnected, flushed FIFO on the next open.
#[derive(Debug)]
pub struct QueuedRequest {
    pub frame: RequestFrame,
    pub options: RequestOptions,
}

pub struct Dispatcher {
    account_id: String,
    state: ConnectionState,
    connected_since: Option<DateTime<Utc>>,
    registry: RequestRegistry,
    queue: VecDeque<QueuedRequest>,
    supervisor: TimeoutSupervisor,
    events: EventBus,
}

impl Dispatcher {
    pub fn new(
        account_id: impl Into<String>,
        events: EventBus,
        registry: RequestRegistry,
        supervisor: TimeoutSupervisor,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            state: ConnectionState::Uninitialized,
            connected_since: None,
            registry,
            queue: VecDeque::new(),
            supervisor,
            events,
        }
    }

    // ── Introspection ────────────────────────────────────────────────

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub fn pending_len(&self) -> usize {
        self.registry.len()
    }

    pub fn queued_len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_pending(&self, id: &str) -> bool {
        self.registry.contains(id)
    }

    /// Ids of queued requests in flush order.
    pub fn queued_ids(&self) -> Vec<String> {
        self.queue.iter().map(|q| q.frame.id.clone()).collect()
    }

    /// When the timeout supervisor next needs [`sweep`](Self::sweep).
    pub fn next_sweep(&self) -> Option<Instant> {
        self.supervisor.next_sweep()
    }

    pub fn stats(&self) -> ClientStats {
        ClientStats {
            state: self.state,
            pending: self.registry.len(),
            queued: self.queue.len(),
            connected_since: self.connected_since,
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    // ── Outbound ─────────────────────────────────────────────────────

    /// Send `frame` now if connected, otherwise park it until the next open.
    pub fn submit(
        &mut self,
        sink: &mut dyn FrameSink,
        frame: RequestFrame,
        options: RequestOptions,
        now: Instant,
    ) {
        if self.is_connected() {
            self.dispatch(sink, frame, options, now);
        } else {
            tracing::debug!(
                req_id = %frame.id,
                msg_type = %frame.msg_type,
                queued = self.queue.len() + 1,
                "not connected, queueing request"
            );
            self.queue.push_back(QueuedRequest { frame, options });
        }
    }

    fn dispatch(
        &mut self,
        sink: &mut dyn FrameSink,
        frame: RequestFrame,
        options: RequestOptions,
        now: Instant,
    ) {
        if self.registry.register(&frame, options, now) {
            self.supervisor.arm(now);
        }
        tracing::debug!(req_id = %frame.id, msg_type = %frame.msg_type, "sending request");
        sink.send(&Envelope::Request(frame));
    }

    /// Issue one clock probe. A failed probe is reported as a service issue;
    /// it never closes the connection.
    pub fn keepalive(&mut self, sink: &mut dyn FrameSink, now: Instant) {
        if !self.is_connected() {
            return;
        }
        let events = self.events.clone();
        let account_id = self.account_id.clone();
        let options = RequestOptions::new()
            .on_success(|body, _| tracing::trace!(clock = %body, "keep-alive ok"))
            .on_error(move |err, _| {
                tracing::warn!(error = %err, "keep-alive probe failed");
                TraceEvent::KeepaliveFailed {
                    account_id,
                    reason: err.to_string(),
                }
                .emit();
                events.emit(SdkEvent::ServiceIssue(err));
            });
        let frame = RequestFrame::new(uuid::Uuid::new_v4().to_string(), GET_CLOCK, Value::Object(Default::default()));
        self.dispatch(sink, frame, options, now);
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    pub fn begin_connect(&mut self) {
        self.state = ConnectionState::Connecting;
    }

    /// The socket opened: flush queued requests in submission order.
    pub fn on_open(&mut self, sink: &mut dyn FrameSink, now: Instant) {
        self.state = ConnectionState::Connected;
        self.connected_since = Some(Utc::now());

        let flushed = self.queue.len();
        while let Some(QueuedRequest { frame, options }) = self.queue.pop_front() {
            self.dispatch(sink, frame, options, now);
        }

        tracing::info!(account_id = %self.account_id, flushed, "connected");
        TraceEvent::Connected {
            account_id: self.account_id.clone(),
            flushed_requests: flushed,
        }
        .emit();
        self.events.emit(SdkEvent::Connected);
    }

    /// Opening the socket failed; the state falls back to disconnected.
    pub fn on_connect_failed(&mut self, err: TransportError) {
        tracing::warn!(error = %err, code = ?err.code, "connect failed");
        self.state = ConnectionState::Disconnected;
        self.events.emit(SdkEvent::Error(SdkError::Transport(err)));
    }

    /// The socket closed: every pending request fails, then `closed` is
    /// published. Queued requests stay queued for the next open.
    pub fn on_close(&mut self, code: Option<u16>, reason: Option<String>) {
        self.state = ConnectionState::Disconnected;
        self.connected_since = None;
        self.supervisor.disarm();

        let failed = self.registry.drain();
        let failed_pending = failed.len();
        for pending in failed {
            pending.fail(RequestError::ConnectionClosed);
        }

        tracing::info!(
            account_id = %self.account_id,
            failed_pending,
            code = ?code,
            reason = reason.as_deref().unwrap_or(""),
            "connection closed"
        );
        TraceEvent::Closed {
            account_id: self.account_id.clone(),
            failed_pending,
            code,
        }
        .emit();
        self.events.emit(SdkEvent::Closed { code, reason });
    }

    pub fn on_error(&mut self, err: SdkError) {
        tracing::warn!(error = %err, "sdk error");
        self.events.emit(SdkEvent::Error(err));
    }

    // ── Inbound ──────────────────────────────────────────────────────

    pub fn on_frame(&mut self, frame: InboundFrame) {
        match frame {
            InboundFrame::Envelope(Envelope::Notification(n)) => self.events.route_notification(n),
            InboundFrame::Envelope(Envelope::Response(r)) => self.on_response(r),
            InboundFrame::Envelope(Envelope::Request(r)) => {
                tracing::debug!(msg_type = %r.msg_type, "ignoring server-sent request");
            }
            InboundFrame::Raw(raw) => {
                let preview: String = raw.chars().take(120).collect();
                self.on_error(SdkError::MalformedFrame(preview));
            }
        }
    }

    fn on_response(&mut self, resp: ResponseFrame) {
        self.events.route_response(&resp);

        match self.registry.resolve(&resp.req_id) {
            Some(pending) => {
                if resp.is_failure() {
                    tracing::debug!(req_id = %resp.req_id, code = ?resp.code, "request failed remotely");
                    pending.fail(RequestError::Remote {
                        code: resp.code.unwrap_or_default(),
                        body: resp.body,
                    });
                } else {
                    pending.succeed(resp.body);
                }
            }
            None => {
                tracing::debug!(req_id = %resp.req_id, "response for unknown request, dropping");
            }
        }

        if self.registry.is_empty() {
            self.supervisor.disarm();
        }
    }

    /// Fail every request whose deadline has passed.
    pub fn sweep(&mut self, now: Instant) {
        for pending in self.supervisor.sweep(&mut self.registry, now) {
            let elapsed = pending.elapsed(now);
            tracing::warn!(
                req_id = %pending.id,
                msg_type = %pending.msg_type,
                elapsed_ms = elapsed.as_millis() as u64,
                "request timed out"
            );
            TraceEvent::RequestTimedOut {
                req_id: pending.id.clone(),
                request_type: pending.msg_type.clone(),
                elapsed_ms: elapsed.as_millis() as u64,
            }
            .emit();
            let timeout = pending.timeout;
            pending.fail(RequestError::Timeout(timeout));
        }
    }

    /// Fail everything still pending or queued; used when the client stops.
    pub fn shutdown(&mut self) {
        self.state = ConnectionState::Disconnected;
        self.connected_since = None;
        self.supervisor.disarm();
        for pending in self.registry.drain() {
            pending.fail(RequestError::Shutdown);
        }
        for queued in self.queue.drain(..) {
            queued.options.fail(RequestError::Shutdown);
        }
    }
}
