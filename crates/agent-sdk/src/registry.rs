//! Request registry: in-flight requests keyed by correlation id.
//!
//! Every resolution path removes the entry before invoking its callback,
//! so a late response racing a timeout (or a close) finds nothing and each
//! callback fires at most once.

use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};

use al_protocol::RequestFrame;
use serde_json::Value;

use crate::types::RequestError;

/// Default per-request deadline.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Called with the response body and the request's context.
pub type SuccessCallback = Box<dyn FnOnce(Value, Option<Value>) + Send + 'static>;
/// Called with the failure cause and the request's context.
pub type ErrorCallback = Box<dyn FnOnce(RequestError, Option<Value>) + Send + 'static>;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Options
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Per-request options.
///
/// A request with neither callback is fire-and-forget: it is sent but never
/// tracked, so it cannot time out.
///
/// ```rust,no_run
/// # use al_agent_sdk::RequestOptions;
/// # use std::time::Duration;
/// let opts = RequestOptions::new()
///     .on_success(|body, _ctx| println!("clock: {body}"))
///     .on_error(|err, _ctx| eprintln!("failed: {err}"))
///     .timeout(Duration::from_secs(5));
/// ```
#[derive(Default)]
pub struct RequestOptions {
    pub(crate) on_success: Option<SuccessCallback>,
    pub(crate) on_error: Option<ErrorCallback>,
    pub(crate) context: Option<Value>,
    pub(crate) timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_success(mut self, f: impl FnOnce(Value, Option<Value>) + Send + 'static) -> Self {
        self.on_success = Some(Box::new(f));
        self
    }

    pub fn on_error(
        mut self,
        f: impl FnOnce(RequestError, Option<Value>) + Send + 'static,
    ) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }

    /// Opaque data handed back to whichever callback fires.
    pub fn context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }

    /// Override the default deadline for this request.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Whether the registry will track this request.
    pub fn is_tracked(&self) -> bool {
        self.on_success.is_some() || self.on_error.is_some()
    }

    /// Fail a request that never made it into the registry.
    pub(crate) fn fail(self, err: RequestError) {
        if let Some(cb) = self.on_error {
            invoke_guarded("error", || cb(err, self.context));
        }
    }
}

impl fmt::Debug for RequestOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestOptions")
            .field("on_success", &self.on_success.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("context", &self.context)
            .field("timeout", &self.timeout)
            .finish()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Pending requests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A sent request awaiting its outcome. Consumed by resolution.
pub struct PendingRequest {
    pub id: String,
    pub msg_type: String,
    pub launched_at: Instant,
    pub timeout: Duration,
    context: Option<Value>,
    on_success: Option<SuccessCallback>,
    on_error: Option<ErrorCallback>,
}

impl PendingRequest {
    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.launched_at)
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        self.elapsed(now) >= self.timeout
    }

    pub fn succeed(self, body: Value) {
        if let Some(cb) = self.on_success {
            let context = self.context;
            invoke_guarded("success", || cb(body, context));
        }
    }

    pub fn fail(self, err: RequestError) {
        if let Some(cb) = self.on_error {
            let context = self.context;
            invoke_guarded("error", || cb(err, context));
        }
    }
}

impl fmt::Debug for PendingRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingRequest")
            .field("id", &self.id)
            .field("msg_type", &self.msg_type)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// A panicking callback must not take the connection worker down with it.
fn invoke_guarded(which: &str, f: impl FnOnce()) {
    if std::panic::catch_unwind(AssertUnwindSafe(f)).is_err() {
        tracing::error!(callback = which, "request callback panicked");
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Registry
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct RequestRegistry {
    pending: HashMap<String, PendingRequest>,
    default_timeout: Duration,
}

impl RequestRegistry {
    pub fn new(default_timeout: Duration) -> Self {
        Self {
            pending: HashMap::new(),
            default_timeout,
        }
    }

    /// Track `frame` if `options` carries a callback. Returns whether it
    /// was tracked.
    pub fn register(&mut self, frame: &RequestFrame, options: RequestOptions, now: Instant) -> bool {
        if !options.is_tracked() {
            return false;
        }
        let entry = PendingRequest {
            id: frame.id.clone(),
            msg_type: frame.msg_type.clone(),
            launched_at: now,
            timeout: options.timeout.unwrap_or(self.default_timeout),
            context: options.context,
            on_success: options.on_success,
            on_error: options.on_error,
        };
        let prev = self.pending.insert(frame.id.clone(), entry);
        // UUID v4 ids make this unreachable in practice.
        debug_assert!(prev.is_none(), "request id collision: {}", frame.id);
        true
    }

    /// Remove and return the entry for `id`, if still pending.
    pub fn resolve(&mut self, id: &str) -> Option<PendingRequest> {
        self.pending.remove(id)
    }

    /// Remove and return every entry whose deadline has passed.
    pub fn take_expired(&mut self, now: Instant) -> Vec<PendingRequest> {
        let expired: Vec<String> = self
            .pending
            .values()
            .filter(|p| p.is_expired(now))
            .map(|p| p.id.clone())
            .collect();
        expired
            .iter()
            .filter_map(|id| self.pending.remove(id))
            .collect()
    }

    /// Remove and return every entry.
    pub fn drain(&mut self) -> Vec<PendingRequest> {
        self.pending.drain().map(|(_, p)| p).collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.pending.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl Default for RequestRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_TIMEOUT)
    }
}
