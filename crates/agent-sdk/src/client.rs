//! Agent client: the public handle and the connection worker behind it.
//!
//! The handle is cheap to call from anywhere: every operation becomes a
//! [`Command`] on an unbounded channel. The worker task owns the transport
//! and the [`Dispatcher`], so protocol state is never shared or locked.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use al_domain::TraceEvent;
use al_protocol::{connection_uri, RequestFrame};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::dispatch::Dispatcher;
use crate::events::{EventBus, SdkEvent};
use crate::reconnect::{ReconnectAttempts, ReconnectBackoff};
use crate::registry::{RequestOptions, RequestRegistry};
use crate::services::{Authenticator, Credentials, DomainResolver, LOGIN_SERVICE, MESSAGING_SERVICE};
use crate::supervisor::TimeoutSupervisor;
use crate::transport::{Transport, TransportError, TransportEvent};
use crate::types::{ClientStats, RequestError, SdkError};

/// Everything the worker needs, validated by the builder.
pub(crate) struct WorkerSettings {
    pub(crate) account_id: String,
    pub(crate) token: Option<String>,
    pub(crate) credentials: Option<Credentials>,
    pub(crate) api_version: String,
    pub(crate) scheme: String,
    pub(crate) request_timeout: Duration,
    pub(crate) sweep_interval: Duration,
    pub(crate) keepalive_interval: Option<Duration>,
    pub(crate) ping_interval: Duration,
    pub(crate) connect_timeout: Duration,
    pub(crate) event_capacity: usize,
    pub(crate) reconnect_backoff: Option<ReconnectBackoff>,
    pub(crate) domain_resolver: Arc<dyn DomainResolver>,
    pub(crate) authenticator: Arc<dyn Authenticator>,
}

enum Command {
    Request {
        frame: RequestFrame,
        options: RequestOptions,
    },
    Reconnect,
    Stats(oneshot::Sender<ClientStats>),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Public handle
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
/// A messaging client bound to one account.
///
/// Create via [`AgentClientBuilder`](crate::AgentClientBuilder). Dropping
/// the client stops its worker; pending and queued requests then fail with
/// [`RequestError::Shutdown`].
pub struct AgentClient {
    commands: mpsc::UnboundedSender<Command>,
    events: EventBus,
    connected: Arc<AtomicBool>,
    shutdown: CancellationToken,
    worker: Option<JoinHandle<()>>,
}

impl AgentClient {
    /// Start a new builder.
    pub fn builder() -> crate::builder::AgentClientBuilder {
        crate::builder::AgentClientBuilder::new()
    }

    pub(crate) fn spawn(runtime: &tokio::runtime::Handle, settings: WorkerSettings) -> Self {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let events = EventBus::new(settings.event_capacity);
        let connected = Arc::new(AtomicBool::new(false));
        let shutdown = CancellationToken::new();

        let dispatcher = Dispatcher::new(
            settings.account_id.clone(),
            events.clone(),
            RequestRegistry::new(settings.request_timeout),
            TimeoutSupervisor::new(settings.sweep_interval),
        );
        let worker = Worker {
            transport: Transport::new(settings.ping_interval)
                .with_connect_timeout(settings.connect_timeout),
            reconnect: settings.reconnect_backoff.clone().map(ReconnectAttempts::new),
            settings,
            dispatcher,
            commands: commands_rx,
            connected: connected.clone(),
            shutdown: shutdown.clone(),
            endpoint: None,
            keepalive_at: None,
            reconnect_at: None,
        };
        let worker = runtime.spawn(worker.run());

        Self {
            commands: commands_tx,
            events,
            connected,
            shutdown,
            worker: Some(worker),
        }
    }

    // ── Requests ─────────────────────────────────────────────────────

    /// Send a request of wire type `msg_type` and return its correlation id.
    ///
    /// Never blocks. While disconnected the request is queued and sent on
    /// the next open. The outcome arrives through `options`' callbacks; a
    /// request without callbacks is fire-and-forget.
    pub fn request(&self, msg_type: &str, body: Value, options: RequestOptions) -> String {
        self.request_with_headers(msg_type, body, options, None)
    }

    /// [`request`](Self::request) with envelope headers.
    pub fn request_with_headers(
        &self,
        msg_type: &str,
        body: Value,
        options: RequestOptions,
        headers: Option<Value>,
    ) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let frame = RequestFrame::new(id.clone(), msg_type, body).with_headers(headers);
        if let Err(mpsc::error::SendError(cmd)) =
            self.commands.send(Command::Request { frame, options })
        {
            if let Command::Request { options, .. } = cmd {
                tracing::debug!(req_id = %id, "worker stopped, failing request");
                options.fail(RequestError::Shutdown);
            }
        }
        id
    }

    /// Send a request and wait for its outcome.
    ///
    /// `timeout` overrides the client's default deadline.
    pub async fn call(
        &self,
        msg_type: &str,
        body: Value,
        timeout: Option<Duration>,
    ) -> Result<Value, RequestError> {
        let (tx, rx) = oneshot::channel();
        let on_success = Arc::new(Mutex::new(Some(tx)));
        let on_error = on_success.clone();

        let mut options = RequestOptions::new()
            .on_success(move |body, _| {
                if let Some(tx) = on_success.lock().take() {
                    let _ = tx.send(Ok(body));
                }
            })
            .on_error(move |err, _| {
                if let Some(tx) = on_error.lock().take() {
                    let _ = tx.send(Err(err));
                }
            });
        if let Some(timeout) = timeout {
            options = options.timeout(timeout);
        }

        self.request(msg_type, body, options);
        rx.await.unwrap_or(Err(RequestError::Shutdown))
    }

    // ── Events & state ───────────────────────────────────────────────

    /// Subscribe to [`SdkEvent`]s emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<SdkEvent> {
        self.events.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Drop the current socket and open a new one. Pending requests fail
    /// with [`RequestError::ConnectionClosed`]. Before a successful startup
    /// this retries domain resolution and login.
    pub fn reconnect(&self) {
        if self.commands.send(Command::Reconnect).is_err() {
            tracing::debug!("worker stopped, ignoring reconnect");
        }
    }

    /// Snapshot of the worker's bookkeeping.
    pub async fn stats(&self) -> Result<ClientStats, SdkError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(Command::Stats(tx))
            .map_err(|_| SdkError::Shutdown)?;
        rx.await.map_err(|_| SdkError::Shutdown)
    }

    /// Stop the worker and wait for it to finish. Pending and queued
    /// requests fail with [`RequestError::Shutdown`].
    pub async fn shutdown(&mut self) {
        self.shutdown.cancel();
        if let Some(worker) = self.worker.take() {
            if let Err(e) = worker.await {
                tracing::error!(error = %e, "connection worker panicked");
            }
        }
    }
}

impl Drop for AgentClient {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Worker
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

struct Worker {
    settings: WorkerSettings,
    dispatcher: Dispatcher,
    transport: Transport,
    commands: mpsc::UnboundedReceiver<Command>,
    connected: Arc<AtomicBool>,
    shutdown: CancellationToken,
    /// Messaging URI, known once startup succeeded.
    endpoint: Option<String>,
    keepalive_at: Option<Instant>,
    reconnect: Option<ReconnectAttempts>,
    reconnect_at: Option<Instant>,
}

impl Worker {
    async fn run(mut self) {
        let account_id = self.settings.account_id.clone();
        tracing::info!(account_id = %account_id, "starting messaging client");

        let started = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => None,
            r = resolve_endpoint(&self.settings) => Some(r),
        };
        match started {
            None => {
                self.teardown();
                return;
            }
            Some(Ok(endpoint)) => {
                self.endpoint = Some(endpoint);
                self.connect().await;
            }
            Some(Err(e)) => {
                tracing::warn!(account_id = %account_id, error = %e, "startup failed");
                self.dispatcher.on_error(e);
            }
        }

        loop {
            let next_sweep = self.dispatcher.next_sweep();
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    tracing::info!(account_id = %account_id, "shutdown requested");
                    break;
                }
                cmd = self.commands.recv() => match cmd {
                    Some(cmd) => self.on_command(cmd).await,
                    None => {
                        tracing::debug!("all client handles dropped");
                        break;
                    }
                },
                event = self.transport.next_event() => self.on_transport_event(event),
                _ = sleep_until(next_sweep) => self.dispatcher.sweep(now()),
                _ = sleep_until(self.keepalive_at) => {
                    self.dispatcher.keepalive(&mut self.transport, now());
                    self.keepalive_at = self.settings.keepalive_interval.map(|d| now() + d);
                }
                _ = sleep_until(self.reconnect_at) => {
                    self.reconnect_at = None;
                    self.connect().await;
                }
            }
        }

        self.teardown();
    }

    async fn on_command(&mut self, cmd: Command) {
        match cmd {
            Command::Request { frame, options } => {
                self.dispatcher.submit(&mut self.transport, frame, options, now());
            }
            Command::Reconnect => self.reconnect_now().await,
            Command::Stats(reply) => {
                let _ = reply.send(self.dispatcher.stats());
            }
        }
    }

    fn on_transport_event(&mut self, event: Option<TransportEvent>) {
        match event {
            Some(TransportEvent::Message(frame)) => self.dispatcher.on_frame(frame),
            Some(TransportEvent::Error(e)) => {
                tracing::warn!(error = %e, code = ?e.code, "transport error");
                self.dispatcher.on_error(SdkError::Transport(e));
            }
            Some(TransportEvent::Close { code, reason }) => self.on_close(code, reason),
            None => self.on_close(None, Some("socket tasks ended".into())),
        }
    }

    fn on_close(&mut self, code: Option<u16>, reason: Option<String>) {
        self.transport.close();
        self.connected.store(false, Ordering::Release);
        self.keepalive_at = None;
        self.dispatcher.on_close(code, reason);
        self.schedule_reconnect();
    }

    /// Open the socket against the resolved endpoint. Returns early, leaving
    /// teardown to the caller, when shutdown is requested mid-handshake.
    async fn connect(&mut self) {
        let Some(endpoint) = self.endpoint.clone() else {
            return;
        };
        self.dispatcher.begin_connect();
        let shutdown = self.shutdown.clone();
        let opened = tokio::select! {
            biased;
            _ = shutdown.cancelled() => return,
            r = self.transport.open(&endpoint) => r,
        };
        self.finish_connect(opened);
    }

    fn finish_connect(&mut self, opened: Result<(), TransportError>) {
        match opened {
            Ok(()) => {
                self.connected.store(true, Ordering::Release);
                if let Some(attempts) = self.reconnect.as_mut() {
                    attempts.reset();
                }
                self.keepalive_at = self.settings.keepalive_interval.map(|d| now() + d);
                self.dispatcher.on_open(&mut self.transport, now());
            }
            Err(e) => {
                self.dispatcher.on_connect_failed(e);
                self.schedule_reconnect();
            }
        }
    }

    async fn reconnect_now(&mut self) {
        self.reconnect_at = None;
        let shutdown = self.shutdown.clone();
        if self.endpoint.is_none() {
            let resolved = tokio::select! {
                biased;
                _ = shutdown.cancelled() => return,
                r = resolve_endpoint(&self.settings) => r,
            };
            match resolved {
                Ok(endpoint) => self.endpoint = Some(endpoint),
                Err(e) => {
                    tracing::warn!(error = %e, "startup retry failed");
                    self.dispatcher.on_error(e);
                    return;
                }
            }
        }
        if self.dispatcher.is_connected() {
            self.transport.close();
            self.connected.store(false, Ordering::Release);
            self.keepalive_at = None;
            self.dispatcher
                .on_close(None, Some("reconnect requested".into()));
        }
        tracing::info!(account_id = %self.settings.account_id, "reconnecting");

        // First open after a late startup: the transport has no endpoint yet.
        if self.transport.endpoint().is_none() {
            self.connect().await;
            return;
        }
        self.dispatcher.begin_connect();
        let opened = tokio::select! {
            biased;
            _ = shutdown.cancelled() => return,
            r = self.transport.reconnect() => r,
        };
        self.finish_connect(opened);
    }

    fn schedule_reconnect(&mut self) {
        let Some(attempts) = self.reconnect.as_mut() else {
            return;
        };
        if self.endpoint.is_none() || self.shutdown.is_cancelled() {
            return;
        }
        match attempts.next_delay() {
            Some(delay) => {
                tracing::info!(
                    account_id = %self.settings.account_id,
                    delay_ms = delay.as_millis() as u64,
                    attempt = attempts.attempts(),
                    "reconnecting"
                );
                self.reconnect_at = Some(now() + delay);
            }
            None => {
                let tried = attempts.attempts();
                tracing::error!(
                    account_id = %self.settings.account_id,
                    attempts = tried,
                    "max reconnect attempts exhausted"
                );
                self.dispatcher.on_error(SdkError::ReconnectExhausted(tried));
            }
        }
    }

    fn teardown(&mut self) {
        let was_connected = self.dispatcher.is_connected();
        self.transport.close();
        self.connected.store(false, Ordering::Release);
        self.dispatcher.shutdown();

        self.commands.close();
        while let Ok(cmd) = self.commands.try_recv() {
            if let Command::Request { options, .. } = cmd {
                options.fail(RequestError::Shutdown);
            }
        }

        if was_connected {
            self.dispatcher.events().emit(SdkEvent::Closed {
                code: Some(1000),
                reason: Some("shutdown".into()),
            });
        }
        tracing::info!(account_id = %self.settings.account_id, "messaging client stopped");
    }
}

/// Resolve service domains, log in if needed, and build the messaging URI.
async fn resolve_endpoint(settings: &WorkerSettings) -> Result<String, SdkError> {
    let domains = settings.domain_resolver.resolve(&settings.account_id).await?;
    TraceEvent::DomainsResolved {
        account_id: settings.account_id.clone(),
        services: domains.len(),
    }
    .emit();

    let messaging = domains.get(MESSAGING_SERVICE).ok_or_else(|| {
        SdkError::DomainResolution(format!("no domain for service {MESSAGING_SERVICE}"))
    })?;

    let token = match (&settings.token, &settings.credentials) {
        (Some(token), _) => token.clone(),
        (None, Some(credentials)) => {
            let login_domain = domains.get(LOGIN_SERVICE).ok_or_else(|| {
                SdkError::DomainResolution(format!("no domain for service {LOGIN_SERVICE}"))
            })?;
            let started = Instant::now();
            let bearer = settings
                .authenticator
                .login(login_domain, &settings.account_id, credentials)
                .await?;
            TraceEvent::LoginCompleted {
                account_id: settings.account_id.clone(),
                duration_ms: started.elapsed().as_millis() as u64,
            }
            .emit();
            bearer
        }
        (None, None) => return Err(SdkError::Config("no token or credentials".into())),
    };

    Ok(connection_uri(
        &settings.scheme,
        messaging,
        &settings.account_id,
        &token,
        &settings.api_version,
    ))
}

/// Current time on the runtime clock.
fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

/// Sleep until `deadline`; pend forever when there is none.
async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(tokio::time::Instant::from_std(at)).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::AgentClientBuilder;
    use crate::services::StaticDomains;
    use crate::types::ConnectionState;
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct FailingResolver;

    #[async_trait]
    impl DomainResolver for FailingResolver {
        async fn resolve(&self, _account_id: &str) -> Result<HashMap<String, String>, SdkError> {
            Err(SdkError::DomainResolution("csds unavailable".into()))
        }
    }

    #[tokio::test]
    async fn startup_failure_is_an_event_and_requests_queue() {
        let client = AgentClientBuilder::new()
            .account_id("1")
            .token("t")
            .domain_resolver(FailingResolver)
            .build()
            .unwrap();
        let mut events = client.subscribe();

        match events.recv().await.unwrap() {
            SdkEvent::Error(SdkError::DomainResolution(msg)) => assert!(msg.contains("csds")),
            other => panic!("expected resolution error, got {other:?}"),
        }

        client.request(".GetClock", serde_json::json!({}), RequestOptions::new());
        let stats = client.stats().await.unwrap();
        assert_eq!(stats.state, ConnectionState::Uninitialized);
        assert_eq!(stats.queued, 1);
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn missing_messaging_domain_is_reported() {
        let client = AgentClientBuilder::new()
            .account_id("1")
            .token("t")
            .domain_resolver(StaticDomains::new().with("somethingElse", "x.example.net"))
            .build()
            .unwrap();
        let mut events = client.subscribe();

        match events.recv().await.unwrap() {
            SdkEvent::Error(SdkError::DomainResolution(msg)) => {
                assert!(msg.contains(MESSAGING_SERVICE))
            }
            other => panic!("expected resolution error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn shutdown_fails_queued_requests() {
        let mut client = AgentClientBuilder::new()
            .account_id("1")
            .token("t")
            .domain_resolver(FailingResolver)
            .build()
            .unwrap();

        let (tx, rx) = oneshot::channel();
        client.request(
            ".GetClock",
            serde_json::json!({}),
            RequestOptions::new().on_error(move |err, _| {
                let _ = tx.send(err);
            }),
        );
        client.shutdown().await;

        assert_eq!(rx.await.unwrap(), RequestError::Shutdown);
        assert!(client.stats().await.is_err());
    }

    #[tokio::test]
    async fn call_after_shutdown_fails_fast() {
        let mut client = AgentClientBuilder::new()
            .account_id("1")
            .token("t")
            .domain_resolver(FailingResolver)
            .build()
            .unwrap();
        client.shutdown().await;

        let result = client.call(".GetClock", serde_json::json!({}), None).await;
        assert_eq!(result, Err(RequestError::Shutdown));
    }
}
