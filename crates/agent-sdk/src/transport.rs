//! Socket ownership: turns the raw WebSocket into a small event vocabulary
//! (`message`, `close`, `error`) and keeps it alive with low-level pings.
//!
//! Each open socket gets a fresh event channel, so replacing the socket
//! (reconnect) drops whatever the old one still had in flight.

use std::time::Duration;

use al_protocol::{codec, Envelope, InboundFrame};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

/// Default interval between WebSocket pings.
pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(60);
/// Upper bound on the TCP + TLS + upgrade handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Words in socket failures that reveal a status code.
const KNOWN_FAILURE_CODES: &[(&str, u16)] = &[
    ("401", 401),
    ("Unauthorized", 401),
    ("403", 403),
    ("Forbidden", 403),
    ("404", 404),
    ("Not Found", 404),
];

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Errors & events
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A socket-level failure, with a numeric code when one can be recovered
/// (e.g. `401` when the token was rejected during the upgrade).
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
    pub code: Option<u16>,
}

impl TransportError {
    /// Wrap a message, extracting a code from known words in it.
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        let code = KNOWN_FAILURE_CODES
            .iter()
            .find(|(needle, _)| contains_word(&message, needle))
            .map(|(_, code)| *code);
        Self { message, code }
    }

    /// Wrap a tungstenite error. The HTTP status of a failed upgrade wins
    /// over word matching.
    pub fn from_ws(err: &WsError) -> Self {
        let mut wrapped = Self::new(err.to_string());
        if let WsError::Http(response) = err {
            wrapped.code = Some(response.status().as_u16());
        }
        wrapped
    }

    /// `true` when the server refused our credentials.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self.code, Some(401) | Some(403))
    }
}

/// Lifecycle events of the current socket.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Message(InboundFrame),
    /// Emitted exactly once per socket, after which no more events arrive.
    Close {
        code: Option<u16>,
        reason: Option<String>,
    },
    Error(TransportError),
}

/// Outbound half of the transport: where the dispatch core writes frames.
///
/// Fire-and-forget; delivery is confirmed only by response correlation.
pub trait FrameSink {
    fn send(&mut self, envelope: &Envelope);
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Transport
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

struct Socket {
    outbound: mpsc::UnboundedSender<Message>,
    events: mpsc::UnboundedReceiver<TransportEvent>,
    reader: JoinHandle<()>,
    pinger: JoinHandle<()>,
}

/// Owns at most one WebSocket at a time.
pub struct Transport {
    ping_interval: Duration,
    connect_timeout: Duration,
    endpoint: Option<String>,
    socket: Option<Socket>,
}

impl Transport {
    pub fn new(ping_interval: Duration) -> Self {
        Self {
            ping_interval,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            endpoint: None,
            socket: None,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn is_open(&self) -> bool {
        self.socket.is_some()
    }

    /// Endpoint of the last [`open`](Self::open), reused by
    /// [`reconnect`](Self::reconnect).
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    /// Open a socket to `endpoint`, replacing any current one.
    ///
    /// On success the reader, writer, and ping tasks are running and
    /// [`next_event`](Self::next_event) yields this socket's events.
    pub async fn open(&mut self, endpoint: &str) -> Result<(), TransportError> {
        self.close();
        self.endpoint = Some(endpoint.to_string());

        tracing::info!(url = %redact_endpoint(endpoint), "opening messaging socket");
        let (ws, _response) =
            match tokio::time::timeout(self.connect_timeout, tokio_tungstenite::connect_async(endpoint))
                .await
            {
                Ok(Ok(pair)) => pair,
                Ok(Err(e)) => return Err(TransportError::from_ws(&e)),
                Err(_) => {
                    return Err(TransportError::new(format!(
                        "connect timed out after {}ms",
                        self.connect_timeout.as_millis()
                    )))
                }
            };
        let (mut sink, mut stream) = ws.split();

        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        // Writer: drains the outbound queue; stops after a close frame.
        tokio::spawn(async move {
            while let Some(msg) = outbound_rx.recv().await {
                let closing = matches!(msg, Message::Close(_));
                if let Err(e) = sink.send(msg).await {
                    tracing::debug!(error = %e, "socket write failed");
                    break;
                }
                if closing {
                    break;
                }
            }
        });

        // Reader: forwards frames until the socket ends, then reports the close.
        let reader_events = events_tx.clone();
        let reader = tokio::spawn(async move {
            let mut close = TransportEvent::Close {
                code: None,
                reason: None,
            };
            while let Some(next) = stream.next().await {
                match next {
                    Ok(Message::Text(text)) => {
                        let _ = reader_events.send(TransportEvent::Message(InboundFrame::parse(&text)));
                    }
                    Ok(Message::Binary(bytes)) => {
                        let text = String::from_utf8_lossy(&bytes);
                        let _ = reader_events.send(TransportEvent::Message(InboundFrame::parse(&text)));
                    }
                    Ok(Message::Pong(_)) => tracing::trace!("received pong"),
                    Ok(Message::Ping(_)) | Ok(Message::Frame(_)) => {}
                    Ok(Message::Close(frame)) => {
                        close = TransportEvent::Close {
                            code: frame.as_ref().map(|f| u16::from(f.code)),
                            reason: frame
                                .map(|f| f.reason.into_owned())
                                .filter(|r| !r.is_empty()),
                        };
                        break;
                    }
                    Err(e) => {
                        let _ = reader_events.send(TransportEvent::Error(TransportError::from_ws(&e)));
                        close = TransportEvent::Close {
                            code: None,
                            reason: Some(e.to_string()),
                        };
                        break;
                    }
                }
            }
            let _ = reader_events.send(close);
        });

        let pinger = spawn_pinger(self.ping_interval, outbound_tx.clone(), events_tx);

        self.socket = Some(Socket {
            outbound: outbound_tx,
            events: events_rx,
            reader,
            pinger,
        });
        Ok(())
    }

    /// Close the current socket and open a new one against the same endpoint.
    pub async fn reconnect(&mut self) -> Result<(), TransportError> {
        let endpoint = self
            .endpoint
            .clone()
            .ok_or_else(|| TransportError::new("no endpoint to reconnect to"))?;
        self.open(&endpoint).await
    }

    /// Stop pinging, detach the reader, and send a close frame.
    /// Calling this without an open socket is a no-op.
    pub fn close(&mut self) {
        if let Some(socket) = self.socket.take() {
            socket.pinger.abort();
            socket.reader.abort();
            let _ = socket.outbound.send(Message::Close(None));
            tracing::debug!("messaging socket closed");
        }
    }

    /// Next event of the current socket. Pends forever while closed.
    ///
    /// Returns `None` only if the socket's tasks vanished without reporting
    /// a close.
    pub async fn next_event(&mut self) -> Option<TransportEvent> {
        match self.socket.as_mut() {
            Some(socket) => socket.events.recv().await,
            None => std::future::pending().await,
        }
    }
}

impl FrameSink for Transport {
    fn send(&mut self, envelope: &Envelope) {
        let Some(socket) = self.socket.as_ref() else {
            tracing::warn!(msg_type = %envelope.msg_type(), "send on closed transport, dropping frame");
            return;
        };
        match codec::encode(envelope) {
            Ok(text) => {
                if socket.outbound.send(Message::Text(text)).is_err() {
                    tracing::warn!(msg_type = %envelope.msg_type(), "socket writer is gone, dropping frame");
                }
            }
            Err(e) => {
                tracing::error!(error = %e, msg_type = %envelope.msg_type(), "failed to encode envelope");
            }
        }
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        self.close();
    }
}

/// Ping on a fixed interval; the first failure is reported and ends the chain.
fn spawn_pinger(
    interval: Duration,
    outbound: mpsc::UnboundedSender<Message>,
    events: mpsc::UnboundedSender<TransportEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        loop {
            ticker.tick().await;
            if outbound.send(Message::Ping(Vec::new())).is_err() {
                let _ = events.send(TransportEvent::Error(TransportError::new(
                    "keep-alive ping failed: socket writer is gone",
                )));
                break;
            }
            tracing::trace!("sent ping");
        }
    })
}

/// `true` when `needle` occurs in `haystack` with no alphanumeric
/// neighbour on either side.
fn contains_word(haystack: &str, needle: &str) -> bool {
    haystack.match_indices(needle).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + needle.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

/// Hide the bearer token embedded in the messaging URI path.
pub(crate) fn redact_endpoint(endpoint: &str) -> String {
    const MARKER: &str = "/brand/";
    match endpoint.find(MARKER) {
        Some(idx) => {
            let start = idx + MARKER.len();
            let rest = &endpoint[start..];
            let end = rest.find('?').map(|i| start + i).unwrap_or(endpoint.len());
            format!("{}***{}", &endpoint[..start], &endpoint[end..])
        }
        None => endpoint.to_string(),
    }
}
