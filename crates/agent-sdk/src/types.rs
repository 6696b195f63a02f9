//! Core SDK types: request outcomes, top-level errors, connection state.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::transport::TransportError;

/// Why a tracked request reached its error outcome.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RequestError {
    /// The server answered with `code >= 400`; `body` carries its detail.
    #[error("remote error {code}: {body}")]
    Remote { code: i64, body: Value },
    /// No response arrived within the request's deadline.
    #[error("request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
    /// The socket closed while the request was pending.
    #[error("connection closed while request was pending")]
    ConnectionClosed,
    /// The client shut down before the request completed.
    #[error("client shut down")]
    Shutdown,
}

impl RequestError {
    /// Timeouts and closed connections share one outcome shape: no answer
    /// was received.
    pub fn is_timeout_like(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::ConnectionClosed)
    }
}

/// Top-level SDK error.
///
/// Returned by [`AgentClientBuilder::build`](crate::AgentClientBuilder::build)
/// for precondition failures; every later failure travels inside an
/// [`SdkEvent::Error`](crate::SdkEvent::Error), so the type is cloneable.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SdkError {
    #[error("config: {0}")]
    Config(String),
    #[error("domain resolution: {0}")]
    DomainResolution(String),
    #[error("login: {0}")]
    Login(String),
    #[error("transport: {0}")]
    Transport(#[from] TransportError),
    #[error("malformed frame: {0}")]
    MalformedFrame(String),
    #[error("reconnect exhausted after {0} attempts")]
    ReconnectExhausted(u32),
    #[error("shutdown")]
    Shutdown,
}

impl From<al_domain::Error> for SdkError {
    fn from(err: al_domain::Error) -> Self {
        match err {
            al_domain::Error::Auth(m) => Self::Login(m),
            other => Self::Config(other.to_string()),
        }
    }
}

/// Lifecycle of the single messaging connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Startup (domain resolution / login) has not finished.
    Uninitialized,
    Connecting,
    Connected,
    Disconnected,
}

/// Snapshot of the worker's bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientStats {
    pub state: ConnectionState,
    /// Requests awaiting a response.
    pub pending: usize,
    /// Requests parked until the socket opens.
    pub queued: usize,
    pub connected_since: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_like_covers_timeout_and_close() {
        assert!(RequestError::Timeout(Duration::from_secs(1)).is_timeout_like());
        assert!(RequestError::ConnectionClosed.is_timeout_like());
        assert!(!RequestError::Shutdown.is_timeout_like());
        assert!(!RequestError::Remote {
            code: 500,
            body: Value::Null
        }
        .is_timeout_like());
    }

    #[test]
    fn timeout_message_reports_millis() {
        let err = RequestError::Timeout(Duration::from_millis(1500));
        assert_eq!(err.to_string(), "request timed out after 1500ms");
    }

    #[test]
    fn domain_auth_error_maps_to_login() {
        let err: SdkError = al_domain::Error::Auth("bad password".into()).into();
        assert_eq!(err, SdkError::Login("bad password".into()));
    }
}
