//! `al-agent-sdk`: client SDK for the asynchronous messaging API.
//!
//! One WebSocket per account carries every request, response, and server
//! push. The SDK owns that socket: it correlates responses with requests,
//! fails requests that never get an answer, keeps the connection alive, and
//! republishes server notifications as typed events.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  AgentClient (handle)        request() / call() / typed API  │
//! │        │ unbounded commands              ▲ broadcast events  │
//! │        ▼                                 │                   │
//! │  ┌────────────────── worker task ────────┴───────────────┐   │
//! │  │ Dispatcher: registry · FIFO queue · timeout sweep     │   │
//! │  │ Transport:  socket reader · writer · ping timer       │   │
//! │  └───────────────────────────────────────────────────────┘   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Connection flow
//!
//! 1. Resolve service domains for the account (`asyncMessagingEnt`, `agentVep`)
//! 2. Without a bearer token, log in with username + password
//! 3. Open `wss://{domain}/ws_api/account/{id}/messaging/brand/{token}?v=2.1`
//! 4. Flush requests queued while disconnected, in submission order
//! 5. Main loop:
//!    - On `resp`: publish under its mapped name, then resolve the pending request
//!    - On `notification`: publish under its mapped name and as `notification`
//!    - Every sweep interval: fail requests past their deadline
//!    - Every keep-alive interval: send `.GetClock`; failures become `service_issue`
//! 6. On close: fail every pending request, publish `closed`, optionally reconnect
//!
//! Startup and transport failures never surface as `Err`: they are published
//! as [`SdkEvent::Error`] and the client stays usable (requests keep queueing).

pub mod builder;
pub mod client;
pub mod dispatch;
pub mod events;
pub mod reconnect;
pub mod registry;
mod requests;
pub mod services;
pub mod supervisor;
pub mod transport;
pub mod types;

// ── Re-exports for ergonomic imports ─────────────────────────────────

pub use builder::AgentClientBuilder;
pub use client::AgentClient;
pub use events::{EventBus, SdkEvent};
pub use reconnect::ReconnectBackoff;
pub use registry::RequestOptions;
pub use services::{
    Authenticator, Credentials, DomainResolver, HttpAuthenticator, StaticDomains, LOGIN_SERVICE,
    MESSAGING_SERVICE,
};
pub use transport::TransportError;
pub use types::{ClientStats, ConnectionState, RequestError, SdkError};

// Re-export protocol types so callers never need to import al-protocol directly.
pub use al_protocol::{EventName, NotificationFrame, RequestType};
