//! Messaging protocol: wire envelopes, the frame codec, and the static
//! catalog of request types and public event names.
//!
//! Frames are JSON text over a single WebSocket:
//!
//! ```text
//! Request:      { "kind": "req",          "id": "…",    "type": "…", "body": {…}, "headers"?: … }
//! Response:     { "kind": "resp",         "reqId": "…", "type": "…", "code"?: 200, "body": {…} }
//! Notification: { "kind": "notification",               "type": "…", "body": {…} }
//! ```

pub mod catalog;
pub mod codec;
pub mod envelope;

pub use catalog::{derived_event_name, method_name, EventName, RequestType, GET_CLOCK};
pub use codec::{decode, encode, CodecError, InboundFrame};
pub use envelope::{
    Envelope, EnvelopeKind, NotificationFrame, RequestFrame, ResponseFrame,
    FAILURE_CODE_THRESHOLD,
};

/// Default messaging API version (`v` query parameter).
pub const DEFAULT_API_VERSION: &str = "2.1";

/// Build the messaging WebSocket URI for an account.
///
/// `wss://{domain}/ws_api/account/{accountId}/messaging/brand/{token}?v={apiVersion}`
pub fn connection_uri(
    scheme: &str,
    domain: &str,
    account_id: &str,
    token: &str,
    api_version: &str,
) -> String {
    format!("{scheme}://{domain}/ws_api/account/{account_id}/messaging/brand/{token}?v={api_version}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_uri_matches_service_pattern() {
        assert_eq!(
            connection_uri("wss", "va.msg.example.net", "acct1", "tok", DEFAULT_API_VERSION),
            "wss://va.msg.example.net/ws_api/account/acct1/messaging/brand/tok?v=2.1"
        );
    }
}
