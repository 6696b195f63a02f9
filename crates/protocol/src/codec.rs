//! Frame codec: envelopes ↔ JSON text frames.
//!
//! Decoding is lenient at the transport boundary: a payload that is not a
//! valid envelope is kept as [`InboundFrame::Raw`] so the caller decides
//! what to do with it.

use crate::envelope::Envelope;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Serialize an envelope into a text frame.
pub fn encode(envelope: &Envelope) -> Result<String, CodecError> {
    Ok(serde_json::to_string(envelope)?)
}

/// Strictly decode a text frame into an envelope.
pub fn decode(text: &str) -> Result<Envelope, CodecError> {
    Ok(serde_json::from_str(text)?)
}

/// A frame received from the socket.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    Envelope(Envelope),
    /// Payload that could not be decoded, forwarded untouched.
    Raw(String),
}

impl InboundFrame {
    pub fn parse(text: &str) -> Self {
        match decode(text) {
            Ok(envelope) => Self::Envelope(envelope),
            Err(e) => {
                tracing::debug!(error = %e, bytes = text.len(), "inbound frame is not an envelope");
                Self::Raw(text.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::{NotificationFrame, RequestFrame, ResponseFrame};
    use serde_json::json;

    #[test]
    fn encode_then_decode_request() {
        let env = Envelope::Request(RequestFrame::new("id-1", ".GetClock", json!({})));
        let text = encode(&env).unwrap();
        assert_eq!(decode(&text).unwrap(), env);
    }

    #[test]
    fn parse_keeps_non_json_payload_raw() {
        assert_eq!(
            InboundFrame::parse("not json at all"),
            InboundFrame::Raw("not json at all".into())
        );
    }

    #[test]
    fn parse_keeps_json_without_kind_raw() {
        let text = r#"{"type":"x","body":{}}"#;
        assert_eq!(InboundFrame::parse(text), InboundFrame::Raw(text.into()));
    }

    #[test]
    fn parse_decodes_notification() {
        let text = r#"{"kind":"notification","type":".ams.ms.MessagingEventNotification","body":{"changes":[]}}"#;
        assert_eq!(
            InboundFrame::parse(text),
            InboundFrame::Envelope(Envelope::Notification(NotificationFrame {
                msg_type: ".ams.ms.MessagingEventNotification".into(),
                body: json!({"changes": []}),
            }))
        );
    }

    #[test]
    fn parse_decodes_response_without_type() {
        let text = r#"{"kind":"resp","reqId":"r-7","code":200,"body":{"ok":true}}"#;
        assert_eq!(
            InboundFrame::parse(text),
            InboundFrame::Envelope(Envelope::Response(ResponseFrame {
                req_id: "r-7".into(),
                msg_type: String::new(),
                code: Some(200),
                body: json!({"ok": true}),
            }))
        );
    }
}
