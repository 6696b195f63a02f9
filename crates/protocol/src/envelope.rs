//! Wire envelope: the single unit exchanged over the messaging socket.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// First response code treated as a failure.
pub const FAILURE_CODE_THRESHOLD: i64 = 400;

/// One complete wire message, discriminated by its `kind` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Envelope {
    /// Client → server: a correlated request.
    #[serde(rename = "req")]
    Request(RequestFrame),

    /// Server → client: the answer to a request, echoing its id as `reqId`.
    #[serde(rename = "resp")]
    Response(ResponseFrame),

    /// Server → client: unsolicited push.
    #[serde(rename = "notification")]
    Notification(NotificationFrame),
}

/// Envelope discriminant without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnvelopeKind {
    Request,
    Response,
    Notification,
}

impl EnvelopeKind {
    /// Value of the `kind` field on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Request => "req",
            Self::Response => "resp",
            Self::Notification => "notification",
        }
    }
}

impl Envelope {
    pub fn kind(&self) -> EnvelopeKind {
        match self {
            Self::Request(_) => EnvelopeKind::Request,
            Self::Response(_) => EnvelopeKind::Response,
            Self::Notification(_) => EnvelopeKind::Notification,
        }
    }

    /// The `type` field, naming the operation or schema.
    pub fn msg_type(&self) -> &str {
        match self {
            Self::Request(f) => &f.msg_type,
            Self::Response(f) => &f.msg_type,
            Self::Notification(f) => &f.msg_type,
        }
    }

    pub fn body(&self) -> &Value {
        match self {
            Self::Request(f) => &f.body,
            Self::Response(f) => &f.body,
            Self::Notification(f) => &f.body,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestFrame {
    /// Correlation id, unique per request.
    pub id: String,
    #[serde(rename = "type")]
    pub msg_type: String,
    #[serde(default)]
    pub body: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<Value>,
}

impl RequestFrame {
    pub fn new(id: impl Into<String>, msg_type: impl Into<String>, body: Value) -> Self {
        Self {
            id: id.into(),
            msg_type: msg_type.into(),
            body,
            headers: None,
        }
    }

    pub fn with_headers(mut self, headers: Option<Value>) -> Self {
        self.headers = headers;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseFrame {
    /// Id of the request this answers.
    #[serde(rename = "reqId")]
    pub req_id: String,
    /// Some servers omit the type on responses; correlation uses `req_id`.
    #[serde(rename = "type", default)]
    pub msg_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    #[serde(default)]
    pub body: Value,
}

impl ResponseFrame {
    /// `true` when the server reported a failure (`code >= 400`).
    /// A missing code counts as success.
    pub fn is_failure(&self) -> bool {
        self.code.is_some_and(|c| c >= FAILURE_CODE_THRESHOLD)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationFrame {
    #[serde(rename = "type")]
    pub msg_type: String,
    #[serde(default)]
    pub body: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_wire_shape() {
        let env = Envelope::Request(RequestFrame::new("abc", ".GetClock", json!({})));
        let wire = serde_json::to_value(&env).unwrap();
        assert_eq!(
            wire,
            json!({"kind": "req", "id": "abc", "type": ".GetClock", "body": {}})
        );
    }

    #[test]
    fn request_headers_serialized_when_present() {
        let frame = RequestFrame::new("abc", ".ams.ms.PublishEvent", json!({"x": 1}))
            .with_headers(Some(json!([{"type": ".ams.headers.BrandProfile"}])));
        let wire = serde_json::to_value(Envelope::Request(frame)).unwrap();
        assert_eq!(wire["headers"][0]["type"], ".ams.headers.BrandProfile");
    }

    #[test]
    fn response_uses_req_id_and_optional_code() {
        let raw = r#"{"kind":"resp","reqId":"r1","type":".GetClock$Response","code":200,"body":{"currentTime":123}}"#;
        let env: Envelope = serde_json::from_str(raw).unwrap();
        match env {
            Envelope::Response(resp) => {
                assert_eq!(resp.req_id, "r1");
                assert_eq!(resp.code, Some(200));
                assert!(!resp.is_failure());
                assert_eq!(resp.body, json!({"currentTime": 123}));
            }
            other => panic!("expected response, got {other:?}"),
        }
    }

    #[test]
    fn missing_code_is_success_and_400_is_failure() {
        let mut resp = ResponseFrame {
            req_id: "r".into(),
            msg_type: "t".into(),
            code: None,
            body: Value::Null,
        };
        assert!(!resp.is_failure());
        resp.code = Some(399);
        assert!(!resp.is_failure());
        resp.code = Some(400);
        assert!(resp.is_failure());
        resp.code = Some(500);
        assert!(resp.is_failure());
    }

    #[test]
    fn notification_without_body_defaults_to_null() {
        let raw = r#"{"kind":"notification","type":".ams.routing.AgentStateNotification"}"#;
        let env: Envelope = serde_json::from_str(raw).unwrap();
        assert_eq!(env.kind(), EnvelopeKind::Notification);
        assert_eq!(env.msg_type(), ".ams.routing.AgentStateNotification");
        assert_eq!(env.body(), &Value::Null);
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let raw = r#"{"kind":"bogus","type":"x","body":{}}"#;
        assert!(serde_json::from_str::<Envelope>(raw).is_err());
    }
}
