//! Public event surface and the notification router.
//!
//! Events are a closed enum fanned out to every subscriber through a
//! broadcast channel. Inbound notifications and responses are republished
//! under the public name the catalog maps their wire type to.

use al_protocol::{EventName, NotificationFrame, ResponseFrame};
use serde_json::Value;
use tokio::sync::broadcast;

use crate::types::{RequestError, SdkError};

/// Everything the client publishes to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum SdkEvent {
    /// The socket opened and queued requests were flushed.
    Connected,
    /// The socket closed; every pending request has already failed.
    Closed {
        code: Option<u16>,
        reason: Option<String>,
    },
    /// Startup, transport, or framing failure. Never fatal on its own.
    Error(SdkError),
    /// The clock keep-alive probe failed; the socket may be unhealthy.
    ServiceIssue(RequestError),
    /// Every inbound notification, unmapped.
    Notification(NotificationFrame),
    /// A notification or response republished under its public name.
    /// `req_id` is set for responses.
    Message {
        name: EventName,
        msg_type: String,
        body: Value,
        req_id: Option<String>,
    },
}

impl SdkEvent {
    /// Public event name.
    pub fn name(&self) -> &str {
        match self {
            Self::Connected => "connected",
            Self::Closed { .. } => "closed",
            Self::Error(_) => "error",
            Self::ServiceIssue(_) => "service_issue",
            Self::Notification(_) => "notification",
            Self::Message { name, .. } => name.as_str(),
        }
    }
}

/// Multi-subscriber event fan-out. Cheap to clone.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SdkEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// New subscription; sees every event emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<SdkEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn emit(&self, event: SdkEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("event dropped, no subscribers");
        }
    }

    /// Publish a notification under its mapped name, then as a generic
    /// `notification`.
    pub fn route_notification(&self, frame: NotificationFrame) {
        let name = EventName::from_wire(&frame.msg_type);
        tracing::debug!(msg_type = %frame.msg_type, event = %name, "routing notification");
        self.emit(SdkEvent::Message {
            name,
            msg_type: frame.msg_type.clone(),
            body: frame.body.clone(),
            req_id: None,
        });
        self.emit(SdkEvent::Notification(frame));
    }

    /// Publish a response under its mapped name together with its `reqId`.
    pub fn route_response(&self, frame: &ResponseFrame) {
        self.emit(SdkEvent::Message {
            name: EventName::from_wire(&frame.msg_type),
            msg_type: frame.msg_type.clone(),
            body: frame.body.clone(),
            req_id: Some(frame.req_id.clone()),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn drain(rx: &mut broadcast::Receiver<SdkEvent>) -> Vec<SdkEvent> {
        let mut out = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            out.push(ev);
        }
        out
    }

    #[test]
    fn notification_fans_out_once_under_mapped_name() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let body = json!({"changes": [{"state": "OPEN"}]});

        bus.route_notification(NotificationFrame {
            msg_type: ".ams.aam.ExConversationChangeNotification".into(),
            body: body.clone(),
        });

        let events = drain(&mut rx);
        let mapped: Vec<&SdkEvent> = events
            .iter()
            .filter(|e| e.name() == "cqm.ExConversationChangeNotification")
            .collect();
        assert_eq!(mapped.len(), 1);
        match mapped[0] {
            SdkEvent::Message {
                name,
                body: got,
                req_id,
                ..
            } => {
                assert_eq!(name, &EventName::ExConversationChange);
                assert_eq!(got, &body);
                assert!(req_id.is_none());
            }
            other => panic!("expected Message, got {other:?}"),
        }
        assert_eq!(events.iter().filter(|e| e.name() == "notification").count(), 1);
    }

    #[test]
    fn every_subscriber_sees_each_event() {
        let bus = EventBus::new(16);
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.emit(SdkEvent::Connected);

        assert_eq!(drain(&mut a), vec![SdkEvent::Connected]);
        assert_eq!(drain(&mut b), vec![SdkEvent::Connected]);
    }

    #[test]
    fn response_carries_req_id_and_derived_name() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.route_response(&ResponseFrame {
            req_id: "r-9".into(),
            msg_type: ".GetClock$Response".into(),
            code: Some(200),
            body: json!({"currentTime": 1}),
        });

        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name(), "GetClock$Response");
        match &events[0] {
            SdkEvent::Message { req_id, .. } => assert_eq!(req_id.as_deref(), Some("r-9")),
            other => panic!("expected Message, got {other:?}"),
        }
    }

    #[test]
    fn emit_without_subscribers_does_not_panic() {
        let bus = EventBus::new(4);
        bus.emit(SdkEvent::Connected);
    }
}
