use serde::Serialize;

/// Structured trace events emitted by the messaging runtime.
///
/// Each event is logged as one JSON document under the `al_event` message so
/// log pipelines can filter protocol lifecycle without parsing free text.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    DomainsResolved {
        account_id: String,
        services: usize,
    },
    LoginCompleted {
        account_id: String,
        duration_ms: u64,
    },
    Connected {
        account_id: String,
        flushed_requests: usize,
    },
    Closed {
        account_id: String,
        failed_pending: usize,
        code: Option<u16>,
    },
    RequestTimedOut {
        req_id: String,
        request_type: String,
        elapsed_ms: u64,
    },
    KeepaliveFailed {
        account_id: String,
        reason: String,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "al_event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_event_tag() {
        let ev = TraceEvent::RequestTimedOut {
            req_id: "r-1".into(),
            request_type: ".GetClock".into(),
            elapsed_ms: 10_000,
        };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["event"], "RequestTimedOut");
        assert_eq!(json["req_id"], "r-1");
        assert_eq!(json["elapsed_ms"], 10_000);
    }
}
