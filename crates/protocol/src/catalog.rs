//! Static catalog of wire types: the requests the client can issue and the
//! public event names inbound types are published under.
//!
//! Both tables are compile-time constants; nothing here is mutated at
//! runtime.

use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Requests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Wire type of the clock request, also used as the keep-alive probe.
pub const GET_CLOCK: &str = ".GetClock";

/// Every request type the client exposes a typed method for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestType {
    GetClock,
    AgentRequestConversation,
    SubscribeExConversations,
    UnsubscribeExConversations,
    UpdateConversationField,
    PublishEvent,
    QueryMessages,
    UpdateRingState,
    SubscribeRoutingTasks,
    UpdateRoutingTaskSubscription,
    GetUserProfile,
    SetAgentState,
    SubscribeAgentsState,
    GenerateUrlForDownloadFile,
    GenerateUrlForUploadFile,
}

impl RequestType {
    pub const ALL: [RequestType; 15] = [
        Self::GetClock,
        Self::AgentRequestConversation,
        Self::SubscribeExConversations,
        Self::UnsubscribeExConversations,
        Self::UpdateConversationField,
        Self::PublishEvent,
        Self::QueryMessages,
        Self::UpdateRingState,
        Self::SubscribeRoutingTasks,
        Self::UpdateRoutingTaskSubscription,
        Self::GetUserProfile,
        Self::SetAgentState,
        Self::SubscribeAgentsState,
        Self::GenerateUrlForDownloadFile,
        Self::GenerateUrlForUploadFile,
    ];

    /// The `type` field sent on the wire.
    pub fn wire_type(self) -> &'static str {
        match self {
            Self::GetClock => GET_CLOCK,
            Self::AgentRequestConversation => ".ams.cm.AgentRequestConversation",
            Self::SubscribeExConversations => ".ams.aam.SubscribeExConversations",
            Self::UnsubscribeExConversations => ".ams.aam.UnsubscribeExConversations",
            Self::UpdateConversationField => ".ams.cm.UpdateConversationField",
            Self::PublishEvent => ".ams.ms.PublishEvent",
            Self::QueryMessages => ".ams.ms.QueryMessages",
            Self::UpdateRingState => ".ams.routing.UpdateRingState",
            Self::SubscribeRoutingTasks => ".ams.routing.SubscribeRoutingTasks",
            Self::UpdateRoutingTaskSubscription => ".ams.routing.UpdateRoutingTaskSubscription",
            Self::GetUserProfile => ".ams.userprofile.GetUserProfile",
            Self::SetAgentState => ".ams.routing.SetAgentState",
            Self::SubscribeAgentsState => ".ams.routing.SubscribeAgentsState",
            Self::GenerateUrlForDownloadFile => ".ams.ms.GenerateURLForDownloadFile",
            Self::GenerateUrlForUploadFile => ".ams.ms.GenerateURLForUploadFile",
        }
    }

    /// Look up a request type by its wire string.
    pub fn from_wire(wire: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.wire_type() == wire)
    }

    /// Client method name for this request (see [`method_name`]).
    pub fn method_name(self) -> String {
        method_name(self.wire_type())
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_type())
    }
}

/// Derive a method name from a wire type: the trailing path segment in
/// snake_case, keeping acronyms together.
///
/// `".ams.ms.GenerateURLForDownloadFile"` → `"generate_url_for_download_file"`.
pub fn method_name(wire_type: &str) -> String {
    let segment = wire_type.rsplit('.').next().unwrap_or(wire_type);
    let chars: Vec<char> = segment.chars().collect();
    let mut out = String::with_capacity(segment.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                Some(p) if p.is_ascii_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_ascii_uppercase() => next.is_some_and(|n| n.is_ascii_lowercase()),
                _ => false,
            };
            if boundary {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Public events
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Public name an inbound notification or response is published under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventName {
    /// `cqm.ExConversationChangeNotification`
    ExConversationChange,
    /// `ms.MessagingEventNotification`
    MessagingEvent,
    /// `routing.RoutingTaskNotification`
    RoutingTask,
    /// `routing.AgentStateNotification`
    AgentState,
    /// Any type outside the table, named by [`derived_event_name`].
    Other(String),
}

impl EventName {
    pub const KNOWN: [EventName; 4] = [
        Self::ExConversationChange,
        Self::MessagingEvent,
        Self::RoutingTask,
        Self::AgentState,
    ];

    /// Map a wire `type` to its public event name.
    pub fn from_wire(wire_type: &str) -> Self {
        match wire_type {
            ".ams.aam.ExConversationChangeNotification" => Self::ExConversationChange,
            ".ams.ms.MessagingEventNotification" => Self::MessagingEvent,
            ".ams.routing.RoutingTaskNotification" => Self::RoutingTask,
            ".ams.routing.AgentStateNotification" => Self::AgentState,
            other => Self::Other(derived_event_name(other)),
        }
    }

    /// The wire type for table entries; `None` for [`EventName::Other`].
    pub fn wire_type(&self) -> Option<&'static str> {
        match self {
            Self::ExConversationChange => Some(".ams.aam.ExConversationChangeNotification"),
            Self::MessagingEvent => Some(".ams.ms.MessagingEventNotification"),
            Self::RoutingTask => Some(".ams.routing.RoutingTaskNotification"),
            Self::AgentState => Some(".ams.routing.AgentStateNotification"),
            Self::Other(_) => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::ExConversationChange => "cqm.ExConversationChangeNotification",
            Self::MessagingEvent => "ms.MessagingEventNotification",
            Self::RoutingTask => "routing.RoutingTaskNotification",
            Self::AgentState => "routing.AgentStateNotification",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Public name for a wire type outside the table: the leading `.` and the
/// `ams.` service prefix are dropped.
///
/// `".GetClock$Response"` → `"GetClock$Response"`,
/// `".ams.cm.AgentRequestConversation$Response"` → `"cm.AgentRequestConversation$Response"`.
pub fn derived_event_name(wire_type: &str) -> String {
    let trimmed = wire_type.strip_prefix('.').unwrap_or(wire_type);
    trimmed.strip_prefix("ams.").unwrap_or(trimmed).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_names_follow_trailing_segment() {
        assert_eq!(method_name(".GetClock"), "get_clock");
        assert_eq!(
            method_name(".ams.aam.SubscribeExConversations"),
            "subscribe_ex_conversations"
        );
        assert_eq!(
            method_name(".ams.ms.GenerateURLForDownloadFile"),
            "generate_url_for_download_file"
        );
    }

    #[test]
    fn every_request_type_round_trips_through_wire_lookup() {
        for ty in RequestType::ALL {
            assert_eq!(RequestType::from_wire(ty.wire_type()), Some(ty));
        }
        assert_eq!(RequestType::from_wire(".ams.nope"), None);
    }

    #[test]
    fn request_method_names_are_unique() {
        let mut names: Vec<String> = RequestType::ALL.iter().map(|t| t.method_name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), RequestType::ALL.len());
    }

    #[test]
    fn known_events_map_both_ways() {
        for name in EventName::KNOWN {
            let wire = name.wire_type().expect("table entry has a wire type");
            assert_eq!(EventName::from_wire(wire), name);
        }
    }

    #[test]
    fn unknown_types_get_derived_names() {
        assert_eq!(
            EventName::from_wire(".GetClock$Response"),
            EventName::Other("GetClock$Response".into())
        );
        assert_eq!(
            EventName::from_wire(".ams.cm.AgentRequestConversation$Response").as_str(),
            "cm.AgentRequestConversation$Response"
        );
    }
}
