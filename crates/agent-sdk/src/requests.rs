//! Typed request methods, one per catalog entry.
//!
//! Each method is named after the trailing segment of its wire type and
//! delegates to [`AgentClient::request_with_headers`].

use al_protocol::RequestType;
use serde_json::Value;

use crate::client::AgentClient;
use crate::registry::RequestOptions;

impl AgentClient {
    /// Send a catalog request. Returns the correlation id.
    pub fn send(
        &self,
        request_type: RequestType,
        body: Value,
        options: RequestOptions,
        headers: Option<Value>,
    ) -> String {
        self.request_with_headers(request_type.wire_type(), body, options, headers)
    }

    /// `.GetClock`: the server's current time.
    /// The server ignores the body; pass `json!({})`.
    pub fn get_clock(
        &self,
        body: Value,
        options: RequestOptions,
        headers: Option<Value>,
    ) -> String {
        self.send(RequestType::GetClock, body, options, headers)
    }

    /// Open a new conversation as the agent.
    pub fn agent_request_conversation(
        &self,
        body: Value,
        options: RequestOptions,
        headers: Option<Value>,
    ) -> String {
        self.send(RequestType::AgentRequestConversation, body, options, headers)
    }

    /// Subscribe to conversation metadata changes, delivered as
    /// `cqm.ExConversationChangeNotification`.
    pub fn subscribe_ex_conversations(
        &self,
        body: Value,
        options: RequestOptions,
        headers: Option<Value>,
    ) -> String {
        self.send(RequestType::SubscribeExConversations, body, options, headers)
    }

    pub fn unsubscribe_ex_conversations(
        &self,
        body: Value,
        options: RequestOptions,
        headers: Option<Value>,
    ) -> String {
        self.send(RequestType::UnsubscribeExConversations, body, options, headers)
    }

    /// Change conversation fields (participants, TTR, stage, ...).
    pub fn update_conversation_field(
        &self,
        body: Value,
        options: RequestOptions,
        headers: Option<Value>,
    ) -> String {
        self.send(RequestType::UpdateConversationField, body, options, headers)
    }

    /// Publish a message or chat-state event into a conversation.
    pub fn publish_event(
        &self,
        body: Value,
        options: RequestOptions,
        headers: Option<Value>,
    ) -> String {
        self.send(RequestType::PublishEvent, body, options, headers)
    }

    pub fn query_messages(
        &self,
        body: Value,
        options: RequestOptions,
        headers: Option<Value>,
    ) -> String {
        self.send(RequestType::QueryMessages, body, options, headers)
    }

    /// Accept or reject a ring.
    pub fn update_ring_state(
        &self,
        body: Value,
        options: RequestOptions,
        headers: Option<Value>,
    ) -> String {
        self.send(RequestType::UpdateRingState, body, options, headers)
    }

    /// Subscribe to routing tasks, delivered as
    /// `routing.RoutingTaskNotification`.
    pub fn subscribe_routing_tasks(
        &self,
        body: Value,
        options: RequestOptions,
        headers: Option<Value>,
    ) -> String {
        self.send(RequestType::SubscribeRoutingTasks, body, options, headers)
    }

    pub fn update_routing_task_subscription(
        &self,
        body: Value,
        options: RequestOptions,
        headers: Option<Value>,
    ) -> String {
        self.send(RequestType::UpdateRoutingTaskSubscription, body, options, headers)
    }

    pub fn get_user_profile(
        &self,
        body: Value,
        options: RequestOptions,
        headers: Option<Value>,
    ) -> String {
        self.send(RequestType::GetUserProfile, body, options, headers)
    }

    pub fn set_agent_state(
        &self,
        body: Value,
        options: RequestOptions,
        headers: Option<Value>,
    ) -> String {
        self.send(RequestType::SetAgentState, body, options, headers)
    }

    /// Subscribe to agent state changes, delivered as
    /// `routing.AgentStateNotification`.
    pub fn subscribe_agents_state(
        &self,
        body: Value,
        options: RequestOptions,
        headers: Option<Value>,
    ) -> String {
        self.send(RequestType::SubscribeAgentsState, body, options, headers)
    }

    pub fn generate_url_for_download_file(
        &self,
        body: Value,
        options: RequestOptions,
        headers: Option<Value>,
    ) -> String {
        self.send(RequestType::GenerateUrlForDownloadFile, body, options, headers)
    }

    pub fn generate_url_for_upload_file(
        &self,
        body: Value,
        options: RequestOptions,
        headers: Option<Value>,
    ) -> String {
        self.send(RequestType::GenerateUrlForUploadFile, body, options, headers)
    }
}
