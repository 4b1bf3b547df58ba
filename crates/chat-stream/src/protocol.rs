//! Wire types for the streaming chat endpoint

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::wire;
use crate::frame::Frame;

/// Outbound request body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamRequest {
    /// The user's message
    pub user_message: String,
    /// Ids of the context cards linked into the chat
    pub context_node_ids: Vec<String>,
    /// Project the canvas belongs to
    pub project_id: Uuid,
    /// Chat card the conversation lives in
    pub chat_node_id: String,
    /// Existing conversation to continue, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<Uuid>,
}

impl StreamRequest {
    pub fn new(
        user_message: impl Into<String>,
        project_id: Uuid,
        chat_node_id: impl Into<String>,
    ) -> Self {
        Self {
            user_message: user_message.into(),
            context_node_ids: Vec::new(),
            project_id,
            chat_node_id: chat_node_id.into(),
            conversation_id: None,
        }
    }

    pub fn with_context(mut self, ids: Vec<String>) -> Self {
        self.context_node_ids = ids;
        self
    }

    pub fn with_conversation(mut self, conversation_id: Option<Uuid>) -> Self {
        self.conversation_id = conversation_id;
        self
    }
}

#[derive(Deserialize)]
struct TokenPayload {
    token: String,
}

#[derive(Deserialize)]
struct ConversationPayload {
    conversation_id: Uuid,
}

#[derive(Deserialize)]
struct EndPayload {
    #[serde(default)]
    message_id: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Deserialize)]
struct ErrorPayload {
    error: String,
}

/// A typed event decoded from a frame
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Server acknowledged the request
    StreamStart,
    /// Next piece of the response text
    Token(String),
    /// Id of the conversation this response belongs to
    ConversationId(Uuid),
    /// Response finished
    StreamEnd {
        message_id: Option<String>,
        status: Option<String>,
    },
    /// Server aborted the response
    Error(String),
    /// Event type this client does not know
    Unrecognized(String),
}

impl StreamEvent {
    /// Interpret a frame.
    ///
    /// Returns `None` when a known event carries a payload that does not
    /// parse; such frames are skipped without ending the session.
    pub fn from_frame(frame: &Frame) -> Option<StreamEvent> {
        match frame.event_type.as_str() {
            wire::STREAM_START => Some(StreamEvent::StreamStart),
            wire::MESSAGE | wire::DATA => {
                parse::<TokenPayload>(frame).map(|p| StreamEvent::Token(p.token))
            }
            wire::CONVERSATION_ID => parse::<ConversationPayload>(frame)
                .map(|p| StreamEvent::ConversationId(p.conversation_id)),
            wire::STREAM_END => {
                // An empty or non-JSON end payload still ends the stream
                let end = parse::<EndPayload>(frame);
                Some(StreamEvent::StreamEnd {
                    message_id: end.as_ref().and_then(|e| e.message_id.clone()),
                    status: end.and_then(|e| e.status),
                })
            }
            wire::ERROR => Some(StreamEvent::Error(
                parse::<ErrorPayload>(frame)
                    .map(|p| p.error)
                    .unwrap_or_else(|| frame.payload.clone()),
            )),
            other => Some(StreamEvent::Unrecognized(other.to_string())),
        }
    }
}

fn parse<T: serde::de::DeserializeOwned>(frame: &Frame) -> Option<T> {
    match serde_json::from_str(&frame.payload) {
        Ok(value) => Some(value),
        Err(e) => {
            log::warn!(
                "Skipping '{}' frame with malformed payload: {}",
                frame.event_type,
                e
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(event_type: &str, payload: &str) -> Frame {
        Frame {
            event_type: event_type.into(),
            payload: payload.into(),
        }
    }

    #[test]
    fn test_request_body_shape() {
        let project = Uuid::new_v4();
        let request = StreamRequest::new("hi", project, "chat-node-1")
            .with_context(vec!["context-node-1".into()]);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["user_message"], "hi");
        assert_eq!(json["context_node_ids"][0], "context-node-1");
        assert_eq!(json["project_id"], project.to_string());
        assert_eq!(json["chat_node_id"], "chat-node-1");
        assert!(json.get("conversation_id").is_none());

        let conversation = Uuid::new_v4();
        let json = serde_json::to_value(request.with_conversation(Some(conversation))).unwrap();
        assert_eq!(json["conversation_id"], conversation.to_string());
    }

    #[test]
    fn test_token_events() {
        assert_eq!(
            StreamEvent::from_frame(&frame("message", r#"{"token":"Hel"}"#)),
            Some(StreamEvent::Token("Hel".into()))
        );
        assert_eq!(
            StreamEvent::from_frame(&frame("data", r#"{"token":"lo"}"#)),
            Some(StreamEvent::Token("lo".into()))
        );
        assert_eq!(StreamEvent::from_frame(&frame("message", "not json")), None);
        assert_eq!(StreamEvent::from_frame(&frame("message", r#"{"text":"x"}"#)), None);
    }

    #[test]
    fn test_conversation_id_event() {
        let id = Uuid::new_v4();
        let payload = format!(r#"{{"conversation_id":"{}"}}"#, id);
        assert_eq!(
            StreamEvent::from_frame(&frame("conversation_id", &payload)),
            Some(StreamEvent::ConversationId(id))
        );
        assert_eq!(
            StreamEvent::from_frame(&frame("conversation_id", r#"{"conversation_id":"nope"}"#)),
            None
        );
    }

    #[test]
    fn test_stream_end_event() {
        assert_eq!(
            StreamEvent::from_frame(&frame(
                "stream_end",
                r#"{"message_id":"m1","status":"complete"}"#
            )),
            Some(StreamEvent::StreamEnd {
                message_id: Some("m1".into()),
                status: Some("complete".into()),
            })
        );
        assert_eq!(
            StreamEvent::from_frame(&frame("stream_end", "")),
            Some(StreamEvent::StreamEnd {
                message_id: None,
                status: None,
            })
        );
    }

    #[test]
    fn test_error_event_falls_back_to_raw_payload() {
        assert_eq!(
            StreamEvent::from_frame(&frame("error", r#"{"error":"quota exceeded"}"#)),
            Some(StreamEvent::Error("quota exceeded".into()))
        );
        assert_eq!(
            StreamEvent::from_frame(&frame("error", "upstream timeout")),
            Some(StreamEvent::Error("upstream timeout".into()))
        );
    }

    #[test]
    fn test_start_and_unknown_events() {
        assert_eq!(
            StreamEvent::from_frame(&frame("stream_start", "{}")),
            Some(StreamEvent::StreamStart)
        );
        assert_eq!(
            StreamEvent::from_frame(&frame("heartbeat", "{}")),
            Some(StreamEvent::Unrecognized("heartbeat".into()))
        );
    }
}
