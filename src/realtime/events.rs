use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::Message;

pub const MAX_CONTENT_CHARS: usize = 5000;
pub const MAX_ATTACHMENTS: usize = 10;

/// Raw inbound frame. Payloads are validated per event.
#[derive(Debug, Clone, Deserialize)]
pub struct Frame {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    JoinConversation(i64),
    LeaveConversation(i64),
    SendMessage {
        conversation_id: i64,
        content: String,
        attachments: Vec<Value>,
    },
    TypingStart(i64),
    TypingStop(i64),
    MessageRead {
        conversation_id: i64,
        message_id: i64,
    },
    SubscribeNotifications,
}

/// Why an inbound frame was not turned into a [`ClientEvent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Dropped without a reply.
    Ignored,
    /// Answered with an `error` event.
    Rejected(&'static str),
}

impl ClientEvent {
    pub fn parse(text: &str) -> Result<Self, FrameError> {
        let frame: Frame =
            serde_json::from_str(text).map_err(|_| FrameError::Rejected("Invalid message format"))?;
        Self::from_frame(frame)
    }

    pub fn from_frame(frame: Frame) -> Result<Self, FrameError> {
        let id = || parse_id(&frame.data).ok_or(FrameError::Ignored);

        match frame.event.as_str() {
            "join_conversation" => Ok(ClientEvent::JoinConversation(id()?)),
            "leave_conversation" => Ok(ClientEvent::LeaveConversation(id()?)),
            "typing_start" => Ok(ClientEvent::TypingStart(id()?)),
            "typing_stop" => Ok(ClientEvent::TypingStop(id()?)),
            "subscribe_notifications" => Ok(ClientEvent::SubscribeNotifications),
            "send_message" => {
                let data = frame.data.as_object().ok_or(FrameError::Ignored)?;
                let conversation_id = data
                    .get("conversationId")
                    .and_then(parse_id)
                    .ok_or(FrameError::Rejected("Invalid conversationId"))?;
                let content = data
                    .get("content")
                    .and_then(Value::as_str)
                    .map(sanitize_content)
                    .filter(|c| !c.trim().is_empty())
                    .ok_or(FrameError::Rejected("Message content is empty"))?;
                let attachments = data
                    .get("attachments")
                    .and_then(Value::as_array)
                    .map(|a| a.iter().take(MAX_ATTACHMENTS).cloned().collect())
                    .unwrap_or_default();
                Ok(ClientEvent::SendMessage {
                    conversation_id,
                    content,
                    attachments,
                })
            }
            "message_read" => {
                let data = frame.data.as_object().ok_or(FrameError::Ignored)?;
                let conversation_id = data.get("conversationId").and_then(parse_id);
                let message_id = data.get("messageId").and_then(parse_id);
                match (conversation_id, message_id) {
                    (Some(conversation_id), Some(message_id)) => Ok(ClientEvent::MessageRead {
                        conversation_id,
                        message_id,
                    }),
                    _ => Err(FrameError::Ignored),
                }
            }
            _ => Err(FrameError::Rejected("Unknown event")),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::JoinConversation(_) => "join_conversation",
            ClientEvent::LeaveConversation(_) => "leave_conversation",
            ClientEvent::SendMessage { .. } => "send_message",
            ClientEvent::TypingStart(_) => "typing_start",
            ClientEvent::TypingStop(_) => "typing_stop",
            ClientEvent::MessageRead { .. } => "message_read",
            ClientEvent::SubscribeNotifications => "subscribe_notifications",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
#[serde(rename_all_fields = "camelCase")]
pub enum ServerEvent {
    NewMessage(Message),
    UserTyping {
        user_id: String,
        conversation_id: i64,
    },
    UserStoppedTyping {
        user_id: String,
        conversation_id: i64,
    },
    MessagesRead {
        user_id: String,
        conversation_id: i64,
        up_to_message_id: i64,
    },
    UserOnline {
        user_id: String,
    },
    UserOffline {
        user_id: String,
    },
    Notification(Value),
    Error {
        message: String,
    },
}

impl ServerEvent {
    pub fn error(message: impl Into<String>) -> Self {
        ServerEvent::Error {
            message: message.into(),
        }
    }
}

/// Positive integer id, given either as a JSON number or a numeric string.
pub fn parse_id(value: &Value) -> Option<i64> {
    let id = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }?;
    (id > 0).then_some(id)
}

/// Truncate to [`MAX_CONTENT_CHARS`] characters and strip angle brackets.
pub fn sanitize_content(raw: &str) -> String {
    raw.chars()
        .take(MAX_CONTENT_CHARS)
        .filter(|c| *c != '<' && *c != '>')
        .collect()
}
