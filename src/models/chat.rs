use chrono::{DateTime, Utc};
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use super::{FromSqliteRow, UserRole, UserSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationType {
    #[default]
    Direct,
    Group,
}

impl ConversationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationType::Direct => "direct",
            ConversationType::Group => "group",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "group" => ConversationType::Group,
            _ => ConversationType::Direct,
        }
    }
}

/// A conversation as seen by one participant.
#[derive(Debug, Clone, Serialize)]
pub struct Conversation {
    pub id: i64,
    pub tenant_id: String,
    #[serde(rename = "type")]
    pub kind: ConversationType,
    pub name: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub last_read_at: Option<DateTime<Utc>>,
    pub is_muted: bool,
}

impl FromSqliteRow for Conversation {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let kind: String = row.get("type")?;
        Ok(Self {
            id: row.get("id")?,
            tenant_id: row.get("tenant_id")?,
            kind: ConversationType::parse(&kind),
            name: row.get("name")?,
            last_message_at: row.get("last_message_at")?,
            created_at: row.get("created_at")?,
            last_read_at: row.get("last_read_at")?,
            is_muted: row.get("is_muted")?,
        })
    }
}

/// Inbox row: conversation plus unread count, preview and counterparts.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationSummary {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub unread_count: i64,
    pub last_message: Option<String>,
    pub last_message_sender_id: Option<String>,
    pub other_participants: Vec<UserSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversationDetail {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub participants: Vec<UserSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub conversation_id: i64,
    pub sender_id: String,
    pub content: String,
    pub message_type: String,
    pub attachments: Option<serde_json::Value>,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub sender_first_name: String,
    pub sender_last_name: String,
    pub sender_role: UserRole,
}

impl FromSqliteRow for Message {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let attachments: Option<String> = row.get("attachments")?;
        let role: String = row.get("sender_role")?;
        Ok(Self {
            id: row.get("id")?,
            conversation_id: row.get("conversation_id")?,
            sender_id: row.get("sender_id")?,
            content: row.get("content")?,
            message_type: row.get("message_type")?,
            attachments: attachments.and_then(|raw| serde_json::from_str(&raw).ok()),
            read_at: row.get("read_at")?,
            created_at: row.get("created_at")?,
            sender_first_name: row.get("sender_first_name")?,
            sender_last_name: row.get("sender_last_name")?,
            sender_role: UserRole::parse(&role),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConversation {
    #[serde(default, rename = "type")]
    pub kind: ConversationType,
    pub name: Option<String>,
    pub participant_ids: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessage {
    pub content: String,
    pub message_type: Option<String>,
    pub attachments: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl Pagination {
    pub fn new(page: i64, limit: i64, total: i64) -> Self {
        Self {
            page,
            limit,
            total,
            total_pages: (total + limit - 1) / limit,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MessagePage {
    pub messages: Vec<Message>,
    pub pagination: Pagination,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversation_type_parse() {
        assert_eq!(ConversationType::parse("group"), ConversationType::Group);
        assert_eq!(ConversationType::parse("direct"), ConversationType::Direct);
        assert_eq!(ConversationType::parse("other"), ConversationType::Direct);
    }

    #[test]
    fn test_create_conversation_defaults_to_direct() {
        let body = r#"{"participantIds": ["u2"]}"#;
        let form: CreateConversation = serde_json::from_str(body).unwrap();
        assert_eq!(form.kind, ConversationType::Direct);
        assert_eq!(form.participant_ids, vec!["u2".to_string()]);
    }

    #[test]
    fn test_pagination_rounds_up() {
        let p = Pagination::new(1, 50, 101);
        assert_eq!(p.total_pages, 3);
        assert_eq!(Pagination::new(1, 50, 0).total_pages, 0);
    }
}
