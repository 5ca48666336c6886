use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};

use crate::db::DbPool;
use crate::error::{AppError, Result};
use crate::models::{
    Conversation, ConversationDetail, ConversationSummary, ConversationType, FromSqliteRow,
    Message, MessagePage, Pagination, UserRole, UserSummary,
};

pub const DEFAULT_MESSAGE_LIMIT: i64 = 50;

const CONVERSATION_COLUMNS: &str =
    "c.id, c.tenant_id, c.type, c.name, c.last_message_at, c.created_at, cp.last_read_at, cp.is_muted";

const MESSAGE_SELECT: &str = "SELECT m.*, u.first_name AS sender_first_name,
        u.last_name AS sender_last_name, u.role AS sender_role
     FROM messages m JOIN users u ON m.sender_id = u.id";

#[derive(Debug, Clone)]
pub struct NewMessage {
    pub content: String,
    pub message_type: String,
    pub attachments: Option<Vec<serde_json::Value>>,
}

#[derive(Clone)]
pub struct ChatRepository {
    pool: DbPool,
}

impl ChatRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Inbox of `user_id`, most recently active first.
    pub async fn list_conversations(
        &self,
        tenant_id: &str,
        user_id: &str,
    ) -> Result<Vec<ConversationSummary>> {
        let pool = self.pool.clone();
        let tenant_id = tenant_id.to_string();
        let user_id = user_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let sql = format!(
                "SELECT {CONVERSATION_COLUMNS},
                    (SELECT COUNT(*) FROM messages m
                     WHERE m.conversation_id = c.id
                       AND m.created_at > COALESCE(cp.last_read_at, '')
                       AND m.sender_id != cp.user_id) AS unread_count,
                    (SELECT m.content FROM messages m
                     WHERE m.conversation_id = c.id ORDER BY m.id DESC LIMIT 1) AS last_message,
                    (SELECT m.sender_id FROM messages m
                     WHERE m.conversation_id = c.id ORDER BY m.id DESC LIMIT 1) AS last_message_sender_id
                 FROM conversations c
                 JOIN conversation_participants cp ON c.id = cp.conversation_id AND cp.user_id = ?
                 WHERE c.tenant_id = ?
                 ORDER BY c.last_message_at DESC, c.id DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([&user_id, &tenant_id], |row| {
                    Ok((
                        Conversation::from_row(row)?,
                        row.get::<_, i64>("unread_count")?,
                        row.get::<_, Option<String>>("last_message")?,
                        row.get::<_, Option<String>>("last_message_sender_id")?,
                    ))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            let mut summaries = Vec::with_capacity(rows.len());
            for (conversation, unread_count, last_message, last_message_sender_id) in rows {
                let other_participants =
                    load_participants(&conn, conversation.id, Some(&user_id))?;
                summaries.push(ConversationSummary {
                    conversation,
                    unread_count,
                    last_message,
                    last_message_sender_id,
                    other_participants,
                });
            }
            Ok(summaries)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    /// Conversation details; `None` unless `user_id` participates.
    pub async fn find_conversation(
        &self,
        tenant_id: &str,
        conversation_id: i64,
        user_id: &str,
    ) -> Result<Option<ConversationDetail>> {
        let pool = self.pool.clone();
        let tenant_id = tenant_id.to_string();
        let user_id = user_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let detail = load_conversation(&conn, &tenant_id, conversation_id, &user_id)?;
            Ok(detail)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    /// Create a conversation between `user_id` and `participant_ids`.
    ///
    /// A direct conversation with a single counterpart is reused if one
    /// already exists in the tenant.
    pub async fn create_conversation(
        &self,
        tenant_id: &str,
        user_id: &str,
        kind: ConversationType,
        name: Option<String>,
        participant_ids: Vec<String>,
    ) -> Result<ConversationDetail> {
        let pool = self.pool.clone();
        let tenant_id = tenant_id.to_string();
        let user_id = user_id.to_string();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;

            if kind == ConversationType::Direct && participant_ids.len() == 1 {
                let existing: Option<i64> = conn
                    .query_row(
                        "SELECT c.id FROM conversations c
                         JOIN conversation_participants cp1 ON c.id = cp1.conversation_id AND cp1.user_id = ?
                         JOIN conversation_participants cp2 ON c.id = cp2.conversation_id AND cp2.user_id = ?
                         WHERE c.tenant_id = ? AND c.type = 'direct'
                         LIMIT 1",
                        rusqlite::params![user_id, participant_ids[0], tenant_id],
                        |row| row.get(0),
                    )
                    .optional()?;

                if let Some(id) = existing {
                    return load_conversation(&conn, &tenant_id, id, &user_id)?.ok_or_else(|| {
                        AppError::Internal("conversation vanished during lookup".to_string())
                    });
                }
            }

            let now = Utc::now();
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO conversations (tenant_id, type, name, created_at) VALUES (?, ?, ?, ?)",
                rusqlite::params![tenant_id, kind.as_str(), name, now],
            )?;
            let conversation_id = tx.last_insert_rowid();

            tx.execute(
                "INSERT INTO conversation_participants (conversation_id, user_id, joined_at) VALUES (?, ?, ?)",
                rusqlite::params![conversation_id, user_id, now],
            )?;
            for participant in participant_ids.iter().filter(|p| **p != user_id) {
                tx.execute(
                    "INSERT OR IGNORE INTO conversation_participants (conversation_id, user_id, joined_at) VALUES (?, ?, ?)",
                    rusqlite::params![conversation_id, participant, now],
                )?;
            }
            tx.commit()?;

            load_conversation(&conn, &tenant_id, conversation_id, &user_id)?
                .ok_or_else(|| AppError::Internal("conversation vanished after insert".to_string()))
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    pub async fn is_participant(&self, conversation_id: i64, user_id: &str) -> Result<bool> {
        let pool = self.pool.clone();
        let user_id = user_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            Ok(is_participant(&conn, conversation_id, &user_id)?)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    /// A page of messages in chronological order. Reading a page marks the
    /// conversation as read for `user_id`. `None` if not a participant.
    pub async fn messages(
        &self,
        tenant_id: &str,
        conversation_id: i64,
        user_id: &str,
        page: i64,
        limit: i64,
    ) -> Result<Option<MessagePage>> {
        let pool = self.pool.clone();
        let tenant_id = tenant_id.to_string();
        let user_id = user_id.to_string();
        let page = page.max(1);
        let limit = limit.clamp(1, 200);
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            if !is_participant(&conn, conversation_id, &user_id)? {
                return Ok(None);
            }

            let total: i64 = conn.query_row(
                "SELECT COUNT(*) FROM messages m
                 JOIN conversations c ON m.conversation_id = c.id
                 WHERE m.conversation_id = ? AND c.tenant_id = ?",
                rusqlite::params![conversation_id, tenant_id],
                |row| row.get(0),
            )?;

            let sql = format!(
                "{MESSAGE_SELECT}
                 JOIN conversations c ON m.conversation_id = c.id
                 WHERE m.conversation_id = ? AND c.tenant_id = ?
                 ORDER BY m.id DESC LIMIT ? OFFSET ?"
            );
            let mut stmt = conn.prepare(&sql)?;
            let mut messages = stmt
                .query_map(
                    rusqlite::params![conversation_id, tenant_id, limit, (page - 1) * limit],
                    Message::from_row,
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            messages.reverse();

            touch_last_read(&conn, conversation_id, &user_id)?;

            Ok(Some(MessagePage {
                messages,
                pagination: Pagination::new(page, limit, total),
            }))
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    /// Store a message from `user_id`. `None` if not a participant of a
    /// conversation in the tenant.
    pub async fn send_message(
        &self,
        tenant_id: &str,
        conversation_id: i64,
        user_id: &str,
        message: NewMessage,
    ) -> Result<Option<Message>> {
        let pool = self.pool.clone();
        let tenant_id = tenant_id.to_string();
        let user_id = user_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let in_tenant: bool = conn.query_row(
                "SELECT COUNT(*) > 0 FROM conversations WHERE id = ? AND tenant_id = ?",
                rusqlite::params![conversation_id, tenant_id],
                |row| row.get(0),
            )?;
            if !in_tenant || !is_participant(&conn, conversation_id, &user_id)? {
                return Ok(None);
            }

            let now = Utc::now();
            let attachments = message
                .attachments
                .as_ref()
                .map(|a| serde_json::Value::Array(a.clone()).to_string());
            conn.execute(
                "INSERT INTO messages (conversation_id, sender_id, content, message_type, attachments, created_at)
                 VALUES (?, ?, ?, ?, ?, ?)",
                rusqlite::params![
                    conversation_id,
                    user_id,
                    message.content,
                    message.message_type,
                    attachments,
                    now
                ],
            )?;
            let message_id = conn.last_insert_rowid();

            conn.execute(
                "UPDATE conversations SET last_message_at = ? WHERE id = ?",
                rusqlite::params![now, conversation_id],
            )?;
            touch_last_read(&conn, conversation_id, &user_id)?;

            let sql = format!("{MESSAGE_SELECT} WHERE m.id = ?");
            let stored = conn.query_row(&sql, [message_id], Message::from_row)?;
            Ok(Some(stored))
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    pub async fn mark_as_read(
        &self,
        tenant_id: &str,
        conversation_id: i64,
        user_id: &str,
    ) -> Result<bool> {
        let pool = self.pool.clone();
        let tenant_id = tenant_id.to_string();
        let user_id = user_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let in_tenant: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM conversations WHERE id = ? AND tenant_id = ?)",
                rusqlite::params![conversation_id, tenant_id],
                |row| row.get(0),
            )?;
            if !in_tenant {
                return Ok(false);
            }
            Ok(touch_last_read(&conn, conversation_id, &user_id)? > 0)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    /// Flip the caller's mute flag. `None` if not a participant.
    pub async fn toggle_mute(&self, conversation_id: i64, user_id: &str) -> Result<Option<bool>> {
        let pool = self.pool.clone();
        let user_id = user_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let updated = conn.execute(
                "UPDATE conversation_participants SET is_muted = NOT is_muted
                 WHERE conversation_id = ? AND user_id = ?",
                rusqlite::params![conversation_id, user_id],
            )?;
            if updated == 0 {
                return Ok(None);
            }
            let muted: bool = conn.query_row(
                "SELECT is_muted FROM conversation_participants WHERE conversation_id = ? AND user_id = ?",
                rusqlite::params![conversation_id, user_id],
                |row| row.get(0),
            )?;
            Ok(Some(muted))
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }

    /// Stamp `read_at` on messages from others up to and including
    /// `up_to_message_id`. Returns the number of messages updated.
    pub async fn mark_messages_read(
        &self,
        conversation_id: i64,
        up_to_message_id: i64,
        reader_id: &str,
    ) -> Result<usize> {
        let pool = self.pool.clone();
        let reader_id = reader_id.to_string();
        let now = Utc::now();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let updated = conn.execute(
                "UPDATE messages SET read_at = ?
                 WHERE conversation_id = ? AND id <= ? AND sender_id != ? AND read_at IS NULL",
                rusqlite::params![now, conversation_id, up_to_message_id, reader_id],
            )?;
            Ok(updated)
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
    }
}

fn is_participant(conn: &Connection, conversation_id: i64, user_id: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM conversation_participants WHERE conversation_id = ? AND user_id = ?",
        rusqlite::params![conversation_id, user_id],
        |row| row.get(0),
    )
}

fn touch_last_read(conn: &Connection, conversation_id: i64, user_id: &str) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE conversation_participants SET last_read_at = ? WHERE conversation_id = ? AND user_id = ?",
        rusqlite::params![Utc::now(), conversation_id, user_id],
    )
}

fn load_participants(
    conn: &Connection,
    conversation_id: i64,
    exclude_user_id: Option<&str>,
) -> rusqlite::Result<Vec<UserSummary>> {
    let mut stmt = conn.prepare(
        "SELECT u.id, u.first_name, u.last_name, u.role
         FROM conversation_participants cp JOIN users u ON cp.user_id = u.id
         WHERE cp.conversation_id = ?
         ORDER BY cp.id",
    )?;
    let participants = stmt
        .query_map([conversation_id], |row| {
            let role: String = row.get("role")?;
            Ok(UserSummary {
                user_id: row.get("id")?,
                first_name: row.get("first_name")?,
                last_name: row.get("last_name")?,
                role: UserRole::parse(&role),
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(match exclude_user_id {
        Some(excluded) => participants
            .into_iter()
            .filter(|p| p.user_id != excluded)
            .collect(),
        None => participants,
    })
}

fn load_conversation(
    conn: &Connection,
    tenant_id: &str,
    conversation_id: i64,
    user_id: &str,
) -> rusqlite::Result<Option<ConversationDetail>> {
    let sql = format!(
        "SELECT {CONVERSATION_COLUMNS}
         FROM conversations c
         JOIN conversation_participants cp ON c.id = cp.conversation_id AND cp.user_id = ?
         WHERE c.id = ? AND c.tenant_id = ?"
    );
    let conversation = conn
        .query_row(
            &sql,
            rusqlite::params![user_id, conversation_id, tenant_id],
            Conversation::from_row,
        )
        .optional()?;

    match conversation {
        Some(conversation) => {
            let participants = load_participants(conn, conversation.id, None)?;
            Ok(Some(ConversationDetail {
                conversation,
                participants,
            }))
        }
        None => Ok(None),
    }
}
