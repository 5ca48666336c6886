use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{AppError, Result};
use crate::middleware::AuthUser;
use crate::models::{CreateConversation, SendMessage};
use crate::realtime::hub::conversation_room;
use crate::realtime::{Hub, ServerEvent};
use crate::repositories::chat_repo::{NewMessage, DEFAULT_MESSAGE_LIMIT};
use crate::repositories::{ChatRepository, UserRepository};

pub const MAX_MESSAGE_CHARS: usize = 5000;
pub const MESSAGE_TYPES: &[&str] = &["text", "image", "file", "audio"];

#[derive(Clone)]
pub struct ChatState {
    pub chat_repo: ChatRepository,
    pub user_repo: UserRepository,
    pub hub: Hub,
}

#[derive(Debug, Default, Deserialize)]
pub struct MessagesQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

fn not_authorized() -> AppError {
    AppError::Forbidden("Not authorized".to_string())
}

pub async fn list_conversations(
    State(state): State<ChatState>,
    user: AuthUser,
) -> Result<Json<Value>> {
    let conversations = state
        .chat_repo
        .list_conversations(&user.tenant_id, &user.id)
        .await?;

    Ok(Json(json!({ "success": true, "data": { "conversations": conversations } })))
}

pub async fn get_conversation(
    State(state): State<ChatState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Value>> {
    let conversation = state
        .chat_repo
        .find_conversation(&user.tenant_id, id, &user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Conversation not found".to_string()))?;

    Ok(Json(json!({ "success": true, "data": { "conversation": conversation } })))
}

pub async fn create_conversation(
    State(state): State<ChatState>,
    user: AuthUser,
    Json(form): Json<CreateConversation>,
) -> Result<(StatusCode, Json<Value>)> {
    let mut requested: Vec<String> = form
        .participant_ids
        .into_iter()
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty() && *id != user.id)
        .collect();
    requested.sort();
    requested.dedup();

    if requested.is_empty() {
        return Err(AppError::Validation(
            "At least one participant is required".to_string(),
        ));
    }
    if form.name.as_ref().is_some_and(|n| n.chars().count() > 255) {
        return Err(AppError::Validation(
            "Name must be at most 255 characters".to_string(),
        ));
    }

    let members = state
        .user_repo
        .filter_tenant_members(&user.tenant_id, &requested)
        .await?;
    if members.len() != requested.len() {
        return Err(AppError::Validation(
            "Participants must belong to your organization".to_string(),
        ));
    }

    let conversation = state
        .chat_repo
        .create_conversation(&user.tenant_id, &user.id, form.kind, form.name, members)
        .await?;
    tracing::debug!(conversation_id = conversation.conversation.id, "Conversation ready");

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "data": { "conversation": conversation } })),
    ))
}

pub async fn list_messages(
    State(state): State<ChatState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Query(query): Query<MessagesQuery>,
) -> Result<Json<Value>> {
    let page = query.page.filter(|p| *p > 0).unwrap_or(1);
    let limit = query
        .limit
        .filter(|l| *l > 0)
        .unwrap_or(DEFAULT_MESSAGE_LIMIT);

    let result = state
        .chat_repo
        .messages(&user.tenant_id, id, &user.id, page, limit)
        .await?
        .ok_or_else(not_authorized)?;

    Ok(Json(json!({ "success": true, "data": result })))
}

pub async fn send_message(
    State(state): State<ChatState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(form): Json<SendMessage>,
) -> Result<(StatusCode, Json<Value>)> {
    if form.content.trim().is_empty() {
        return Err(AppError::Validation("Message content is required".to_string()));
    }
    if form.content.chars().count() > MAX_MESSAGE_CHARS {
        return Err(AppError::Validation(format!(
            "Message must be at most {} characters",
            MAX_MESSAGE_CHARS
        )));
    }
    let message_type = form.message_type.unwrap_or_else(|| "text".to_string());
    if !MESSAGE_TYPES.contains(&message_type.as_str()) {
        return Err(AppError::Validation(format!(
            "messageType must be one of {}",
            MESSAGE_TYPES.join(", ")
        )));
    }

    let message = state
        .chat_repo
        .send_message(
            &user.tenant_id,
            id,
            &user.id,
            NewMessage {
                content: form.content,
                message_type,
                attachments: form.attachments,
            },
        )
        .await?
        .ok_or_else(not_authorized)?;

    state
        .hub
        .emit_to_room(
            &conversation_room(id),
            &ServerEvent::NewMessage(message.clone()),
            None,
        )
        .await;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "data": { "message": message } })),
    ))
}

pub async fn mark_as_read(
    State(state): State<ChatState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Value>> {
    let updated = state
        .chat_repo
        .mark_as_read(&user.tenant_id, id, &user.id)
        .await?;
    if !updated {
        return Err(AppError::NotFound("Conversation not found".to_string()));
    }
    Ok(Json(json!({ "success": true, "data": { "updated": updated } })))
}

pub async fn toggle_mute(
    State(state): State<ChatState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Value>> {
    let muted = state
        .chat_repo
        .toggle_mute(id, &user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Conversation not found".to_string()))?;

    Ok(Json(json!({ "success": true, "data": { "isMuted": muted } })))
}

pub async fn available_users(
    State(state): State<ChatState>,
    user: AuthUser,
) -> Result<Json<Value>> {
    let users = state
        .user_repo
        .find_active_in_tenant(&user.tenant_id, &user.id)
        .await?;

    Ok(Json(json!({ "success": true, "data": { "users": users } })))
}

pub async fn online_users(State(state): State<ChatState>, user: AuthUser) -> Result<Json<Value>> {
    let online = state.hub.online_users(&user.tenant_id).await;
    Ok(Json(json!({ "success": true, "data": { "onlineUserIds": online } })))
}
