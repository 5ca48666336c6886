use std::time::Instant;

use axum::extract::ws::{Message as WsMessage, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use uuid::Uuid;

use super::events::{ClientEvent, FrameError, ServerEvent};
use super::hub::{conversation_room, notifications_room, tenant_room, Hub};
use super::rate_limit::EventRateLimit;
use crate::middleware::AuthUser;
use crate::repositories::chat_repo::NewMessage;
use crate::repositories::ChatRepository;

/// Server-side state of one authenticated socket.
pub struct ConnectionSession {
    pub id: Uuid,
    user: AuthUser,
    hub: Hub,
    chat_repo: ChatRepository,
    rate_limit: EventRateLimit,
}

impl ConnectionSession {
    /// Register with the hub and announce presence to the tenant.
    pub async fn open(
        user: AuthUser,
        hub: Hub,
        chat_repo: ChatRepository,
        tx: mpsc::UnboundedSender<ServerEvent>,
    ) -> Self {
        let id = Uuid::new_v4();
        let presence = hub.register(id, &user.id, &user.tenant_id, tx).await;
        tracing::info!(connection_id = %id, email = %user.email, "Socket connected");

        if presence.changed {
            hub.emit_to_room(
                &tenant_room(&user.tenant_id),
                &ServerEvent::UserOnline {
                    user_id: user.id.clone(),
                },
                Some(id),
            )
            .await;
        }

        Self {
            id,
            user,
            hub,
            chat_repo,
            rate_limit: EventRateLimit::default(),
        }
    }

    /// Handle one inbound text frame.
    pub async fn handle_text(&mut self, text: &str) {
        if !self.rate_limit.check(Instant::now()) {
            tracing::warn!(email = %self.user.email, "Socket rate limit exceeded");
            self.reply(ServerEvent::error("Too many requests, slow down"))
                .await;
            return;
        }

        match ClientEvent::parse(text) {
            Ok(event) => self.dispatch(event).await,
            Err(FrameError::Rejected(message)) => self.reply(ServerEvent::error(message)).await,
            Err(FrameError::Ignored) => {}
        }
    }

    async fn dispatch(&mut self, event: ClientEvent) {
        tracing::debug!(connection_id = %self.id, event = event.name(), "Socket event");

        match event {
            ClientEvent::JoinConversation(conversation_id) => {
                match self
                    .chat_repo
                    .is_participant(conversation_id, &self.user.id)
                    .await
                {
                    Ok(true) => {
                        self.hub
                            .join(self.id, conversation_room(conversation_id))
                            .await
                    }
                    Ok(false) => {
                        self.reply(ServerEvent::error("Conversation not found"))
                            .await
                    }
                    Err(e) => tracing::error!("join_conversation failed: {:?}", e),
                }
            }
            ClientEvent::LeaveConversation(conversation_id) => {
                self.hub
                    .leave(self.id, &conversation_room(conversation_id))
                    .await
            }
            ClientEvent::SendMessage {
                conversation_id,
                content,
                attachments,
            } => {
                self.send_message(conversation_id, content, attachments)
                    .await
            }
            ClientEvent::TypingStart(conversation_id) => {
                let event = ServerEvent::UserTyping {
                    user_id: self.user.id.clone(),
                    conversation_id,
                };
                self.typing(conversation_id, event).await;
            }
            ClientEvent::TypingStop(conversation_id) => {
                let event = ServerEvent::UserStoppedTyping {
                    user_id: self.user.id.clone(),
                    conversation_id,
                };
                self.typing(conversation_id, event).await;
            }
            ClientEvent::MessageRead {
                conversation_id,
                message_id,
            } => self.message_read(conversation_id, message_id).await,
            ClientEvent::SubscribeNotifications => {
                self.hub
                    .join(self.id, notifications_room(&self.user.id))
                    .await
            }
        }
    }

    async fn send_message(
        &mut self,
        conversation_id: i64,
        content: String,
        attachments: Vec<serde_json::Value>,
    ) {
        let message = NewMessage {
            content,
            message_type: "text".to_string(),
            attachments: (!attachments.is_empty()).then_some(attachments),
        };

        match self
            .chat_repo
            .send_message(&self.user.tenant_id, conversation_id, &self.user.id, message)
            .await
        {
            Ok(Some(stored)) => {
                // Sender receives its own copy, joined or not.
                let room = conversation_room(conversation_id);
                let event = ServerEvent::NewMessage(stored);
                let joined = self.hub.is_in_room(self.id, &room).await;
                self.hub.emit_to_room(&room, &event, None).await;
                if !joined {
                    self.reply(event).await;
                }
            }
            Ok(None) => {
                self.reply(ServerEvent::error("Conversation not found"))
                    .await
            }
            Err(e) => {
                tracing::error!("send_message failed: {:?}", e);
                self.reply(ServerEvent::error("Failed to send message"))
                    .await
            }
        }
    }

    /// Typing indicators are dropped silently for non-participants.
    async fn typing(&mut self, conversation_id: i64, event: ServerEvent) {
        match self
            .chat_repo
            .is_participant(conversation_id, &self.user.id)
            .await
        {
            Ok(true) => self.broadcast_to_conversation(conversation_id, event).await,
            Ok(false) => {}
            Err(e) => tracing::error!("typing failed: {:?}", e),
        }
    }

    async fn message_read(&mut self, conversation_id: i64, message_id: i64) {
        match self
            .chat_repo
            .is_participant(conversation_id, &self.user.id)
            .await
        {
            Ok(true) => {}
            Ok(false) => return,
            Err(e) => {
                tracing::error!("message_read failed: {:?}", e);
                return;
            }
        }

        if let Err(e) = self
            .chat_repo
            .mark_messages_read(conversation_id, message_id, &self.user.id)
            .await
        {
            tracing::error!("message_read failed: {:?}", e);
            return;
        }

        let event = ServerEvent::MessagesRead {
            user_id: self.user.id.clone(),
            conversation_id,
            up_to_message_id: message_id,
        };
        self.broadcast_to_conversation(conversation_id, event).await;
    }

    async fn broadcast_to_conversation(&self, conversation_id: i64, event: ServerEvent) {
        self.hub
            .emit_to_room(&conversation_room(conversation_id), &event, Some(self.id))
            .await;
    }

    async fn reply(&self, event: ServerEvent) {
        self.hub.send_to(self.id, event).await;
    }

    /// Unregister and announce the user offline if this was their last socket.
    pub async fn close(self) {
        tracing::info!(connection_id = %self.id, email = %self.user.email, "Socket disconnected");
        if let Some(presence) = self.hub.unregister(self.id).await {
            if presence.changed {
                self.hub
                    .emit_to_room(
                        &tenant_room(&presence.tenant_id),
                        &ServerEvent::UserOffline {
                            user_id: presence.user_id,
                        },
                        None,
                    )
                    .await;
            }
        }
    }
}

/// Drive an upgraded socket until the peer disconnects.
pub async fn serve_socket(socket: WebSocket, user: AuthUser, hub: Hub, chat_repo: ChatRepository) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();

    let send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(e) => {
                    tracing::warn!(error = ?e, "Failed to serialize socket event");
                    continue;
                }
            };
            if ws_tx.send(WsMessage::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let mut session = ConnectionSession::open(user, hub, chat_repo, tx).await;

    while let Some(msg) = ws_rx.next().await {
        match msg {
            Ok(WsMessage::Text(text)) => session.handle_text(text.as_str()).await,
            Ok(WsMessage::Close(_)) | Err(_) => break,
            _ => {}
        }
    }

    session.close().await;
    send_task.abort();
}
