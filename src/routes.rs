use std::sync::Arc;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, put},
    Extension, Router,
};

use crate::handlers::{auth, chat, health, readiness, socket};
use crate::middleware::{csrf_protection, request_id, CsrfPolicy};
use crate::repositories::SessionRepository;

pub fn create_router(
    health_state: health::HealthState,
    auth_state: auth::AuthState,
    readiness_state: readiness::ReadinessState,
    chat_state: chat::ChatState,
    session_repo: SessionRepository,
    csrf_policy: Arc<CsrfPolicy>,
) -> Router {
    let socket_state = socket::SocketState {
        chat: chat_state.clone(),
        session_repo: session_repo.clone(),
    };

    Router::new()
        .route("/health", get(health::health_check))
        .with_state(health_state)
        // Auth routes
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/me", get(auth::me))
        .with_state(auth_state)
        // Readiness routes
        .route("/api/readiness/{client_id}", post(readiness::save))
        .route("/api/readiness/{client_id}/today", get(readiness::today))
        .route("/api/readiness/{client_id}/history", get(readiness::history))
        .route("/api/readiness/{client_id}/average", get(readiness::average))
        .with_state(readiness_state)
        // Chat routes
        .route(
            "/api/chat/conversations",
            get(chat::list_conversations).post(chat::create_conversation),
        )
        .route("/api/chat/conversations/{id}", get(chat::get_conversation))
        .route(
            "/api/chat/conversations/{id}/messages",
            get(chat::list_messages).post(chat::send_message),
        )
        .route("/api/chat/conversations/{id}/read", put(chat::mark_as_read))
        .route("/api/chat/conversations/{id}/mute", put(chat::toggle_mute))
        .route("/api/chat/users", get(chat::available_users))
        .route("/api/chat/online", get(chat::online_users))
        .with_state(chat_state)
        // Realtime channel
        .route("/api/ws", get(socket::upgrade))
        .with_state(socket_state)
        .layer(from_fn_with_state(csrf_policy, csrf_protection))
        .layer(Extension(session_repo))
        .layer(from_fn(request_id))
}
