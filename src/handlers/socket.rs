use axum::{
    extract::{
        ws::rejection::WebSocketUpgradeRejection, Query, State, WebSocketUpgrade,
    },
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::middleware::AuthUser;
use crate::realtime::serve_socket;
use crate::repositories::SessionRepository;
use crate::session::get_session_token;

use super::chat::ChatState;

#[derive(Debug, Default, Deserialize)]
pub struct SocketQuery {
    pub token: Option<String>,
}

#[derive(Clone)]
pub struct SocketState {
    pub chat: ChatState,
    pub session_repo: SessionRepository,
}

async fn authenticate(
    session_repo: &SessionRepository,
    headers: &HeaderMap,
    query: SocketQuery,
) -> Result<AuthUser> {
    let token = get_session_token(headers)
        .or(query.token.filter(|t| !t.is_empty()))
        .ok_or(AppError::Unauthorized)?;

    AuthUser::from_token(session_repo, &token)
        .await?
        .ok_or(AppError::Unauthorized)
}

/// Upgrade to the realtime channel. The session comes from the cookie or
/// bearer header, or from `?token=` for clients that cannot set headers.
/// Authentication is checked before the upgrade itself.
pub async fn upgrade(
    State(state): State<SocketState>,
    headers: HeaderMap,
    Query(query): Query<SocketQuery>,
    ws: std::result::Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let user = match authenticate(&state.session_repo, &headers, query).await {
        Ok(user) => user,
        Err(e) => {
            tracing::debug!("Socket authentication failed: {}", e);
            return e.into_response();
        }
    };

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return rejection.into_response(),
    };

    let hub = state.chat.hub.clone();
    let chat_repo = state.chat.chat_repo.clone();
    ws.on_upgrade(move |socket| serve_socket(socket, user, hub, chat_repo))
}
