use axum::{extract::State, Json};
use axum_extra::extract::CookieJar;
use serde_json::{json, Value};

use crate::error::{AppError, Result};
use crate::middleware::AuthUser;
use crate::models::LoginCredentials;
use crate::repositories::{SessionRepository, UserRepository};
use crate::session::{create_session_cookie, remove_session_cookie};

#[derive(Clone)]
pub struct AuthState {
    pub user_repo: UserRepository,
    pub session_repo: SessionRepository,
    pub secure_cookies: bool,
}

pub async fn login(
    State(state): State<AuthState>,
    jar: CookieJar,
    Json(credentials): Json<LoginCredentials>,
) -> Result<(CookieJar, Json<Value>)> {
    if credentials.email.trim().is_empty() || credentials.password.is_empty() {
        return Err(AppError::Validation(
            "Email and password are required".to_string(),
        ));
    }

    let user = state
        .user_repo
        .verify_password(&credentials.email, &credentials.password)
        .await?
        .ok_or_else(|| {
            tracing::info!("Failed login attempt");
            AppError::Unauthorized
        })?;

    let token = state.session_repo.create(&user.id).await?;
    tracing::info!(user_id = %user.id, tenant_id = %user.tenant_id, "User logged in");

    let jar = jar.add(create_session_cookie(&token, state.secure_cookies));
    Ok((
        jar,
        Json(json!({
            "success": true,
            "data": { "user": user, "token": token }
        })),
    ))
}

pub async fn logout(
    State(state): State<AuthState>,
    user: AuthUser,
    jar: CookieJar,
) -> Result<(CookieJar, Json<Value>)> {
    state.session_repo.delete(&user.token).await?;
    tracing::info!(user_id = %user.id, "User logged out");

    let jar = jar.remove(remove_session_cookie());
    Ok((jar, Json(json!({ "success": true, "message": "Logged out" }))))
}

pub async fn me(State(state): State<AuthState>, user: AuthUser) -> Result<Json<Value>> {
    let user = state
        .user_repo
        .find_by_id(&user.id)
        .await?
        .ok_or(AppError::Unauthorized)?;

    Ok(Json(json!({ "success": true, "data": { "user": user } })))
}
