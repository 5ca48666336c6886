use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::AppError;
use crate::models::{User, UserRole};
use crate::repositories::SessionRepository;
use crate::session::get_session_token;

/// The authenticated caller. Every query made on its behalf is scoped to
/// `tenant_id`.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: String,
    pub tenant_id: String,
    pub email: String,
    pub role: UserRole,
    pub first_name: String,
    pub last_name: String,
    pub token: String,
}

impl AuthUser {
    pub fn from_user(user: User, token: String) -> Self {
        Self {
            id: user.id,
            tenant_id: user.tenant_id,
            email: user.email,
            role: user.role,
            first_name: user.first_name,
            last_name: user.last_name,
            token,
        }
    }

    /// Resolve a raw session token into a caller.
    pub async fn from_token(
        session_repo: &SessionRepository,
        token: &str,
    ) -> Result<Option<Self>, AppError> {
        let user = session_repo.find_user(token).await?;
        Ok(user.map(|u| Self::from_user(u, token.to_string())))
    }
}

fn session_repo(parts: &Parts) -> Result<SessionRepository, AppError> {
    parts
        .extensions
        .get::<SessionRepository>()
        .cloned()
        .ok_or_else(|| AppError::Internal("session repository not configured".to_string()))
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = get_session_token(&parts.headers).ok_or(AppError::Unauthorized)?;
        let repo = session_repo(parts)?;

        AuthUser::from_token(&repo, &token)
            .await?
            .ok_or(AppError::Unauthorized)
    }
}
