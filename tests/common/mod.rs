#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request},
    response::Response,
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use atlas::db::{create_memory_pool, DbPool};
use atlas::handlers::{auth, chat, health, readiness};
use atlas::middleware::CsrfPolicy;
use atlas::migrations::run_migrations_for_tests;
use atlas::models::{Client, CreateTenant, CreateUser, Tenant, User, UserRole};
use atlas::realtime::Hub;
use atlas::repositories::{
    AlertRepository, ChatRepository, CheckinRepository, ClientRepository, SessionRepository,
    TenantRepository, UserRepository,
};

pub const FRONTEND_ORIGIN: &str = "http://localhost:5173";
pub const TEST_PASSWORD: &str = "password123";

pub fn setup_test_db() -> DbPool {
    let pool = create_memory_pool().expect("Failed to create test database");
    run_migrations_for_tests(&pool).expect("Failed to run migrations");
    pool
}

pub struct TestApp {
    pub router: Router,
    pub hub: Hub,
}

pub fn create_test_app(pool: DbPool) -> Router {
    create_test_app_with_hub(pool).router
}

pub fn create_test_app_with_hub(pool: DbPool) -> TestApp {
    let health_state = health::HealthState { pool: pool.clone() };
    let user_repo = UserRepository::new(pool.clone());
    let session_repo = SessionRepository::new(pool.clone());
    let hub = Hub::new();

    let auth_state = auth::AuthState {
        user_repo: user_repo.clone(),
        session_repo: session_repo.clone(),
        secure_cookies: false,
    };
    let readiness_state = readiness::ReadinessState {
        client_repo: ClientRepository::new(pool.clone()),
        checkin_repo: CheckinRepository::new(pool.clone()),
        alert_repo: AlertRepository::new(pool.clone()),
    };
    let chat_state = chat::ChatState {
        chat_repo: ChatRepository::new(pool.clone()),
        user_repo,
        hub: hub.clone(),
    };
    let csrf_policy = Arc::new(CsrfPolicy::new(
        vec![FRONTEND_ORIGIN.to_string()],
        vec!["/api/webhooks".to_string()],
    ));

    let router = atlas::routes::create_router(
        health_state,
        auth_state,
        readiness_state,
        chat_state,
        session_repo,
        csrf_policy,
    );

    TestApp {
        router,
        hub,
    }
}

pub async fn create_test_tenant(pool: &DbPool, name: &str) -> Tenant {
    TenantRepository::new(pool.clone())
        .create(CreateTenant {
            id: None,
            business_name: name.to_string(),
            owner_email: format!("owner@{}.test", name.to_lowercase()),
            subscription_plan: "basic".to_string(),
            max_clients: 10,
        })
        .await
        .unwrap()
}

pub async fn create_test_user(
    pool: &DbPool,
    tenant_id: &str,
    email: &str,
    role: UserRole,
) -> User {
    UserRepository::new(pool.clone())
        .create(
            tenant_id,
            &CreateUser {
                email: email.to_string(),
                password: TEST_PASSWORD.to_string(),
                role,
                first_name: "Test".to_string(),
                last_name: email.split('@').next().unwrap_or("User").to_string(),
            },
        )
        .await
        .unwrap()
}

pub async fn create_test_client(pool: &DbPool, tenant_id: &str, user_id: Option<&str>) -> Client {
    ClientRepository::new(pool.clone())
        .create(tenant_id, user_id, "Casey", "Client", None)
        .await
        .unwrap()
}

pub async fn create_session_cookie(pool: &DbPool, user: &User) -> String {
    let token = SessionRepository::new(pool.clone())
        .create(&user.id)
        .await
        .unwrap();
    format!("access_token={}", token)
}

/// Move a session's expiry into the past.
pub fn expire_session(pool: &DbPool, token: &str) {
    let past = chrono::Utc::now() - chrono::Duration::seconds(1);
    pool.get()
        .unwrap()
        .execute(
            "UPDATE sessions SET expires_at = ? WHERE token = ?",
            rusqlite::params![past, token],
        )
        .unwrap();
}

pub fn extract_cookie_header(set_cookie: &str) -> String {
    set_cookie.split(';').next().unwrap_or("").to_string()
}

pub fn get(uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

/// JSON request sent from the allowed frontend origin.
pub fn json_request(method: &str, uri: &str, cookie: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::COOKIE, cookie)
        .header(header::ORIGIN, FRONTEND_ORIGIN)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response) -> Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}
