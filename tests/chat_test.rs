mod common;

use atlas::models::{User, UserRole};
use atlas::realtime::hub::conversation_room;
use atlas::realtime::ServerEvent;
use axum::{http::StatusCode, Router};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use uuid::Uuid;

struct ChatFixture {
    app: common::TestApp,
    tenant_id: String,
    alice: User,
    bob: User,
    alice_cookie: String,
    bob_cookie: String,
    pool: atlas::db::DbPool,
}

async fn fixture() -> ChatFixture {
    let pool = common::setup_test_db();
    let tenant = common::create_test_tenant(&pool, "Gym").await;
    let alice = common::create_test_user(&pool, &tenant.id, "alice@gym.test", UserRole::Staff).await;
    let bob = common::create_test_user(&pool, &tenant.id, "bob@gym.test", UserRole::Client).await;
    let alice_cookie = common::create_session_cookie(&pool, &alice).await;
    let bob_cookie = common::create_session_cookie(&pool, &bob).await;
    ChatFixture {
        app: common::create_test_app_with_hub(pool.clone()),
        tenant_id: tenant.id,
        alice,
        bob,
        alice_cookie,
        bob_cookie,
        pool,
    }
}

async fn create_direct(app: &Router, cookie: &str, other: &str) -> Value {
    let response = common::send(
        app,
        common::json_request(
            "POST",
            "/api/chat/conversations",
            cookie,
            json!({ "type": "direct", "participantIds": [other] }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    common::body_json(response).await["data"]["conversation"].clone()
}

async fn post_message(app: &Router, cookie: &str, conversation_id: i64, body: Value) -> axum::response::Response {
    common::send(
        app,
        common::json_request(
            "POST",
            &format!("/api/chat/conversations/{}/messages", conversation_id),
            cookie,
            body,
        ),
    )
    .await
}

#[tokio::test]
async fn test_direct_conversation_is_reused() {
    let f = fixture().await;
    let app = &f.app.router;

    let first = create_direct(app, &f.alice_cookie, &f.bob.id).await;
    let second = create_direct(app, &f.alice_cookie, &f.bob.id).await;
    assert_eq!(first["id"], second["id"]);
    assert_eq!(first["type"], "direct");

    let participants = first["participants"].as_array().unwrap();
    assert_eq!(participants.len(), 2);
}

#[tokio::test]
async fn test_create_requires_participants() {
    let f = fixture().await;

    let response = common::send(
        &f.app.router,
        common::json_request(
            "POST",
            "/api/chat/conversations",
            &f.alice_cookie,
            json!({ "participantIds": [] }),
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_rejects_users_of_other_tenants() {
    let f = fixture().await;
    let rival = common::create_test_tenant(&f.pool, "Rival").await;
    let outsider =
        common::create_test_user(&f.pool, &rival.id, "eve@rival.test", UserRole::Staff).await;

    let response = common::send(
        &f.app.router,
        common::json_request(
            "POST",
            "/api/chat/conversations",
            &f.alice_cookie,
            json!({ "participantIds": [outsider.id] }),
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_send_and_list_messages() {
    let f = fixture().await;
    let app = &f.app.router;
    let conversation = create_direct(app, &f.alice_cookie, &f.bob.id).await;
    let id = conversation["id"].as_i64().unwrap();

    for text in ["first", "second"] {
        let response = post_message(app, &f.alice_cookie, id, json!({ "content": text })).await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = common::send(
        app,
        common::get(
            &format!("/api/chat/conversations/{}/messages?limit=50", id),
            &f.bob_cookie,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = common::body_json(response).await;
    let messages = body["data"]["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["content"], "first");
    assert_eq!(messages[1]["content"], "second");
    assert_eq!(messages[0]["message_type"], "text");
    assert_eq!(body["data"]["pagination"]["total"], 2);
    assert_eq!(body["data"]["pagination"]["totalPages"], 1);
}

#[tokio::test]
async fn test_inbox_shows_unread_and_last_message() {
    let f = fixture().await;
    let app = &f.app.router;
    let conversation = create_direct(app, &f.alice_cookie, &f.bob.id).await;
    let id = conversation["id"].as_i64().unwrap();

    post_message(app, &f.alice_cookie, id, json!({ "content": "hello bob" })).await;

    let response = common::send(app, common::get("/api/chat/conversations", &f.bob_cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = common::body_json(response).await;
    let inbox = body["data"]["conversations"].as_array().unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0]["last_message"], "hello bob");
    assert_eq!(inbox[0]["unread_count"], 1);
    assert_eq!(
        inbox[0]["other_participants"][0]["userId"],
        f.alice.id.as_str()
    );

    let response = common::send(
        app,
        common::json_request(
            "PUT",
            &format!("/api/chat/conversations/{}/read", id),
            &f.bob_cookie,
            json!({}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = common::send(app, common::get("/api/chat/conversations", &f.bob_cookie)).await;
    let body = common::body_json(response).await;
    assert_eq!(body["data"]["conversations"][0]["unread_count"], 0);
}

#[tokio::test]
async fn test_message_validation() {
    let f = fixture().await;
    let app = &f.app.router;
    let conversation = create_direct(app, &f.alice_cookie, &f.bob.id).await;
    let id = conversation["id"].as_i64().unwrap();

    let response = post_message(app, &f.alice_cookie, id, json!({ "content": "   " })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let long = "x".repeat(5001);
    let response = post_message(app, &f.alice_cookie, id, json!({ "content": long })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_message(
        app,
        &f.alice_cookie,
        id,
        json!({ "content": "hi", "messageType": "video" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_outsider_cannot_read_or_write() {
    let f = fixture().await;
    let app = &f.app.router;
    let carol =
        common::create_test_user(&f.pool, &f.tenant_id, "carol@gym.test", UserRole::Staff).await;
    let carol_cookie = common::create_session_cookie(&f.pool, &carol).await;
    let conversation = create_direct(app, &f.alice_cookie, &f.bob.id).await;
    let id = conversation["id"].as_i64().unwrap();

    let response = common::send(
        app,
        common::get(&format!("/api/chat/conversations/{}", id), &carol_cookie),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = common::send(
        app,
        common::get(&format!("/api/chat/conversations/{}/messages", id), &carol_cookie),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = post_message(app, &carol_cookie, id, json!({ "content": "let me in" })).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = common::send(
        app,
        common::json_request(
            "PUT",
            &format!("/api/chat/conversations/{}/read", id),
            &carol_cookie,
            json!({}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        common::body_json(response).await["message"],
        "Conversation not found"
    );
}

#[tokio::test]
async fn test_toggle_mute() {
    let f = fixture().await;
    let app = &f.app.router;
    let conversation = create_direct(app, &f.alice_cookie, &f.bob.id).await;
    let uri = format!("/api/chat/conversations/{}/mute", conversation["id"]);

    let response = common::send(
        app,
        common::json_request("PUT", &uri, &f.alice_cookie, json!({})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(common::body_json(response).await["data"]["isMuted"], true);

    let response = common::send(
        app,
        common::json_request("PUT", &uri, &f.alice_cookie, json!({})),
    )
    .await;
    assert_eq!(common::body_json(response).await["data"]["isMuted"], false);
}

#[tokio::test]
async fn test_available_users_excludes_caller_and_other_tenants() {
    let f = fixture().await;
    let rival = common::create_test_tenant(&f.pool, "Rival").await;
    common::create_test_user(&f.pool, &rival.id, "eve@rival.test", UserRole::Staff).await;

    let response = common::send(&f.app.router, common::get("/api/chat/users", &f.alice_cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = common::body_json(response).await;
    let users = body["data"]["users"].as_array().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["userId"], f.bob.id.as_str());
}

#[tokio::test]
async fn test_rest_message_is_pushed_to_room() {
    let f = fixture().await;
    let app = &f.app.router;
    let conversation = create_direct(app, &f.alice_cookie, &f.bob.id).await;
    let id = conversation["id"].as_i64().unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let connection = Uuid::new_v4();
    f.app.hub.register(connection, &f.bob.id, &f.tenant_id, tx).await;
    f.app.hub.join(connection, conversation_room(id)).await;

    let response = post_message(app, &f.alice_cookie, id, json!({ "content": "ping" })).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    match rx.try_recv().unwrap() {
        ServerEvent::NewMessage(message) => {
            assert_eq!(message.content, "ping");
            assert_eq!(message.sender_id, f.alice.id);
        }
        other => panic!("unexpected event: {:?}", other),
    }
}

#[tokio::test]
async fn test_online_lists_connected_tenant_users() {
    let f = fixture().await;
    let (tx, _rx) = mpsc::unbounded_channel();
    f.app
        .hub
        .register(Uuid::new_v4(), &f.bob.id, &f.tenant_id, tx)
        .await;

    let response = common::send(&f.app.router, common::get("/api/chat/online", &f.alice_cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = common::body_json(response).await;
    assert_eq!(body["data"]["onlineUserIds"], json!([f.bob.id]));
}

#[tokio::test]
async fn test_socket_upgrade_requires_session() {
    let f = fixture().await;

    let response = common::send(&f.app.router, common::get("/api/ws", "")).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
