mod common;

use atlas::db::DbPool;
use atlas::middleware::AuthUser;
use atlas::models::{ConversationType, User, UserRole};
use atlas::realtime::hub::notifications_room;
use atlas::realtime::{ConnectionSession, Hub, ServerEvent};
use atlas::repositories::ChatRepository;
use serde_json::json;
use tokio::sync::mpsc::{self, UnboundedReceiver};

struct Peer {
    session: ConnectionSession,
    rx: UnboundedReceiver<ServerEvent>,
}

impl Peer {
    async fn connect(user: &User, hub: &Hub, chat_repo: &ChatRepository) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let auth = AuthUser::from_user(user.clone(), "test-token".to_string());
        let session = ConnectionSession::open(auth, hub.clone(), chat_repo.clone(), tx).await;
        Self { session, rx }
    }

    async fn send(&mut self, frame: serde_json::Value) {
        self.session.handle_text(&frame.to_string()).await;
    }

    fn drain(&mut self) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }
}

struct Setup {
    pool: DbPool,
    hub: Hub,
    chat_repo: ChatRepository,
    tenant_id: String,
    alice: User,
    bob: User,
    conversation_id: i64,
}

async fn setup() -> Setup {
    let pool = common::setup_test_db();
    let tenant = common::create_test_tenant(&pool, "Gym").await;
    let alice = common::create_test_user(&pool, &tenant.id, "alice@gym.test", UserRole::Staff).await;
    let bob = common::create_test_user(&pool, &tenant.id, "bob@gym.test", UserRole::Client).await;
    let chat_repo = ChatRepository::new(pool.clone());
    let conversation = chat_repo
        .create_conversation(
            &tenant.id,
            &alice.id,
            ConversationType::Direct,
            None,
            vec![bob.id.clone()],
        )
        .await
        .unwrap();

    Setup {
        pool,
        hub: Hub::new(),
        chat_repo,
        tenant_id: tenant.id,
        alice,
        bob,
        conversation_id: conversation.conversation.id,
    }
}

fn error_message(event: &ServerEvent) -> Option<&str> {
    match event {
        ServerEvent::Error { message } => Some(message.as_str()),
        _ => None,
    }
}

#[tokio::test]
async fn test_presence_announced_once_per_user() {
    let s = setup().await;
    let mut alice = Peer::connect(&s.alice, &s.hub, &s.chat_repo).await;

    let bob_first = Peer::connect(&s.bob, &s.hub, &s.chat_repo).await;
    let events = alice.drain();
    assert_eq!(events.len(), 1);
    assert!(matches!(&events[0], ServerEvent::UserOnline { user_id } if *user_id == s.bob.id));

    let bob_second = Peer::connect(&s.bob, &s.hub, &s.chat_repo).await;
    assert!(alice.drain().is_empty());
    assert!(s.hub.is_user_online(&s.bob.id).await);

    bob_first.session.close().await;
    assert!(alice.drain().is_empty());
    assert!(s.hub.is_user_online(&s.bob.id).await);

    bob_second.session.close().await;
    let events = alice.drain();
    assert!(matches!(&events[0], ServerEvent::UserOffline { user_id } if *user_id == s.bob.id));
    assert!(!s.hub.is_user_online(&s.bob.id).await);
    assert_eq!(s.hub.online_users(&s.tenant_id).await, vec![s.alice.id.clone()]);
}

#[tokio::test]
async fn test_message_reaches_room_members() {
    let s = setup().await;
    let mut alice = Peer::connect(&s.alice, &s.hub, &s.chat_repo).await;
    let mut bob = Peer::connect(&s.bob, &s.hub, &s.chat_repo).await;

    alice
        .send(json!({ "event": "join_conversation", "data": s.conversation_id }))
        .await;
    bob.send(json!({ "event": "join_conversation", "data": s.conversation_id }))
        .await;
    alice.drain();
    bob.drain();

    alice
        .send(json!({
            "event": "send_message",
            "data": { "conversationId": s.conversation_id, "content": "<b>hi</b> bob" }
        }))
        .await;

    let to_alice = alice.drain();
    let to_bob = bob.drain();
    assert_eq!(to_alice.len(), 1);
    assert_eq!(to_bob.len(), 1);
    match &to_bob[0] {
        ServerEvent::NewMessage(message) => {
            assert_eq!(message.content, "bhi/b bob");
            assert_eq!(message.sender_id, s.alice.id);
            assert_eq!(message.message_type, "text");
        }
        other => panic!("unexpected event: {:?}", other),
    }
}

#[tokio::test]
async fn test_sender_outside_room_still_gets_copy() {
    let s = setup().await;
    let mut alice = Peer::connect(&s.alice, &s.hub, &s.chat_repo).await;

    alice
        .send(json!({
            "event": "send_message",
            "data": { "conversationId": s.conversation_id.to_string(), "content": "hello" }
        }))
        .await;

    let events = alice.drain();
    assert_eq!(events.len(), 1);
    assert!(matches!(&events[0], ServerEvent::NewMessage(m) if m.content == "hello"));
}

#[tokio::test]
async fn test_non_participant_is_refused() {
    let s = setup().await;
    let carol =
        common::create_test_user(&s.pool, &s.tenant_id, "carol@gym.test", UserRole::Staff).await;
    let mut carol = Peer::connect(&carol, &s.hub, &s.chat_repo).await;

    carol
        .send(json!({ "event": "join_conversation", "data": s.conversation_id }))
        .await;
    let events = carol.drain();
    assert_eq!(error_message(&events[0]), Some("Conversation not found"));

    carol
        .send(json!({
            "event": "send_message",
            "data": { "conversationId": s.conversation_id, "content": "sneaky" }
        }))
        .await;
    let events = carol.drain();
    assert_eq!(error_message(&events[0]), Some("Conversation not found"));
}

#[tokio::test]
async fn test_typing_excludes_sender() {
    let s = setup().await;
    let mut alice = Peer::connect(&s.alice, &s.hub, &s.chat_repo).await;
    let mut bob = Peer::connect(&s.bob, &s.hub, &s.chat_repo).await;
    for peer in [&mut alice, &mut bob] {
        peer.send(json!({ "event": "join_conversation", "data": s.conversation_id }))
            .await;
    }
    alice.drain();
    bob.drain();

    alice
        .send(json!({ "event": "typing_start", "data": s.conversation_id }))
        .await;
    alice
        .send(json!({ "event": "typing_stop", "data": s.conversation_id }))
        .await;

    assert!(alice.drain().is_empty());
    let events = bob.drain();
    assert_eq!(events.len(), 2);
    assert!(matches!(&events[0], ServerEvent::UserTyping { user_id, .. } if *user_id == s.alice.id));
    assert!(matches!(&events[1], ServerEvent::UserStoppedTyping { .. }));
}

#[tokio::test]
async fn test_typing_from_outsider_is_dropped() {
    let s = setup().await;
    let other_tenant = common::create_test_tenant(&s.pool, "Rival").await;
    let mallory =
        common::create_test_user(&s.pool, &other_tenant.id, "mallory@rival.test", UserRole::Staff)
            .await;
    let mut alice = Peer::connect(&s.alice, &s.hub, &s.chat_repo).await;
    alice
        .send(json!({ "event": "join_conversation", "data": s.conversation_id }))
        .await;
    let mut mallory = Peer::connect(&mallory, &s.hub, &s.chat_repo).await;
    alice.drain();

    mallory
        .send(json!({ "event": "typing_start", "data": s.conversation_id }))
        .await;
    mallory
        .send(json!({ "event": "typing_stop", "data": s.conversation_id }))
        .await;

    assert!(alice.drain().is_empty());
    assert!(mallory.drain().is_empty());
}

#[tokio::test]
async fn test_message_read_broadcasts_receipt() {
    let s = setup().await;
    let mut alice = Peer::connect(&s.alice, &s.hub, &s.chat_repo).await;
    let mut bob = Peer::connect(&s.bob, &s.hub, &s.chat_repo).await;
    for peer in [&mut alice, &mut bob] {
        peer.send(json!({ "event": "join_conversation", "data": s.conversation_id }))
            .await;
    }

    alice
        .send(json!({
            "event": "send_message",
            "data": { "conversationId": s.conversation_id, "content": "read me" }
        }))
        .await;
    let message_id = match bob.drain().pop() {
        Some(ServerEvent::NewMessage(message)) => message.id,
        other => panic!("unexpected event: {:?}", other),
    };
    alice.drain();

    bob.send(json!({
        "event": "message_read",
        "data": { "conversationId": s.conversation_id, "messageId": message_id }
    }))
    .await;

    let events = alice.drain();
    assert!(matches!(
        &events[0],
        ServerEvent::MessagesRead { user_id, up_to_message_id, .. }
            if *user_id == s.bob.id && *up_to_message_id == message_id
    ));
}

#[tokio::test]
async fn test_malformed_frames() {
    let s = setup().await;
    let mut alice = Peer::connect(&s.alice, &s.hub, &s.chat_repo).await;

    alice.session.handle_text("not json").await;
    alice.send(json!({ "event": "dance", "data": null })).await;
    alice
        .send(json!({ "event": "send_message", "data": { "conversationId": "abc", "content": "x" } }))
        .await;
    alice
        .send(json!({ "event": "send_message", "data": { "conversationId": 1, "content": "  " } }))
        .await;
    alice
        .send(json!({ "event": "join_conversation", "data": "nope" }))
        .await;

    let messages: Vec<_> = alice
        .drain()
        .iter()
        .map(|e| error_message(e).unwrap_or_default().to_string())
        .collect();
    assert_eq!(
        messages,
        vec![
            "Invalid message format",
            "Unknown event",
            "Invalid conversationId",
            "Message content is empty",
        ]
    );
}

#[tokio::test]
async fn test_rate_limit_per_connection() {
    let s = setup().await;
    let mut alice = Peer::connect(&s.alice, &s.hub, &s.chat_repo).await;

    for _ in 0..61 {
        alice
            .send(json!({ "event": "typing_start", "data": s.conversation_id }))
            .await;
    }

    let events = alice.drain();
    assert_eq!(events.len(), 1);
    assert_eq!(error_message(&events[0]), Some("Too many requests, slow down"));

    let mut other = Peer::connect(&s.alice, &s.hub, &s.chat_repo).await;
    other
        .send(json!({ "event": "typing_start", "data": s.conversation_id }))
        .await;
    assert!(other.drain().is_empty());
}

#[tokio::test]
async fn test_notifications_reach_user_and_tenant() {
    let s = setup().await;
    let mut alice = Peer::connect(&s.alice, &s.hub, &s.chat_repo).await;
    let mut bob = Peer::connect(&s.bob, &s.hub, &s.chat_repo).await;
    alice.drain();

    bob.send(json!({ "event": "subscribe_notifications", "data": null }))
        .await;
    assert!(s.hub.is_in_room(bob.session.id, &notifications_room(&s.bob.id)).await);

    let delivered = s
        .hub
        .send_notification_to_user(&s.bob.id, json!({ "title": "Workout assigned" }))
        .await;
    assert_eq!(delivered, 1);
    assert!(alice.drain().is_empty());
    assert!(matches!(&bob.drain()[0], ServerEvent::Notification(n) if n["title"] == "Workout assigned"));

    let delivered = s
        .hub
        .send_notification_to_tenant(&s.tenant_id, json!({ "title": "Gym closed" }))
        .await;
    assert_eq!(delivered, 2);
}
