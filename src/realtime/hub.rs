//! Connection registry for the realtime channel.
//!
//! Each socket registers under a connection id with an outbound channel.
//! Rooms are plain strings (`tenant:{id}`, `user:{id}`,
//! `conversation:{id}`, `notifications:{id}`); a user is online while at
//! least one of their connections is registered.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use super::events::ServerEvent;

pub type EventSender = mpsc::UnboundedSender<ServerEvent>;

pub fn tenant_room(tenant_id: &str) -> String {
    format!("tenant:{tenant_id}")
}

pub fn user_room(user_id: &str) -> String {
    format!("user:{user_id}")
}

pub fn conversation_room(conversation_id: i64) -> String {
    format!("conversation:{conversation_id}")
}

pub fn notifications_room(user_id: &str) -> String {
    format!("notifications:{user_id}")
}

#[derive(Debug)]
struct Connection {
    user_id: String,
    tenant_id: String,
    rooms: HashSet<String>,
    tx: EventSender,
}

#[derive(Debug, Default)]
struct HubState {
    connections: HashMap<Uuid, Connection>,
    /// user id -> live connection ids
    presence: HashMap<String, HashSet<Uuid>>,
}

/// Presence, as reported by [`Hub::register`] and [`Hub::unregister`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceChange {
    pub user_id: String,
    pub tenant_id: String,
    /// First connection on register, last connection on unregister.
    pub changed: bool,
}

#[derive(Clone, Default)]
pub struct Hub {
    state: Arc<RwLock<HubState>>,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection and join it to its tenant and user rooms.
    pub async fn register(
        &self,
        connection_id: Uuid,
        user_id: &str,
        tenant_id: &str,
        tx: EventSender,
    ) -> PresenceChange {
        let mut state = self.state.write().await;

        let rooms = HashSet::from([tenant_room(tenant_id), user_room(user_id)]);
        state.connections.insert(
            connection_id,
            Connection {
                user_id: user_id.to_string(),
                tenant_id: tenant_id.to_string(),
                rooms,
                tx,
            },
        );

        let sessions = state.presence.entry(user_id.to_string()).or_default();
        sessions.insert(connection_id);

        PresenceChange {
            user_id: user_id.to_string(),
            tenant_id: tenant_id.to_string(),
            changed: sessions.len() == 1,
        }
    }

    pub async fn unregister(&self, connection_id: Uuid) -> Option<PresenceChange> {
        let mut state = self.state.write().await;
        let connection = state.connections.remove(&connection_id)?;

        let mut changed = false;
        if let Some(sessions) = state.presence.get_mut(&connection.user_id) {
            sessions.remove(&connection_id);
            if sessions.is_empty() {
                state.presence.remove(&connection.user_id);
                changed = true;
            }
        }

        Some(PresenceChange {
            user_id: connection.user_id,
            tenant_id: connection.tenant_id,
            changed,
        })
    }

    pub async fn join(&self, connection_id: Uuid, room: String) {
        if let Some(connection) = self.state.write().await.connections.get_mut(&connection_id) {
            connection.rooms.insert(room);
        }
    }

    pub async fn leave(&self, connection_id: Uuid, room: &str) {
        if let Some(connection) = self.state.write().await.connections.get_mut(&connection_id) {
            connection.rooms.remove(room);
        }
    }

    pub async fn is_in_room(&self, connection_id: Uuid, room: &str) -> bool {
        self.state
            .read()
            .await
            .connections
            .get(&connection_id)
            .is_some_and(|c| c.rooms.contains(room))
    }

    /// Send to a single connection.
    pub async fn send_to(&self, connection_id: Uuid, event: ServerEvent) {
        if let Some(connection) = self.state.read().await.connections.get(&connection_id) {
            if let Err(e) = connection.tx.send(event) {
                tracing::warn!(%connection_id, error = ?e, "Failed to queue event for connection");
            }
        }
    }

    /// Send to every member of `room`, optionally skipping the originator.
    /// Returns how many connections the event was queued for.
    pub async fn emit_to_room(&self, room: &str, event: &ServerEvent, except: Option<Uuid>) -> usize {
        let state = self.state.read().await;
        let mut delivered = 0;
        for (id, connection) in state.connections.iter() {
            if Some(*id) == except || !connection.rooms.contains(room) {
                continue;
            }
            match connection.tx.send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::warn!(connection_id = %id, room, error = ?e, "Failed to queue room event")
                }
            }
        }
        delivered
    }

    pub async fn send_notification_to_user(&self, user_id: &str, notification: Value) -> usize {
        self.emit_to_room(&user_room(user_id), &ServerEvent::Notification(notification), None)
            .await
    }

    pub async fn send_notification_to_tenant(&self, tenant_id: &str, notification: Value) -> usize {
        self.emit_to_room(
            &tenant_room(tenant_id),
            &ServerEvent::Notification(notification),
            None,
        )
        .await
    }

    pub async fn is_user_online(&self, user_id: &str) -> bool {
        self.state.read().await.presence.contains_key(user_id)
    }

    /// Online user ids in the tenant, sorted.
    pub async fn online_users(&self, tenant_id: &str) -> Vec<String> {
        let state = self.state.read().await;
        let mut users: Vec<String> = state
            .connections
            .values()
            .filter(|c| c.tenant_id == tenant_id)
            .map(|c| c.user_id.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        users.sort();
        users
    }
}
