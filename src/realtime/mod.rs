//! Realtime chat channel: presence, typing indicators and message delivery
//! over WebSocket JSON frames shaped `{"event": ..., "data": ...}`.

pub mod connection;
pub mod events;
pub mod hub;
pub mod rate_limit;

pub use connection::{serve_socket, ConnectionSession};
pub use events::{ClientEvent, ServerEvent};
pub use hub::Hub;
