//! Realtime push layer.
//!
//! Keeps an in-process registry of live WebSocket connections and fans out
//! JSON events, per-identity or broadcast. Consumed by the notification
//! service and by the post/comment/vote services.

pub mod connection;
pub mod handler;
pub mod messages;

pub use connection::{ConnectionRegistry, WsSender};
pub use handler::ws_handler;
pub use messages::{NotificationPayload, WsEvent};
