//! Per-identity notifications with realtime push.
//!
//! The notification row is committed first; the push over the connection
//! registry is best-effort and never fails the triggering operation.

pub mod handlers;
pub mod repository;
pub mod service;

use chrono::{DateTime, Utc};

use crate::core_types::UserId;

/// What triggered a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Comment,
    Reply,
    Follow,
    Vote,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Comment => "comment",
            Self::Reply => "reply",
            Self::Follow => "follow",
            Self::Vote => "vote",
        }
    }
}

/// Stored notification row.
#[derive(Debug, Clone)]
pub struct NotificationRecord {
    pub id: i64,
    pub recipient_id: UserId,
    pub sender_id: Option<UserId>,
    pub kind: String,
    pub message: String,
    pub post_id: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields for creating a notification.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub recipient_id: UserId,
    pub sender_id: Option<UserId>,
    pub kind: NotificationKind,
    pub message: String,
    pub post_id: Option<String>,
}

pub use repository::{
    MemoryNotificationRepository, NotificationRepository, PgNotificationRepository,
};
pub use service::NotificationService;
