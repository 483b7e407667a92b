//! Notification storage.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::sync::atomic::{AtomicI64, Ordering};

use super::{NewNotification, NotificationRecord};
use crate::core_types::UserId;

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn insert(&self, new: NewNotification) -> Result<NotificationRecord>;
    /// Most recent first.
    async fn list_for(&self, recipient_id: UserId, limit: i64) -> Result<Vec<NotificationRecord>>;
    /// Returns whether a row owned by `recipient_id` was updated.
    async fn mark_read(&self, id: i64, recipient_id: UserId) -> Result<bool>;
    async fn mark_all_read(&self, recipient_id: UserId) -> Result<u64>;
}

pub struct PgNotificationRepository {
    pool: PgPool,
}

impl PgNotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_record(row: PgRow) -> NotificationRecord {
    NotificationRecord {
        id: row.get("id"),
        recipient_id: row.get("recipient_id"),
        sender_id: row.get("sender_id"),
        kind: row.get("kind"),
        message: row.get("message"),
        post_id: row.get("post_id"),
        is_read: row.get("is_read"),
        created_at: row.get("created_at"),
    }
}

#[async_trait]
impl NotificationRepository for PgNotificationRepository {
    async fn insert(&self, new: NewNotification) -> Result<NotificationRecord> {
        let row = sqlx::query(
            r#"INSERT INTO notification (recipient_id, sender_id, kind, message, post_id)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING id, recipient_id, sender_id, kind, message, post_id, is_read, created_at"#,
        )
        .bind(new.recipient_id)
        .bind(new.sender_id)
        .bind(new.kind.as_str())
        .bind(&new.message)
        .bind(&new.post_id)
        .fetch_one(&self.pool)
        .await
        .context("Failed to insert notification")?;

        Ok(row_to_record(row))
    }

    async fn list_for(&self, recipient_id: UserId, limit: i64) -> Result<Vec<NotificationRecord>> {
        let rows = sqlx::query(
            r#"SELECT id, recipient_id, sender_id, kind, message, post_id, is_read, created_at
               FROM notification WHERE recipient_id = $1
               ORDER BY created_at DESC LIMIT $2"#,
        )
        .bind(recipient_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list notifications")?;

        Ok(rows.into_iter().map(row_to_record).collect())
    }

    async fn mark_read(&self, id: i64, recipient_id: UserId) -> Result<bool> {
        let res = sqlx::query(
            r#"UPDATE notification SET is_read = TRUE WHERE id = $1 AND recipient_id = $2"#,
        )
        .bind(id)
        .bind(recipient_id)
        .execute(&self.pool)
        .await
        .context("Failed to mark notification read")?;
        Ok(res.rows_affected() > 0)
    }

    async fn mark_all_read(&self, recipient_id: UserId) -> Result<u64> {
        let res = sqlx::query(
            r#"UPDATE notification SET is_read = TRUE WHERE recipient_id = $1 AND is_read = FALSE"#,
        )
        .bind(recipient_id)
        .execute(&self.pool)
        .await
        .context("Failed to mark notifications read")?;
        Ok(res.rows_affected())
    }
}

#[derive(Default)]
pub struct MemoryNotificationRepository {
    items: DashMap<i64, NotificationRecord>,
    next_id: AtomicI64,
}

impl MemoryNotificationRepository {
    pub fn new() -> Self {
        Self {
            items: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }
}

#[async_trait]
impl NotificationRepository for MemoryNotificationRepository {
    async fn insert(&self, new: NewNotification) -> Result<NotificationRecord> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let record = NotificationRecord {
            id,
            recipient_id: new.recipient_id,
            sender_id: new.sender_id,
            kind: new.kind.as_str().to_string(),
            message: new.message,
            post_id: new.post_id,
            is_read: false,
            created_at: Utc::now(),
        };
        self.items.insert(id, record.clone());
        Ok(record)
    }

    async fn list_for(&self, recipient_id: UserId, limit: i64) -> Result<Vec<NotificationRecord>> {
        let mut records: Vec<NotificationRecord> = self
            .items
            .iter()
            .filter(|entry| entry.value().recipient_id == recipient_id)
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records.truncate(limit as usize);
        Ok(records)
    }

    async fn mark_read(&self, id: i64, recipient_id: UserId) -> Result<bool> {
        if let Some(mut entry) = self.items.get_mut(&id) {
            if entry.recipient_id == recipient_id {
                entry.is_read = true;
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn mark_all_read(&self, recipient_id: UserId) -> Result<u64> {
        let mut updated = 0;
        for mut entry in self.items.iter_mut() {
            if entry.recipient_id == recipient_id && !entry.is_read {
                entry.is_read = true;
                updated += 1;
            }
        }
        Ok(updated)
    }
}
