//! Notification creation and realtime delivery.

use std::sync::Arc;

use super::repository::NotificationRepository;
use super::{NewNotification, NotificationRecord};
use crate::auth::repository::IdentityRepository;
use crate::core_types::UserId;
use crate::error::AppError;
use crate::websocket::{ConnectionRegistry, NotificationPayload, WsEvent};

pub struct NotificationService {
    repo: Arc<dyn NotificationRepository>,
    identities: Arc<dyn IdentityRepository>,
    registry: Arc<ConnectionRegistry>,
}

impl NotificationService {
    pub fn new(
        repo: Arc<dyn NotificationRepository>,
        identities: Arc<dyn IdentityRepository>,
        registry: Arc<ConnectionRegistry>,
    ) -> Self {
        Self {
            repo,
            identities,
            registry,
        }
    }

    /// Persist a notification, then push it to the recipient's live
    /// connections. The row is durable before any push is attempted, and a
    /// failed push never fails the operation.
    pub async fn notify(&self, new: NewNotification) -> Result<NotificationRecord, AppError> {
        let record = self.repo.insert(new).await?;

        let sender_pseudonym = match record.sender_id {
            Some(sender_id) => self
                .identities
                .find_by_id(sender_id)
                .await?
                .map(|identity| identity.pseudonym),
            None => None,
        };

        self.registry.send_to(
            record.recipient_id,
            WsEvent::Notification(NotificationPayload {
                id: record.id,
                kind: record.kind.clone(),
                message: record.message.clone(),
                post_id: record.post_id.clone(),
                sender_pseudonym,
                created_at: record.created_at,
                is_read: record.is_read,
            }),
        );

        Ok(record)
    }

    pub async fn list_for(
        &self,
        recipient_id: UserId,
        limit: i64,
    ) -> Result<Vec<NotificationRecord>, AppError> {
        Ok(self.repo.list_for(recipient_id, limit).await?)
    }

    pub async fn mark_read(&self, id: i64, recipient_id: UserId) -> Result<(), AppError> {
        if !self.repo.mark_read(id, recipient_id).await? {
            return Err(AppError::not_found(
                "The data you tried searching for does not exist",
            ));
        }
        Ok(())
    }

    pub async fn mark_all_read(&self, recipient_id: UserId) -> Result<u64, AppError> {
        Ok(self.repo.mark_all_read(recipient_id).await?)
    }
}
