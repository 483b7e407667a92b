//! Shared gateway state.
//!
//! Every process-wide mutable component (revocation set, connection
//! registry) is owned here and injected by reference, constructed once at
//! startup. Tests build a fresh state per case.

use std::sync::Arc;

use crate::auth::AuthService;
use crate::notifications::NotificationService;
use crate::websocket::ConnectionRegistry;

pub struct AppState {
    pub auth: Arc<AuthService>,
    pub registry: Arc<ConnectionRegistry>,
    pub notifications: Arc<NotificationService>,
}

impl AppState {
    pub fn new(
        auth: Arc<AuthService>,
        registry: Arc<ConnectionRegistry>,
        notifications: Arc<NotificationService>,
    ) -> Self {
        Self {
            auth,
            registry,
            notifications,
        }
    }
}
