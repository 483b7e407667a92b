//! Notification endpoints (all protected).

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use super::NotificationRecord;
use crate::auth::models::Claims;
use crate::error::AppError;
use crate::gateway::state::AppState;
use crate::gateway::types::ApiResponse;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    50
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NotificationItem {
    pub id: i64,
    pub kind: String,
    pub message: String,
    pub post_id: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<NotificationRecord> for NotificationItem {
    fn from(record: NotificationRecord) -> Self {
        Self {
            id: record.id,
            kind: record.kind,
            message: record.message,
            post_id: record.post_id,
            is_read: record.is_read,
            created_at: record.created_at,
        }
    }
}

fn claims_user_id(claims: &Claims) -> Result<i64, AppError> {
    claims
        .sub
        .parse()
        .map_err(|_| AppError::unauthorized("Invalid or expired token"))
}

/// List the caller's notifications, newest first
///
/// GET /v1/notifications
#[utoipa::path(
    get,
    path = "/v1/notifications",
    params(("limit" = i64, Query, description = "Max rows, default 50")),
    responses(
        (status = 200, description = "Notifications", body = ApiResponse<Vec<NotificationItem>>),
        (status = 401, description = "Missing or invalid access token")
    ),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<Vec<NotificationItem>>>, AppError> {
    let user_id = claims_user_id(&claims)?;
    let records = state.notifications.list_for(user_id, query.limit).await?;
    Ok(Json(ApiResponse::success(
        records.into_iter().map(NotificationItem::from).collect(),
    )))
}

/// Mark one notification as read
///
/// POST /v1/notifications/{id}/read
#[utoipa::path(
    post,
    path = "/v1/notifications/{id}/read",
    params(("id" = i64, Path, description = "Notification id")),
    responses(
        (status = 200, description = "Marked read"),
        (status = 404, description = "Not found or not owned by caller")
    ),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let user_id = claims_user_id(&claims)?;
    state.notifications.mark_read(id, user_id).await?;
    Ok(Json(ApiResponse::success(())))
}

/// Mark all of the caller's notifications as read
///
/// POST /v1/notifications/read-all
#[utoipa::path(
    post,
    path = "/v1/notifications/read-all",
    responses(
        (status = 200, description = "All marked read", body = ApiResponse<u64>)
    ),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn mark_all_read(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ApiResponse<u64>>, AppError> {
    let user_id = claims_user_id(&claims)?;
    let updated = state.notifications.mark_all_read(user_id).await?;
    Ok(Json(ApiResponse::success(updated)))
}
