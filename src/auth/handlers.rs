//! Axum handlers for the auth protocol.
//!
//! Handlers stay thin: deserialize, delegate to `AuthService`, wrap the
//! result. All failure mapping lives in `AppError::into_response`.

use axum::{
    Extension, Json,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
};
use serde::Deserialize;
use std::sync::Arc;

use super::middleware::bearer_token;
use super::models::{
    CheckUsernameResponse, Claims, LoginRequest, LoginResponse, LogoutRequest, MeResponse,
    RefreshRequest, RefreshResponse, SignupRequest, SignupResponse, VerifyRequest, VerifyResponse,
};
use crate::error::AppError;
use crate::gateway::state::AppState;
use crate::gateway::types::ApiResponse;

#[derive(Debug, Deserialize)]
pub struct CheckUsernameQuery {
    pub user_name: String,
}

/// Check whether a pseudonym is still available
///
/// GET /v1/auth/check-username?user_name=...
#[utoipa::path(
    get,
    path = "/v1/auth/check-username",
    params(("user_name" = String, Query, description = "Pseudonym to check")),
    responses(
        (status = 200, description = "Pseudonym available", body = ApiResponse<CheckUsernameResponse>),
        (status = 409, description = "Pseudonym already in use")
    ),
    tag = "Auth"
)]
pub async fn check_username(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CheckUsernameQuery>,
) -> Result<Json<ApiResponse<CheckUsernameResponse>>, AppError> {
    state.auth.check_pseudonym(&query.user_name).await?;
    Ok(Json(ApiResponse::with_msg(
        "Pseudonym available",
        CheckUsernameResponse { is_available: true },
    )))
}

/// Register a new identity
///
/// POST /v1/auth/signup
#[utoipa::path(
    post,
    path = "/v1/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Identity registered, challenge issued", body = ApiResponse<SignupResponse>),
        (status = 400, description = "Malformed input"),
        (status = 409, description = "Pseudonym already in use")
    ),
    tag = "Auth"
)]
pub async fn signup(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SignupResponse>>), AppError> {
    let resp = state.auth.signup(req).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_msg(
            "Signup successful. Verify the challenge to complete registration.",
            resp,
        )),
    ))
}

/// Request a login challenge
///
/// POST /v1/auth/login
#[utoipa::path(
    post,
    path = "/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Challenge issued", body = ApiResponse<LoginResponse>),
        (status = 404, description = "No such identity")
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, AppError> {
    let resp = state.auth.login(req).await?;
    Ok(Json(ApiResponse::with_msg(
        "Challenge generated. Please sign it with your private key.",
        resp,
    )))
}

/// Prove possession of the private key over the issued challenge
///
/// POST /v1/auth/verify
#[utoipa::path(
    post,
    path = "/v1/auth/verify",
    request_body = VerifyRequest,
    responses(
        (status = 200, description = "Authenticated; tokens issued", body = ApiResponse<VerifyResponse>),
        (status = 401, description = "Signature rejected or no active challenge"),
        (status = 404, description = "No such identity")
    ),
    tag = "Auth"
)]
pub async fn verify(
    State(state): State<Arc<AppState>>,
    Json(req): Json<VerifyRequest>,
) -> Result<Json<ApiResponse<VerifyResponse>>, AppError> {
    let resp = state.auth.verify(req).await?;
    Ok(Json(ApiResponse::with_msg(
        "Authentication successful.",
        resp,
    )))
}

/// Rotate a refresh token into a fresh access + refresh pair
///
/// POST /v1/auth/refresh
#[utoipa::path(
    post,
    path = "/v1/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Tokens rotated", body = ApiResponse<RefreshResponse>),
        (status = 401, description = "Refresh token unknown, expired or already consumed")
    ),
    tag = "Auth"
)]
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<ApiResponse<RefreshResponse>>, AppError> {
    let resp = state.auth.refresh(&req.refresh_token).await?;
    Ok(Json(ApiResponse::success(resp)))
}

/// Revoke the current session's tokens
///
/// POST /v1/auth/logout
#[utoipa::path(
    post,
    path = "/v1/auth/logout",
    request_body = LogoutRequest,
    responses(
        (status = 200, description = "Tokens revoked (idempotent)")
    ),
    tag = "Auth"
)]
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<LogoutRequest>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    state
        .auth
        .logout(bearer_token(&headers), &req.refresh_token)
        .await?;
    Ok(Json(ApiResponse::with_msg("Logged out.", ())))
}

/// Resolve the authenticated identity
///
/// GET /v1/auth/me (protected)
#[utoipa::path(
    get,
    path = "/v1/auth/me",
    responses(
        (status = 200, description = "Authenticated identity", body = ApiResponse<MeResponse>),
        (status = 401, description = "Missing or invalid access token"),
        (status = 404, description = "Identity no longer exists")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn me(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ApiResponse<MeResponse>>, AppError> {
    let resp = state.auth.resolve_identity(&claims).await?;
    Ok(Json(ApiResponse::success(resp)))
}
