//! Unified API response wrapper.

use serde::Serialize;
use utoipa::ToSchema;

/// All success responses follow this structure:
/// - code: always 0 on success (errors use their own body, see `error.rs`)
/// - msg: short human message
/// - data: actual payload
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    #[schema(example = 0)]
    pub code: i32,
    #[schema(example = "ok")]
    pub msg: String,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: 0,
            msg: "ok".to_string(),
            data,
        }
    }

    pub fn with_msg(msg: impl Into<String>, data: T) -> Self {
        Self {
            code: 0,
            msg: msg.into(),
            data,
        }
    }
}

/// Health check payload.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub live_connections: usize,
}
