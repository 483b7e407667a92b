//! WebSocket handler for realtime connections.
//!
//! Handles the upgrade, connection lifecycle, and message forwarding. A
//! connection may present an access token (`/ws?token=...`) to be keyed by
//! identity; without one it joins anonymously and only receives broadcasts.

use axum::extract::ws::{Message, WebSocket};
use axum::{
    extract::{Query, State, WebSocketUpgrade},
    response::{IntoResponse, Response},
};
use futures::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;

use super::connection::ConnectionRegistry;
use super::messages::WsEvent;
use crate::auth::TokenService;
use crate::core_types::UserId;
use crate::error::AppError;
use crate::gateway::state::AppState;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Optional access token; a present-but-invalid token is rejected
    pub token: Option<String>,
}

/// Resolve the optional `?token=` into a connection identity.
///
/// No token means anonymous. A token that fails verification, or whose
/// subject claim is not an identity id, is rejected outright rather than
/// downgraded to anonymous.
fn identify(tokens: &TokenService, token: Option<&str>) -> Result<Option<UserId>, AppError> {
    let Some(token) = token else {
        return Ok(None);
    };

    let claims = tokens.verify_access_token(token)?;
    let user_id = claims
        .sub
        .parse()
        .map_err(|_| AppError::unauthorized("Invalid or expired token"))?;
    Ok(Some(user_id))
}

/// Inbound text frames are control messages shaped `{"type": ...}`; only
/// `ping` is recognized.
fn is_ping(text: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(text)
        .ok()
        .and_then(|v| v.get("type").and_then(|t| t.as_str()).map(|t| t == "ping"))
        .unwrap_or(false)
}

/// WebSocket upgrade handler
///
/// Endpoint: GET /ws or GET /ws?token=...
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let user_id = match identify(state.auth.tokens(), params.token.as_deref()) {
        Ok(user_id) => user_id,
        Err(err) => return err.into_response(),
    };

    let registry = state.registry.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, user_id, registry))
}

/// Handle a connection's lifecycle from upgrade to disconnect.
async fn handle_socket(socket: WebSocket, user_id: Option<UserId>, registry: Arc<ConnectionRegistry>) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<WsEvent>();

    let conn_id = registry.connect(user_id, tx.clone());

    let welcome = WsEvent::Connected { user_id };
    if let Ok(json) = serde_json::to_string(&welcome) {
        let _ = sender.send(Message::Text(json.into())).await;
    }

    // Forward events from the registry channel to the socket
    let mut send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if let Ok(json) = serde_json::to_string(&event) {
                if sender.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
        }
    });

    // Handle inbound control frames (ping, close)
    let tx_for_recv = tx.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    if is_ping(&text) {
                        let _ = tx_for_recv.send(WsEvent::Pong);
                    }
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    }

    // Deregister synchronously so later sends cannot hit a dangling entry
    registry.disconnect(user_id, conn_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TokenBlacklist;
    use crate::auth::models::{Claims, NewIdentity};
    use crate::auth::repository::{
        IdentityRepository, MemoryIdentityRepository, MemoryRefreshTokenRepository,
    };
    use crate::config::AuthConfig;
    use crate::error::ErrorCode;
    use jsonwebtoken::{EncodingKey, Header, encode};

    const TEST_SECRET: &str = "ws-test-secret";

    async fn token_service() -> (TokenService, crate::auth::Identity) {
        let identities = Arc::new(MemoryIdentityRepository::new());
        let identity = identities
            .create(NewIdentity {
                login_id: "user_abc".to_string(),
                pseudonym: "quiet-fox-42".to_string(),
                public_key: "pk".to_string(),
                recovery_phrase_hashes: vec!["h".to_string(); 20],
                current_challenge: None,
            })
            .await
            .unwrap();

        let service = TokenService::new(
            &AuthConfig {
                jwt_secret: TEST_SECRET.to_string(),
                access_ttl_minutes: 15,
                refresh_ttl_days: 30,
                blacklist_sweep_secs: 60,
            },
            identities,
            Arc::new(MemoryRefreshTokenRepository::new()),
            Arc::new(TokenBlacklist::new()),
        );
        (service, identity)
    }

    #[tokio::test]
    async fn test_identify_without_token_is_anonymous() {
        let (tokens, _) = token_service().await;
        assert_eq!(identify(&tokens, None).unwrap(), None);
    }

    #[tokio::test]
    async fn test_identify_with_valid_token() {
        let (tokens, identity) = token_service().await;
        let token = tokens.issue_access_token(&identity).unwrap();
        assert_eq!(identify(&tokens, Some(&token)).unwrap(), Some(identity.id));
    }

    #[tokio::test]
    async fn test_identify_rejects_garbage_token() {
        let (tokens, _) = token_service().await;
        let err = identify(&tokens, Some("not.a.jwt")).unwrap_err();
        assert_eq!(err.code, ErrorCode::Unauthorized);
    }

    #[tokio::test]
    async fn test_identify_rejects_non_numeric_subject() {
        // Well-signed token whose subject is not an identity id must be
        // rejected, not downgraded to an anonymous connection
        let (tokens, _) = token_service().await;
        let now = chrono::Utc::now().timestamp() as usize;
        let claims = Claims {
            sub: "not-a-number".to_string(),
            pseudonym: "quiet-fox-42".to_string(),
            iat: now,
            exp: now + 900,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
        )
        .unwrap();

        let err = identify(&tokens, Some(&token)).unwrap_err();
        assert_eq!(err.code, ErrorCode::Unauthorized);
    }

    #[test]
    fn test_is_ping_requires_control_shape() {
        assert!(is_ping(r#"{"type": "ping"}"#));
        assert!(is_ping(r#"{"type": "ping", "extra": 1}"#));

        // Mentioning "ping" in an unrelated payload is not a control frame
        assert!(!is_ping(r#"{"body": "loved your \"ping\" article"}"#));
        assert!(!is_ping(r#"{"type": "pingg"}"#));
        assert!(!is_ping("ping"));
        assert!(!is_ping("{not json"));
    }
}
