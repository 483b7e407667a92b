//! Token issuance and lifecycle.
//!
//! Access tokens are stateless HS256 JWTs carrying `{sub, pseudonym, iat,
//! exp}`. Refresh tokens are opaque 32-byte random secrets; only their
//! SHA-256 hash is persisted, and the raw value is returned to the client
//! exactly once. Every rotation consumes the presented token and mints a
//! fresh pair, bounding the replay window.
//!
//! Every cryptographic or lookup failure here surfaces as `Unauthorized`
//! with the same message. Callers cannot distinguish "malformed" from
//! "revoked" from "expired".

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use std::sync::Arc;

use super::blacklist::TokenBlacklist;
use super::models::{Claims, Identity};
use super::repository::{IdentityRepository, RefreshTokenRepository};
use crate::config::AuthConfig;
use crate::core_types::UserId;
use crate::error::AppError;

/// Refresh-token entropy in bytes.
const REFRESH_TOKEN_BYTES: usize = 32;

const AUTH_FAILED_MSG: &str = "Invalid or expired token";

/// Freshly minted access + refresh token pair. The refresh token is the raw
/// secret, shown to the client exactly once.
#[derive(Debug)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

pub struct TokenService {
    jwt_secret: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
    identities: Arc<dyn IdentityRepository>,
    refresh_tokens: Arc<dyn RefreshTokenRepository>,
    blacklist: Arc<TokenBlacklist>,
}

/// Deterministic one-way hash of a raw refresh token. Used as the storage
/// lookup key, so no salt.
pub fn hash_refresh_token(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}

impl TokenService {
    pub fn new(
        config: &AuthConfig,
        identities: Arc<dyn IdentityRepository>,
        refresh_tokens: Arc<dyn RefreshTokenRepository>,
        blacklist: Arc<TokenBlacklist>,
    ) -> Self {
        Self {
            jwt_secret: config.jwt_secret.clone(),
            access_ttl: Duration::minutes(config.access_ttl_minutes),
            refresh_ttl: Duration::days(config.refresh_ttl_days),
            identities,
            refresh_tokens,
            blacklist,
        }
    }

    pub fn blacklist(&self) -> &Arc<TokenBlacklist> {
        &self.blacklist
    }

    /// Mint a signed access token for an identity.
    pub fn issue_access_token(&self, identity: &Identity) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: identity.id.to_string(),
            pseudonym: identity.pseudonym.clone(),
            iat: now.timestamp() as usize,
            exp: (now + self.access_ttl).timestamp() as usize,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| {
            tracing::error!("access token encoding failed: {}", e);
            AppError::internal()
        })
    }

    /// Verify an access token: signature, expiry, and revocation set.
    pub fn verify_access_token(&self, token: &str) -> Result<Claims, AppError> {
        if self.blacklist.contains(token) {
            return Err(AppError::unauthorized(AUTH_FAILED_MSG));
        }

        let decoding_key = DecodingKey::from_secret(self.jwt_secret.as_bytes());
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|_| AppError::unauthorized(AUTH_FAILED_MSG))
    }

    /// Mint a refresh token, persisting only its hash. Returns the raw
    /// secret.
    pub async fn issue_refresh_token(&self, user_id: UserId) -> Result<String, AppError> {
        let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        let raw = URL_SAFE_NO_PAD.encode(bytes);

        self.refresh_tokens
            .insert(user_id, &hash_refresh_token(&raw), Utc::now() + self.refresh_ttl)
            .await?;

        Ok(raw)
    }

    /// Mint a paired access + refresh token for a verified identity.
    pub async fn issue_pair(&self, identity: &Identity) -> Result<TokenPair, AppError> {
        let access_token = self.issue_access_token(identity)?;
        let refresh_token = self.issue_refresh_token(identity.id).await?;
        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Exchange a raw refresh token for a fresh pair, invalidating the
    /// consumed record. Succeeds at most once per raw token.
    pub async fn rotate(&self, raw: &str) -> Result<(UserId, TokenPair), AppError> {
        let record = self
            .refresh_tokens
            .find_valid(&hash_refresh_token(raw), Utc::now())
            .await?
            .ok_or_else(|| AppError::unauthorized(AUTH_FAILED_MSG))?;

        self.refresh_tokens.delete(record.id).await?;

        // A vanished identity is indistinguishable from a bad token
        let identity = self
            .identities
            .find_by_id(record.user_id)
            .await?
            .ok_or_else(|| AppError::unauthorized(AUTH_FAILED_MSG))?;

        let pair = self.issue_pair(&identity).await?;
        Ok((identity.id, pair))
    }

    /// Add an access token to the revocation set until its embedded expiry.
    ///
    /// A token that fails signature decoding is ignored: it can never pass
    /// `verify_access_token` anyway.
    pub fn revoke_access_token(&self, token: &str) {
        let decoding_key = DecodingKey::from_secret(self.jwt_secret.as_bytes());
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;

        if let Ok(data) = decode::<Claims>(token, &decoding_key, &validation) {
            self.blacklist.add(token, data.claims.exp as i64);
        }
    }

    /// Destroy the stored record for a raw refresh token. Idempotent.
    pub async fn revoke_refresh_token(&self, raw: &str) -> Result<(), AppError> {
        self.refresh_tokens
            .delete_by_hash(&hash_refresh_token(raw))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::NewIdentity;
    use crate::auth::repository::{MemoryIdentityRepository, MemoryRefreshTokenRepository};
    use crate::error::ErrorCode;

    fn test_config(access_ttl_minutes: i64) -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret".to_string(),
            access_ttl_minutes,
            refresh_ttl_days: 30,
            blacklist_sweep_secs: 60,
        }
    }

    async fn setup(access_ttl_minutes: i64) -> (TokenService, Identity) {
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
            &test_config(access_ttl_minutes),
            identities,
            Arc::new(MemoryRefreshTokenRepository::new()),
            Arc::new(TokenBlacklist::new()),
        );
        (service, identity)
    }

    #[tokio::test]
    async fn test_access_token_roundtrip() {
        let (service, identity) = setup(15).await;
        let token = service.issue_access_token(&identity).unwrap();

        let claims = service.verify_access_token(&token).unwrap();
        assert_eq!(claims.sub, identity.id.to_string());
        assert_eq!(claims.pseudonym, "quiet-fox-42");
    }

    #[tokio::test]
    async fn test_tampered_access_token_rejected() {
        let (service, identity) = setup(15).await;
        let token = service.issue_access_token(&identity).unwrap();
        let mut tampered = token.clone();
        tampered.push('x');

        let err = service.verify_access_token(&tampered).unwrap_err();
        assert_eq!(err.code, ErrorCode::Unauthorized);
    }

    #[tokio::test]
    async fn test_expired_access_token_rejected() {
        // Negative TTL puts the expiry beyond the validation leeway
        let (service, identity) = setup(-5).await;
        let token = service.issue_access_token(&identity).unwrap();

        let err = service.verify_access_token(&token).unwrap_err();
        assert_eq!(err.code, ErrorCode::Unauthorized);
    }

    #[tokio::test]
    async fn test_revoked_access_token_rejected() {
        let (service, identity) = setup(15).await;
        let token = service.issue_access_token(&identity).unwrap();
        assert!(service.verify_access_token(&token).is_ok());

        service.revoke_access_token(&token);
        let err = service.verify_access_token(&token).unwrap_err();
        assert_eq!(err.code, ErrorCode::Unauthorized);
    }

    #[tokio::test]
    async fn test_revoking_forged_token_is_ignored() {
        let (service, _) = setup(15).await;
        service.revoke_access_token("not.a.jwt");
        assert!(service.blacklist().is_empty());
    }

    #[tokio::test]
    async fn test_rotate_never_reuses_raw_value() {
        let (service, identity) = setup(15).await;
        let raw = service.issue_refresh_token(identity.id).await.unwrap();

        let (user_id, pair) = service.rotate(&raw).await.unwrap();
        assert_eq!(user_id, identity.id);
        assert_ne!(pair.refresh_token, raw);
    }

    #[tokio::test]
    async fn test_rotate_consumes_token() {
        let (service, identity) = setup(15).await;
        let raw = service.issue_refresh_token(identity.id).await.unwrap();

        assert!(service.rotate(&raw).await.is_ok());
        let err = service.rotate(&raw).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Unauthorized);
    }

    #[tokio::test]
    async fn test_rotate_unknown_token_rejected() {
        let (service, _) = setup(15).await;
        let err = service.rotate("made-up-token").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Unauthorized);
    }

    #[tokio::test]
    async fn test_revoke_refresh_token_idempotent() {
        let (service, identity) = setup(15).await;
        let raw = service.issue_refresh_token(identity.id).await.unwrap();

        service.revoke_refresh_token(&raw).await.unwrap();
        // Second revocation is the same no-op
        service.revoke_refresh_token(&raw).await.unwrap();

        let err = service.rotate(&raw).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Unauthorized);
    }

    #[test]
    fn test_refresh_hash_is_deterministic_and_opaque() {
        let a = hash_refresh_token("raw-token");
        let b = hash_refresh_token("raw-token");
        assert_eq!(a, b);
        assert_ne!(a, "raw-token");
        assert_eq!(a.len(), 64);
    }
}
