//! Identity and token models plus the auth wire DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::core_types::UserId;

/// Number of hashed recovery words every identity registers with.
pub const RECOVERY_PHRASE_WORDS: usize = 20;

/// A registered pseudonymous account.
///
/// The public key is the sole authentication credential and is immutable
/// after registration. `current_challenge` holds the at-most-one outstanding
/// login/signup challenge; it is cleared on every verification attempt.
#[derive(Debug, Clone)]
pub struct Identity {
    pub id: UserId,
    /// System-generated opaque login id, immutable.
    pub login_id: String,
    /// Unique, user-chosen display handle.
    pub pseudonym: String,
    /// Base64-encoded Ed25519 public key.
    pub public_key: String,
    pub key_algorithm: String,
    /// Hashes of the 20 recovery words. Never compared against plaintext
    /// server-side.
    pub recovery_phrase_hashes: Vec<String>,
    pub current_challenge: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields for creating an identity at signup.
#[derive(Debug, Clone)]
pub struct NewIdentity {
    pub login_id: String,
    pub pseudonym: String,
    pub public_key: String,
    pub recovery_phrase_hashes: Vec<String>,
    pub current_challenge: Option<String>,
}

/// Stored refresh-token row. Only the SHA-256 hash of the raw secret is
/// ever persisted.
#[derive(Debug, Clone)]
pub struct RefreshTokenRecord {
    pub id: i64,
    pub user_id: UserId,
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// JWT claim set carried by access tokens.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Identity id as string
    pub sub: String,
    pub pseudonym: String,
    /// Issued at (unix seconds)
    pub iat: usize,
    /// Expiry (unix seconds)
    pub exp: usize,
}

// ============================================================================
// Wire DTOs
// ============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SignupRequest {
    #[schema(example = "quiet-fox-42")]
    #[validate(length(min = 3, max = 32))]
    pub pseudonym: String,
    /// Base64-encoded Ed25519 public key
    #[validate(length(min = 1))]
    pub public_key: String,
    /// Exactly 20 hashed recovery words
    #[validate(length(equal = 20))]
    pub recovery_phrase_hashes: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SignupResponse {
    pub id: UserId,
    pub pseudonym: String,
    pub challenge: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "quiet-fox-42")]
    pub pseudonym: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub pseudonym: String,
    pub challenge: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyRequest {
    pub pseudonym: String,
    /// Base64-encoded Ed25519 signature over the issued challenge string
    pub signature: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VerifyResponse {
    pub user_id: UserId,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RefreshResponse {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LogoutRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MeResponse {
    pub id: UserId,
    pub login_id: String,
    pub pseudonym: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckUsernameResponse {
    pub is_available: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signup_request_validation() {
        let ok = SignupRequest {
            pseudonym: "quiet-fox-42".to_string(),
            public_key: "AAAA".to_string(),
            recovery_phrase_hashes: vec!["h".to_string(); RECOVERY_PHRASE_WORDS],
        };
        assert!(ok.validate().is_ok());

        let short_name = SignupRequest {
            pseudonym: "ab".to_string(),
            public_key: "AAAA".to_string(),
            recovery_phrase_hashes: vec!["h".to_string(); RECOVERY_PHRASE_WORDS],
        };
        assert!(short_name.validate().is_err());

        let wrong_count = SignupRequest {
            pseudonym: "quiet-fox-42".to_string(),
            public_key: "AAAA".to_string(),
            recovery_phrase_hashes: vec!["h".to_string(); 19],
        };
        assert!(wrong_count.validate().is_err());
    }
}
