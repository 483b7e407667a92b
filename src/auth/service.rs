//! Auth orchestrator: the signup / login / verify / refresh / logout
//! protocol, composed from the challenge manager, signature verifier and
//! token service.
//!
//! Per-identity state machine: `Unregistered -> Registered -> Challenged ->
//! Authenticated -> Registered` (on logout or refresh expiry). Concurrent
//! logins for the same identity are last-writer-wins on the challenge; the
//! orchestrator does not serialize them.

use rand::Rng;
use std::sync::Arc;
use validator::Validate;

use super::challenge::{ChallengeManager, generate_challenge};
use super::models::{
    Claims, LoginRequest, LoginResponse, MeResponse, NewIdentity, RefreshResponse, SignupRequest,
    SignupResponse, VerifyRequest, VerifyResponse,
};
use super::repository::IdentityRepository;
use super::tokens::TokenService;
use crate::error::AppError;

fn generate_login_id() -> String {
    let bytes: [u8; 8] = rand::thread_rng().r#gen();
    format!("user_{}", hex::encode(bytes))
}

pub struct AuthService {
    identities: Arc<dyn IdentityRepository>,
    challenges: ChallengeManager,
    tokens: TokenService,
}

impl AuthService {
    pub fn new(identities: Arc<dyn IdentityRepository>, tokens: TokenService) -> Self {
        let challenges = ChallengeManager::new(identities.clone());
        Self {
            identities,
            challenges,
            tokens,
        }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Fails with `AlreadyExists` when the pseudonym is taken.
    pub async fn check_pseudonym(&self, pseudonym: &str) -> Result<(), AppError> {
        if self
            .identities
            .find_by_pseudonym(pseudonym)
            .await?
            .is_some()
        {
            return Err(AppError::already_exists("The pseudonym is already in use"));
        }
        Ok(())
    }

    /// Register a new identity and issue its first challenge. Signup alone
    /// does not produce tokens; the caller must `verify` to activate login.
    pub async fn signup(&self, req: SignupRequest) -> Result<SignupResponse, AppError> {
        req.validate()?;

        if self
            .identities
            .find_by_pseudonym(&req.pseudonym)
            .await?
            .is_some()
        {
            return Err(AppError::already_exists("This pseudonym is already in use"));
        }

        let challenge = generate_challenge();
        let identity = self
            .identities
            .create(NewIdentity {
                login_id: generate_login_id(),
                pseudonym: req.pseudonym,
                public_key: req.public_key,
                recovery_phrase_hashes: req.recovery_phrase_hashes,
                current_challenge: Some(challenge.clone()),
            })
            .await?;

        tracing::info!(user_id = identity.id, "identity registered");

        Ok(SignupResponse {
            id: identity.id,
            pseudonym: identity.pseudonym,
            challenge,
        })
    }

    /// Issue a fresh challenge, superseding any outstanding one.
    pub async fn login(&self, req: LoginRequest) -> Result<LoginResponse, AppError> {
        let identity = self
            .identities
            .find_by_pseudonym(&req.pseudonym)
            .await?
            .ok_or_else(|| AppError::not_found("User not found."))?;

        let challenge = self.challenges.issue(&identity).await?;

        Ok(LoginResponse {
            pseudonym: identity.pseudonym,
            challenge,
        })
    }

    /// Check the signed challenge and, on success, mint an access + refresh
    /// pair. The challenge is spent either way.
    pub async fn verify(&self, req: VerifyRequest) -> Result<VerifyResponse, AppError> {
        let identity = self
            .identities
            .find_by_pseudonym(&req.pseudonym)
            .await?
            .ok_or_else(|| AppError::not_found("This user account does not exist."))?;

        let ok = self.challenges.consume(&identity, &req.signature).await?;
        if !ok {
            tracing::warn!(user_id = identity.id, "challenge signature rejected");
            return Err(AppError::invalid_signature("Authentication failed"));
        }

        let pair = self.tokens.issue_pair(&identity).await?;
        tracing::info!(user_id = identity.id, "identity authenticated");

        Ok(VerifyResponse {
            user_id: identity.id,
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
        })
    }

    /// Rotate a refresh token into a fresh pair.
    pub async fn refresh(&self, raw_refresh_token: &str) -> Result<RefreshResponse, AppError> {
        let (_, pair) = self.tokens.rotate(raw_refresh_token).await?;
        Ok(RefreshResponse {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
        })
    }

    /// Revoke both tokens of a session. Idempotent: repeated logout with
    /// the same tokens is the same no-op.
    pub async fn logout(
        &self,
        access_token: Option<&str>,
        raw_refresh_token: &str,
    ) -> Result<(), AppError> {
        if let Some(token) = access_token {
            self.tokens.revoke_access_token(token);
        }
        self.tokens.revoke_refresh_token(raw_refresh_token).await
    }

    /// Re-resolve the identity behind verified claims. Fails with
    /// `NotFound` when the identity no longer exists.
    pub async fn resolve_identity(&self, claims: &Claims) -> Result<MeResponse, AppError> {
        let user_id: i64 = claims
            .sub
            .parse()
            .map_err(|_| AppError::unauthorized("Invalid or expired token"))?;

        let identity = self
            .identities
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("This user account does not exist."))?;

        Ok(MeResponse {
            id: identity.id,
            login_id: identity.login_id,
            pseudonym: identity.pseudonym,
        })
    }

    #[cfg(test)]
    pub(crate) async fn identity(&self, pseudonym: &str) -> Option<super::models::Identity> {
        self.identities
            .find_by_pseudonym(pseudonym)
            .await
            .ok()
            .flatten()
    }
}
