//! One-time login/signup challenges.
//!
//! Each identity holds at most one outstanding challenge; issuing a new one
//! silently supersedes the previous, which becomes permanently
//! unconsumable. Consuming clears the challenge no matter the outcome, so a
//! challenge can never be replayed after a failed attempt.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use rand::rngs::OsRng;
use std::sync::Arc;

use super::models::Identity;
use super::repository::IdentityRepository;
use super::signature;
use crate::error::AppError;

/// Challenge entropy in bytes.
const CHALLENGE_BYTES: usize = 32;

/// Generate a fresh unpredictable challenge string (URL-safe base64).
pub fn generate_challenge() -> String {
    let mut bytes = [0u8; CHALLENGE_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Per-identity challenge state machine: `NoChallenge -> Challenged ->
/// NoChallenge`, looping once per issue/consume pair.
pub struct ChallengeManager {
    identities: Arc<dyn IdentityRepository>,
}

impl ChallengeManager {
    pub fn new(identities: Arc<dyn IdentityRepository>) -> Self {
        Self { identities }
    }

    /// Issue a fresh challenge, overwriting any outstanding one. Only the
    /// most recently issued challenge is ever valid.
    pub async fn issue(&self, identity: &Identity) -> Result<String, AppError> {
        let challenge = generate_challenge();
        self.identities
            .set_challenge(identity.id, Some(&challenge))
            .await?;
        Ok(challenge)
    }

    /// Check `signature_b64` against the identity's current challenge.
    ///
    /// The challenge is cleared before the signature check, so it is spent
    /// regardless of the outcome. Fails when no challenge is outstanding;
    /// that case folds into the generic signature failure at the gateway.
    pub async fn consume(
        &self,
        identity: &Identity,
        signature_b64: &str,
    ) -> Result<bool, AppError> {
        let challenge = identity
            .current_challenge
            .as_deref()
            .ok_or_else(|| AppError::invalid_signature("No active challenge: try logging in."))?;

        self.identities.set_challenge(identity.id, None).await?;

        Ok(signature::verify(
            &identity.public_key,
            challenge,
            signature_b64,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::NewIdentity;
    use crate::auth::repository::MemoryIdentityRepository;
    use crate::auth::signature::{generate_keypair, sign_b64};
    use crate::error::ErrorCode;

    async fn setup() -> (
        Arc<MemoryIdentityRepository>,
        ChallengeManager,
        ed25519_dalek::SigningKey,
        Identity,
    ) {
        let repo = Arc::new(MemoryIdentityRepository::new());
        let (sk, pk) = generate_keypair();
        let identity = repo
            .create(NewIdentity {
                login_id: "user_abc".to_string(),
                pseudonym: "quiet-fox-42".to_string(),
                public_key: pk,
                recovery_phrase_hashes: vec!["h".to_string(); 20],
                current_challenge: None,
            })
            .await
            .unwrap();
        let manager = ChallengeManager::new(repo.clone() as Arc<dyn IdentityRepository>);
        (repo, manager, sk, identity)
    }

    #[test]
    fn test_generate_challenge_entropy() {
        let a = generate_challenge();
        let b = generate_challenge();
        assert_ne!(a, b);
        // 32 bytes -> 43 chars of unpadded url-safe base64
        assert_eq!(a.len(), 43);
    }

    #[tokio::test]
    async fn test_consume_success_clears_challenge() {
        let (repo, manager, sk, identity) = setup().await;
        let challenge = manager.issue(&identity).await.unwrap();

        let identity = repo.find_by_id(identity.id).await.unwrap().unwrap();
        let ok = manager
            .consume(&identity, &sign_b64(&sk, &challenge))
            .await
            .unwrap();
        assert!(ok);

        let after = repo.find_by_id(identity.id).await.unwrap().unwrap();
        assert!(after.current_challenge.is_none());
    }

    #[tokio::test]
    async fn test_consume_failure_also_clears_challenge() {
        let (repo, manager, sk, identity) = setup().await;
        manager.issue(&identity).await.unwrap();

        let identity = repo.find_by_id(identity.id).await.unwrap().unwrap();
        let ok = manager
            .consume(&identity, &sign_b64(&sk, "some-other-message"))
            .await
            .unwrap();
        assert!(!ok);

        let after = repo.find_by_id(identity.id).await.unwrap().unwrap();
        assert!(after.current_challenge.is_none());
    }

    #[tokio::test]
    async fn test_consume_without_challenge_fails() {
        let (_, manager, sk, identity) = setup().await;
        let err = manager
            .consume(&identity, &sign_b64(&sk, "anything"))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidSignature);
    }

    #[tokio::test]
    async fn test_reissue_supersedes_previous_challenge() {
        let (repo, manager, sk, identity) = setup().await;
        let c1 = manager.issue(&identity).await.unwrap();
        let c2 = manager.issue(&identity).await.unwrap();
        assert_ne!(c1, c2);

        // Signing the stale challenge fails; only c2 is live
        let identity = repo.find_by_id(identity.id).await.unwrap().unwrap();
        let ok = manager
            .consume(&identity, &sign_b64(&sk, &c1))
            .await
            .unwrap();
        assert!(!ok);
    }
}
