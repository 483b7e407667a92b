//! Ed25519 signature verification for challenge-response authentication.
//!
//! The server stores only base64-encoded public keys; private keys never
//! leave the client. This is the sole trust boundary proving possession of
//! the private key.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};

/// Verify an Ed25519 signature over the UTF-8 bytes of `message`.
///
/// # Arguments
/// * `public_key_b64` - base64-encoded 32-byte Ed25519 public key
/// * `message` - the challenge string that was signed
/// * `signature_b64` - base64-encoded 64-byte Ed25519 signature
///
/// # Returns
/// `true` if the signature is valid, `false` otherwise. Never errors: any
/// decoding failure, malformed key, or mismatch yields `false`, so callers
/// can treat this as a pure predicate.
pub fn verify(public_key_b64: &str, message: &str, signature_b64: &str) -> bool {
    let pk_raw = match B64.decode(public_key_b64) {
        Ok(b) => b,
        Err(_) => return false,
    };
    let sig_raw = match B64.decode(signature_b64) {
        Ok(b) => b,
        Err(_) => return false,
    };

    // Public key must be exactly 32 bytes
    let pk_bytes: [u8; 32] = match pk_raw.as_slice().try_into() {
        Ok(b) => b,
        Err(_) => return false,
    };

    // Signature must be exactly 64 bytes
    let sig_bytes: [u8; 64] = match sig_raw.as_slice().try_into() {
        Ok(b) => b,
        Err(_) => return false,
    };

    let verifying_key = match VerifyingKey::from_bytes(&pk_bytes) {
        Ok(k) => k,
        Err(_) => return false,
    };

    let sig = Signature::from_bytes(&sig_bytes);

    verifying_key.verify(message.as_bytes(), &sig).is_ok()
}

/// Generate a keypair for testing. Returns (signing key, base64 public key).
#[cfg(test)]
pub fn generate_keypair() -> (ed25519_dalek::SigningKey, String) {
    use ed25519_dalek::SigningKey;
    use rand::rngs::OsRng;

    let signing_key = SigningKey::generate(&mut OsRng);
    let public_b64 = B64.encode(signing_key.verifying_key().to_bytes());
    (signing_key, public_b64)
}

/// Sign a message, returning the base64 signature (for testing).
#[cfg(test)]
pub fn sign_b64(signing_key: &ed25519_dalek::SigningKey, message: &str) -> String {
    use ed25519_dalek::Signer;

    B64.encode(signing_key.sign(message.as_bytes()).to_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_valid_signature() {
        let (sk, pk) = generate_keypair();
        let message = "challenge-abc123";
        let sig = sign_b64(&sk, message);

        assert!(verify(&pk, message, &sig));
    }

    #[test]
    fn test_verify_wrong_message() {
        let (sk, pk) = generate_keypair();
        let sig = sign_b64(&sk, "challenge-one");

        assert!(!verify(&pk, "challenge-two", &sig));
    }

    #[test]
    fn test_verify_wrong_key() {
        let (sk, _) = generate_keypair();
        let (_, other_pk) = generate_keypair();
        let message = "challenge-abc123";
        let sig = sign_b64(&sk, message);

        assert!(!verify(&other_pk, message, &sig));
    }

    #[test]
    fn test_bit_flip_rejected() {
        let (sk, pk) = generate_keypair();
        let message = "challenge-abc123";
        let sig = sign_b64(&sk, message);

        let mut raw = B64.decode(&sig).unwrap();
        raw[10] ^= 0x01;
        let tampered = B64.encode(raw);

        assert!(!verify(&pk, message, &tampered));
    }

    #[test]
    fn test_malformed_base64_rejected() {
        let (sk, pk) = generate_keypair();
        let sig = sign_b64(&sk, "msg");

        assert!(!verify("not-base64!!", "msg", &sig));
        assert!(!verify(&pk, "msg", "not-base64!!"));
    }

    #[test]
    fn test_wrong_lengths_rejected() {
        let (sk, pk) = generate_keypair();
        let sig = sign_b64(&sk, "msg");

        // 16-byte key, 32-byte signature
        assert!(!verify(&B64.encode([0u8; 16]), "msg", &sig));
        assert!(!verify(&pk, "msg", &B64.encode([0u8; 32])));
    }
}
