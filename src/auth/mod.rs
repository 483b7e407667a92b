//! Challenge-response authentication.
//!
//! Identity is a pseudonym plus an Ed25519 public key; there are no
//! passwords. Proof of possession works over single-use challenges, and
//! sessions are carried by short-lived JWT access tokens paired with
//! rotating opaque refresh tokens.
//!
//! ## Components
//! - `signature`: Ed25519 signature verification (pure predicate)
//! - `challenge`: one-time challenge issue/consume
//! - `tokens`: access/refresh token lifecycle
//! - `blacklist`: access-token revocation set
//! - `service`: the signup/login/verify/refresh/logout orchestrator
//! - `repository`: identity and refresh-token storage
//! - `middleware`: bearer-token guard for protected routes
//! - `handlers`: gateway endpoints

pub mod blacklist;
pub mod challenge;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod service;
pub mod signature;
pub mod tokens;

pub use blacklist::TokenBlacklist;
pub use challenge::ChallengeManager;
pub use models::{Claims, Identity, NewIdentity, RefreshTokenRecord};
pub use repository::{
    IdentityRepository, MemoryIdentityRepository, MemoryRefreshTokenRepository,
    PgIdentityRepository, PgRefreshTokenRepository, RefreshTokenRepository,
};
pub use service::AuthService;
pub use tokens::{TokenPair, TokenService};
