//! Ichtaka - secure, anonymous social-reporting platform.
//!
//! Pseudonymous identities register with an Ed25519 public key and prove
//! possession of the private key by signing single-use challenges. There
//! are no passwords anywhere in the system.
//!
//! # Modules
//!
//! - [`auth`] - challenge-response authentication and token lifecycle
//! - [`websocket`] - realtime connection registry and event fan-out
//! - [`notifications`] - per-identity notifications with push delivery
//! - [`gateway`] - HTTP routing and server startup
//! - [`config`] - YAML application configuration
//! - [`db`] - PostgreSQL pool management
//! - [`error`] - domain error taxonomy

pub mod auth;
pub mod config;
pub mod core_types;
pub mod db;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod notifications;
pub mod websocket;

// Convenient re-exports at crate root
pub use auth::{AuthService, TokenBlacklist, TokenService};
pub use config::AppConfig;
pub use core_types::{ConnectionId, UserId};
pub use error::{AppError, ErrorCode};
pub use notifications::NotificationService;
pub use websocket::{ConnectionRegistry, WsEvent};
