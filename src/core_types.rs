//! Core type definitions shared across the platform.

/// Identity id, assigned by storage at signup.
pub type UserId = i64;

/// Unique id for a live realtime connection. Process-local, never persisted.
pub type ConnectionId = u64;
