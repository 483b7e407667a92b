//! Access-token revocation set.
//!
//! Logout must invalidate an access token before its natural expiry, so
//! verified tokens are additionally checked against this process-wide set.
//! Entries carry the token's own expiry; a periodic sweep drops entries
//! past it, which bounds memory to the longest access-token TTL.
//!
//! Single-process only. A multi-instance deployment needs an external
//! shared store here.

use dashmap::DashMap;

/// Thread-safe revocation set for access tokens.
pub struct TokenBlacklist {
    /// token -> expiry (unix seconds)
    entries: DashMap<String, i64>,
}

impl TokenBlacklist {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Revoke a token until `expires_at` (unix seconds).
    pub fn add(&self, token: &str, expires_at: i64) {
        self.entries.insert(token.to_string(), expires_at);
    }

    pub fn contains(&self, token: &str) -> bool {
        self.entries.contains_key(token)
    }

    /// Drop entries whose tokens have expired on their own.
    ///
    /// Returns the number of entries removed.
    pub fn sweep(&self, now: i64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, exp| *exp > now);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for TokenBlacklist {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_contains() {
        let blacklist = TokenBlacklist::new();
        assert!(!blacklist.contains("tok"));

        blacklist.add("tok", 2000);
        assert!(blacklist.contains("tok"));
        assert_eq!(blacklist.len(), 1);
    }

    #[test]
    fn test_double_revoke_is_noop() {
        let blacklist = TokenBlacklist::new();
        blacklist.add("tok", 2000);
        blacklist.add("tok", 2000);
        assert_eq!(blacklist.len(), 1);
    }

    #[test]
    fn test_sweep_removes_only_expired() {
        let blacklist = TokenBlacklist::new();
        blacklist.add("old", 1000);
        blacklist.add("live", 3000);

        let removed = blacklist.sweep(2000);
        assert_eq!(removed, 1);
        assert!(!blacklist.contains("old"));
        assert!(blacklist.contains("live"));
    }
}
