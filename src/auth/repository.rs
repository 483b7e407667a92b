//! Storage access for identities and refresh tokens.
//!
//! Repositories are trait objects injected at process start: the gateway
//! wires the PostgreSQL implementations, tests construct in-memory ones.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::sync::atomic::{AtomicI64, Ordering};

use super::models::{Identity, NewIdentity, RefreshTokenRecord};
use crate::core_types::UserId;

#[async_trait]
pub trait IdentityRepository: Send + Sync {
    async fn create(&self, new: NewIdentity) -> Result<Identity>;
    async fn find_by_id(&self, id: UserId) -> Result<Option<Identity>>;
    async fn find_by_pseudonym(&self, pseudonym: &str) -> Result<Option<Identity>>;
    /// Overwrite the current challenge. `None` clears it.
    async fn set_challenge(&self, id: UserId, challenge: Option<&str>) -> Result<()>;
}

#[async_trait]
pub trait RefreshTokenRepository: Send + Sync {
    async fn insert(
        &self,
        user_id: UserId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshTokenRecord>;
    /// Look up an unexpired record by hash.
    async fn find_valid(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<RefreshTokenRecord>>;
    /// Returns whether a record was removed.
    async fn delete(&self, id: i64) -> Result<bool>;
    async fn delete_by_hash(&self, token_hash: &str) -> Result<bool>;
}

// ============================================================================
// PostgreSQL implementations
// ============================================================================

pub struct PgIdentityRepository {
    pool: PgPool,
}

impl PgIdentityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_identity(row: PgRow) -> Identity {
    Identity {
        id: row.get("id"),
        login_id: row.get("login_id"),
        pseudonym: row.get("pseudonym"),
        public_key: row.get("public_key"),
        key_algorithm: row.get("key_algorithm"),
        recovery_phrase_hashes: row.get("recovery_phrase_hashes"),
        current_challenge: row.get("current_challenge"),
        created_at: row.get("created_at"),
    }
}

#[async_trait]
impl IdentityRepository for PgIdentityRepository {
    async fn create(&self, new: NewIdentity) -> Result<Identity> {
        let row = sqlx::query(
            r#"INSERT INTO user_account
               (login_id, pseudonym, public_key, key_algorithm, recovery_phrase_hashes, current_challenge)
               VALUES ($1, $2, $3, 'Ed25519', $4, $5)
               RETURNING id, login_id, pseudonym, public_key, key_algorithm,
                         recovery_phrase_hashes, current_challenge, created_at"#,
        )
        .bind(&new.login_id)
        .bind(&new.pseudonym)
        .bind(&new.public_key)
        .bind(&new.recovery_phrase_hashes)
        .bind(&new.current_challenge)
        .fetch_one(&self.pool)
        .await
        .context("Failed to insert identity")?;

        Ok(row_to_identity(row))
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<Identity>> {
        let row = sqlx::query(
            r#"SELECT id, login_id, pseudonym, public_key, key_algorithm,
                      recovery_phrase_hashes, current_challenge, created_at
               FROM user_account WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to query identity by id")?;

        Ok(row.map(row_to_identity))
    }

    async fn find_by_pseudonym(&self, pseudonym: &str) -> Result<Option<Identity>> {
        let row = sqlx::query(
            r#"SELECT id, login_id, pseudonym, public_key, key_algorithm,
                      recovery_phrase_hashes, current_challenge, created_at
               FROM user_account WHERE pseudonym = $1"#,
        )
        .bind(pseudonym)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to query identity by pseudonym")?;

        Ok(row.map(row_to_identity))
    }

    async fn set_challenge(&self, id: UserId, challenge: Option<&str>) -> Result<()> {
        sqlx::query(r#"UPDATE user_account SET current_challenge = $2 WHERE id = $1"#)
            .bind(id)
            .bind(challenge)
            .execute(&self.pool)
            .await
            .context("Failed to update challenge")?;
        Ok(())
    }
}

pub struct PgRefreshTokenRepository {
    pool: PgPool,
}

impl PgRefreshTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_refresh(row: PgRow) -> RefreshTokenRecord {
    RefreshTokenRecord {
        id: row.get("id"),
        user_id: row.get("user_id"),
        token_hash: row.get("token_hash"),
        created_at: row.get("created_at"),
        expires_at: row.get("expires_at"),
    }
}

#[async_trait]
impl RefreshTokenRepository for PgRefreshTokenRepository {
    async fn insert(
        &self,
        user_id: UserId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshTokenRecord> {
        let row = sqlx::query(
            r#"INSERT INTO refresh_token (user_id, token_hash, expires_at)
               VALUES ($1, $2, $3)
               RETURNING id, user_id, token_hash, created_at, expires_at"#,
        )
        .bind(user_id)
        .bind(token_hash)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await
        .context("Failed to insert refresh token")?;

        Ok(row_to_refresh(row))
    }

    async fn find_valid(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<RefreshTokenRecord>> {
        let row = sqlx::query(
            r#"SELECT id, user_id, token_hash, created_at, expires_at
               FROM refresh_token WHERE token_hash = $1 AND expires_at > $2"#,
        )
        .bind(token_hash)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to query refresh token")?;

        Ok(row.map(row_to_refresh))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let res = sqlx::query(r#"DELETE FROM refresh_token WHERE id = $1"#)
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete refresh token")?;
        Ok(res.rows_affected() > 0)
    }

    async fn delete_by_hash(&self, token_hash: &str) -> Result<bool> {
        let res = sqlx::query(r#"DELETE FROM refresh_token WHERE token_hash = $1"#)
            .bind(token_hash)
            .execute(&self.pool)
            .await
            .context("Failed to delete refresh token by hash")?;
        Ok(res.rows_affected() > 0)
    }
}

// ============================================================================
// In-memory implementations (tests, local development)
// ============================================================================

#[derive(Default)]
pub struct MemoryIdentityRepository {
    items: DashMap<UserId, Identity>,
    next_id: AtomicI64,
}

impl MemoryIdentityRepository {
    pub fn new() -> Self {
        Self {
            items: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }
}

#[async_trait]
impl IdentityRepository for MemoryIdentityRepository {
    async fn create(&self, new: NewIdentity) -> Result<Identity> {
        // Mirrors the unique index on pseudonym
        if self
            .items
            .iter()
            .any(|entry| entry.value().pseudonym == new.pseudonym)
        {
            bail!("duplicate key: pseudonym");
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let identity = Identity {
            id,
            login_id: new.login_id,
            pseudonym: new.pseudonym,
            public_key: new.public_key,
            key_algorithm: "Ed25519".to_string(),
            recovery_phrase_hashes: new.recovery_phrase_hashes,
            current_challenge: new.current_challenge,
            created_at: Utc::now(),
        };
        self.items.insert(id, identity.clone());
        Ok(identity)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<Identity>> {
        Ok(self.items.get(&id).map(|entry| entry.value().clone()))
    }

    async fn find_by_pseudonym(&self, pseudonym: &str) -> Result<Option<Identity>> {
        Ok(self
            .items
            .iter()
            .find(|entry| entry.value().pseudonym == pseudonym)
            .map(|entry| entry.value().clone()))
    }

    async fn set_challenge(&self, id: UserId, challenge: Option<&str>) -> Result<()> {
        if let Some(mut entry) = self.items.get_mut(&id) {
            entry.current_challenge = challenge.map(str::to_string);
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryRefreshTokenRepository {
    items: DashMap<i64, RefreshTokenRecord>,
    next_id: AtomicI64,
}

impl MemoryRefreshTokenRepository {
    pub fn new() -> Self {
        Self {
            items: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }
}

#[async_trait]
impl RefreshTokenRepository for MemoryRefreshTokenRepository {
    async fn insert(
        &self,
        user_id: UserId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshTokenRecord> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let record = RefreshTokenRecord {
            id,
            user_id,
            token_hash: token_hash.to_string(),
            created_at: Utc::now(),
            expires_at,
        };
        self.items.insert(id, record.clone());
        Ok(record)
    }

    async fn find_valid(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<RefreshTokenRecord>> {
        Ok(self
            .items
            .iter()
            .find(|entry| entry.value().token_hash == token_hash && entry.value().expires_at > now)
            .map(|entry| entry.value().clone()))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        Ok(self.items.remove(&id).is_some())
    }

    async fn delete_by_hash(&self, token_hash: &str) -> Result<bool> {
        let id = self
            .items
            .iter()
            .find(|entry| entry.value().token_hash == token_hash)
            .map(|entry| *entry.key());
        match id {
            Some(id) => Ok(self.items.remove(&id).is_some()),
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_identity(pseudonym: &str) -> NewIdentity {
        NewIdentity {
            login_id: format!("user_{}", pseudonym),
            pseudonym: pseudonym.to_string(),
            public_key: "pk".to_string(),
            recovery_phrase_hashes: vec!["h".to_string(); 20],
            current_challenge: Some("c1".to_string()),
        }
    }

    #[tokio::test]
    async fn test_memory_identity_roundtrip() {
        let repo = MemoryIdentityRepository::new();
        let created = repo.create(new_identity("quiet-fox-42")).await.unwrap();
        assert_eq!(created.key_algorithm, "Ed25519");

        let found = repo.find_by_pseudonym("quiet-fox-42").await.unwrap();
        assert_eq!(found.unwrap().id, created.id);

        repo.set_challenge(created.id, None).await.unwrap();
        let cleared = repo.find_by_id(created.id).await.unwrap().unwrap();
        assert!(cleared.current_challenge.is_none());
    }

    #[tokio::test]
    async fn test_memory_identity_duplicate_pseudonym() {
        let repo = MemoryIdentityRepository::new();
        repo.create(new_identity("quiet-fox-42")).await.unwrap();
        assert!(repo.create(new_identity("quiet-fox-42")).await.is_err());
    }

    #[tokio::test]
    async fn test_memory_refresh_expiry_filter() {
        let repo = MemoryRefreshTokenRepository::new();
        let now = Utc::now();
        repo.insert(7, "hash-live", now + chrono::Duration::days(1))
            .await
            .unwrap();
        repo.insert(7, "hash-dead", now - chrono::Duration::days(1))
            .await
            .unwrap();

        assert!(repo.find_valid("hash-live", now).await.unwrap().is_some());
        assert!(repo.find_valid("hash-dead", now).await.unwrap().is_none());

        assert!(repo.delete_by_hash("hash-live").await.unwrap());
        assert!(!repo.delete_by_hash("hash-live").await.unwrap());
    }
}
