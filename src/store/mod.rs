//! Abstract persistence for accounts and sessions. The services never touch
//! a concrete storage technology; they talk to these traits, and the adapter
//! in `postgres` (or `memory`, for tests) does the actual I/O.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

pub mod memory;
pub mod postgres;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Unique-constraint violation on the normalized email column.
    #[error("email already registered")]
    EmailTaken,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// A user record as persisted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserAccount {
    pub id: i64,
    pub email: String,                // normalized: trimmed + lowercased
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,        // Argon2 hash, never exposed in JSON
    pub avatar: Option<String>,       // object key or absolute URL
    pub is_active: bool,
    pub is_admin: bool,
    pub created_at: OffsetDateTime,
}

/// Fields the caller supplies when creating an account; everything else is
/// defaulted by the store.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub username: String,
    pub password_hash: String,
}

/// A server-held session. Only the SHA-256 of the opaque token is stored.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Session {
    pub id: Uuid,
    pub user_id: i64,
    pub token_hash: String,
    pub created_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, StoreError>;
    async fn find_by_id(&self, id: i64) -> Result<Option<UserAccount>, StoreError>;
    /// Insert a new account. Email uniqueness is enforced atomically here;
    /// the loser of a concurrent insert gets `EmailTaken`.
    async fn create(&self, new: NewAccount) -> Result<UserAccount, StoreError>;
    /// Persist the mutable fields of an existing account.
    async fn update(&self, account: &UserAccount) -> Result<(), StoreError>;
    /// Hard delete. The adapter also drops the account's sessions.
    async fn delete(&self, id: i64) -> Result<(), StoreError>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create(&self, session: &Session) -> Result<(), StoreError>;
    /// Look up a session by token hash, ignoring expired rows.
    async fn find_live(
        &self,
        token_hash: &str,
        now: OffsetDateTime,
    ) -> Result<Option<Session>, StoreError>;
    async fn delete(&self, id: Uuid) -> Result<(), StoreError>;
    /// Revoke every session of a user, optionally sparing one. Returns the
    /// number of sessions removed.
    async fn delete_for_user(&self, user_id: i64, spare: Option<Uuid>) -> Result<u64, StoreError>;
}
