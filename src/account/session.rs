//! Session issuance and lookup. The client holds an opaque random token;
//! the store holds only its SHA-256, so a leaked sessions table cannot be
//! replayed.

use rand::RngCore;
use sha2::{Digest, Sha256};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::state::AppState;
use crate::store::{Session, StoreError};

/// The opaque token handed to the client at login.
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Create a session for the account and return it with the raw token.
pub async fn issue(state: &AppState, user_id: i64) -> Result<(Session, String), StoreError> {
    let token = generate_token();
    let now = OffsetDateTime::now_utc();
    let session = Session {
        id: Uuid::new_v4(),
        user_id,
        token_hash: hash_token(&token),
        created_at: now,
        expires_at: now + Duration::days(state.config.security.session_ttl_days),
    };
    state.sessions.create(&session).await?;
    Ok((session, token))
}

/// Resolve a presented token to its live session, if any.
pub async fn resolve(state: &AppState, token: &str) -> Result<Option<Session>, StoreError> {
    state
        .sessions
        .find_live(&hash_token(token), OffsetDateTime::now_utc())
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_long_and_unique() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
    }

    #[test]
    fn token_hash_is_deterministic_and_distinct_from_token() {
        let token = generate_token();
        assert_eq!(hash_token(&token), hash_token(&token));
        assert_ne!(hash_token(&token), token);
    }

    #[tokio::test]
    async fn issued_sessions_resolve_until_deleted() {
        let state = AppState::fake();
        let (session, token) = issue(&state, 1).await.expect("issue");

        let found = resolve(&state, &token).await.expect("resolve");
        assert_eq!(found.map(|s| s.id), Some(session.id));

        state.sessions.delete(session.id).await.expect("delete");
        assert!(resolve(&state, &token).await.expect("resolve").is_none());
    }

    #[tokio::test]
    async fn unknown_tokens_do_not_resolve() {
        let state = AppState::fake();
        assert!(resolve(&state, "not-a-token").await.expect("resolve").is_none());
    }
}
