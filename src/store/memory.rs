//! In-memory store backing `AppState::fake()` and the scenario tests. Keeps
//! the same uniqueness and cascade behavior as the Postgres adapter.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{CredentialStore, NewAccount, Session, SessionStore, StoreError, UserAccount};

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    next_id: i64,
    users: HashMap<i64, UserAccount>,
    sessions: HashMap<Uuid, Session>,
}

impl MemoryStore {
    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("memory store lock poisoned")
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, StoreError> {
        let inner = self.lock();
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<UserAccount>, StoreError> {
        let inner = self.lock();
        Ok(inner.users.get(&id).cloned())
    }

    async fn create(&self, new: NewAccount) -> Result<UserAccount, StoreError> {
        let mut inner = self.lock();
        if inner.users.values().any(|u| u.email == new.email) {
            return Err(StoreError::EmailTaken);
        }
        inner.next_id += 1;
        let account = UserAccount {
            id: inner.next_id,
            email: new.email,
            username: new.username,
            password_hash: new.password_hash,
            avatar: None,
            is_active: true,
            is_admin: false,
            created_at: OffsetDateTime::now_utc(),
        };
        inner.users.insert(account.id, account.clone());
        Ok(account)
    }

    async fn update(&self, account: &UserAccount) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if inner
            .users
            .values()
            .any(|u| u.id != account.id && u.email == account.email)
        {
            return Err(StoreError::EmailTaken);
        }
        if inner.users.contains_key(&account.id) {
            inner.users.insert(account.id, account.clone());
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.users.remove(&id);
        inner.sessions.retain(|_, s| s.user_id != id);
        Ok(())
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn create(&self, session: &Session) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.sessions.insert(session.id, session.clone());
        Ok(())
    }

    async fn find_live(
        &self,
        token_hash: &str,
        now: OffsetDateTime,
    ) -> Result<Option<Session>, StoreError> {
        let inner = self.lock();
        Ok(inner
            .sessions
            .values()
            .find(|s| s.token_hash == token_hash && s.expires_at > now)
            .cloned())
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.sessions.remove(&id);
        Ok(())
    }

    async fn delete_for_user(&self, user_id: i64, spare: Option<Uuid>) -> Result<u64, StoreError> {
        let mut inner = self.lock();
        let before = inner.sessions.len();
        inner
            .sessions
            .retain(|id, s| s.user_id != user_id || spare == Some(*id));
        Ok((before - inner.sessions.len()) as u64)
    }
}
