//! In-memory repository implementations, used by `AppState::fake()` and tests.

use std::collections::HashMap;
use std::sync::Mutex;

use axum::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo::{NewUser, SessionToken, TokenRepo, User, UserRepo};

#[derive(Default)]
pub struct MemoryUserRepo {
    users: Mutex<HashMap<Uuid, User>>,
}

impl MemoryUserRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_superuser(&self, id: Uuid, value: bool) {
        if let Some(user) = self.users.lock().unwrap().get_mut(&id) {
            user.is_superuser = value;
        }
    }
}

#[async_trait]
impl UserRepo for MemoryUserRepo {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let users = self.users.lock().unwrap();
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(self.users.lock().unwrap().get(&id).cloned())
    }

    async fn create(&self, new: NewUser) -> anyhow::Result<User> {
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            email: new.email,
            password_hash: new.password_hash,
            first_name: new.first_name,
            last_name: new.last_name,
            is_active: true,
            is_superuser: false,
            created_at: now,
            updated_at: now,
            last_login: None,
        };
        self.users.lock().unwrap().insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        first_name: Option<String>,
        last_name: Option<String>,
    ) -> anyhow::Result<Option<User>> {
        let mut users = self.users.lock().unwrap();
        let Some(user) = users.get_mut(&id) else {
            return Ok(None);
        };
        if first_name.is_some() {
            user.first_name = first_name;
        }
        if last_name.is_some() {
            user.last_name = last_name;
        }
        user.updated_at = OffsetDateTime::now_utc();
        Ok(Some(user.clone()))
    }

    async fn record_login(&self, id: Uuid, at: OffsetDateTime) -> anyhow::Result<()> {
        if let Some(user) = self.users.lock().unwrap().get_mut(&id) {
            user.last_login = Some(at);
        }
        Ok(())
    }

    async fn deactivate(&self, id: Uuid) -> anyhow::Result<()> {
        if let Some(user) = self.users.lock().unwrap().get_mut(&id) {
            user.is_active = false;
            user.updated_at = OffsetDateTime::now_utc();
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryTokenRepo {
    rows: Mutex<Vec<SessionToken>>,
}

impl MemoryTokenRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenRepo for MemoryTokenRepo {
    async fn insert(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<Option<SessionToken>> {
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|t| t.token == token) {
            return Ok(None);
        }
        let row = SessionToken {
            id: Uuid::new_v4(),
            user_id,
            token: token.to_string(),
            expires_at,
            is_active: true,
            created_at: OffsetDateTime::now_utc(),
        };
        rows.push(row.clone());
        Ok(Some(row))
    }

    async fn find_active(&self, token: &str) -> anyhow::Result<Option<SessionToken>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().find(|t| t.token == token && t.is_active).cloned())
    }

    async fn deactivate(&self, token: &str, user_id: Uuid) -> anyhow::Result<u64> {
        let mut rows = self.rows.lock().unwrap();
        let mut affected = 0;
        for row in rows
            .iter_mut()
            .filter(|t| t.token == token && t.user_id == user_id && t.is_active)
        {
            row.is_active = false;
            affected += 1;
        }
        Ok(affected)
    }

    async fn deactivate_all(&self, user_id: Uuid) -> anyhow::Result<u64> {
        let mut rows = self.rows.lock().unwrap();
        let mut affected = 0;
        for row in rows.iter_mut().filter(|t| t.user_id == user_id && t.is_active) {
            row.is_active = false;
            affected += 1;
        }
        Ok(affected)
    }
}
