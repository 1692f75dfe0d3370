//! User-record store contract and its two backends.
//!
//! All operations are single-record, keyed by id, email, or reset digest.
//! The reset/photo updates touch only their own columns, so a record with a
//! pending reset is never re-validated as a whole on those writes.

use std::collections::HashMap;
use std::sync::RwLock;

use axum::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::users::model::{Role, User};

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;

    /// Reset lookup: digest must match AND the expiry must still be in the
    /// future. Stale and unmatched digests both come back as `None`.
    async fn find_by_reset_digest(
        &self,
        digest: &str,
        now: OffsetDateTime,
    ) -> anyhow::Result<Option<User>>;

    async fn create(&self, name: &str, email: &str, password_hash: &str)
        -> anyhow::Result<User>;

    async fn set_reset_token(
        &self,
        id: Uuid,
        digest: &str,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<()>;

    async fn clear_reset_token(&self, id: Uuid) -> anyhow::Result<()>;

    /// One atomic write: new hash, changed-at stamp, reset fields cleared.
    async fn reset_password(
        &self,
        id: Uuid,
        password_hash: &str,
        changed_at: OffsetDateTime,
    ) -> anyhow::Result<User>;

    async fn set_photo(&self, id: Uuid, location: &str) -> anyhow::Result<User>;

    async fn list(&self) -> anyhow::Result<Vec<User>>;
}

// ---- Postgres backend ----

pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, role, photo, password_changed_at,
                   password_reset_token, password_reset_expires, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, role, photo, password_changed_at,
                   password_reset_token, password_reset_expires, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_reset_digest(
        &self,
        digest: &str,
        now: OffsetDateTime,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, role, photo, password_changed_at,
                   password_reset_token, password_reset_expires, created_at, updated_at
            FROM users
            WHERE password_reset_token = $1 AND password_reset_expires > $2
            "#,
        )
        .bind(digest)
        .bind(now)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn create(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, name, email, password_hash, role, photo, password_changed_at,
                      password_reset_token, password_reset_expires, created_at, updated_at
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.db)
        .await?;
        Ok(user)
    }

    async fn set_reset_token(
        &self,
        id: Uuid,
        digest: &str,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET password_reset_token = $2, password_reset_expires = $3, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(digest)
        .bind(expires_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn clear_reset_token(&self, id: Uuid) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET password_reset_token = NULL, password_reset_expires = NULL, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn reset_password(
        &self,
        id: Uuid,
        password_hash: &str,
        changed_at: OffsetDateTime,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET password_hash = $2,
                password_changed_at = $3,
                password_reset_token = NULL,
                password_reset_expires = NULL,
                updated_at = now()
            WHERE id = $1
            RETURNING id, name, email, password_hash, role, photo, password_changed_at,
                      password_reset_token, password_reset_expires, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .bind(changed_at)
        .fetch_one(&self.db)
        .await?;
        Ok(user)
    }

    async fn set_photo(&self, id: Uuid, location: &str) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET photo = $2, updated_at = now()
            WHERE id = $1
            RETURNING id, name, email, password_hash, role, photo, password_changed_at,
                      password_reset_token, password_reset_expires, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(location)
        .fetch_one(&self.db)
        .await?;
        Ok(user)
    }

    async fn list(&self) -> anyhow::Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, role, photo, password_changed_at,
                   password_reset_token, password_reset_expires, created_at, updated_at
            FROM users
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(users)
    }
}

// ---- In-memory backend ----

/// Map-backed store for tests and storeless local runs.
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl MemoryUserStore {
    /// Mutate a stored record in place. Test support: lets a suite move
    /// timestamps or roles without growing the public store contract.
    pub fn update_record(&self, id: Uuid, f: impl FnOnce(&mut User)) -> bool {
        let mut users = self.users.write().expect("user map lock poisoned");
        match users.get_mut(&id) {
            Some(user) => {
                f(user);
                true
            }
            None => false,
        }
    }

    /// Drop a record entirely. Test support: the HTTP surface never
    /// hard-deletes, but the guard must cope with an account that vanished.
    pub fn remove_record(&self, id: Uuid) -> bool {
        let mut users = self.users.write().expect("user map lock poisoned");
        users.remove(&id).is_some()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let users = self.users.read().expect("user map lock poisoned");
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let users = self.users.read().expect("user map lock poisoned");
        Ok(users.get(&id).cloned())
    }

    async fn find_by_reset_digest(
        &self,
        digest: &str,
        now: OffsetDateTime,
    ) -> anyhow::Result<Option<User>> {
        let users = self.users.read().expect("user map lock poisoned");
        Ok(users
            .values()
            .find(|u| {
                u.password_reset_token.as_deref() == Some(digest)
                    && u.password_reset_expires.map(|e| e > now).unwrap_or(false)
            })
            .cloned())
    }

    async fn create(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> anyhow::Result<User> {
        let mut users = self.users.write().expect("user map lock poisoned");
        if users.values().any(|u| u.email == email) {
            anyhow::bail!("email already registered: {email}");
        }
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            role: Role::default(),
            photo: None,
            password_changed_at: None,
            password_reset_token: None,
            password_reset_expires: None,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn set_reset_token(
        &self,
        id: Uuid,
        digest: &str,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<()> {
        let mut users = self.users.write().expect("user map lock poisoned");
        let user = users
            .get_mut(&id)
            .ok_or_else(|| anyhow::anyhow!("user not found: {id}"))?;
        user.password_reset_token = Some(digest.to_string());
        user.password_reset_expires = Some(expires_at);
        user.updated_at = OffsetDateTime::now_utc();
        Ok(())
    }

    async fn clear_reset_token(&self, id: Uuid) -> anyhow::Result<()> {
        let mut users = self.users.write().expect("user map lock poisoned");
        let user = users
            .get_mut(&id)
            .ok_or_else(|| anyhow::anyhow!("user not found: {id}"))?;
        user.password_reset_token = None;
        user.password_reset_expires = None;
        user.updated_at = OffsetDateTime::now_utc();
        Ok(())
    }

    async fn reset_password(
        &self,
        id: Uuid,
        password_hash: &str,
        changed_at: OffsetDateTime,
    ) -> anyhow::Result<User> {
        let mut users = self.users.write().expect("user map lock poisoned");
        let user = users
            .get_mut(&id)
            .ok_or_else(|| anyhow::anyhow!("user not found: {id}"))?;
        user.password_hash = password_hash.to_string();
        user.password_changed_at = Some(changed_at);
        user.password_reset_token = None;
        user.password_reset_expires = None;
        user.updated_at = OffsetDateTime::now_utc();
        Ok(user.clone())
    }

    async fn set_photo(&self, id: Uuid, location: &str) -> anyhow::Result<User> {
        let mut users = self.users.write().expect("user map lock poisoned");
        let user = users
            .get_mut(&id)
            .ok_or_else(|| anyhow::anyhow!("user not found: {id}"))?;
        user.photo = Some(location.to_string());
        user.updated_at = OffsetDateTime::now_utc();
        Ok(user.clone())
    }

    async fn list(&self) -> anyhow::Result<Vec<User>> {
        let users = self.users.read().expect("user map lock poisoned");
        let mut all: Vec<User> = users.values().cloned().collect();
        all.sort_by_key(|u| u.created_at);
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    #[tokio::test]
    async fn create_then_find_by_email_and_id() {
        let store = MemoryUserStore::default();
        let created = store
            .create("Ada", "ada@example.com", "$argon2id$fake")
            .await
            .unwrap();
        assert_eq!(created.role, Role::User);

        let by_email = store.find_by_email("ada@example.com").await.unwrap();
        assert_eq!(by_email.unwrap().id, created.id);

        let by_id = store.find_by_id(created.id).await.unwrap();
        assert_eq!(by_id.unwrap().email, "ada@example.com");
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = MemoryUserStore::default();
        store
            .create("Ada", "ada@example.com", "hash-a")
            .await
            .unwrap();
        let err = store
            .create("Other Ada", "ada@example.com", "hash-b")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("already registered"));
    }

    #[tokio::test]
    async fn reset_digest_lookup_honors_the_expiry_window() {
        let store = MemoryUserStore::default();
        let user = store.create("Ada", "ada@example.com", "hash").await.unwrap();

        let now = OffsetDateTime::now_utc();
        store
            .set_reset_token(user.id, "digest-1", now + Duration::minutes(10))
            .await
            .unwrap();

        // Inside the window.
        let found = store
            .find_by_reset_digest("digest-1", now + Duration::minutes(5))
            .await
            .unwrap();
        assert_eq!(found.unwrap().id, user.id);

        // Past the window: identical outcome to a wrong digest.
        let stale = store
            .find_by_reset_digest("digest-1", now + Duration::minutes(11))
            .await
            .unwrap();
        let wrong = store
            .find_by_reset_digest("digest-2", now + Duration::minutes(5))
            .await
            .unwrap();
        assert!(stale.is_none());
        assert!(wrong.is_none());
    }

    #[tokio::test]
    async fn reset_password_clears_reset_fields_atomically() {
        let store = MemoryUserStore::default();
        let user = store.create("Ada", "ada@example.com", "old-hash").await.unwrap();
        let now = OffsetDateTime::now_utc();
        store
            .set_reset_token(user.id, "digest-1", now + Duration::minutes(10))
            .await
            .unwrap();

        let updated = store
            .reset_password(user.id, "new-hash", now)
            .await
            .unwrap();
        assert_eq!(updated.password_hash, "new-hash");
        assert_eq!(updated.password_changed_at, Some(now));
        assert!(updated.password_reset_token.is_none());
        assert!(updated.password_reset_expires.is_none());
    }

    #[tokio::test]
    async fn clear_reset_token_voids_a_pending_reset() {
        let store = MemoryUserStore::default();
        let user = store.create("Ada", "ada@example.com", "hash").await.unwrap();
        let now = OffsetDateTime::now_utc();
        store
            .set_reset_token(user.id, "digest-1", now + Duration::minutes(10))
            .await
            .unwrap();
        store.clear_reset_token(user.id).await.unwrap();

        let found = store.find_by_reset_digest("digest-1", now).await.unwrap();
        assert!(found.is_none());
        let user = store.find_by_id(user.id).await.unwrap().unwrap();
        assert!(user.password_reset_token.is_none());
        assert!(user.password_reset_expires.is_none());
    }
}
