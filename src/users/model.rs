use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Role granted to an account. New signups always start as `User`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Default for Role {
    fn default() -> Self {
        Role::User
    }
}

/// Full user record as persisted.
///
/// Deliberately not `Serialize`: responses go through `PublicUser`, so the
/// password hash and reset fields cannot end up in a JSON body by accident.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub photo: Option<String>,
    pub password_changed_at: Option<OffsetDateTime>,
    pub password_reset_token: Option<String>,
    pub password_reset_expires: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl User {
    /// True when the password was changed after a token with this `iat` was
    /// signed. Comparison is strict at unix-second resolution, so a token
    /// signed in the same second as the change stays valid.
    pub fn changed_password_after(&self, token_iat: usize) -> bool {
        self.password_changed_at
            .map(|changed| changed.unix_timestamp() > token_iat as i64)
            .unwrap_or(false)
    }
}
