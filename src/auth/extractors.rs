use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;
use uuid::Uuid;

use crate::{
    auth::jwt::JwtKeys,
    error::ApiError,
    state::AppState,
    users::model::{Role, User},
};

/// The authenticated caller, as seen by handlers.
///
/// Built by the session guard from a verified token plus a live store
/// lookup; the password hash, reset fields and internal timestamps never
/// make it into this value.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub photo: Option<String>,
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            photo: user.photo.clone(),
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                ApiError::authentication("You are not logged in. Please log in to get access.")
            })?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .or_else(|| auth_header.strip_prefix("bearer "))
            .ok_or_else(|| {
                ApiError::authentication("You are not logged in. Please log in to get access.")
            })?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify(token).map_err(|err| {
            warn!(error = %err, "token verification failed");
            ApiError::from(err)
        })?;

        let user = state
            .users
            .find_by_id(claims.sub)
            .await?
            .ok_or_else(|| {
                warn!(user_id = %claims.sub, "token subject no longer exists");
                ApiError::authentication("The user belonging to this token no longer exists.")
            })?;

        if user.changed_password_after(claims.iat) {
            warn!(user_id = %user.id, "token predates a password change");
            return Err(ApiError::authentication(
                "Password was changed recently. Please log in again.",
            ));
        }

        Ok(CurrentUser::from(&user))
    }
}

/// Role gate: reject unless the caller's role is in the permitted set.
///
/// Takes the already-extracted `CurrentUser`, so it can only run after the
/// session guard succeeded.
pub fn restrict_to(user: &CurrentUser, permitted: &[Role]) -> Result<(), ApiError> {
    if permitted.contains(&user.role) {
        Ok(())
    } else {
        warn!(user_id = %user.id, role = ?user.role, "role not permitted");
        Err(ApiError::authorization(
            "You do not have permission to perform this action.",
        ))
    }
}
