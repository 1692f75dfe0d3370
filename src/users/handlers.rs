use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::{
        dto::PublicUser,
        extractors::{restrict_to, CurrentUser},
    },
    error::ApiError,
    state::AppState,
    users::{dto::UploadPhotoRequest, model::Role},
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/me", get(get_me))
        .route("/users/me/photo", post(upload_photo))
}

#[instrument(skip(user))]
pub async fn get_me(user: CurrentUser) -> Json<PublicUser> {
    Json(PublicUser::from(&user))
}

#[instrument(skip(state, user))]
pub async fn list_users(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<PublicUser>>, ApiError> {
    restrict_to(&user, &[Role::Admin])?;

    let users = state.users.list().await?;
    Ok(Json(users.iter().map(PublicUser::from).collect()))
}

#[instrument(skip(state, user, payload))]
pub async fn upload_photo(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<UploadPhotoRequest>,
) -> Result<Json<PublicUser>, ApiError> {
    if payload.image.is_empty() {
        return Err(ApiError::validation("There is no uploaded image."));
    }
    let ext = match ext_from_mime(&payload.content_type) {
        Some(ext) => ext,
        None => {
            return Err(ApiError::validation(
                "Not an image. Please upload only images.",
            ));
        }
    };

    let key = format!("avatars/{}/img-{}.{}", user.id, Uuid::new_v4(), ext);
    let location = state
        .images
        .store(&key, Bytes::from(payload.image.into_vec()), &payload.content_type)
        .await?;

    let updated = state.users.set_photo(user.id, &location).await?;
    info!(user_id = %user.id, location = %location, "profile photo updated");
    Ok(Json(PublicUser::from(&updated)))
}

fn ext_from_mime(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}
