use axum::{
    extract::{FromRef, Path, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use time::OffsetDateTime;
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{
            AuthResponse, ForgotPasswordRequest, LoginRequest, MessageResponse, PublicUser,
            ResetPasswordRequest, SignupRequest,
        },
        jwt::JwtKeys,
        password::{hash_password, verify_password},
        reset,
    },
    error::ApiError,
    state::AppState,
    users::model::User,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password/:secret", post(reset_password))
}

fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn sign_for(state: &AppState, user: &User) -> Result<AuthResponse, ApiError> {
    let keys = JwtKeys::from_ref(state);
    let token = keys.sign(user.id)?;
    Ok(AuthResponse {
        token,
        user: PublicUser::from(user),
    })
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    Json(mut payload): Json<SignupRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    payload.email = payload.email.trim().to_lowercase();
    payload.name = payload.name.trim().to_string();

    if state.users.find_by_email(&payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(ApiError::conflict("The email address is already in use."));
    }
    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::validation("Please enter a valid email address."));
    }
    if payload.name.is_empty() {
        return Err(ApiError::validation("Please enter your name."));
    }
    if payload.password.len() < 8 {
        return Err(ApiError::validation(
            "Password length must be at least 8 characters.",
        ));
    }
    if payload.password != payload.password_confirm {
        return Err(ApiError::validation("Passwords do not match."));
    }

    let hash = hash_password(&payload.password)?;
    let user = state
        .users
        .create(&payload.name, &payload.email, &hash)
        .await?;

    info!(user_id = %user.id, email = %user.email, "user signed up");
    let body = sign_for(&state, &user)?;
    Ok((StatusCode::CREATED, Json(body)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    // Unknown email and bad password answer identically.
    let user = match state.users.find_by_email(&payload.email).await? {
        Some(user) => user,
        None => {
            warn!(email = %payload.email, "login with unknown email");
            return Err(ApiError::authentication("Incorrect email or password"));
        }
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login with wrong password");
        return Err(ApiError::authentication("Incorrect email or password"));
    }

    info!(user_id = %user.id, "user logged in");
    Ok(Json(sign_for(&state, &user)?))
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(mut payload): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    let user = match state.users.find_by_email(&payload.email).await? {
        Some(user) => user,
        None => {
            return Err(ApiError::not_found(
                "There is no user with that email address.",
            ));
        }
    };

    // The digest must be persisted before the mail leaves, and voided if it
    // never does.
    let token = reset::generate();
    state
        .users
        .set_reset_token(user.id, &token.digest, token.expires_at)
        .await?;

    let url = format!(
        "{}/api/v1/auth/reset-password/{}",
        state.config.base_url.trim_end_matches('/'),
        token.secret
    );
    let body = format!(
        "Forgot your password? Reset it by visiting the following link: {url}\n\
         If you didn't request a reset, you can ignore this email."
    );

    if let Err(err) = state
        .mailer
        .send(
            &user.email,
            "Your password reset token (valid for 10 minutes)",
            &body,
        )
        .await
    {
        error!(error = %err, user_id = %user.id, "reset email send failed");
        state.users.clear_reset_token(user.id).await?;
        return Err(ApiError::dependency(
            "There was an error sending the email. Please try again later.",
        ));
    }

    info!(user_id = %user.id, "password reset email sent");
    Ok(Json(MessageResponse {
        message: "The reset token was sent to your email address.".into(),
    }))
}

#[instrument(skip(state, secret, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    Path(secret): Path<String>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let digest = reset::digest(&secret);
    let user = match state
        .users
        .find_by_reset_digest(&digest, OffsetDateTime::now_utc())
        .await?
    {
        Some(user) => user,
        None => {
            warn!("reset with unknown or expired secret");
            return Err(ApiError::validation("Token is invalid or has expired."));
        }
    };

    if payload.password.len() < 8 {
        return Err(ApiError::validation(
            "Password length must be at least 8 characters.",
        ));
    }
    if payload.password != payload.password_confirm {
        return Err(ApiError::validation("Passwords do not match."));
    }

    let hash = hash_password(&payload.password)?;
    let user = state
        .users
        .reset_password(user.id, &hash, OffsetDateTime::now_utc())
        .await?;

    info!(user_id = %user.id, "password reset completed");
    Ok(Json(sign_for(&state, &user)?))
}
