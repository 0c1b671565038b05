//! Registration, login and the caller's profile.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::extract::{AuthUser, JsonBody};
use super::AppState;
use crate::auth::{hash_password, verify_password};
use crate::error::{Error, Result};
use crate::model::{NewUser, User};

/// Message for any failed login; never says which half was wrong.
const BAD_LOGIN: &str = "invalid username or password";

#[derive(Debug, Deserialize)]
pub(super) struct RegisterRequest {
    username: Option<String>,
    password: Option<String>,
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct LoginRequest {
    username: Option<String>,
    password: Option<String>,
}

/// `POST /api/auth/register`
pub(super) async fn register(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<RegisterRequest>,
) -> Result<impl IntoResponse> {
    let new_user = NewUser::validate(body.username, body.password, body.email)?;

    let cost = state.bcrypt_cost;
    let password = new_user.password.clone();
    let hash = tokio::task::spawn_blocking(move || hash_password(&password, cost))
        .await
        .map_err(|e| Error::internal(format!("password hashing task failed: {e}")))??;

    let user = state.storage.lock().await.create_user(&new_user, &hash)?;
    info!("Registered user {} ({})", user.user_id, user.username);

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "user registered", "userId": user.user_id })),
    ))
}

/// `POST /api/auth/login`
pub(super) async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    JsonBody(body): JsonBody<LoginRequest>,
) -> Result<impl IntoResponse> {
    let (Some(username), Some(password)) = (
        body.username.filter(|u| !u.trim().is_empty()),
        body.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(Error::invalid_argument("username and password are required"));
    };

    let credentials = state
        .storage
        .lock()
        .await
        .find_credentials(username.trim())?
        .ok_or_else(|| Error::unauthorized(BAD_LOGIN))?;

    let hash = credentials.password_hash;
    let matches = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| Error::internal(format!("password check task failed: {e}")))?;
    if !matches {
        return Err(Error::unauthorized(BAD_LOGIN));
    }

    let token = state.tokens.issue(credentials.user_id)?;
    let jar = match state
        .credentials
        .issue_cookie(token.clone(), state.token_ttl_seconds)
    {
        Some(cookie) => jar.add(cookie),
        None => jar,
    };

    Ok((
        jar,
        Json(json!({
            "message": "login successful",
            "token": token,
            "userId": credentials.user_id,
        })),
    ))
}

/// `GET /api/auth/me`
pub(super) async fn me(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
) -> Result<Json<User>> {
    let user = state
        .storage
        .lock()
        .await
        .get_user(user_id)?
        .ok_or_else(|| Error::not_found("user"))?;
    Ok(Json(user))
}
