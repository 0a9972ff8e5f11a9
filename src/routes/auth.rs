// SPDX-License-Identifier: MIT

//! Account registration and password login.

use axum::{extract::State, routing::post, Json, Router};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::middleware::auth::{create_jwt, SESSION_COOKIE};
use crate::models::User;
use crate::services::password;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
}

#[derive(Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 32))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1))]
    pub username: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Session response: token also rides in the session cookie.
#[derive(Serialize)]
pub struct SessionResponse {
    pub username: String,
    pub suspended: bool,
    pub token: String,
}

fn session_cookie(token: &str) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// Register a new account.
///
/// Duplicate email and duplicate username are both rejected before the
/// profile is created. The password is hashed; plaintext never reaches
/// the store.
async fn register(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(payload): Json<RegisterRequest>,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    if state.db.find_user_by_email(&payload.email).await?.is_some() {
        return Err(AppError::Conflict("email already registered".to_string()));
    }
    if state.db.get_user(&payload.username).await?.is_some() {
        return Err(AppError::Conflict("username already taken".to_string()));
    }

    let password_hash = password::hash_password(&payload.password)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Password hashing failed: {}", e)))?;
    let user = User::new(payload.username.clone(), payload.email, password_hash);
    state.db.upsert_user(&user).await?;

    tracing::info!(username = %user.username, "User registered");

    let token = create_jwt(&user.username, &state.config.jwt_signing_key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;

    Ok((
        jar.add(session_cookie(&token)),
        Json(SessionResponse {
            username: user.username,
            suspended: false,
            token,
        }),
    ))
}

/// Log in with username and password.
///
/// Suspension is re-evaluated here, so a user whose pharmacies were
/// flagged since the last session is routed to the restricted screen.
async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let user = state
        .db
        .get_user(&payload.username)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    if !password::verify_password(&payload.password, &user.password_hash) {
        tracing::debug!(username = %payload.username, "Password mismatch");
        return Err(AppError::InvalidCredentials);
    }

    let suspended = state.moderation.refresh_owner_suspension(&user.username).await?;

    let token = create_jwt(&user.username, &state.config.jwt_signing_key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;

    tracing::info!(username = %user.username, suspended, "User logged in");

    Ok((
        jar.add(session_cookie(&token)),
        Json(SessionResponse {
            username: user.username,
            suspended,
            token,
        }),
    ))
}

#[derive(Serialize)]
pub struct LogoutResponse {
    pub success: bool,
}

/// Log out by clearing the session cookie.
async fn logout(jar: CookieJar) -> (CookieJar, Json<LogoutResponse>) {
    let jar = jar.remove(Cookie::from(SESSION_COOKIE));
    (jar, Json(LogoutResponse { success: true }))
}
