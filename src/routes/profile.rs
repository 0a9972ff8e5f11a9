// SPDX-License-Identifier: MIT

//! Profile routes for the signed-in user.

use axum::{extract::State, routing::get, Extension, Json, Router};
use serde::Serialize;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::routes::pharmacies::PharmacyResponse;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me))
        .route("/api/favorites", get(get_favorites))
}

/// Current user response.
#[derive(Serialize)]
pub struct ProfileResponse {
    pub username: String,
    pub email: String,
    pub pharmacies_created: Vec<String>,
    pub favorite_pharmacies: Vec<String>,
    pub pharmacies_flagged: Vec<String>,
    pub suspended: bool,
}

/// Get current user profile.
async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<ProfileResponse>> {
    let user = state
        .db
        .get_user(&auth.username)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", auth.username)))?;

    Ok(Json(ProfileResponse {
        username: user.username,
        email: user.email,
        pharmacies_created: user.pharmacies_created,
        favorite_pharmacies: user.favorite_pharmacies,
        pharmacies_flagged: user.pharmacies_flagged,
        suspended: user.suspended,
    }))
}

/// The user's favorite pharmacies, resolved against the catalog.
async fn get_favorites(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<PharmacyResponse>>> {
    let user = state
        .db
        .get_user(&auth.username)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", auth.username)))?;

    let favorites = state.catalog.favorites_of(&user);
    Ok(Json(favorites.into_iter().map(Into::into).collect()))
}
