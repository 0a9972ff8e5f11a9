// SPDX-License-Identifier: MIT

//! Catalog synchronization and notification triggers.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::geo::Coordinates;
use crate::middleware::auth::AuthUser;
use crate::services::{ReconcileSummary, RefreshSummary};
use crate::AppState;

/// Public routes: cached photo lookup.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new().route("/photos/{entity_id}", get(get_cached_photo))
}

/// Sync and notification routes requiring authentication.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/sync", post(sync_catalog))
        .route("/api/notifications/nearby", post(notify_nearby))
        .route("/api/notifications/medicines", post(notify_medicines))
}

#[derive(Deserialize, Validate)]
pub struct LocationRequest {
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lng: f64,
}

#[derive(Serialize)]
pub struct SyncResponse {
    /// Where the snapshot came from: "remote" or "cache"
    pub source: String,
    pub refresh: Option<RefreshSummary>,
    pub reconcile: Option<ReconcileSummary>,
}

/// Refresh the catalog around the caller's location.
///
/// On success the region snapshot replaces the in-memory maps and is
/// reconciled into the local cache. When the remote store is
/// unreachable, the catalog falls back to whatever the cache holds.
async fn sync_catalog(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LocationRequest>,
) -> Result<Json<SyncResponse>> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    let center = Coordinates::new(payload.lat, payload.lng);

    match state.catalog.refresh_from_remote(center).await {
        Ok(refresh) => {
            let reconcile = state
                .catalog
                .reconcile(&state.pharmacy_cache, &state.medicine_cache);
            Ok(Json(SyncResponse {
                source: "remote".to_string(),
                refresh: Some(refresh),
                reconcile: Some(reconcile),
            }))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Remote refresh failed, serving cached catalog");
            state
                .catalog
                .load_from_cache(&state.pharmacy_cache, &state.medicine_cache)?;
            Ok(Json(SyncResponse {
                source: "cache".to_string(),
                refresh: None,
                reconcile: None,
            }))
        }
    }
}

#[derive(Serialize)]
pub struct NearbyResponse {
    pub nearby_pharmacies: usize,
}

/// Check for pharmacies near the caller and emit a notification event.
async fn notify_nearby(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LocationRequest>,
) -> Result<Json<NearbyResponse>> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let count = state
        .notifier
        .notify_nearby(Coordinates::new(payload.lat, payload.lng));
    Ok(Json(NearbyResponse {
        nearby_pharmacies: count,
    }))
}

#[derive(Serialize)]
pub struct MedicineNotifyResponse {
    pub events: usize,
}

/// Emit availability events for the caller's subscribed medicines.
async fn notify_medicines(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<MedicineNotifyResponse>> {
    let user = state
        .db
        .get_user(&auth.username)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", auth.username)))?;

    let events = state.notifier.notify_medicines(&user);
    Ok(Json(MedicineNotifyResponse { events }))
}

#[derive(Serialize)]
pub struct CachedPhotoResponse {
    pub entity_id: String,
    pub path: String,
}

/// Resolve the locally cached photo path for an entity.
async fn get_cached_photo(
    State(state): State<Arc<AppState>>,
    Path(entity_id): Path<String>,
) -> Result<Json<CachedPhotoResponse>> {
    let path = state
        .photos
        .cached_path(&entity_id)
        .ok_or_else(|| AppError::NotFound(format!("No cached photo for {}", entity_id)))?;

    Ok(Json(CachedPhotoResponse { entity_id, path }))
}
