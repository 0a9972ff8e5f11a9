// SPDX-License-Identifier: MIT

//! Pharmacy routes: discovery, creation, stock, and moderation actions.

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::geo::Coordinates;
use crate::middleware::auth::AuthUser;
use crate::models::Pharmacy;
use crate::services::moderation::{self, FlagOutcome};
use crate::AppState;

/// Public pharmacy routes (guest browsing).
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/pharmacies", get(list_pharmacies))
        .route("/pharmacies/{id}", get(get_pharmacy))
        .route("/pharmacies/{id}/medicines", get(get_pharmacy_medicines))
}

/// Pharmacy routes requiring authentication.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/pharmacies", post(create_pharmacy))
        .route("/api/pharmacies/visible", get(visible_pharmacies))
        .route("/api/pharmacies/{id}/flag", post(flag_pharmacy))
        .route("/api/pharmacies/{id}/favorite", post(toggle_favorite))
        .route(
            "/api/pharmacies/{id}/stock",
            post(add_stock).delete(remove_stock),
        )
}

// ─── Responses ───────────────────────────────────────────────────

#[derive(Serialize)]
pub struct PharmacyResponse {
    pub id: String,
    pub owner: String,
    pub name: String,
    pub address: String,
    pub lat: f64,
    pub lng: f64,
    pub photo_path: String,
    pub medicines: BTreeMap<String, u32>,
    pub flagged_globally: bool,
}

impl From<Pharmacy> for PharmacyResponse {
    fn from(p: Pharmacy) -> Self {
        Self {
            id: p.id,
            owner: p.owner,
            name: p.name,
            address: p.address,
            lat: p.location.lat,
            lng: p.location.lng,
            photo_path: p.photo_path,
            medicines: p.medicines,
            flagged_globally: p.flagged_globally,
        }
    }
}

#[derive(Serialize)]
pub struct MedicineStockResponse {
    pub barcode: String,
    pub name: String,
    pub purpose: String,
    pub photo_path: String,
    pub quantity: u32,
}

// ─── Discovery ───────────────────────────────────────────────────

#[derive(Deserialize)]
struct ListQuery {
    /// Substring filter on pharmacy name (case-insensitive)
    query: Option<String>,
}

/// List or search pharmacies. Globally-flagged pharmacies are hidden.
async fn list_pharmacies(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListQuery>,
) -> Result<Json<Vec<PharmacyResponse>>> {
    let pharmacies = match params.query.as_deref() {
        Some(q) if !q.is_empty() => state.catalog.search_pharmacies(q),
        _ => state.catalog.pharmacies_snapshot(),
    };

    let mut visible = moderation::visible_pharmacies(None, pharmacies);
    visible.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(Json(visible.into_iter().map(Into::into).collect()))
}

/// Get one pharmacy by ID.
async fn get_pharmacy(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<PharmacyResponse>> {
    let pharmacy = match state.catalog.pharmacy(&id) {
        Some(p) => p,
        // Outside the current snapshot: fall through to the remote store.
        None => state
            .db
            .get_pharmacy(&id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Pharmacy {} not found", id)))?,
    };
    Ok(Json(pharmacy.into()))
}

/// Medicines stocked by one pharmacy, with quantities.
async fn get_pharmacy_medicines(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<MedicineStockResponse>>> {
    if state.catalog.pharmacy(&id).is_none() {
        return Err(AppError::NotFound(format!("Pharmacy {} not found", id)));
    }

    let stocked = state
        .catalog
        .medicines_of_pharmacy(&id)
        .into_iter()
        .map(|(m, quantity)| MedicineStockResponse {
            barcode: m.barcode,
            name: m.name,
            purpose: m.purpose,
            photo_path: m.photo_path,
            quantity,
        })
        .collect();

    Ok(Json(stocked))
}

/// Map view for a signed-in user: hides globally-flagged pharmacies
/// and the ones this user flagged.
async fn visible_pharmacies(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<PharmacyResponse>>> {
    let user = state
        .db
        .get_user(&auth.username)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", auth.username)))?;

    let visible =
        moderation::visible_pharmacies(Some(&user), state.catalog.pharmacies_snapshot());
    Ok(Json(visible.into_iter().map(Into::into).collect()))
}

// ─── Creation ────────────────────────────────────────────────────

#[derive(Deserialize, Validate)]
pub struct CreatePharmacyRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 200))]
    pub address: String,
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lng: f64,
    /// Photo reference; defaults to the blob-store path for the new id
    pub photo_path: Option<String>,
}

/// Create a pharmacy owned by the authenticated user.
async fn create_pharmacy(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<CreatePharmacyRequest>,
) -> Result<Json<PharmacyResponse>> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let mut user = super::require_active_user(&state, &auth.username).await?;

    let id = uuid::Uuid::new_v4().to_string();
    let photo_path = payload
        .photo_path
        .unwrap_or_else(|| state.photos.blob_path(&id).to_string_lossy().into_owned());

    let pharmacy = Pharmacy::new(
        id.clone(),
        user.username.clone(),
        payload.name,
        payload.address,
        Coordinates::new(payload.lat, payload.lng),
        photo_path,
    );

    state.db.upsert_pharmacy(&pharmacy).await?;

    user.add_created(&id);
    state.db.upsert_user(&user).await?;

    state.catalog.insert_pharmacy(pharmacy.clone());
    tracing::info!(pharmacy_id = %id, owner = %user.username, "Pharmacy created");

    Ok(Json(pharmacy.into()))
}

// ─── Moderation & Favorites ──────────────────────────────────────

#[derive(Serialize)]
pub struct FlagResponse {
    pub flagger_count: usize,
    pub flagged_globally: bool,
    pub owner_suspended: bool,
}

/// Flag a pharmacy. Idempotent per user.
async fn flag_pharmacy(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<FlagResponse>> {
    super::require_active_user(&state, &auth.username).await?;

    let report = state.moderation.flag(&auth.username, &id).await?;

    let flagger_count = match report.outcome {
        FlagOutcome::Flagged { flagger_count, .. } => flagger_count,
        FlagOutcome::AlreadyFlagged => report.pharmacy.flaggers.len(),
    };

    Ok(Json(FlagResponse {
        flagger_count,
        flagged_globally: report.pharmacy.flagged_globally,
        owner_suspended: report.owner_suspended,
    }))
}

#[derive(Serialize)]
pub struct FavoriteResponse {
    pub pharmacy_id: String,
    pub favorite: bool,
}

/// Toggle a pharmacy as favorite for the authenticated user.
async fn toggle_favorite(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<FavoriteResponse>> {
    let mut user = state
        .db
        .get_user(&auth.username)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", auth.username)))?;

    if state.catalog.pharmacy(&id).is_none() && state.db.get_pharmacy(&id).await?.is_none() {
        return Err(AppError::NotFound(format!("Pharmacy {} not found", id)));
    }

    let favorite = if user.is_favorite(&id) {
        user.remove_favorite(&id);
        false
    } else {
        user.add_favorite(&id);
        true
    };
    state.db.upsert_user(&user).await?;

    tracing::debug!(username = %user.username, pharmacy_id = %id, favorite, "Favorite toggled");

    Ok(Json(FavoriteResponse {
        pharmacy_id: id,
        favorite,
    }))
}

// ─── Stock ───────────────────────────────────────────────────────

#[derive(Deserialize, Validate)]
pub struct StockRequest {
    #[validate(length(min = 1, max = 64))]
    pub barcode: String,
    #[validate(range(min = 1))]
    pub quantity: u32,
}

#[derive(Serialize)]
pub struct StockResponse {
    pub pharmacy_id: String,
    pub barcode: String,
    pub quantity: u32,
}

/// Add stock of an existing medicine to a pharmacy.
///
/// Keeps both sides of the pharmacy<->medicine relation in sync.
async fn add_stock(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(payload): Json<StockRequest>,
) -> Result<Json<StockResponse>> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    super::require_active_user(&state, &auth.username).await?;

    let mut pharmacy = state
        .db
        .get_pharmacy(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Pharmacy {} not found", id)))?;
    let mut medicine = state
        .db
        .get_medicine(&payload.barcode)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Medicine {} not found", payload.barcode)))?;

    pharmacy.add_stock(&payload.barcode, payload.quantity);
    state.db.upsert_pharmacy(&pharmacy).await?;

    if !medicine.is_stocked_by(&id) {
        medicine.add_pharmacy_id(&id);
        state.db.upsert_medicine(&medicine).await?;
    }

    state.catalog.insert_pharmacy(pharmacy.clone());
    state.catalog.insert_medicine(medicine);

    let quantity = pharmacy.stock_of(&payload.barcode).unwrap_or(0);
    Ok(Json(StockResponse {
        pharmacy_id: id,
        barcode: payload.barcode,
        quantity,
    }))
}

/// Remove (purchase) stock of a medicine from a pharmacy.
///
/// Fails with a conflict when the stock is insufficient; a quantity of
/// zero keeps the medicine listed.
async fn remove_stock(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(payload): Json<StockRequest>,
) -> Result<Json<StockResponse>> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    super::require_active_user(&state, &auth.username).await?;

    let mut pharmacy = state
        .db
        .get_pharmacy(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Pharmacy {} not found", id)))?;

    if !pharmacy.remove_stock(&payload.barcode, payload.quantity) {
        return Err(AppError::InsufficientStock(payload.barcode));
    }
    state.db.upsert_pharmacy(&pharmacy).await?;
    state.catalog.insert_pharmacy(pharmacy.clone());

    let quantity = pharmacy.stock_of(&payload.barcode).unwrap_or(0);
    Ok(Json(StockResponse {
        pharmacy_id: id,
        barcode: payload.barcode,
        quantity,
    }))
}
