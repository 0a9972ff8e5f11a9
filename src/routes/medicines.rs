// SPDX-License-Identifier: MIT

//! Medicine routes: lookup, creation, search, notify-me toggles.

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::geo::Coordinates;
use crate::middleware::auth::AuthUser;
use crate::models::Medicine;
use crate::AppState;

/// Public medicine routes (guest browsing).
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/medicines/{barcode}", get(get_medicine))
        .route(
            "/medicines/{barcode}/pharmacies",
            get(get_medicine_pharmacies),
        )
        .route("/search/medicines", get(search_medicines))
}

/// Medicine routes requiring authentication.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/medicines", post(create_medicine))
        .route("/api/medicines/{barcode}/notify", post(toggle_notify))
}

// ─── Responses ───────────────────────────────────────────────────

#[derive(Serialize)]
pub struct MedicineResponse {
    pub barcode: String,
    pub name: String,
    pub purpose: String,
    pub photo_path: String,
    pub pharmacy_ids: Vec<String>,
}

impl From<Medicine> for MedicineResponse {
    fn from(m: Medicine) -> Self {
        Self {
            barcode: m.barcode,
            name: m.name,
            purpose: m.purpose,
            photo_path: m.photo_path,
            pharmacy_ids: m.pharmacy_ids,
        }
    }
}

/// A pharmacy stocking a searched medicine, with its distance from
/// the caller's location in meters.
#[derive(Serialize)]
pub struct RankedPharmacyResponse {
    pub pharmacy_id: String,
    pub pharmacy_name: String,
    pub address: String,
    pub lat: f64,
    pub lng: f64,
    pub distance_meters: f64,
}

// ─── Lookup & Search ─────────────────────────────────────────────

/// Get a medicine by barcode (e.g. after a barcode scan).
async fn get_medicine(
    State(state): State<Arc<AppState>>,
    Path(barcode): Path<String>,
) -> Result<Json<MedicineResponse>> {
    let medicine = match state.catalog.medicine(&barcode) {
        Some(m) => m,
        None => state
            .db
            .get_medicine(&barcode)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Medicine {} not found", barcode)))?,
    };
    Ok(Json(medicine.into()))
}

#[derive(Deserialize, Validate)]
struct MedicineSearchQuery {
    /// Substring filter on medicine name (case-insensitive)
    #[validate(length(min = 1, max = 100))]
    name: String,
    #[validate(range(min = -90.0, max = 90.0))]
    lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    lng: f64,
}

/// Search pharmacies stocking a medicine by name, ranked by distance
/// from the caller's location, closest first.
async fn search_medicines(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MedicineSearchQuery>,
) -> Result<Json<Vec<RankedPharmacyResponse>>> {
    params
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let origin = Coordinates::new(params.lat, params.lng);
    let ranked = state
        .catalog
        .search_by_medicine_name(&params.name, origin)
        .into_iter()
        .map(|(p, distance_meters)| RankedPharmacyResponse {
            pharmacy_id: p.id,
            pharmacy_name: p.name,
            address: p.address,
            lat: p.location.lat,
            lng: p.location.lng,
            distance_meters,
        })
        .collect();

    Ok(Json(ranked))
}

#[derive(Deserialize, Validate)]
struct StockedByQuery {
    #[validate(range(min = -90.0, max = 90.0))]
    lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    lng: f64,
}

/// The pharmacies stocking a medicine (e.g. after a barcode scan),
/// ranked by distance from the caller's location, closest first.
async fn get_medicine_pharmacies(
    State(state): State<Arc<AppState>>,
    Path(barcode): Path<String>,
    Query(params): Query<StockedByQuery>,
) -> Result<Json<Vec<RankedPharmacyResponse>>> {
    params
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let medicine = state
        .catalog
        .medicine(&barcode)
        .ok_or_else(|| AppError::NotFound(format!("Medicine {} not found", barcode)))?;

    let origin = Coordinates::new(params.lat, params.lng);
    let ranked = state
        .catalog
        .pharmacies_stocking(&medicine, origin)
        .into_iter()
        .map(|(p, distance_meters)| RankedPharmacyResponse {
            pharmacy_id: p.id,
            pharmacy_name: p.name,
            address: p.address,
            lat: p.location.lat,
            lng: p.location.lng,
            distance_meters,
        })
        .collect();

    Ok(Json(ranked))
}

// ─── Creation ────────────────────────────────────────────────────

#[derive(Deserialize, Validate)]
pub struct CreateMedicineRequest {
    #[validate(length(min = 1, max = 64))]
    pub barcode: String,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 500))]
    pub purpose: String,
    /// Photo reference; defaults to the blob-store path for the barcode
    pub photo_path: Option<String>,
    /// Pharmacy receiving the initial stock
    #[validate(length(min = 1))]
    pub pharmacy_id: String,
    #[validate(range(min = 1))]
    pub quantity: u32,
}

/// Create a medicine and stock it at a pharmacy.
///
/// A barcode that already exists is a conflict; the client offers the
/// add-stock flow for those instead.
async fn create_medicine(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(payload): Json<CreateMedicineRequest>,
) -> Result<Json<MedicineResponse>> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    super::require_active_user(&state, &auth.username).await?;

    if state.catalog.barcode_exists(&payload.barcode)
        || state.db.get_medicine(&payload.barcode).await?.is_some()
    {
        return Err(AppError::Conflict(format!(
            "barcode {} already exists",
            payload.barcode
        )));
    }

    let mut pharmacy = state
        .db
        .get_pharmacy(&payload.pharmacy_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("Pharmacy {} not found", payload.pharmacy_id))
        })?;

    let photo_path = payload.photo_path.unwrap_or_else(|| {
        state
            .photos
            .blob_path(&payload.barcode)
            .to_string_lossy()
            .into_owned()
    });

    let mut medicine = Medicine::new(
        payload.barcode.clone(),
        payload.name,
        photo_path,
        payload.purpose,
    );
    medicine.add_pharmacy_id(&pharmacy.id);
    pharmacy.add_medicine(&medicine.barcode, payload.quantity);

    state.db.upsert_medicine(&medicine).await?;
    state.db.upsert_pharmacy(&pharmacy).await?;

    state.catalog.insert_medicine(medicine.clone());
    state.catalog.insert_pharmacy(pharmacy);

    tracing::info!(barcode = %medicine.barcode, "Medicine created");

    Ok(Json(medicine.into()))
}

// ─── Notify-me ───────────────────────────────────────────────────

#[derive(Serialize)]
pub struct NotifyResponse {
    pub barcode: String,
    pub notify: bool,
}

/// Toggle the notify-me subscription on a medicine for the caller.
async fn toggle_notify(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(barcode): Path<String>,
) -> Result<Json<NotifyResponse>> {
    let mut medicine = state
        .db
        .get_medicine(&barcode)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Medicine {} not found", barcode)))?;

    let notify = if medicine.notifies_user(&auth.username) {
        medicine.remove_user_to_notify(&auth.username);
        false
    } else {
        medicine.add_user_to_notify(&auth.username);
        true
    };

    state.db.upsert_medicine(&medicine).await?;
    state.catalog.insert_medicine(medicine);

    tracing::debug!(username = %auth.username, barcode = %barcode, notify, "Notify toggled");

    Ok(Json(NotifyResponse { barcode, notify }))
}
