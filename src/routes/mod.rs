// SPDX-License-Identifier: MIT

//! HTTP route handlers.

pub mod auth;
pub mod medicines;
pub mod pharmacies;
pub mod profile;
pub mod sync;

use crate::error::{AppError, Result};
use crate::middleware::auth::require_auth;
use crate::models::User;
use crate::AppState;
use axum::http::{header, Method};
use axum::{middleware, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub build_id: String,
}

/// Health check response
async fn health_check() -> Json<HealthResponse> {
    let build_id = option_env!("BUILD_ID").unwrap_or("unknown").to_string();
    Json(HealthResponse {
        status: "ok".to_string(),
        build_id,
    })
}

/// Fetch a profile and reject suspended accounts.
///
/// Mutating endpoints call this; suspended users keep read access (the
/// restricted screen still shows the map) but cannot create, flag, or
/// change stock.
pub(crate) async fn require_active_user(state: &AppState, username: &str) -> Result<User> {
    let user = state
        .db
        .get_user(username)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", username)))?;

    if user.suspended {
        return Err(AppError::Suspended);
    }
    Ok(user)
}

/// Build the complete router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    // CORS layer - allow requests from frontend URL and localhost (for dev)
    let frontend_url = state.config.frontend_url.clone();
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::AllowOrigin::predicate(
            move |origin: &axum::http::HeaderValue, _request_parts: &axum::http::request::Parts| {
                let origin_str = origin.to_str().unwrap_or("");
                origin_str == frontend_url
                    || origin_str.starts_with("http://localhost")
                    || origin_str.starts_with("http://127.0.0.1")
            },
        ))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]);

    // Public routes (no auth required; guest browsing)
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .merge(auth::routes())
        .merge(pharmacies::public_routes())
        .merge(medicines::public_routes())
        .merge(sync::public_routes());

    // Protected routes (auth required)
    let protected_routes = pharmacies::routes()
        .merge(medicines::routes())
        .merge(profile::routes())
        .merge(sync::routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}
