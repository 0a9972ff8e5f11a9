// SPDX-License-Identifier: MIT

//! PharmacIST API Server
//!
//! Serves the pharmacy/medicine catalog: region synchronization with
//! the remote store, offline cache, distance-ranked search, favorites,
//! notify-me subscriptions, and community moderation.

use pharmacist::{
    cache::{MedicineCache, PharmacyCache},
    config::Config,
    db::FirestoreDb,
    services::{CatalogService, ModerationService, Notifier, PhotoStore, TracingSink},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting PharmacIST API");

    // Initialize Firestore database
    let db = FirestoreDb::new(&config.gcp_project_id)
        .await
        .expect("Failed to connect to Firestore");

    // Open the local caches and photo store
    std::fs::create_dir_all(&config.cache_dir).expect("Failed to create cache directory");
    let pharmacy_cache = PharmacyCache::open(config.cache_dir.join("pharmacies.db"))
        .expect("Failed to open pharmacy cache");
    let medicine_cache = MedicineCache::open(config.cache_dir.join("medicines.db"))
        .expect("Failed to open medicine cache");
    let photos = PhotoStore::open(&config.photo_dir).expect("Failed to open photo store");
    tracing::info!(cache_dir = %config.cache_dir.display(), "Local caches ready");

    // Build the catalog and pre-load cached entities so search works
    // before the first remote sync (offline reads).
    let catalog = CatalogService::new(db.clone());
    match catalog.load_from_cache(&pharmacy_cache, &medicine_cache) {
        Ok((pharmacies, medicines)) => {
            tracing::info!(pharmacies, medicines, "Catalog primed from local cache");
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to prime catalog from cache");
        }
    }

    let moderation = ModerationService::new(db.clone(), catalog.clone());
    let notifier = Notifier::new(catalog.clone(), Arc::new(TracingSink));

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        catalog,
        moderation,
        notifier,
        photos,
        pharmacy_cache,
        medicine_cache,
    });

    // Build router
    let app = pharmacist::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("pharmacist=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
