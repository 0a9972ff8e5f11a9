// SPDX-License-Identifier: MIT

use pharmacist::cache::{MedicineCache, PharmacyCache};
use pharmacist::config::Config;
use pharmacist::db::FirestoreDb;
use pharmacist::middleware::auth::create_jwt;
use pharmacist::routes::create_router;
use pharmacist::services::{
    CatalogService, ModerationService, Notifier, PhotoStore, TracingSink,
};
use pharmacist::AppState;
use std::sync::Arc;

/// Create a mock database connection (offline).
#[allow(dead_code)]
pub fn test_db_offline() -> FirestoreDb {
    FirestoreDb::new_mock()
}

/// Create a test app with offline mock dependencies.
/// Returns the router, the shared state, and the temp dir backing the
/// photo store (dropped state tears the dir down).
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>, tempfile::TempDir) {
    let config = Config::default();
    let db = test_db_offline();

    let photo_dir = tempfile::tempdir().expect("temp photo dir");
    let photos = PhotoStore::open(photo_dir.path()).expect("photo store");
    let pharmacy_cache = PharmacyCache::open_in_memory().expect("pharmacy cache");
    let medicine_cache = MedicineCache::open_in_memory().expect("medicine cache");

    let catalog = CatalogService::new(db.clone());
    let moderation = ModerationService::new(db.clone(), catalog.clone());
    let notifier = Notifier::new(catalog.clone(), Arc::new(TracingSink));

    let state = Arc::new(AppState {
        config,
        db,
        catalog,
        moderation,
        notifier,
        photos,
        pharmacy_cache,
        medicine_cache,
    });

    (create_router(state.clone()), state, photo_dir)
}

/// Mint a session token the way the login handler does.
#[allow(dead_code)]
pub fn create_test_jwt(username: &str, signing_key: &[u8]) -> String {
    create_jwt(username, signing_key).expect("test jwt")
}
