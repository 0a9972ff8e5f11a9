// SPDX-License-Identifier: MIT

//! PharmacIST: discover pharmacies and medicine stock near you.
//!
//! This crate provides the backend API for the pharmacy catalog,
//! including the remote/local state synchronization, distance-ranked
//! search, and community moderation.

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod geo;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use cache::{MedicineCache, PharmacyCache};
use config::Config;
use db::FirestoreDb;
use services::{CatalogService, ModerationService, Notifier, PhotoStore};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub catalog: CatalogService,
    pub moderation: ModerationService,
    pub notifier: Notifier,
    pub photos: PhotoStore,
    pub pharmacy_cache: PharmacyCache,
    pub medicine_cache: MedicineCache,
}
