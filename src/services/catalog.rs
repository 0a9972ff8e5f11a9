// SPDX-License-Identifier: MIT

//! In-memory pharmacy/medicine catalog and its synchronization with
//! the remote store and the local cache.
//!
//! The catalog is the shared state every screen reads: pharmacies
//! keyed by id, medicines keyed by barcode. A refresh replaces the
//! maps with a region snapshot from the remote store, then reconciles
//! the snapshot into the local cache (insert-if-changed, never purge).
//! When the remote is unreachable the maps fall back to the cache.

use std::collections::BTreeSet;
use std::sync::Arc;

use dashmap::DashMap;

use crate::cache::{MedicineCache, PharmacyCache};
use crate::db::FirestoreDb;
use crate::error::Result;
use crate::geo::{self, Coordinates, REGION_RADIUS_KM};
use crate::models::{Medicine, Pharmacy, User};

/// Counters returned by a remote refresh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct RefreshSummary {
    pub pharmacies: usize,
    pub medicines: usize,
}

/// Counters returned by a cache reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct ReconcileSummary {
    pub pharmacies_written: usize,
    pub medicines_written: usize,
    pub unchanged: usize,
    pub errors: usize,
}

/// Shared in-memory catalog state.
#[derive(Clone)]
pub struct CatalogService {
    db: FirestoreDb,
    pharmacies: Arc<DashMap<String, Pharmacy>>,
    medicines: Arc<DashMap<String, Medicine>>,
}

impl CatalogService {
    pub fn new(db: FirestoreDb) -> Self {
        Self {
            db,
            pharmacies: Arc::new(DashMap::new()),
            medicines: Arc::new(DashMap::new()),
        }
    }

    // ─── Map Access ──────────────────────────────────────────────

    pub fn pharmacy(&self, id: &str) -> Option<Pharmacy> {
        self.pharmacies.get(id).map(|p| p.clone())
    }

    pub fn medicine(&self, barcode: &str) -> Option<Medicine> {
        self.medicines.get(barcode).map(|m| m.clone())
    }

    pub fn insert_pharmacy(&self, pharmacy: Pharmacy) {
        self.pharmacies.insert(pharmacy.id.clone(), pharmacy);
    }

    pub fn insert_medicine(&self, medicine: Medicine) {
        self.medicines.insert(medicine.barcode.clone(), medicine);
    }

    pub fn pharmacies_snapshot(&self) -> Vec<Pharmacy> {
        self.pharmacies.iter().map(|e| e.value().clone()).collect()
    }

    pub fn medicines_snapshot(&self) -> Vec<Medicine> {
        self.medicines.iter().map(|e| e.value().clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.pharmacies.is_empty() && self.medicines.is_empty()
    }

    /// Whether a barcode is already known to the catalog.
    pub fn barcode_exists(&self, barcode: &str) -> bool {
        self.medicines.contains_key(barcode)
    }

    // ─── Remote Synchronization ──────────────────────────────────

    /// Replace the in-memory maps with a region snapshot around
    /// `center`: pharmacies inside the ±30 km box, plus every medicine
    /// they stock.
    pub async fn refresh_from_remote(&self, center: Coordinates) -> Result<RefreshSummary> {
        let bounds = geo::region_bounds(center, REGION_RADIUS_KM);
        let pharmacies = self.db.pharmacies_in_region(bounds).await?;

        let barcodes: BTreeSet<String> = pharmacies
            .iter()
            .flat_map(|p| p.medicines.keys().cloned())
            .collect();
        let barcodes: Vec<String> = barcodes.into_iter().collect();
        let medicines = self.db.get_medicines(&barcodes).await?;

        self.pharmacies.clear();
        for pharmacy in &pharmacies {
            self.pharmacies.insert(pharmacy.id.clone(), pharmacy.clone());
        }
        self.medicines.clear();
        for medicine in &medicines {
            self.medicines.insert(medicine.barcode.clone(), medicine.clone());
        }

        let summary = RefreshSummary {
            pharmacies: pharmacies.len(),
            medicines: medicines.len(),
        };
        tracing::info!(
            pharmacies = summary.pharmacies,
            medicines = summary.medicines,
            "Catalog refreshed from remote"
        );
        Ok(summary)
    }

    /// Push the in-memory state into the local cache, writing only
    /// entities whose cached row differs (or is missing).
    ///
    /// Cache failures are logged and counted, never fatal; the cache
    /// is a best-effort mirror. Entities that disappeared remotely are
    /// never purged here.
    pub fn reconcile(
        &self,
        pharmacy_cache: &PharmacyCache,
        medicine_cache: &MedicineCache,
    ) -> ReconcileSummary {
        let mut summary = ReconcileSummary::default();

        for entry in self.pharmacies.iter() {
            let pharmacy = entry.value();
            match pharmacy_cache.get(&pharmacy.id) {
                Ok(Some(cached)) if &cached == pharmacy => summary.unchanged += 1,
                Ok(_) => match pharmacy_cache.upsert(pharmacy) {
                    Ok(()) => summary.pharmacies_written += 1,
                    Err(e) => {
                        tracing::warn!(id = %pharmacy.id, error = %e, "Pharmacy cache write failed");
                        summary.errors += 1;
                    }
                },
                Err(e) => {
                    tracing::warn!(id = %pharmacy.id, error = %e, "Pharmacy cache read failed");
                    summary.errors += 1;
                }
            }
        }

        for entry in self.medicines.iter() {
            let medicine = entry.value();
            match medicine_cache.get(&medicine.barcode) {
                Ok(Some(cached)) if &cached == medicine => summary.unchanged += 1,
                Ok(_) => match medicine_cache.upsert(medicine) {
                    Ok(()) => summary.medicines_written += 1,
                    Err(e) => {
                        tracing::warn!(barcode = %medicine.barcode, error = %e, "Medicine cache write failed");
                        summary.errors += 1;
                    }
                },
                Err(e) => {
                    tracing::warn!(barcode = %medicine.barcode, error = %e, "Medicine cache read failed");
                    summary.errors += 1;
                }
            }
        }

        tracing::debug!(
            pharmacies_written = summary.pharmacies_written,
            medicines_written = summary.medicines_written,
            unchanged = summary.unchanged,
            errors = summary.errors,
            "Cache reconciled"
        );
        summary
    }

    /// Repopulate the in-memory maps from the local cache (offline
    /// reads). Returns the number of pharmacies and medicines loaded.
    pub fn load_from_cache(
        &self,
        pharmacy_cache: &PharmacyCache,
        medicine_cache: &MedicineCache,
    ) -> Result<(usize, usize)> {
        let pharmacies = pharmacy_cache.all()?;
        let medicines = medicine_cache.all()?;

        for pharmacy in &pharmacies {
            self.pharmacies.insert(pharmacy.id.clone(), pharmacy.clone());
        }
        for medicine in &medicines {
            self.medicines.insert(medicine.barcode.clone(), medicine.clone());
        }

        tracing::info!(
            pharmacies = pharmacies.len(),
            medicines = medicines.len(),
            "Catalog loaded from local cache"
        );
        Ok((pharmacies.len(), medicines.len()))
    }

    // ─── Search ──────────────────────────────────────────────────

    /// Case-insensitive substring search on pharmacy name. Linear scan.
    pub fn search_pharmacies(&self, query: &str) -> Vec<Pharmacy> {
        let needle = query.to_lowercase();
        self.pharmacies
            .iter()
            .filter(|e| e.value().name.to_lowercase().contains(&needle))
            .map(|e| e.value().clone())
            .collect()
    }

    /// Pharmacies stocking any medicine whose name matches `query`
    /// (case-insensitive substring), ranked by distance from `origin`
    /// ascending. Distances are meters.
    pub fn search_by_medicine_name(
        &self,
        query: &str,
        origin: Coordinates,
    ) -> Vec<(Pharmacy, f64)> {
        let needle = query.to_lowercase();
        let mut ranked: Vec<(Pharmacy, f64)> = Vec::new();

        for entry in self.pharmacies.iter() {
            let pharmacy = entry.value();
            let stocks_match = pharmacy.medicines.keys().any(|barcode| {
                self.medicines
                    .get(barcode)
                    .map(|m| m.name.to_lowercase().contains(&needle))
                    .unwrap_or(false)
            });
            if stocks_match {
                let distance = geo::distance_meters(origin, pharmacy.location);
                ranked.push((pharmacy.clone(), distance));
            }
        }

        ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
        ranked
    }

    /// The pharmacies a medicine lists, ranked by distance from
    /// `origin` ascending. Stale ids (pharmacies outside the current
    /// snapshot) are skipped.
    pub fn pharmacies_stocking(
        &self,
        medicine: &Medicine,
        origin: Coordinates,
    ) -> Vec<(Pharmacy, f64)> {
        let mut ranked: Vec<(Pharmacy, f64)> = medicine
            .pharmacy_ids
            .iter()
            .filter_map(|id| self.pharmacy(id))
            .map(|p| {
                let distance = geo::distance_meters(origin, p.location);
                (p, distance)
            })
            .collect();

        ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
        ranked
    }

    /// All medicines of a pharmacy with their quantities, resolved
    /// against the medicine map. Unknown barcodes are skipped.
    pub fn medicines_of_pharmacy(&self, pharmacy_id: &str) -> Vec<(Medicine, u32)> {
        let Some(pharmacy) = self.pharmacy(pharmacy_id) else {
            return Vec::new();
        };
        pharmacy
            .medicines
            .iter()
            .filter_map(|(barcode, quantity)| {
                self.medicine(barcode).map(|m| (m, *quantity))
            })
            .collect()
    }

    /// Resolve a user's favorite pharmacies against the snapshot.
    pub fn favorites_of(&self, user: &User) -> Vec<Pharmacy> {
        user.favorite_pharmacies
            .iter()
            .filter_map(|id| self.pharmacy(id))
            .collect()
    }

    /// Pharmacies within [`geo::NEARBY_RADIUS_METERS`] of `origin`.
    pub fn nearby_pharmacies(&self, origin: Coordinates) -> Vec<Pharmacy> {
        self.pharmacies
            .iter()
            .filter(|e| {
                geo::distance_meters(origin, e.value().location) <= geo::NEARBY_RADIUS_METERS
            })
            .map(|e| e.value().clone())
            .collect()
    }
}
