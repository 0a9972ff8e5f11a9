// SPDX-License-Identifier: MIT

//! Local on-device cache for offline reads.
//!
//! Two single-table SQLite databases mirror the Pharmacy and Medicine
//! projections. The mirror is best-effort: rows are written only when
//! the remote copy differs, and rows are never purged (no tombstones).

mod medicine_cache;
mod pharmacy_cache;

pub use medicine_cache::MedicineCache;
pub use pharmacy_cache::PharmacyCache;

/// Errors from the local cache.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Failed to open cache database: {0}")]
    Open(String),

    #[error("Cache query failed: {0}")]
    Query(String),

    #[error("Corrupt cached column: {0}")]
    Corrupt(String),
}

impl From<CacheError> for crate::error::AppError {
    fn from(e: CacheError) -> Self {
        crate::error::AppError::Database(e.to_string())
    }
}
