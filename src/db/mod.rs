//! Database layer (Firestore).

pub mod firestore;

pub use firestore::FirestoreDb;

/// Collection names as constants.
pub mod collections {
    pub const PROFILES: &str = "Profiles";
    pub const PHARMACIES: &str = "Pharmacies";
    pub const MEDICINES: &str = "Medicines";
}
