//! User profile model for storage and API.

use serde::{Deserialize, Serialize};

/// User profile stored in the `Profiles` collection, keyed by username.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Username (also used as document ID)
    pub username: String,
    /// Email address
    pub email: String,
    /// PBKDF2 password hash, `salt_hex$hash_hex`
    pub password_hash: String,
    /// Pharmacies this user created
    #[serde(default)]
    pub pharmacies_created: Vec<String>,
    /// Favorite pharmacy ids
    #[serde(default)]
    pub favorite_pharmacies: Vec<String>,
    /// Pharmacies this user flagged
    #[serde(default)]
    pub pharmacies_flagged: Vec<String>,
    /// Set once enough of this user's pharmacies are globally flagged
    #[serde(default)]
    pub suspended: bool,
}

impl User {
    pub fn new(username: String, email: String, password_hash: String) -> Self {
        Self {
            username,
            email,
            password_hash,
            pharmacies_created: Vec::new(),
            favorite_pharmacies: Vec::new(),
            pharmacies_flagged: Vec::new(),
            suspended: false,
        }
    }

    pub fn is_favorite(&self, pharmacy_id: &str) -> bool {
        self.favorite_pharmacies.iter().any(|p| p == pharmacy_id)
    }

    pub fn add_favorite(&mut self, pharmacy_id: &str) {
        if !self.is_favorite(pharmacy_id) {
            self.favorite_pharmacies.push(pharmacy_id.to_string());
        }
    }

    pub fn remove_favorite(&mut self, pharmacy_id: &str) {
        self.favorite_pharmacies.retain(|p| p != pharmacy_id);
    }

    pub fn has_flagged(&self, pharmacy_id: &str) -> bool {
        self.pharmacies_flagged.iter().any(|p| p == pharmacy_id)
    }

    pub fn add_flagged(&mut self, pharmacy_id: &str) {
        if !self.has_flagged(pharmacy_id) {
            self.pharmacies_flagged.push(pharmacy_id.to_string());
        }
    }

    pub fn add_created(&mut self, pharmacy_id: &str) {
        self.pharmacies_created.push(pharmacy_id.to_string());
    }

    pub fn suspend(&mut self) {
        self.suspended = true;
    }
}
