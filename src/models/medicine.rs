// SPDX-License-Identifier: MIT

//! Medicine model for storage and API.

use serde::{Deserialize, Serialize};

/// Medicine document stored in the `Medicines` collection.
///
/// The document ID is the barcode. `pharmacy_ids` mirrors the
/// pharmacy-side stock map; both sides are kept in sync manually.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Medicine {
    /// EAN barcode (also used as document ID)
    pub barcode: String,
    /// Display name
    pub name: String,
    /// Box photo reference (blob path or URL)
    pub photo_path: String,
    /// Purpose / category free text
    pub purpose: String,
    /// Usernames that asked to be notified when this medicine shows up
    /// in one of their favorite pharmacies
    #[serde(default)]
    pub users_to_notify: Vec<String>,
    /// Pharmacies currently listing this medicine
    #[serde(default)]
    pub pharmacy_ids: Vec<String>,
}

impl Medicine {
    pub fn new(barcode: String, name: String, photo_path: String, purpose: String) -> Self {
        Self {
            barcode,
            name,
            photo_path,
            purpose,
            users_to_notify: Vec::new(),
            pharmacy_ids: Vec::new(),
        }
    }

    pub fn notifies_user(&self, username: &str) -> bool {
        self.users_to_notify.iter().any(|u| u == username)
    }

    pub fn add_user_to_notify(&mut self, username: &str) {
        if !self.notifies_user(username) {
            self.users_to_notify.push(username.to_string());
        }
    }

    pub fn remove_user_to_notify(&mut self, username: &str) {
        self.users_to_notify.retain(|u| u != username);
    }

    pub fn is_stocked_by(&self, pharmacy_id: &str) -> bool {
        self.pharmacy_ids.iter().any(|p| p == pharmacy_id)
    }

    pub fn add_pharmacy_id(&mut self, pharmacy_id: &str) {
        if !self.is_stocked_by(pharmacy_id) {
            self.pharmacy_ids.push(pharmacy_id.to_string());
        }
    }

    pub fn remove_pharmacy_id(&mut self, pharmacy_id: &str) {
        self.pharmacy_ids.retain(|p| p != pharmacy_id);
    }
}
