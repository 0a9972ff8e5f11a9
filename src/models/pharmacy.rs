// SPDX-License-Identifier: MIT

//! Pharmacy model for storage and API.

use crate::geo::Coordinates;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Pharmacy document stored in the `Pharmacies` collection.
///
/// The document ID is `id`. Stock is a map of medicine barcode to
/// quantity; the medicine side keeps a mirror list of pharmacy ids,
/// maintained manually on both sides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pharmacy {
    /// Pharmacy ID (also used as document ID)
    pub id: String,
    /// Username of the user who created the pharmacy
    pub owner: String,
    /// Display name
    pub name: String,
    /// Street address
    pub address: String,
    /// Geographic location
    pub location: Coordinates,
    /// Photo reference (blob path or URL)
    pub photo_path: String,
    /// Medicine barcode -> quantity in stock
    #[serde(default)]
    pub medicines: BTreeMap<String, u32>,
    /// Usernames that flagged this pharmacy
    #[serde(default)]
    pub flaggers: Vec<String>,
    /// Set once enough distinct users flag the pharmacy; never cleared
    #[serde(default)]
    pub flagged_globally: bool,
}

impl Pharmacy {
    pub fn new(
        id: String,
        owner: String,
        name: String,
        address: String,
        location: Coordinates,
        photo_path: String,
    ) -> Self {
        Self {
            id,
            owner,
            name,
            address,
            location,
            photo_path,
            medicines: BTreeMap::new(),
            flaggers: Vec::new(),
            flagged_globally: false,
        }
    }

    /// Quantity in stock for a barcode, if the medicine is listed.
    pub fn stock_of(&self, barcode: &str) -> Option<u32> {
        self.medicines.get(barcode).copied()
    }

    /// List a medicine with an initial quantity, replacing any
    /// previous entry for the barcode.
    pub fn add_medicine(&mut self, barcode: &str, quantity: u32) {
        self.medicines.insert(barcode.to_string(), quantity);
    }

    /// Increase stock for a barcode, listing it if absent.
    pub fn add_stock(&mut self, barcode: &str, quantity: u32) {
        *self.medicines.entry(barcode.to_string()).or_insert(0) += quantity;
    }

    /// Decrease stock for a barcode.
    ///
    /// Returns `false` (and changes nothing) if the current quantity is
    /// lower than `quantity`. Stock may reach zero; the medicine stays
    /// listed.
    pub fn remove_stock(&mut self, barcode: &str, quantity: u32) -> bool {
        let current = self.medicines.get(barcode).copied().unwrap_or(0);
        if current < quantity {
            return false;
        }
        self.medicines.insert(barcode.to_string(), current - quantity);
        true
    }

    /// Delist a medicine entirely.
    pub fn remove_medicine(&mut self, barcode: &str) {
        self.medicines.remove(barcode);
    }

    /// Record a flag by `username`.
    ///
    /// Returns `false` if this user already flagged the pharmacy;
    /// flaggers are counted once per user.
    pub fn add_flagger(&mut self, username: &str) -> bool {
        if self.flaggers.iter().any(|f| f == username) {
            return false;
        }
        self.flaggers.push(username.to_string());
        true
    }

    pub fn is_flagged(&self) -> bool {
        self.flagged_globally
    }

    /// Set the global flag. There is no unflag path.
    pub fn flag(&mut self) {
        self.flagged_globally = true;
    }
}
