// SPDX-License-Identifier: MIT

//! Notification decisions.
//!
//! The service decides who should be told about what; delivery is an
//! external collaborator behind [`NotificationSink`]. The production
//! sink just logs the event.

use std::sync::Arc;

use crate::geo::Coordinates;
use crate::models::User;
use crate::services::CatalogService;

/// A notification the client should surface.
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationEvent {
    /// Pharmacies within the nearby radius of the user's location.
    NearbyPharmacies { count: usize },
    /// A medicine the user subscribed to is in stock at a favorite
    /// pharmacy.
    MedicineAvailable {
        username: String,
        medicine_name: String,
        pharmacy_name: String,
        quantity: u32,
    },
}

/// Delivery seam for notifications.
pub trait NotificationSink: Send + Sync {
    fn deliver(&self, event: NotificationEvent);
}

/// Sink that logs events; presentation is the client's concern.
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn deliver(&self, event: NotificationEvent) {
        match event {
            NotificationEvent::NearbyPharmacies { count } => {
                tracing::info!(count, "Nearby pharmacies notification");
            }
            NotificationEvent::MedicineAvailable {
                username,
                medicine_name,
                pharmacy_name,
                quantity,
            } => {
                tracing::info!(
                    username = %username,
                    medicine = %medicine_name,
                    pharmacy = %pharmacy_name,
                    quantity,
                    "Medicine availability notification"
                );
            }
        }
    }
}

/// Notification decision service.
#[derive(Clone)]
pub struct Notifier {
    catalog: CatalogService,
    sink: Arc<dyn NotificationSink>,
}

impl Notifier {
    pub fn new(catalog: CatalogService, sink: Arc<dyn NotificationSink>) -> Self {
        Self { catalog, sink }
    }

    /// Emit one nearby-pharmacies event if any pharmacy is within the
    /// nearby radius of `origin`. Returns the pharmacy count.
    pub fn notify_nearby(&self, origin: Coordinates) -> usize {
        let nearby = self.catalog.nearby_pharmacies(origin);
        if !nearby.is_empty() {
            self.sink.deliver(NotificationEvent::NearbyPharmacies {
                count: nearby.len(),
            });
        }
        nearby.len()
    }

    /// Emit availability events for every medicine the user subscribed
    /// to that is stocked by one of their favorite pharmacies. Returns
    /// the number of events emitted.
    pub fn notify_medicines(&self, user: &User) -> usize {
        let favorites = self.catalog.favorites_of(user);
        let mut emitted = 0;

        for medicine in self.catalog.medicines_snapshot() {
            if !medicine.notifies_user(&user.username) {
                continue;
            }
            for pharmacy in &favorites {
                if let Some(quantity) = pharmacy.stock_of(&medicine.barcode) {
                    self.sink.deliver(NotificationEvent::MedicineAvailable {
                        username: user.username.clone(),
                        medicine_name: medicine.name.clone(),
                        pharmacy_name: pharmacy.name.clone(),
                        quantity,
                    });
                    emitted += 1;
                }
            }
        }

        emitted
    }
}
