// SPDX-License-Identifier: MIT

//! Notification decision tests with a collecting sink.

use std::sync::{Arc, Mutex};

use pharmacist::db::FirestoreDb;
use pharmacist::geo::Coordinates;
use pharmacist::models::{Medicine, Pharmacy, User};
use pharmacist::services::{CatalogService, NotificationEvent, NotificationSink, Notifier};

/// Sink that records every delivered event.
#[derive(Default)]
struct CollectingSink {
    events: Mutex<Vec<NotificationEvent>>,
}

impl NotificationSink for CollectingSink {
    fn deliver(&self, event: NotificationEvent) {
        self.events.lock().unwrap().push(event);
    }
}

fn pharmacy(id: &str, lat: f64, lng: f64) -> Pharmacy {
    Pharmacy::new(
        id.to_string(),
        "owner".to_string(),
        format!("Pharmacy {id}"),
        "Rua Augusta 1".to_string(),
        Coordinates::new(lat, lng),
        String::new(),
    )
}

fn setup() -> (CatalogService, Notifier, Arc<CollectingSink>) {
    let catalog = CatalogService::new(FirestoreDb::new_mock());
    let sink = Arc::new(CollectingSink::default());
    let notifier = Notifier::new(catalog.clone(), sink.clone());
    (catalog, notifier, sink)
}

#[test]
fn test_nearby_event_only_within_radius() {
    let (catalog, notifier, sink) = setup();
    let origin = Coordinates::new(38.7369, -9.1427);

    // ~1 km away: outside the 100 m radius, no event.
    catalog.insert_pharmacy(pharmacy("far", 38.7459, -9.1427));
    assert_eq!(notifier.notify_nearby(origin), 0);
    assert!(sink.events.lock().unwrap().is_empty());

    // ~50 m away: one event with the count.
    catalog.insert_pharmacy(pharmacy("close", 38.73735, -9.1427));
    assert_eq!(notifier.notify_nearby(origin), 1);
    assert_eq!(
        *sink.events.lock().unwrap(),
        vec![NotificationEvent::NearbyPharmacies { count: 1 }]
    );
}

#[test]
fn test_medicine_availability_requires_subscription_favorite_and_stock() {
    let (catalog, notifier, sink) = setup();

    let mut favorite = pharmacy("fav", 38.7, -9.1);
    favorite.add_medicine("111", 7);
    let mut other = pharmacy("other", 38.8, -9.2);
    other.add_medicine("111", 3);
    catalog.insert_pharmacy(favorite);
    catalog.insert_pharmacy(other);

    let mut subscribed = Medicine::new(
        "111".to_string(),
        "Aspirin".to_string(),
        String::new(),
        "Analgesic".to_string(),
    );
    subscribed.add_user_to_notify("alice");
    catalog.insert_medicine(subscribed);

    // Stocked by the favorite pharmacy, but nobody subscribed.
    let unsubscribed = Medicine::new(
        "222".to_string(),
        "Xanax".to_string(),
        String::new(),
        "Anxiolytic".to_string(),
    );
    catalog.insert_medicine(unsubscribed);

    let mut alice = User::new(
        "alice".to_string(),
        "alice@example.com".to_string(),
        String::new(),
    );
    alice.add_favorite("fav");

    // One event: subscribed medicine at the favorite pharmacy only.
    assert_eq!(notifier.notify_medicines(&alice), 1);
    let events = sink.events.lock().unwrap();
    assert_eq!(
        *events,
        vec![NotificationEvent::MedicineAvailable {
            username: "alice".to_string(),
            medicine_name: "Aspirin".to_string(),
            pharmacy_name: "Pharmacy fav".to_string(),
            quantity: 7,
        }]
    );
}

#[test]
fn test_no_events_for_unsubscribed_user() {
    let (catalog, notifier, sink) = setup();

    let mut favorite = pharmacy("fav", 38.7, -9.1);
    favorite.add_medicine("111", 7);
    catalog.insert_pharmacy(favorite);

    let mut subscribed_by_other = Medicine::new(
        "111".to_string(),
        "Aspirin".to_string(),
        String::new(),
        "Analgesic".to_string(),
    );
    subscribed_by_other.add_user_to_notify("bob");
    catalog.insert_medicine(subscribed_by_other);

    let mut alice = User::new(
        "alice".to_string(),
        "alice@example.com".to_string(),
        String::new(),
    );
    alice.add_favorite("fav");

    assert_eq!(notifier.notify_medicines(&alice), 0);
    assert!(sink.events.lock().unwrap().is_empty());
}
