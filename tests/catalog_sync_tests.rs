// SPDX-License-Identifier: MIT

//! Reconciliation and offline-read behavior of the catalog.

use pharmacist::cache::{MedicineCache, PharmacyCache};
use pharmacist::db::FirestoreDb;
use pharmacist::geo::Coordinates;
use pharmacist::models::{Medicine, Pharmacy};
use pharmacist::services::CatalogService;

fn pharmacy(id: &str) -> Pharmacy {
    Pharmacy::new(
        id.to_string(),
        "alice".to_string(),
        format!("Pharmacy {id}"),
        "Rua Augusta 1".to_string(),
        Coordinates::new(38.7369, -9.1427),
        format!("{id}_photo.jpg"),
    )
}

fn medicine(barcode: &str) -> Medicine {
    Medicine::new(
        barcode.to_string(),
        format!("Medicine {barcode}"),
        format!("{barcode}_photo.jpg"),
        "Analgesic".to_string(),
    )
}

#[test]
fn test_reconcile_writes_new_rows_once() {
    let catalog = CatalogService::new(FirestoreDb::new_mock());
    let pharmacy_cache = PharmacyCache::open_in_memory().unwrap();
    let medicine_cache = MedicineCache::open_in_memory().unwrap();

    catalog.insert_pharmacy(pharmacy("ph-1"));
    catalog.insert_pharmacy(pharmacy("ph-2"));
    catalog.insert_medicine(medicine("111"));

    let first = catalog.reconcile(&pharmacy_cache, &medicine_cache);
    assert_eq!(first.pharmacies_written, 2);
    assert_eq!(first.medicines_written, 1);
    assert_eq!(first.unchanged, 0);
    assert_eq!(first.errors, 0);

    // Nothing changed: the second pass must not rewrite anything.
    let second = catalog.reconcile(&pharmacy_cache, &medicine_cache);
    assert_eq!(second.pharmacies_written, 0);
    assert_eq!(second.medicines_written, 0);
    assert_eq!(second.unchanged, 3);
}

#[test]
fn test_reconcile_writes_only_changed_rows() {
    let catalog = CatalogService::new(FirestoreDb::new_mock());
    let pharmacy_cache = PharmacyCache::open_in_memory().unwrap();
    let medicine_cache = MedicineCache::open_in_memory().unwrap();

    catalog.insert_pharmacy(pharmacy("ph-1"));
    catalog.insert_pharmacy(pharmacy("ph-2"));
    catalog.reconcile(&pharmacy_cache, &medicine_cache);

    // Remote update arrives for one pharmacy only.
    let mut updated = pharmacy("ph-1");
    updated.add_medicine("111", 4);
    catalog.insert_pharmacy(updated.clone());

    let summary = catalog.reconcile(&pharmacy_cache, &medicine_cache);
    assert_eq!(summary.pharmacies_written, 1);
    assert_eq!(summary.unchanged, 1);

    let cached = pharmacy_cache.get("ph-1").unwrap().unwrap();
    assert_eq!(cached, updated);
}

#[test]
fn test_remote_removals_are_never_purged_from_cache() {
    let pharmacy_cache = PharmacyCache::open_in_memory().unwrap();
    let medicine_cache = MedicineCache::open_in_memory().unwrap();

    let catalog = CatalogService::new(FirestoreDb::new_mock());
    catalog.insert_pharmacy(pharmacy("ph-1"));
    catalog.reconcile(&pharmacy_cache, &medicine_cache);

    // A fresh snapshot without ph-1 (removed remotely).
    let catalog = CatalogService::new(FirestoreDb::new_mock());
    catalog.insert_pharmacy(pharmacy("ph-2"));
    catalog.reconcile(&pharmacy_cache, &medicine_cache);

    let ids: Vec<String> = pharmacy_cache
        .all()
        .unwrap()
        .into_iter()
        .map(|p| p.id)
        .collect();
    assert!(ids.contains(&"ph-1".to_string()), "no tombstone handling");
    assert!(ids.contains(&"ph-2".to_string()));
}

#[test]
fn test_offline_load_repopulates_catalog() {
    let pharmacy_cache = PharmacyCache::open_in_memory().unwrap();
    let medicine_cache = MedicineCache::open_in_memory().unwrap();

    pharmacy_cache.upsert(&pharmacy("ph-1")).unwrap();
    medicine_cache.upsert(&medicine("111")).unwrap();
    medicine_cache.upsert(&medicine("222")).unwrap();

    let catalog = CatalogService::new(FirestoreDb::new_mock());
    assert!(catalog.is_empty());

    let (pharmacies, medicines) = catalog
        .load_from_cache(&pharmacy_cache, &medicine_cache)
        .unwrap();
    assert_eq!(pharmacies, 1);
    assert_eq!(medicines, 2);

    assert!(catalog.pharmacy("ph-1").is_some());
    assert!(catalog.medicine("222").is_some());
    assert_eq!(catalog.search_pharmacies("pharmacy").len(), 1);
}
