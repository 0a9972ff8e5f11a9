// SPDX-License-Identifier: MIT

//! SQLite mirror of the Medicine projection.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};

use crate::cache::CacheError;
use crate::models::Medicine;

/// Single-table medicine cache database.
pub struct MedicineCache {
    connection: Mutex<Connection>,
}

impl MedicineCache {
    /// Open (or create) the cache database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CacheError> {
        let connection =
            Connection::open(path.as_ref()).map_err(|e| CacheError::Open(e.to_string()))?;
        let cache = Self {
            connection: Mutex::new(connection),
        };
        cache.initialize_schema()?;
        Ok(cache)
    }

    /// Open an in-memory cache (tests).
    pub fn open_in_memory() -> Result<Self, CacheError> {
        let connection =
            Connection::open_in_memory().map_err(|e| CacheError::Open(e.to_string()))?;
        let cache = Self {
            connection: Mutex::new(connection),
        };
        cache.initialize_schema()?;
        Ok(cache)
    }

    fn initialize_schema(&self) -> Result<(), CacheError> {
        self.connection
            .lock()
            .expect("medicine cache mutex poisoned")
            .execute(
                "CREATE TABLE IF NOT EXISTS medicines (
                    barcode TEXT PRIMARY KEY,
                    name TEXT NOT NULL,
                    photo_path TEXT NOT NULL,
                    purpose TEXT NOT NULL,
                    users_to_notify TEXT NOT NULL,
                    pharmacy_ids TEXT NOT NULL
                )",
                [],
            )
            .map_err(|e| CacheError::Open(e.to_string()))?;
        Ok(())
    }

    /// Insert or replace a cached medicine row.
    pub fn upsert(&self, medicine: &Medicine) -> Result<(), CacheError> {
        let users_to_notify = serde_json::to_string(&medicine.users_to_notify)
            .map_err(|e| CacheError::Corrupt(e.to_string()))?;
        let pharmacy_ids = serde_json::to_string(&medicine.pharmacy_ids)
            .map_err(|e| CacheError::Corrupt(e.to_string()))?;

        self.connection
            .lock()
            .expect("medicine cache mutex poisoned")
            .execute(
                "INSERT OR REPLACE INTO medicines
                 (barcode, name, photo_path, purpose, users_to_notify, pharmacy_ids)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    medicine.barcode,
                    medicine.name,
                    medicine.photo_path,
                    medicine.purpose,
                    users_to_notify,
                    pharmacy_ids,
                ],
            )
            .map_err(|e| CacheError::Query(e.to_string()))?;
        Ok(())
    }

    /// Get a cached medicine by barcode.
    pub fn get(&self, barcode: &str) -> Result<Option<Medicine>, CacheError> {
        self.connection
            .lock()
            .expect("medicine cache mutex poisoned")
            .query_row(
                "SELECT barcode, name, photo_path, purpose, users_to_notify, pharmacy_ids
                 FROM medicines WHERE barcode = ?1",
                params![barcode],
                row_to_medicine,
            )
            .optional()
            .map_err(|e| CacheError::Query(e.to_string()))
    }

    /// All cached medicines.
    pub fn all(&self) -> Result<Vec<Medicine>, CacheError> {
        let connection = self
            .connection
            .lock()
            .expect("medicine cache mutex poisoned");
        let mut stmt = connection
            .prepare(
                "SELECT barcode, name, photo_path, purpose, users_to_notify, pharmacy_ids
                 FROM medicines",
            )
            .map_err(|e| CacheError::Query(e.to_string()))?;

        let rows = stmt
            .query_map([], row_to_medicine)
            .map_err(|e| CacheError::Query(e.to_string()))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| CacheError::Query(e.to_string()))
    }
}

fn row_to_medicine(row: &rusqlite::Row<'_>) -> rusqlite::Result<Medicine> {
    let users_json: String = row.get(4)?;
    let pharmacies_json: String = row.get(5)?;

    let users_to_notify: Vec<String> = serde_json::from_str(&users_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let pharmacy_ids: Vec<String> = serde_json::from_str(&pharmacies_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(Medicine {
        barcode: row.get(0)?,
        name: row.get(1)?,
        photo_path: row.get(2)?,
        purpose: row.get(3)?,
        users_to_notify,
        pharmacy_ids,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_and_get_roundtrip() {
        let cache = MedicineCache::open_in_memory().unwrap();
        let mut m = Medicine::new(
            "5601234567890".to_string(),
            "Ben-u-ron".to_string(),
            "5601234567890_photo.jpg".to_string(),
            "Analgesic".to_string(),
        );
        m.add_user_to_notify("alice");
        m.add_pharmacy_id("ph-1");

        cache.upsert(&m).unwrap();
        let cached = cache.get("5601234567890").unwrap().unwrap();

        assert_eq!(cached, m);
        assert!(cache.get("0000000000000").unwrap().is_none());
    }
}
