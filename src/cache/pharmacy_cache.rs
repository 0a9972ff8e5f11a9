// SPDX-License-Identifier: MIT

//! SQLite mirror of the Pharmacy projection.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};

use crate::cache::CacheError;
use crate::geo::Coordinates;
use crate::models::Pharmacy;

/// Single-table pharmacy cache database.
///
/// List and map fields are stored as JSON text columns, the same shape
/// the on-device cache has always used.
pub struct PharmacyCache {
    connection: Mutex<Connection>,
}

impl PharmacyCache {
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
            .expect("pharmacy cache mutex poisoned")
            .execute(
                "CREATE TABLE IF NOT EXISTS pharmacies (
                    id TEXT PRIMARY KEY,
                    owner TEXT NOT NULL,
                    name TEXT NOT NULL,
                    address TEXT NOT NULL,
                    lat REAL NOT NULL,
                    lng REAL NOT NULL,
                    photo_path TEXT NOT NULL,
                    medicines TEXT NOT NULL,
                    flaggers TEXT NOT NULL,
                    flagged_globally INTEGER NOT NULL
                )",
                [],
            )
            .map_err(|e| CacheError::Open(e.to_string()))?;
        Ok(())
    }

    /// Insert or replace a cached pharmacy row.
    pub fn upsert(&self, pharmacy: &Pharmacy) -> Result<(), CacheError> {
        let medicines = serde_json::to_string(&pharmacy.medicines)
            .map_err(|e| CacheError::Corrupt(e.to_string()))?;
        let flaggers = serde_json::to_string(&pharmacy.flaggers)
            .map_err(|e| CacheError::Corrupt(e.to_string()))?;

        self.connection
            .lock()
            .expect("pharmacy cache mutex poisoned")
            .execute(
                "INSERT OR REPLACE INTO pharmacies
                 (id, owner, name, address, lat, lng, photo_path, medicines, flaggers, flagged_globally)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    pharmacy.id,
                    pharmacy.owner,
                    pharmacy.name,
                    pharmacy.address,
                    pharmacy.location.lat,
                    pharmacy.location.lng,
                    pharmacy.photo_path,
                    medicines,
                    flaggers,
                    pharmacy.flagged_globally as i64,
                ],
            )
            .map_err(|e| CacheError::Query(e.to_string()))?;
        Ok(())
    }

    /// Get a cached pharmacy by ID.
    pub fn get(&self, id: &str) -> Result<Option<Pharmacy>, CacheError> {
        self.connection
            .lock()
            .expect("pharmacy cache mutex poisoned")
            .query_row(
                "SELECT id, owner, name, address, lat, lng, photo_path, medicines, flaggers, flagged_globally
                 FROM pharmacies WHERE id = ?1",
                params![id],
                row_to_pharmacy,
            )
            .optional()
            .map_err(|e| CacheError::Query(e.to_string()))
    }

    /// All cached pharmacies.
    pub fn all(&self) -> Result<Vec<Pharmacy>, CacheError> {
        let connection = self
            .connection
            .lock()
            .expect("pharmacy cache mutex poisoned");
        let mut stmt = connection
            .prepare(
                "SELECT id, owner, name, address, lat, lng, photo_path, medicines, flaggers, flagged_globally
                 FROM pharmacies",
            )
            .map_err(|e| CacheError::Query(e.to_string()))?;

        let rows = stmt
            .query_map([], row_to_pharmacy)
            .map_err(|e| CacheError::Query(e.to_string()))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| CacheError::Query(e.to_string()))
    }
}

fn row_to_pharmacy(row: &rusqlite::Row<'_>) -> rusqlite::Result<Pharmacy> {
    let medicines_json: String = row.get(7)?;
    let flaggers_json: String = row.get(8)?;

    let medicines: BTreeMap<String, u32> = serde_json::from_str(&medicines_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(7, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let flaggers: Vec<String> = serde_json::from_str(&flaggers_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(8, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(Pharmacy {
        id: row.get(0)?,
        owner: row.get(1)?,
        name: row.get(2)?,
        address: row.get(3)?,
        location: Coordinates::new(row.get(4)?, row.get(5)?),
        photo_path: row.get(6)?,
        medicines,
        flaggers,
        flagged_globally: row.get::<_, i64>(9)? != 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pharmacy(id: &str) -> Pharmacy {
        let mut p = Pharmacy::new(
            id.to_string(),
            "alice".to_string(),
            "Farmacia Central".to_string(),
            "Rua Augusta 1".to_string(),
            Coordinates::new(38.7369, -9.1427),
            format!("{id}_photo.jpg"),
        );
        p.add_medicine("5601234567890", 4);
        p.add_flagger("bob");
        p
    }

    #[test]
    fn test_upsert_and_get_roundtrip() {
        let cache = PharmacyCache::open_in_memory().unwrap();
        let p = pharmacy("ph-1");

        cache.upsert(&p).unwrap();
        let cached = cache.get("ph-1").unwrap().unwrap();

        assert_eq!(cached, p);
    }

    #[test]
    fn test_get_missing_returns_none() {
        let cache = PharmacyCache::open_in_memory().unwrap();
        assert!(cache.get("ph-404").unwrap().is_none());
    }

    #[test]
    fn test_upsert_replaces_existing_row() {
        let cache = PharmacyCache::open_in_memory().unwrap();
        let mut p = pharmacy("ph-1");
        cache.upsert(&p).unwrap();

        p.flag();
        p.add_stock("5601234567890", 6);
        cache.upsert(&p).unwrap();

        let all = cache.all().unwrap();
        assert_eq!(all.len(), 1);
        assert!(all[0].flagged_globally);
        assert_eq!(all[0].stock_of("5601234567890"), Some(10));
    }
}
