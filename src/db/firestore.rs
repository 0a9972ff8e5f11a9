// SPDX-License-Identifier: MIT

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Profiles (user accounts)
//! - Pharmacies (region queries, stock updates)
//! - Medicines (per-barcode reads)

use crate::db::collections;
use crate::error::AppError;
use crate::geo::RegionBounds;
use crate::models::{Medicine, Pharmacy, User};
use crate::services::moderation::{self, FlagOutcome};
use futures_util::{stream, StreamExt};

const MAX_CONCURRENT_DB_OPS: usize = 50;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    /// Whether a remote connection exists (false in offline/mock mode).
    pub fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    // ─── Profile Operations ──────────────────────────────────────

    /// Get a user profile by username.
    pub async fn get_user(&self, username: &str) -> Result<Option<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::PROFILES)
            .obj()
            .one(username)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a user profile by email, if any.
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let email = email.to_string();
        let users: Vec<User> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::PROFILES)
            .filter(move |q| q.for_all([q.field("email").eq(email.clone())]))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(users.into_iter().next())
    }

    /// Create or update a user profile.
    pub async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::PROFILES)
            .document_id(&user.username)
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Pharmacy Operations ─────────────────────────────────────

    /// Get a pharmacy by ID.
    pub async fn get_pharmacy(&self, pharmacy_id: &str) -> Result<Option<Pharmacy>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::PHARMACIES)
            .obj()
            .one(pharmacy_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or update a pharmacy.
    pub async fn upsert_pharmacy(&self, pharmacy: &Pharmacy) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::PHARMACIES)
            .document_id(&pharmacy.id)
            .object(pharmacy)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Query pharmacies whose location falls inside a lat/lng box.
    ///
    /// This is the region snapshot the catalog refresh consumes; the
    /// box comes from [`crate::geo::region_bounds`].
    pub async fn pharmacies_in_region(
        &self,
        bounds: RegionBounds,
    ) -> Result<Vec<Pharmacy>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::PHARMACIES)
            .filter(move |q| {
                q.for_all([
                    q.field("location.lat").greater_than(bounds.lower_lat),
                    q.field("location.lat").less_than(bounds.upper_lat),
                    q.field("location.lng").greater_than(bounds.lower_lng),
                    q.field("location.lng").less_than(bounds.upper_lng),
                ])
            })
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Medicine Operations ─────────────────────────────────────

    /// Get a medicine by barcode.
    pub async fn get_medicine(&self, barcode: &str) -> Result<Option<Medicine>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::MEDICINES)
            .obj()
            .one(barcode)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or update a medicine.
    pub async fn upsert_medicine(&self, medicine: &Medicine) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::MEDICINES)
            .document_id(&medicine.barcode)
            .object(medicine)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Fetch many medicines by barcode with bounded concurrency.
    ///
    /// Barcodes without a document are skipped with a warning; the
    /// pharmacy side may reference medicines that were never created
    /// on this device.
    pub async fn get_medicines(&self, barcodes: &[String]) -> Result<Vec<Medicine>, AppError> {
        let client = self.get_client()?;

        let results: Vec<Result<Option<Medicine>, firestore::errors::FirestoreError>> =
            stream::iter(barcodes.to_vec())
                .map(|barcode| async move {
                    client
                        .fluent()
                        .select()
                        .by_id_in(collections::MEDICINES)
                        .obj()
                        .one(&barcode)
                        .await
                })
                .buffer_unordered(MAX_CONCURRENT_DB_OPS)
                .collect()
                .await;

        let mut medicines = Vec::with_capacity(results.len());
        for result in results {
            match result {
                Ok(Some(medicine)) => medicines.push(medicine),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping medicine fetch failure");
                }
            }
        }

        Ok(medicines)
    }

    // ─── Atomic Flag Write ───────────────────────────────────────

    /// Atomically flag a pharmacy on behalf of a user.
    ///
    /// Both the pharmacy's flagger list and the user's flagged list are
    /// written in one Firestore transaction, so concurrent flaggers
    /// cannot lose updates around the global-flag threshold check. If
    /// another request touches either document first, Firestore retries
    /// with fresh data.
    ///
    /// Returns the updated documents and the flag outcome, or `None`
    /// if the pharmacy or user no longer exists.
    pub async fn flag_pharmacy_atomic(
        &self,
        pharmacy_id: &str,
        username: &str,
    ) -> Result<Option<(Pharmacy, User, FlagOutcome)>, AppError> {
        let mut transaction = self
            .get_client()?
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        // Read both documents; this registers them for conflict detection.
        let pharmacy = self.get_pharmacy(pharmacy_id).await?;
        let user = self.get_user(username).await?;

        let (Some(mut pharmacy), Some(mut user)) = (pharmacy, user) else {
            let _ = transaction.rollback().await;
            return Ok(None);
        };

        let outcome = moderation::apply_flag(&mut user, &mut pharmacy);

        if outcome == FlagOutcome::AlreadyFlagged {
            tracing::debug!(pharmacy_id, username, "Duplicate flag (idempotent skip)");
            let _ = transaction.rollback().await;
            return Ok(Some((pharmacy, user, outcome)));
        }

        self.get_client()?
            .fluent()
            .update()
            .in_col(collections::PHARMACIES)
            .document_id(&pharmacy.id)
            .object(&pharmacy)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add pharmacy to transaction: {}", e))
            })?;

        self.get_client()?
            .fluent()
            .update()
            .in_col(collections::PROFILES)
            .document_id(&user.username)
            .object(&user)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add profile to transaction: {}", e))
            })?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        tracing::info!(
            pharmacy_id,
            username,
            flaggers = pharmacy.flaggers.len(),
            flagged_globally = pharmacy.flagged_globally,
            "Pharmacy flagged atomically"
        );

        Ok(Some((pharmacy, user, outcome)))
    }
}
