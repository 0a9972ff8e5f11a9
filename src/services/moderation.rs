// SPDX-License-Identifier: MIT

//! Community moderation: flag thresholds and user suspension.
//!
//! The state transitions are pure functions over the models; the
//! service wraps them with the remote writes and in-memory updates.

use crate::db::FirestoreDb;
use crate::error::{AppError, Result};
use crate::models::{Pharmacy, User};
use crate::services::CatalogService;

/// Distinct flaggers required before a pharmacy is flagged globally.
pub const GLOBAL_FLAG_THRESHOLD: usize = 3;

/// Globally-flagged pharmacies a user may own before being suspended.
pub const SUSPENSION_THRESHOLD: usize = 3;

/// Result of applying one flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagOutcome {
    /// The user had already flagged this pharmacy; nothing changed.
    AlreadyFlagged,
    /// The flag was recorded.
    Flagged {
        flagger_count: usize,
        /// True when this flag tripped the global threshold.
        newly_global: bool,
    },
}

/// Apply a flag from `user` to `pharmacy`.
///
/// Records the user on the pharmacy's flagger list and the pharmacy on
/// the user's flagged list. Once [`GLOBAL_FLAG_THRESHOLD`] distinct
/// users have flagged the pharmacy, the global flag is set permanently;
/// there is no unflag path.
pub fn apply_flag(user: &mut User, pharmacy: &mut Pharmacy) -> FlagOutcome {
    if !pharmacy.add_flagger(&user.username) {
        return FlagOutcome::AlreadyFlagged;
    }
    user.add_flagged(&pharmacy.id);

    let flagger_count = pharmacy.flaggers.len();
    let newly_global = !pharmacy.flagged_globally && flagger_count >= GLOBAL_FLAG_THRESHOLD;
    if newly_global {
        pharmacy.flag();
    }

    FlagOutcome::Flagged {
        flagger_count,
        newly_global,
    }
}

/// Whether `user` should be suspended, given a lookup telling which of
/// their created pharmacies are globally flagged.
pub fn suspension_due<F>(user: &User, is_globally_flagged: F) -> bool
where
    F: Fn(&str) -> bool,
{
    let flagged_owned = user
        .pharmacies_created
        .iter()
        .filter(|id| is_globally_flagged(id))
        .count();
    flagged_owned >= SUSPENSION_THRESHOLD
}

/// Pharmacies a user should see on the map: globally-flagged ones are
/// hidden from everyone, and a signed-in user additionally hides the
/// ones they flagged themselves.
pub fn visible_pharmacies(user: Option<&User>, pharmacies: Vec<Pharmacy>) -> Vec<Pharmacy> {
    pharmacies
        .into_iter()
        .filter(|p| !p.is_flagged())
        .filter(|p| match user {
            Some(u) => !u.has_flagged(&p.id),
            None => true,
        })
        .collect()
}

/// Report returned to the flag endpoint.
#[derive(Debug, Clone)]
pub struct FlagReport {
    pub outcome: FlagOutcome,
    pub pharmacy: Pharmacy,
    /// Set when the flag tripped suspension for the pharmacy owner.
    pub owner_suspended: bool,
}

/// Moderation service: orchestrates flag writes and suspension checks.
#[derive(Clone)]
pub struct ModerationService {
    db: FirestoreDb,
    catalog: CatalogService,
}

impl ModerationService {
    pub fn new(db: FirestoreDb, catalog: CatalogService) -> Self {
        Self { db, catalog }
    }

    /// Flag `pharmacy_id` on behalf of `username`.
    ///
    /// The remote write is transactional (see
    /// [`FirestoreDb::flag_pharmacy_atomic`]); afterwards the in-memory
    /// catalog is updated and, if the flag tripped the global
    /// threshold, the owner's suspension is re-evaluated.
    pub async fn flag(&self, username: &str, pharmacy_id: &str) -> Result<FlagReport> {
        let Some((pharmacy, user, outcome)) =
            self.db.flag_pharmacy_atomic(pharmacy_id, username).await?
        else {
            return Err(AppError::NotFound(format!(
                "Pharmacy {} not found",
                pharmacy_id
            )));
        };

        self.catalog.insert_pharmacy(pharmacy.clone());
        tracing::debug!(username = %user.username, pharmacy_id, ?outcome, "Flag applied");

        let mut owner_suspended = false;
        if let FlagOutcome::Flagged {
            newly_global: true, ..
        } = outcome
        {
            owner_suspended = self.refresh_owner_suspension(&pharmacy.owner).await?;
        }

        Ok(FlagReport {
            outcome,
            pharmacy,
            owner_suspended,
        })
    }

    /// Re-evaluate suspension for `owner`, persisting it when due.
    ///
    /// Returns `true` if the user ends up suspended.
    pub async fn refresh_owner_suspension(&self, owner: &str) -> Result<bool> {
        let Some(mut user) = self.db.get_user(owner).await? else {
            tracing::warn!(owner, "Owner profile missing during suspension check");
            return Ok(false);
        };

        if user.suspended {
            return Ok(true);
        }

        // Prefer the in-memory copy; fall back to the remote store for
        // pharmacies outside the current region snapshot.
        let mut flagged = Vec::with_capacity(user.pharmacies_created.len());
        for id in &user.pharmacies_created {
            let is_flagged = match self.catalog.pharmacy(id) {
                Some(p) => p.is_flagged(),
                None => self
                    .db
                    .get_pharmacy(id)
                    .await?
                    .map(|p| p.is_flagged())
                    .unwrap_or(false),
            };
            flagged.push((id.clone(), is_flagged));
        }

        let due = suspension_due(&user, |id| {
            flagged
                .iter()
                .any(|(fid, is_flagged)| fid == id && *is_flagged)
        });

        if due {
            user.suspend();
            self.db.upsert_user(&user).await?;
            tracing::info!(owner, "User suspended");
        }

        Ok(due)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Coordinates;

    fn pharmacy(id: &str, owner: &str) -> Pharmacy {
        Pharmacy::new(
            id.to_string(),
            owner.to_string(),
            format!("Pharmacy {id}"),
            "Somewhere 1".to_string(),
            Coordinates::new(38.7, -9.1),
            String::new(),
        )
    }

    fn user(name: &str) -> User {
        User::new(name.to_string(), format!("{name}@example.com"), String::new())
    }

    #[test]
    fn test_three_flags_trip_global_flag() {
        let mut p = pharmacy("ph-1", "owner");

        for name in ["a", "b"] {
            let mut u = user(name);
            let outcome = apply_flag(&mut u, &mut p);
            assert!(matches!(
                outcome,
                FlagOutcome::Flagged {
                    newly_global: false,
                    ..
                }
            ));
            assert!(u.has_flagged("ph-1"));
        }
        assert!(!p.is_flagged(), "two flags must not flag globally");

        let mut third = user("c");
        let outcome = apply_flag(&mut third, &mut p);
        assert_eq!(
            outcome,
            FlagOutcome::Flagged {
                flagger_count: 3,
                newly_global: true
            }
        );
        assert!(p.is_flagged());
    }

    #[test]
    fn test_duplicate_flagger_does_not_advance_count() {
        let mut p = pharmacy("ph-1", "owner");
        let mut u = user("a");

        apply_flag(&mut u, &mut p);
        assert_eq!(apply_flag(&mut u, &mut p), FlagOutcome::AlreadyFlagged);
        assert_eq!(p.flaggers.len(), 1);
    }

    #[test]
    fn test_flag_beyond_threshold_is_not_newly_global() {
        let mut p = pharmacy("ph-1", "owner");
        for name in ["a", "b", "c"] {
            let mut u = user(name);
            apply_flag(&mut u, &mut p);
        }

        let mut fourth = user("d");
        assert_eq!(
            apply_flag(&mut fourth, &mut p),
            FlagOutcome::Flagged {
                flagger_count: 4,
                newly_global: false
            }
        );
    }

    #[test]
    fn test_suspension_requires_three_flagged_pharmacies() {
        let mut owner = user("owner");
        for id in ["ph-1", "ph-2", "ph-3"] {
            owner.add_created(id);
        }

        let two_flagged = |id: &str| id == "ph-1" || id == "ph-2";
        assert!(!suspension_due(&owner, two_flagged));

        let three_flagged = |_: &str| true;
        assert!(suspension_due(&owner, three_flagged));
    }

    #[test]
    fn test_visibility_hides_global_and_own_flags() {
        let mut flagged_globally = pharmacy("ph-1", "owner");
        flagged_globally.flag();
        let flagged_by_me = pharmacy("ph-2", "owner");
        let clean = pharmacy("ph-3", "owner");

        let mut me = user("me");
        me.add_flagged("ph-2");

        let visible = visible_pharmacies(
            Some(&me),
            vec![flagged_globally.clone(), flagged_by_me.clone(), clean.clone()],
        );
        assert_eq!(visible, vec![clean.clone()]);

        // Guests only lose the globally-flagged ones.
        let visible = visible_pharmacies(None, vec![flagged_globally, flagged_by_me.clone(), clean]);
        assert_eq!(visible.len(), 2);
        assert!(visible.iter().any(|p| p.id == "ph-2"));
    }
}
