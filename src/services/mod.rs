// SPDX-License-Identifier: MIT

//! Services module - business logic layer.

pub mod catalog;
pub mod moderation;
pub mod notify;
pub mod password;
pub mod photos;

pub use catalog::{CatalogService, ReconcileSummary, RefreshSummary};
pub use moderation::{FlagOutcome, FlagReport, ModerationService};
pub use notify::{NotificationEvent, NotificationSink, Notifier, TracingSink};
pub use photos::PhotoStore;
