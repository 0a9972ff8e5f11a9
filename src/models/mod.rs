// SPDX-License-Identifier: MIT

//! Data models for the application.

pub mod medicine;
pub mod pharmacy;
pub mod user;

pub use medicine::Medicine;
pub use pharmacy::Pharmacy;
pub use user::User;
