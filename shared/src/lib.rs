//! Shared types and models for the group-order marketplace
//!
//! This crate holds the domain enums and pure business rules shared by the
//! backend and its tests. Nothing here performs I/O.

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
