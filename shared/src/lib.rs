//! Shared types and models for the Municipal Weather Monitoring service
//!
//! This crate contains the domain models, enums, validation rules and the
//! daily weather aggregation used by the backend. Enabling the `sqlx` feature
//! derives `FromRow` for the persisted models.

pub mod aggregation;
pub mod models;
pub mod types;
pub mod validation;

pub use aggregation::*;
pub use models::*;
pub use types::*;
pub use validation::*;
