pub mod sqlite;

pub use sqlite::*;

use thiserror::Error;

/// Storage-layer error shared by every repository module.
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Lookup by id came back empty. `entity_type` is the caller's label
    /// ("User", "Facility", "Pending appointment").
    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    /// A stored string did not parse back into its enum (role, facility
    /// kind, status columns).
    #[error("Invalid enum value for {field}: {value}")]
    InvalidEnum { field: String, value: String },

    #[error("Migration failed at version {version}: {reason}")]
    MigrationFailed { version: i64, reason: String },

    /// A domain rule was violated: overdrawing the points ledger, booking
    /// a taken slot, an unknown referral code, an invalid status
    /// transition.
    #[error("Constraint violated: {0}")]
    ConstraintViolation(String),
}
