//! Schema synchronization engine
//!
//! The migration core: inspect the live feature table, diff it against the
//! catalog, and apply the missing columns atomically. The lookup path
//! resolves user-supplied names against the inspected column set before any
//! query text is built, which is this crate's injection boundary.
//!
//! A sync runs Inspect → Plan → Apply. Recoverable failures
//! (`StoreUnavailable`) restart at Inspecting on the next attempt;
//! `SchemaConflict` is terminal for the attempt and needs operator action.

pub mod executor;
pub mod inspector;
pub mod lookup;
pub mod planner;

/// Name of the wide feature table.
pub const FEATURE_TABLE: &str = "track_features";

/// Primary key column holding the track identifier.
pub const TRACK_ID_COLUMN: &str = "filename";

/// Append-only audit log of applied column additions.
pub const MIGRATION_LOG_TABLE: &str = "schema_migrations";

/// Phase of the sync lifecycle, carried as log and error context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// No sync in flight.
    Idle,
    /// Reading the live column set.
    Inspecting,
    /// Diffing catalog against columns.
    Planning,
    /// Executing the migration transaction.
    Applying,
}

impl std::fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let phase = match self {
            SyncPhase::Idle => "idle",
            SyncPhase::Inspecting => "inspecting",
            SyncPhase::Planning => "planning",
            SyncPhase::Applying => "applying",
        };
        write!(f, "{}", phase)
    }
}
