//! Migration planning
//!
//! Pure set difference between the catalog and the live column set. No I/O
//! happens here; given the same two sets the planner always returns the
//! same ordered plan, and an empty plan is an expected result rather than
//! an error.

use crate::types::{FeatureName, MigrationPlan};
use std::collections::BTreeSet;

/// Compute the ordered set of columns missing from the table.
pub fn plan(catalog: &BTreeSet<FeatureName>, existing: &BTreeSet<FeatureName>) -> MigrationPlan {
    MigrationPlan::from_missing(catalog.difference(existing).cloned())
}
