//! Core data types for the track feature store
//!
//! This module defines the validated feature identifier, the track
//! identifier, and the migration plan computed by the planner. `FeatureName`
//! is the crate's safety boundary: the only way to obtain one is through
//! normalization plus charset validation, so holding a value is proof that
//! the string is a legal column identifier.

use crate::error::{FeatureStoreError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Normalized feature identifier
///
/// Wraps the normalized form of a feature name: lowercase, with spaces and
/// hyphens folded to underscores, restricted to `[a-z0-9_]+`. Two raw
/// inputs that normalize to the same string are the same feature.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FeatureName(String);

impl FeatureName {
    /// Parse a raw feature name, normalizing it first.
    ///
    /// Returns `InvalidFeatureName` when the input is empty or the
    /// normalized form contains characters outside the allowed charset.
    pub fn parse(raw: &str) -> Result<Self> {
        let normalized: String = raw
            .chars()
            .map(|c| match c {
                ' ' | '-' => '_',
                c => c.to_ascii_lowercase(),
            })
            .collect();

        if normalized.is_empty()
            || !normalized
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        {
            return Err(FeatureStoreError::InvalidFeatureName(raw.to_string()));
        }

        Ok(Self(normalized))
    }

    /// The normalized name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for FeatureName {
    type Error = FeatureStoreError;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<FeatureName> for String {
    fn from(name: FeatureName) -> String {
        name.0
    }
}

impl std::fmt::Display for FeatureName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable track identifier, typically the source filename
///
/// Wraps the identifier to prevent mixing track ids with feature names or
/// other strings flowing through the query layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(String);

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TrackId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ordered set of feature columns missing from the table
///
/// Computed fresh per sync and discarded after execution. Ordering is
/// lexicographic, so the same catalog and column set always produce the
/// same plan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationPlan {
    columns: Vec<FeatureName>,
}

impl MigrationPlan {
    /// Build a plan from the missing names, sorting and deduplicating.
    pub fn from_missing(missing: impl IntoIterator<Item = FeatureName>) -> Self {
        let set: BTreeSet<FeatureName> = missing.into_iter().collect();
        Self {
            columns: set.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Columns to add, in application order.
    pub fn columns(&self) -> &[FeatureName] {
        &self.columns
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FeatureName> {
        self.columns.iter()
    }
}
