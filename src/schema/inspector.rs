//! Live schema inspection
//!
//! Reads the actual column set of the feature table from the store. The
//! feature-column subset returned by [`current_columns`] doubles as the
//! lookup whitelist: a name that is not in this set can never be referenced
//! in a query.

use crate::error::{FeatureStoreError, Result};
use crate::types::FeatureName;
use rusqlite::Connection;
use std::collections::BTreeSet;

use super::FEATURE_TABLE;

/// Declared type of every feature value column.
pub const FEATURE_COLUMN_TYPE: &str = "REAL";

/// One column of the feature table as reported by the store.
#[derive(Debug, Clone)]
pub struct TableColumn {
    pub name: String,
    pub decl_type: String,
    pub is_primary_key: bool,
}

impl TableColumn {
    /// The feature this column stores, if it is a feature column at all:
    /// not the primary key, named in canonical form, and declared with the
    /// numeric feature type.
    pub fn as_feature(&self) -> Option<FeatureName> {
        if self.is_primary_key || !self.decl_type.eq_ignore_ascii_case(FEATURE_COLUMN_TYPE) {
            return None;
        }
        FeatureName::parse(&self.name)
            .ok()
            .filter(|name| name.as_str() == self.name)
    }
}

/// Read the full column list of the feature table.
///
/// Fails with `StoreUnavailable` when the query fails or the table does not
/// exist; retry policy is the caller's decision.
pub fn table_columns(conn: &Connection) -> Result<Vec<TableColumn>> {
    let mut stmt = conn
        .prepare("SELECT name, type, pk FROM pragma_table_info(?1)")
        .map_err(|e| {
            FeatureStoreError::StoreUnavailable(format!("Failed to inspect schema: {}", e))
        })?;

    let columns = stmt
        .query_map(rusqlite::params![FEATURE_TABLE], |row| {
            Ok(TableColumn {
                name: row.get(0)?,
                decl_type: row.get(1)?,
                is_primary_key: row.get::<_, i64>(2)? != 0,
            })
        })
        .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
        .map_err(|e| {
            FeatureStoreError::StoreUnavailable(format!("Failed to read table info: {}", e))
        })?;

    // A real feature table always carries at least its primary key column;
    // zero rows means the table itself is missing.
    if columns.is_empty() {
        return Err(FeatureStoreError::StoreUnavailable(format!(
            "Table '{}' does not exist",
            FEATURE_TABLE
        )));
    }

    Ok(columns)
}

/// Current set of feature columns on the live table.
pub fn current_columns(conn: &Connection) -> Result<BTreeSet<FeatureName>> {
    let columns = table_columns(conn)?;
    Ok(columns.iter().filter_map(TableColumn::as_feature).collect())
}
