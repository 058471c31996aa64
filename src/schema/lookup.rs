//! Feature value lookup
//!
//! The read path: validate the raw name, prove it against the live column
//! set, and only then let it into query text. A feature name is used as a
//! column reference only after being matched against a name that genuinely
//! exists as a column; the track id is always bound as a parameter.

use crate::error::{FeatureStoreError, Result};
use crate::types::{FeatureName, TrackId};
use rusqlite::Connection;
use tracing::debug;

use super::inspector;
use super::{FEATURE_TABLE, TRACK_ID_COLUMN};

/// Fetch a single feature value for a track.
///
/// `NotFound` covers every empty outcome: the feature has no column yet
/// (even when the catalog already knows the name), the track has no row,
/// or the cell is NULL because the feature has not been computed for this
/// track. Malformed names fail with `InvalidFeatureName` before any store
/// access.
pub fn lookup(conn: &Connection, track: &TrackId, raw_feature_name: &str) -> Result<f64> {
    let name = FeatureName::parse(raw_feature_name)?;

    let columns = inspector::current_columns(conn)?;
    if !columns.contains(&name) {
        debug!(feature = %name, "Requested feature is not a column on the table");
        return Err(FeatureStoreError::NotFound);
    }

    // `name` is now proven equal to an existing feature column.
    let sql = format!(
        r#"SELECT "{}" FROM {} WHERE {} = ?1"#,
        name, FEATURE_TABLE, TRACK_ID_COLUMN
    );

    let value: Option<f64> = conn
        .query_row(&sql, rusqlite::params![track.as_str()], |row| row.get(0))
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => FeatureStoreError::NotFound,
            e => FeatureStoreError::StoreUnavailable(format!(
                "Failed to read feature value: {}",
                e
            )),
        })?;

    value.ok_or(FeatureStoreError::NotFound)
}
