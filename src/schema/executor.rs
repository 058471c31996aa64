//! Migration execution
//!
//! Applies a plan as one transaction: every column in the plan is added or
//! none are. Each addition is recorded in the migration log inside the same
//! transaction, so the audit trail can never disagree with the schema.

use crate::error::{FeatureStoreError, Result};
use crate::types::MigrationPlan;
use chrono::Utc;
use rusqlite::Connection;
use std::time::Instant;
use tracing::{debug, info};

use super::inspector::{self, FEATURE_COLUMN_TYPE};
use super::{FEATURE_TABLE, MIGRATION_LOG_TABLE};

/// Apply a migration plan inside a single transaction.
///
/// Returns the number of columns added. An empty plan returns 0 without
/// touching the store. The deadline is checked between statements; expiry
/// abandons the transaction, which rolls back when dropped, and surfaces as
/// `StoreUnavailable` so the caller can retry the whole sync with a fresh
/// inspection.
pub fn apply(conn: &mut Connection, plan: &MigrationPlan, deadline: Instant) -> Result<usize> {
    if plan.is_empty() {
        debug!("Empty migration plan, nothing to apply");
        return Ok(0);
    }

    let tx = conn.transaction().map_err(|e| {
        FeatureStoreError::StoreUnavailable(format!("Failed to begin transaction: {}", e))
    })?;

    // Conflict check against the schema as of this transaction, not the
    // earlier inspection. SQLite identifiers are case-insensitive.
    let live = inspector::table_columns(&tx)?;
    for name in plan.iter() {
        if let Some(column) = live
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name.as_str()))
        {
            if column.is_primary_key {
                return Err(FeatureStoreError::SchemaConflict(format!(
                    "Feature '{}' collides with the primary key column '{}'",
                    name, column.name
                )));
            }
            return Err(FeatureStoreError::SchemaConflict(format!(
                "Feature '{}' collides with existing column '{}' of type {}",
                name, column.name, column.decl_type
            )));
        }
    }

    let applied_at = Utc::now().to_rfc3339();
    let mut added = 0usize;

    for name in plan.iter() {
        if Instant::now() >= deadline {
            return Err(FeatureStoreError::StoreUnavailable(
                "Sync deadline expired during apply; transaction rolled back".to_string(),
            ));
        }

        // The identifier comes from a validated FeatureName, never from raw
        // input; quoting guards against keyword collisions only.
        let ddl = format!(
            r#"ALTER TABLE {} ADD COLUMN "{}" {}"#,
            FEATURE_TABLE, name, FEATURE_COLUMN_TYPE
        );
        tx.execute(&ddl, []).map_err(|e| map_alter_error(name.as_str(), e))?;

        tx.execute(
            &format!(
                "INSERT INTO {} (column_name, applied_at) VALUES (?1, ?2)",
                MIGRATION_LOG_TABLE
            ),
            rusqlite::params![name.as_str(), applied_at],
        )
        .map_err(|e| {
            FeatureStoreError::StoreUnavailable(format!("Failed to record migration: {}", e))
        })?;

        debug!(column = %name, "Added feature column");
        added += 1;
    }

    tx.commit().map_err(|e| {
        FeatureStoreError::StoreUnavailable(format!("Failed to commit migration: {}", e))
    })?;

    info!(added, "Applied schema migration");
    Ok(added)
}

fn map_alter_error(column: &str, err: rusqlite::Error) -> FeatureStoreError {
    let message = err.to_string();
    if message.contains("duplicate column name") {
        FeatureStoreError::SchemaConflict(format!(
            "Column '{}' already exists on the feature table",
            column
        ))
    } else {
        FeatureStoreError::StoreUnavailable(format!("Failed to add column '{}': {}", column, message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::inspector::current_columns;
    use crate::schema::planner;
    use crate::types::FeatureName;
    use std::collections::BTreeSet;
    use std::time::Duration;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE track_features (filename TEXT PRIMARY KEY, mfcc REAL, notes TEXT);
             CREATE TABLE schema_migrations (
                 column_name TEXT PRIMARY KEY,
                 applied_at TEXT NOT NULL
             );",
        )
        .unwrap();
        conn
    }

    fn names(raw: &[&str]) -> BTreeSet<FeatureName> {
        raw.iter().map(|s| FeatureName::parse(s).unwrap()).collect()
    }

    fn far_deadline() -> Instant {
        Instant::now() + Duration::from_secs(60)
    }

    #[test]
    fn test_apply_adds_missing_columns() {
        let mut conn = test_conn();
        let plan = planner::plan(&names(&["mfcc", "chroma"]), &current_columns(&conn).unwrap());

        let added = apply(&mut conn, &plan, far_deadline()).unwrap();
        assert_eq!(added, 1);

        let columns = current_columns(&conn).unwrap();
        assert!(columns.contains(&FeatureName::parse("chroma").unwrap()));
        assert!(columns.contains(&FeatureName::parse("mfcc").unwrap()));
    }

    #[test]
    fn test_apply_empty_plan_is_a_no_op() {
        let mut conn = test_conn();
        let plan = planner::plan(&names(&["mfcc"]), &current_columns(&conn).unwrap());
        assert!(plan.is_empty());

        let added = apply(&mut conn, &plan, far_deadline()).unwrap();
        assert_eq!(added, 0);

        let logged: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(logged, 0);
    }

    #[test]
    fn test_pk_collision_is_schema_conflict_and_rolls_back() {
        let mut conn = test_conn();
        // "filename" survives planning because only feature columns are
        // subtracted from the catalog.
        let plan = planner::plan(
            &names(&["filename", "zcr"]),
            &current_columns(&conn).unwrap(),
        );
        assert_eq!(plan.len(), 2);

        let err = apply(&mut conn, &plan, far_deadline()).unwrap_err();
        assert!(matches!(err, FeatureStoreError::SchemaConflict(_)));

        // Nothing from the plan may land, "zcr" included.
        let columns = current_columns(&conn).unwrap();
        assert!(!columns.contains(&FeatureName::parse("zcr").unwrap()));
        let logged: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(logged, 0);
    }

    #[test]
    fn test_non_feature_column_collision_is_schema_conflict() {
        let mut conn = test_conn();
        let plan = planner::plan(&names(&["notes"]), &current_columns(&conn).unwrap());
        assert_eq!(plan.len(), 1);

        let err = apply(&mut conn, &plan, far_deadline()).unwrap_err();
        match err {
            FeatureStoreError::SchemaConflict(message) => {
                assert!(message.contains("notes"));
                assert!(message.contains("TEXT"));
            }
            other => panic!("expected SchemaConflict, got {:?}", other),
        }
    }

    #[test]
    fn test_expired_deadline_rolls_back() {
        let mut conn = test_conn();
        let plan = planner::plan(
            &names(&["chroma", "zcr"]),
            &current_columns(&conn).unwrap(),
        );

        let err = apply(&mut conn, &plan, Instant::now()).unwrap_err();
        assert!(matches!(err, FeatureStoreError::StoreUnavailable(_)));

        let columns = current_columns(&conn).unwrap();
        assert!(!columns.contains(&FeatureName::parse("chroma").unwrap()));
        assert!(!columns.contains(&FeatureName::parse("zcr").unwrap()));
    }

    #[test]
    fn test_migration_log_matches_applied_columns() {
        let mut conn = test_conn();
        let plan = planner::plan(
            &names(&["mfcc", "chroma", "zcr"]),
            &current_columns(&conn).unwrap(),
        );

        let added = apply(&mut conn, &plan, far_deadline()).unwrap();
        assert_eq!(added, 2);

        let mut stmt = conn
            .prepare("SELECT column_name FROM schema_migrations ORDER BY column_name")
            .unwrap();
        let logged: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap();
        assert_eq!(logged, vec!["chroma", "zcr"]);
    }
}
