//! Pooled store handle and service facade
//!
//! `FeatureStore` owns the connection pool and exposes the operations the
//! transport layer consumes: point lookups, value upserts, and the
//! operator-triggered schema sync. Lookups run concurrently on pooled
//! connections without coordination; syncs are serialized behind a mutex
//! and bounded by the configured timeout.

use crate::catalog::FeatureCatalog;
use crate::config::StoreConfig;
use crate::error::{FeatureStoreError, Result};
use crate::schema::{
    executor, inspector, lookup, planner, SyncPhase, FEATURE_TABLE, MIGRATION_LOG_TABLE,
    TRACK_ID_COLUMN,
};
use crate::types::{FeatureName, TrackId};
use chrono::{DateTime, Utc};
use deadpool_sqlite::{Config, Pool, PoolConfig, Runtime};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// One applied column addition from the migration log.
#[derive(Debug, Clone)]
pub struct AppliedMigration {
    pub column_name: String,
    pub applied_at: DateTime<Utc>,
}

/// Feature store over one SQLite database
pub struct FeatureStore {
    pool: Pool,
    sync_timeout: Duration,
    sync_gate: Mutex<()>,
}

impl FeatureStore {
    /// Open a store at the configured database path.
    ///
    /// The database file is created on first connection if missing; the
    /// tables are not. Call [`bootstrap`](Self::bootstrap) once per
    /// deployment, or point the store at a database provisioned elsewhere.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        info!(
            path = %config.db_path.display(),
            pool_size = config.pool_size,
            "Opening feature store"
        );

        let mut pool_config = Config::new(&config.db_path);
        pool_config.pool = Some(PoolConfig::new(config.pool_size));
        let pool = pool_config.create_pool(Runtime::Tokio1).map_err(|e| {
            FeatureStoreError::StoreUnavailable(format!("Failed to create connection pool: {}", e))
        })?;

        Ok(Self {
            pool,
            sync_timeout: config.sync_timeout(),
            sync_gate: Mutex::new(()),
        })
    }

    async fn conn(&self) -> Result<deadpool_sqlite::Object> {
        self.pool.get().await.map_err(|e| {
            FeatureStoreError::StoreUnavailable(format!(
                "Failed to get connection from pool: {}",
                e
            ))
        })
    }

    /// Create the feature table (primary key only) and the migration log
    /// if they do not exist yet. Safe to call repeatedly.
    pub async fn bootstrap(&self) -> Result<()> {
        let conn = self.conn().await?;
        conn.interact(|conn| -> Result<()> {
            conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {table} (
                    {pk} TEXT PRIMARY KEY
                );
                CREATE TABLE IF NOT EXISTS {log} (
                    column_name TEXT PRIMARY KEY,
                    applied_at TEXT NOT NULL
                );",
                table = FEATURE_TABLE,
                pk = TRACK_ID_COLUMN,
                log = MIGRATION_LOG_TABLE,
            ))
            .map_err(|e| {
                FeatureStoreError::StoreUnavailable(format!("Failed to create base tables: {}", e))
            })
        })
        .await
        .map_err(|e| FeatureStoreError::StoreUnavailable(format!("Pool interaction failed: {}", e)))??;

        info!("Feature store bootstrapped");
        Ok(())
    }

    /// Look up one feature value for a track.
    ///
    /// Read-only and safe to call concurrently; never touches the planner
    /// or executor.
    pub async fn get_feature_value(&self, track: &TrackId, raw_feature_name: &str) -> Result<f64> {
        // Reject malformed names before borrowing a connection, so invalid
        // input never reaches the store at all.
        let name = FeatureName::parse(raw_feature_name)?;

        let conn = self.conn().await?;
        let track = track.clone();
        conn.interact(move |conn| lookup::lookup(conn, &track, name.as_str()))
            .await
            .map_err(|e| {
                FeatureStoreError::StoreUnavailable(format!("Pool interaction failed: {}", e))
            })?
    }

    /// Store one computed feature value for a track, creating the track row
    /// if needed.
    ///
    /// The feature must already exist as a column; values for unsynced
    /// features are rejected as `NotFound` so producers sync first.
    pub async fn put_feature_value(
        &self,
        track: &TrackId,
        raw_feature_name: &str,
        value: f64,
    ) -> Result<()> {
        let name = FeatureName::parse(raw_feature_name)?;

        let conn = self.conn().await?;
        let track = track.clone();
        conn.interact(move |conn| -> Result<()> {
            let columns = inspector::current_columns(conn)?;
            if !columns.contains(&name) {
                return Err(FeatureStoreError::NotFound);
            }

            let sql = format!(
                r#"INSERT INTO {table} ({pk}, "{col}") VALUES (?1, ?2)
                   ON CONFLICT({pk}) DO UPDATE SET "{col}" = excluded."{col}""#,
                table = FEATURE_TABLE,
                pk = TRACK_ID_COLUMN,
                col = name,
            );
            conn.execute(&sql, rusqlite::params![track.as_str(), value])
                .map_err(|e| {
                    FeatureStoreError::StoreUnavailable(format!(
                        "Failed to store feature value: {}",
                        e
                    ))
                })?;
            Ok(())
        })
        .await
        .map_err(|e| FeatureStoreError::StoreUnavailable(format!("Pool interaction failed: {}", e)))?
    }

    /// Bring the table's columns into alignment with the catalog, using the
    /// configured timeout.
    ///
    /// Returns the number of columns added; 0 means the schema already
    /// matched the catalog and the store was not written at all.
    pub async fn sync_schema(&self, catalog: &dyn FeatureCatalog) -> Result<usize> {
        self.sync_schema_with_timeout(catalog, self.sync_timeout).await
    }

    /// Like [`sync_schema`](Self::sync_schema) with a caller-supplied
    /// timeout.
    ///
    /// At most one sync runs at a time; a second caller waits on the gate.
    /// The deadline spans the whole Inspect → Plan → Apply sequence, and an
    /// expiry during Apply rolls the transaction back before surfacing as
    /// `StoreUnavailable`.
    pub async fn sync_schema_with_timeout(
        &self,
        catalog: &dyn FeatureCatalog,
        timeout: Duration,
    ) -> Result<usize> {
        let _guard = self.sync_gate.lock().await;
        let deadline = Instant::now() + timeout;

        debug!(phase = %SyncPhase::Inspecting, "Starting schema sync");
        let conn = self.conn().await?;
        let existing = conn
            .interact(|conn| inspector::current_columns(conn))
            .await
            .map_err(|e| {
                FeatureStoreError::StoreUnavailable(format!("Pool interaction failed: {}", e))
            })??;
        drop(conn);

        debug!(
            phase = %SyncPhase::Planning,
            existing = existing.len(),
            "Planning against catalog"
        );
        let wanted = catalog.feature_names().await?;
        let plan = planner::plan(&wanted, &existing);
        if plan.is_empty() {
            debug!(phase = %SyncPhase::Idle, "Schema already matches catalog");
            return Ok(0);
        }

        info!(
            phase = %SyncPhase::Applying,
            columns = plan.len(),
            "Applying migration plan"
        );
        // The pooled object is held exclusively for the apply step only.
        let conn = self.conn().await?;
        let added = conn
            .interact(move |conn| executor::apply(conn, &plan, deadline))
            .await
            .map_err(|e| {
                FeatureStoreError::StoreUnavailable(format!("Pool interaction failed: {}", e))
            })??;

        debug!(phase = %SyncPhase::Idle, added, "Schema sync finished");
        Ok(added)
    }

    /// Audit trail of column additions, oldest first.
    pub async fn applied_migrations(&self) -> Result<Vec<AppliedMigration>> {
        let conn = self.conn().await?;
        conn.interact(|conn| -> Result<Vec<AppliedMigration>> {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT column_name, applied_at FROM {} ORDER BY applied_at, column_name",
                    MIGRATION_LOG_TABLE
                ))
                .map_err(|e| {
                    FeatureStoreError::StoreUnavailable(format!(
                        "Failed to read migration log: {}",
                        e
                    ))
                })?;

            let rows = stmt
                .query_map([], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })
                .and_then(|mapped| mapped.collect::<rusqlite::Result<Vec<_>>>())
                .map_err(|e| {
                    FeatureStoreError::StoreUnavailable(format!(
                        "Failed to read migration log: {}",
                        e
                    ))
                })?;

            rows.into_iter()
                .map(|(column_name, timestamp)| {
                    let applied_at = DateTime::parse_from_rfc3339(&timestamp)
                        .map_err(|e| {
                            FeatureStoreError::StoreUnavailable(format!(
                                "Malformed migration timestamp '{}': {}",
                                timestamp, e
                            ))
                        })?
                        .with_timezone(&Utc);
                    Ok(AppliedMigration {
                        column_name,
                        applied_at,
                    })
                })
                .collect()
        })
        .await
        .map_err(|e| FeatureStoreError::StoreUnavailable(format!("Pool interaction failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StaticCatalog;
    use tempfile::TempDir;

    async fn create_test_store() -> (FeatureStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config = StoreConfig::new(temp_dir.path().join("test.db"));
        let store = FeatureStore::open(&config).unwrap();
        store.bootstrap().await.unwrap();
        (store, temp_dir)
    }

    #[tokio::test]
    async fn test_sync_then_lookup_round_trip() {
        let (store, _temp) = create_test_store().await;
        let catalog = StaticCatalog::new(["mfcc", "chroma"]).unwrap();

        let added = store.sync_schema(&catalog).await.unwrap();
        assert_eq!(added, 2);

        let track = TrackId::new("track1.mid");
        store.put_feature_value(&track, "chroma", 0.42).await.unwrap();

        let value = store.get_feature_value(&track, "Chroma").await.unwrap();
        assert_eq!(value, 0.42);
    }

    #[tokio::test]
    async fn test_second_sync_is_a_no_op() {
        let (store, _temp) = create_test_store().await;
        let catalog = StaticCatalog::new(["mfcc", "chroma"]).unwrap();

        assert_eq!(store.sync_schema(&catalog).await.unwrap(), 2);
        assert_eq!(store.sync_schema(&catalog).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_put_rejects_unsynced_feature() {
        let (store, _temp) = create_test_store().await;
        let err = store
            .put_feature_value(&TrackId::new("track1.mid"), "chroma", 0.42)
            .await
            .unwrap_err();
        assert!(matches!(err, FeatureStoreError::NotFound));
    }

    #[tokio::test]
    async fn test_applied_migrations_records_additions() {
        let (store, _temp) = create_test_store().await;
        let catalog = StaticCatalog::new(["zcr", "mfcc"]).unwrap();
        store.sync_schema(&catalog).await.unwrap();

        let log = store.applied_migrations().await.unwrap();
        let columns: Vec<&str> = log.iter().map(|m| m.column_name.as_str()).collect();
        assert_eq!(columns, vec!["mfcc", "zcr"]);
    }
}
