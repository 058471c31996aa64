//! Track Features - schema-synchronized store for per-track audio features
//!
//! Stores per-track numeric audio/MIDI features in a single wide table
//! whose columns are discovered at runtime from a feature-extraction
//! catalog, and serves point lookups of individual values by track id and
//! feature name.
//!
//! # Architecture
//!
//! The crate is organized into a few layers:
//! - **Types**: validated identifiers (`FeatureName`, `TrackId`) and the
//!   migration plan
//! - **Catalog**: the opaque provider of the feature vocabulary
//! - **Schema**: the inspect → plan → apply sync engine plus the
//!   whitelisted lookup path
//! - **Store**: the pooled connection handle and public facade
//!
//! # Example
//!
//! ```ignore
//! use track_features::{FeatureStore, StaticCatalog, StoreConfig, TrackId};
//!
//! #[tokio::main]
//! async fn main() -> track_features::Result<()> {
//!     let store = FeatureStore::open(&StoreConfig::new("features.db"))?;
//!     store.bootstrap().await?;
//!
//!     // Align the table with the current feature vocabulary.
//!     let catalog = StaticCatalog::new(["Spectral Centroid", "chroma"])?;
//!     let added = store.sync_schema(&catalog).await?;
//!     println!("added {} columns", added);
//!
//!     // Point lookup by track id and (raw) feature name.
//!     let value = store
//!         .get_feature_value(&TrackId::new("track1.mid"), "Chroma")
//!         .await?;
//!     println!("chroma = {}", value);
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod schema;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use catalog::{FeatureCatalog, FileCatalog, StaticCatalog};
pub use config::StoreConfig;
pub use error::{FeatureStoreError, Result};
pub use store::{AppliedMigration, FeatureStore};
pub use types::{FeatureName, MigrationPlan, TrackId};
