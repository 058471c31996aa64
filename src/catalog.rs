//! Feature catalog providers
//!
//! The catalog is the authoritative, externally supplied set of currently
//! known feature names. This crate treats the producer as opaque: anything
//! that can enumerate normalized names can drive a schema sync. The catalog
//! may grow over time; it never shrinks within a single sync.

use crate::error::Result;
use crate::types::FeatureName;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::debug;

/// Source of the authoritative feature vocabulary
#[async_trait]
pub trait FeatureCatalog: Send + Sync {
    /// Current set of known feature names, normalized.
    async fn feature_names(&self) -> Result<BTreeSet<FeatureName>>;
}

/// Fixed in-memory catalog
///
/// The form used by tests and by embedders that already hold the
/// vocabulary, e.g. compiled into the extraction pipeline.
pub struct StaticCatalog {
    names: BTreeSet<FeatureName>,
}

impl StaticCatalog {
    /// Build a catalog from raw names, normalizing and deduplicating.
    ///
    /// Fails with `InvalidFeatureName` if any entry cannot be normalized
    /// into the allowed charset.
    pub fn new<I, S>(raw: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names = raw
            .into_iter()
            .map(|s| FeatureName::parse(s.as_ref()))
            .collect::<Result<BTreeSet<_>>>()?;
        Ok(Self { names })
    }
}

#[async_trait]
impl FeatureCatalog for StaticCatalog {
    async fn feature_names(&self) -> Result<BTreeSet<FeatureName>> {
        Ok(self.names.clone())
    }
}

/// Catalog backed by a JSON file holding an array of raw feature names
///
/// Covers deployments where the extraction pipeline writes its vocabulary
/// next to the data it produces. The file is re-read on every call so a
/// grown vocabulary is picked up by the next sync without a restart.
pub struct FileCatalog {
    path: PathBuf,
}

impl FileCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl FeatureCatalog for FileCatalog {
    async fn feature_names(&self) -> Result<BTreeSet<FeatureName>> {
        let text = std::fs::read_to_string(&self.path)?;
        let raw: Vec<String> = serde_json::from_str(&text)?;
        debug!(path = %self.path.display(), entries = raw.len(), "Loaded catalog file");

        raw.iter()
            .map(|s| FeatureName::parse(s))
            .collect::<Result<BTreeSet<_>>>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_static_catalog_normalizes_and_deduplicates() {
        let catalog = StaticCatalog::new(["Chroma", "chroma", "Spectral Centroid"]).unwrap();
        let names = catalog.feature_names().await.unwrap();

        let listed: Vec<&str> = names.iter().map(|n| n.as_str()).collect();
        assert_eq!(listed, vec!["chroma", "spectral_centroid"]);
    }

    #[tokio::test]
    async fn test_static_catalog_rejects_malformed_entry() {
        assert!(StaticCatalog::new(["chroma", "bad name!"]).is_err());
    }

    #[tokio::test]
    async fn test_file_catalog_reads_json_array() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"["MFCC", "Zero-Crossing Rate", "mfcc"]"#).unwrap();

        let catalog = FileCatalog::new(file.path());
        let names = catalog.feature_names().await.unwrap();

        let listed: Vec<&str> = names.iter().map(|n| n.as_str()).collect();
        assert_eq!(listed, vec!["mfcc", "zero_crossing_rate"]);
    }

    #[tokio::test]
    async fn test_file_catalog_missing_file() {
        let catalog = FileCatalog::new("/nonexistent/catalog.json");
        assert!(catalog.feature_names().await.is_err());
    }
}
