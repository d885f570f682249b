//! Catalog configuration.

use std::path::Path;

use serde::Deserialize;

/// Names of the secondary indexes on scalar book fields.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IndexNames {
    pub name: String,
    pub pages: String,
    pub release_date: String,
}

impl Default for IndexNames {
    fn default() -> Self {
        Self {
            name: "nameIndex".to_string(),
            pages: "numberofPagesIndex".to_string(),
            release_date: "releaseDateIndex".to_string(),
        }
    }
}

/// Tunables of a [`Catalog`](crate::catalog::Catalog).
///
/// Every field is optional when deserializing; missing fields take the
/// defaults of the reference deployment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CatalogConfig {
    /// Upper bound on operations per store transaction.
    pub max_transaction_items: usize,
    /// Maximum number of books returned by a listing.
    pub scan_limit: usize,
    pub indexes: IndexNames,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            max_transaction_items: 25,
            scan_limit: 100,
            indexes: IndexNames::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("maxTransactionItems must be at least 1")]
    ZeroTransactionItems,
}

impl CatalogConfig {
    /// Load a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: CatalogConfig = serde_json::from_str(raw)?;
        if config.max_transaction_items == 0 {
            return Err(ConfigError::ZeroTransactionItems);
        }
        Ok(config)
    }
}
