//! Boundary to the single-table key-value store.
//!
//! The catalog talks to the store only through [`StoreClient`], so a deployed
//! table and an in-process fake are interchangeable.

#[cfg(feature = "dynamodb")]
pub mod dynamodb;
pub mod memory;

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StoreError;

/// A stored item: a JSON object carrying `entityId` and `sortKey`.
pub type Item = Value;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Composite primary key of an item.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordKey {
    pub entity_id: String,
    pub sort_key: String,
}

impl RecordKey {
    pub fn new(entity_id: impl Into<String>, sort_key: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            sort_key: sort_key.into(),
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.entity_id, self.sort_key)
    }
}

/// Precondition on the item currently stored at a write's key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// Passes when no stored item carries the attribute, i.e. when the key is
    /// unused if the attribute is part of the key.
    AttributeNotExists(String),
}

impl Condition {
    pub fn evaluate(&self, existing: Option<&Item>) -> bool {
        match self {
            Condition::AttributeNotExists(attr) => existing
                .and_then(|item| item.get(attr))
                .is_none_or(Value::is_null),
        }
    }
}

/// One element of a transactional write.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Put {
        key: RecordKey,
        item: Item,
        condition: Option<Condition>,
    },
    Delete {
        key: RecordKey,
    },
}

impl WriteOp {
    pub fn key(&self) -> &RecordKey {
        match self {
            WriteOp::Put { key, .. } | WriteOp::Delete { key } => key,
        }
    }
}

/// Operations the catalog needs from the store.
///
/// `transact_write` is all-or-nothing: either every operation in the list is
/// applied or none is. Implementations reject lists longer than their
/// per-transaction item cap with [`StoreError::TooManyItems`] and report a
/// failed condition with [`StoreError::ConditionFailed`].
#[async_trait]
pub trait StoreClient: Send + Sync {
    /// Point lookup by composite key.
    async fn get_by_key(&self, key: &RecordKey) -> StoreResult<Option<Item>>;

    /// Items of a secondary index whose key attribute equals `value`.
    async fn query_index(
        &self,
        index_name: &str,
        key_attribute: &str,
        value: &Value,
    ) -> StoreResult<Vec<Item>>;

    /// Every item in the partition `entity_id`.
    async fn query_by_partition(&self, entity_id: &str) -> StoreResult<Vec<Item>>;

    /// Items whose `filter_attribute` equals `filter_value`, at most `limit`.
    async fn scan(
        &self,
        filter_attribute: &str,
        filter_value: &Value,
        limit: usize,
    ) -> StoreResult<Vec<Item>>;

    /// Apply `ops` atomically.
    async fn transact_write(&self, ops: Vec<WriteOp>) -> StoreResult<()>;
}
