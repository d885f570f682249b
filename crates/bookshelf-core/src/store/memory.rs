//! In-process [`StoreClient`] backed by an ordered map.
//!
//! Mirrors the semantics the catalog relies on from the deployed table:
//! atomic multi-item transactions with conditions, a per-transaction item cap,
//! sparse secondary indexes and a limited filtered scan.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

use crate::error::StoreError;
use crate::record::{ENTITY_ID, SORT_KEY};

use super::{Item, RecordKey, StoreClient, StoreResult, WriteOp};

/// Default number of operations accepted by one transaction.
pub const DEFAULT_MAX_TRANSACTION_ITEMS: usize = 25;

struct MemoryInner {
    items: RwLock<BTreeMap<RecordKey, Item>>,
    max_transaction_items: usize,
    /// Transactions that will fail with a backend error before touching data.
    pending_failures: AtomicUsize,
    committed: AtomicUsize,
}

/// The in-memory store handle.
///
/// `MemoryStore` is cheaply clonable (`Arc`-based) and `Send + Sync`; clones
/// share the same data.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<MemoryInner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_max_transaction_items(DEFAULT_MAX_TRANSACTION_ITEMS)
    }

    pub fn with_max_transaction_items(max_transaction_items: usize) -> Self {
        Self {
            inner: Arc::new(MemoryInner {
                items: RwLock::new(BTreeMap::new()),
                max_transaction_items,
                pending_failures: AtomicUsize::new(0),
                committed: AtomicUsize::new(0),
            }),
        }
    }

    /// Make the next `count` transactions fail with [`StoreError::Backend`].
    pub fn fail_next_transactions(&self, count: usize) {
        self.inner.pending_failures.store(count, Ordering::SeqCst);
    }

    /// Number of transactions committed so far.
    pub fn committed_transactions(&self) -> usize {
        self.inner.committed.load(Ordering::SeqCst)
    }

    /// Total number of stored items.
    pub fn len(&self) -> usize {
        self.inner.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.items.read().is_empty()
    }

    /// Every stored key, in key order.
    pub fn keys(&self) -> Vec<RecordKey> {
        self.inner.items.read().keys().cloned().collect()
    }

    fn take_injected_failure(&self) -> bool {
        self.inner
            .pending_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

/// Check that a put carries the key it is filed under.
fn check_item_key(key: &RecordKey, item: &Item) -> StoreResult<()> {
    let entity_id = item.get(ENTITY_ID).and_then(Value::as_str);
    let sort_key = item.get(SORT_KEY).and_then(Value::as_str);
    if entity_id == Some(key.entity_id.as_str()) && sort_key == Some(key.sort_key.as_str()) {
        Ok(())
    } else {
        Err(StoreError::MalformedItem(format!(
            "item key does not match {key}"
        )))
    }
}

#[async_trait]
impl StoreClient for MemoryStore {
    async fn get_by_key(&self, key: &RecordKey) -> StoreResult<Option<Item>> {
        Ok(self.inner.items.read().get(key).cloned())
    }

    async fn query_index(
        &self,
        _index_name: &str,
        key_attribute: &str,
        value: &Value,
    ) -> StoreResult<Vec<Item>> {
        // An index only holds items that carry its key attribute.
        let items = self.inner.items.read();
        Ok(items
            .values()
            .filter(|item| item.get(key_attribute) == Some(value))
            .cloned()
            .collect())
    }

    async fn query_by_partition(&self, entity_id: &str) -> StoreResult<Vec<Item>> {
        let items = self.inner.items.read();
        Ok(items
            .iter()
            .filter(|(key, _)| key.entity_id == entity_id)
            .map(|(_, item)| item.clone())
            .collect())
    }

    async fn scan(
        &self,
        filter_attribute: &str,
        filter_value: &Value,
        limit: usize,
    ) -> StoreResult<Vec<Item>> {
        let items = self.inner.items.read();
        Ok(items
            .values()
            .filter(|item| item.get(filter_attribute) == Some(filter_value))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn transact_write(&self, ops: Vec<WriteOp>) -> StoreResult<()> {
        let max = self.inner.max_transaction_items;
        if ops.len() > max {
            return Err(StoreError::TooManyItems {
                max,
                actual: ops.len(),
            });
        }
        if self.take_injected_failure() {
            return Err(StoreError::backend("injected transaction failure"));
        }

        let mut items = self.inner.items.write();

        // Check every operation before applying any of them.
        {
            let mut seen = HashSet::with_capacity(ops.len());
            for op in &ops {
                let key = op.key();
                if !seen.insert(key) {
                    return Err(StoreError::DuplicateKey { key: key.clone() });
                }
                if let WriteOp::Put {
                    key,
                    item,
                    condition,
                } = op
                {
                    check_item_key(key, item)?;
                    if let Some(condition) = condition
                        && !condition.evaluate(items.get(key))
                    {
                        return Err(StoreError::ConditionFailed { key: key.clone() });
                    }
                }
            }
        }

        for op in ops {
            match op {
                WriteOp::Put { key, item, .. } => {
                    items.insert(key, item);
                }
                WriteOp::Delete { key } => {
                    items.remove(&key);
                }
            }
        }
        self.inner.committed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
