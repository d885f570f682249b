//! Splitting write operations into bounded transactions and committing them.

use std::collections::HashSet;

use futures::future::join_all;
use tracing::warn;

use crate::error::StoreError;
use crate::store::{RecordKey, StoreClient, WriteOp};

/// Drop every operation whose key already appeared earlier in `ops`.
///
/// Duplicate list values (two identical authors, say) project to the same key,
/// and a store transaction may touch each key only once.
pub(crate) fn dedup_by_key(ops: Vec<WriteOp>) -> Vec<WriteOp> {
    let mut seen = HashSet::with_capacity(ops.len());
    ops.into_iter()
        .filter(|op| seen.insert(op.key().clone()))
        .collect()
}

/// Partition `ops` into consecutive batches of at most `max_items`.
pub(crate) fn into_batches(ops: Vec<WriteOp>, max_items: usize) -> Vec<Vec<WriteOp>> {
    let max_items = max_items.max(1);
    let mut batches = Vec::with_capacity(ops.len().div_ceil(max_items));
    let mut ops = ops.into_iter().peekable();
    while ops.peek().is_some() {
        batches.push(ops.by_ref().take(max_items).collect());
    }
    batches
}

/// What a [`commit`] achieved.
pub(crate) struct Commit {
    /// Keys written or deleted by the batches that committed.
    pub committed: Vec<RecordKey>,
    /// The failure to report, if any batch failed.
    pub error: Option<StoreError>,
}

impl Commit {
    pub fn into_result(self) -> Result<(), StoreError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Issue one transaction per batch, all at once, and wait for every one.
///
/// Batches that committed stay committed when another batch fails. A failed
/// condition is reported in preference to any other failure.
pub(crate) async fn commit(store: &dyn StoreClient, batches: Vec<Vec<WriteOp>>) -> Commit {
    let total = batches.len();
    let keys: Vec<Vec<RecordKey>> = batches
        .iter()
        .map(|batch| batch.iter().map(|op| op.key().clone()).collect())
        .collect();
    let results = join_all(batches.into_iter().map(|batch| store.transact_write(batch))).await;

    let mut committed = Vec::new();
    let mut first_error = None;
    for (index, (result, batch_keys)) in results.into_iter().zip(keys).enumerate() {
        let err = match result {
            Ok(()) => {
                committed.extend(batch_keys);
                continue;
            }
            Err(err) => err,
        };
        warn!(batch = index, batches = total, error = %err, "transaction batch failed");
        let replace = match &first_error {
            None => true,
            Some(StoreError::ConditionFailed { .. }) => false,
            Some(_) => matches!(err, StoreError::ConditionFailed { .. }),
        };
        if replace {
            first_error = Some(err);
        }
    }

    Commit {
        committed,
        error: first_error,
    }
}
