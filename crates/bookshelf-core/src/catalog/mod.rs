//! The catalog: validated, batched writes of a book's records and lookups by
//! any book field.
//!
//! Writes fan out one store transaction per batch of at most
//! [`CatalogConfig::max_transaction_items`] operations. Each transaction is
//! atomic; a save or delete that spans several batches is not. If one batch
//! fails after another has committed, the stored records of that book are left
//! out of step with each other and the call reports the failure.
//!
//! Creates are the exception for conflicts: the batch holding the primary
//! record commits first, and a conflict in any later batch deletes what the
//! create already wrote.

mod batch;
mod router;

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::book::{Book, BookMutation};
use crate::config::CatalogConfig;
use crate::error::{CatalogError, Result, StoreError};
use crate::record::{self, ENTITY_ID, PhysicalRecord};
use crate::store::{Condition, RecordKey, StoreClient, WriteOp};
use crate::validation::Validate;

/// Whether a save may replace an existing book.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Every record is written only if its key is unused.
    Create,
    /// Records are overwritten unconditionally.
    Update,
}

/// Handle to a book catalog stored through a [`StoreClient`].
///
/// `Catalog` is cheaply clonable and holds no state besides the store handle
/// and its configuration.
#[derive(Clone)]
pub struct Catalog {
    store: Arc<dyn StoreClient>,
    config: CatalogConfig,
}

impl Catalog {
    pub fn new(store: Arc<dyn StoreClient>, config: CatalogConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// Validate `book` and write all of its records.
    ///
    /// In [`WriteMode::Create`] an existing record at any of the book's keys
    /// fails the call with [`CatalogError::Conflict`]. In
    /// [`WriteMode::Update`] the records are overwritten and the author,
    /// language and country records of the previous version that the new
    /// version no longer has are deleted.
    pub async fn save(&self, book: &Book, mode: WriteMode) -> Result<()> {
        book.validate()?;
        self.write(book, mode).await
    }

    /// Shorthand for [`save`](Self::save) in [`WriteMode::Create`].
    pub async fn create(&self, book: &Book) -> Result<()> {
        self.save(book, WriteMode::Create).await
    }

    /// Replace the book stored under `isbn` with `mutation`.
    ///
    /// The isbn always comes from the argument, never from the mutation, and
    /// only the mutation's own fields are validated.
    pub async fn update(&self, isbn: &str, mutation: BookMutation) -> Result<Book> {
        mutation.validate()?;
        let book = mutation.into_book(isbn);
        self.write(&book, WriteMode::Update).await?;
        Ok(book)
    }

    /// Project, batch and commit an already validated book.
    async fn write(&self, book: &Book, mode: WriteMode) -> Result<()> {
        let guard = match mode {
            WriteMode::Create => Some(Condition::AttributeNotExists(ENTITY_ID.to_string())),
            WriteMode::Update => None,
        };
        let puts: Vec<WriteOp> = record::to_records(book)
            .into_iter()
            .map(|record| WriteOp::Put {
                key: record.key(),
                item: record.to_item(),
                condition: guard.clone(),
            })
            .collect();
        let mut ops = batch::dedup_by_key(puts);

        if mode == WriteMode::Update {
            ops.extend(self.stale_record_deletes(book, &ops).await?);
        }

        let mut batches = batch::into_batches(ops, self.config.max_transaction_items);
        debug!(isbn = %book.isbn, ?mode, batches = batches.len(), "saving book");

        let result = match mode {
            WriteMode::Create => {
                let rest = batches.split_off(batches.len().min(1));
                self.commit_create(batches, rest).await
            }
            WriteMode::Update => batch::commit(self.store.as_ref(), batches)
                .await
                .into_result(),
        };

        match result {
            Ok(()) => {
                info!(isbn = %book.isbn, ?mode, "book saved");
                Ok(())
            }
            Err(StoreError::ConditionFailed { key }) => {
                warn!(isbn = %book.isbn, %key, "book already exists");
                Err(CatalogError::Conflict {
                    isbn: book.isbn.clone(),
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Commit the batch holding the primary record, then the rest.
    ///
    /// A create that loses the existence guard on the primary record writes
    /// nothing. If a later batch loses it on a secondary key, every key this
    /// call wrote is deleted again: those keys were free when written, so
    /// they belong to this create alone.
    async fn commit_create(
        &self,
        head: Vec<Vec<WriteOp>>,
        rest: Vec<Vec<WriteOp>>,
    ) -> std::result::Result<(), StoreError> {
        let head = batch::commit(self.store.as_ref(), head).await;
        if head.error.is_some() || rest.is_empty() {
            return head.into_result();
        }

        let mut tail = batch::commit(self.store.as_ref(), rest).await;
        if matches!(tail.error, Some(StoreError::ConditionFailed { .. })) {
            let mut written = head.committed;
            written.append(&mut tail.committed);
            warn!(records = written.len(), "rolling back partially created book");
            let deletes = written
                .into_iter()
                .map(|key| WriteOp::Delete { key })
                .collect();
            let batches = batch::into_batches(deletes, self.config.max_transaction_items);
            batch::commit(self.store.as_ref(), batches)
                .await
                .into_result()?;
        }
        tail.into_result()
    }

    /// Delete every record of the book stored under `isbn`.
    ///
    /// The records to delete are derived from the currently stored book, so
    /// the denormalized copies matching its authors, languages and countries
    /// are all targeted.
    pub async fn delete(&self, isbn: &str) -> Result<()> {
        let current = self.get_book(isbn).await?;

        let deletes: Vec<WriteOp> = record::to_records(&current)
            .iter()
            .map(|record| WriteOp::Delete { key: record.key() })
            .collect();
        let batches = batch::into_batches(
            batch::dedup_by_key(deletes),
            self.config.max_transaction_items,
        );
        debug!(isbn, batches = batches.len(), "deleting book");

        batch::commit(self.store.as_ref(), batches)
            .await
            .into_result()?;
        info!(isbn, "book deleted");
        Ok(())
    }

    /// The book stored under `isbn`.
    pub async fn get_book(&self, isbn: &str) -> Result<Book> {
        self.find_book(isbn)
            .await?
            .ok_or_else(|| CatalogError::NotFound {
                isbn: isbn.to_string(),
            })
    }

    async fn find_book(&self, isbn: &str) -> Result<Option<Book>> {
        let item = self.store.get_by_key(&record::primary_key(isbn)).await?;
        Ok(item.as_ref().map(record::to_book).transpose()?)
    }

    /// Deletes for the secondary records of the stored version of `book` whose
    /// keys are not written by `puts`.
    async fn stale_record_deletes(&self, book: &Book, puts: &[WriteOp]) -> Result<Vec<WriteOp>> {
        let Some(previous) = self.find_book(&book.isbn).await? else {
            return Ok(Vec::new());
        };
        let written: HashSet<&RecordKey> = puts.iter().map(WriteOp::key).collect();
        let stale: Vec<WriteOp> = record::to_records(&previous)
            .iter()
            .map(PhysicalRecord::key)
            .filter(|key| !written.contains(key))
            .map(|key| WriteOp::Delete { key })
            .collect();
        let stale = batch::dedup_by_key(stale);
        if !stale.is_empty() {
            debug!(isbn = %book.isbn, stale = stale.len(), "removing stale records");
        }
        Ok(stale)
    }
}
