//! Lookups: each filterable field maps to one way of reading the table.

use serde_json::Value;
use tracing::debug;

use crate::book::{Book, BookField, BookFilter};
use crate::error::{CatalogError, Result};
use crate::record::{self, METADATA, PhysicalRecord, RecordKind, SORT_KEY};

use super::Catalog;

impl Catalog {
    /// Books whose `field` matches `value`.
    ///
    /// - `isbn`: point lookup of the primary record.
    /// - `name`, `releaseDate`, `pages`: query of the field's secondary index;
    ///   `pages` must parse as an unsigned integer.
    /// - `authors`, `languages`, `countries`: query of the partition holding
    ///   the denormalized records for `value`, each of which embeds its book.
    pub async fn query_by_filter(&self, field: BookField, value: &str) -> Result<Vec<Book>> {
        debug!(%field, value, "querying books");
        match field {
            BookField::Isbn => Ok(self.find_book(value).await?.into_iter().collect()),
            BookField::Name => {
                let index = &self.config.indexes.name;
                self.query_index(index, field, Value::from(value)).await
            }
            BookField::ReleaseDate => {
                let index = &self.config.indexes.release_date;
                self.query_index(index, field, Value::from(value)).await
            }
            BookField::Pages => {
                let pages: u32 = value.trim().parse().map_err(|_| {
                    CatalogError::InvalidFilter(format!("pages value {value} is not a number"))
                })?;
                let index = &self.config.indexes.pages;
                self.query_index(index, field, Value::from(pages)).await
            }
            BookField::Authors => self.query_denormalized(RecordKind::Author, value).await,
            BookField::Languages => self.query_denormalized(RecordKind::Language, value).await,
            BookField::Countries => self.query_denormalized(RecordKind::Country, value).await,
        }
    }

    /// [`query_by_filter`](Self::query_by_filter) for a [`BookFilter`].
    pub async fn query(&self, filter: &BookFilter) -> Result<Vec<Book>> {
        self.query_by_filter(filter.field, &filter.value).await
    }

    /// The first page of books, at most
    /// [`CatalogConfig::scan_limit`](crate::config::CatalogConfig::scan_limit).
    pub async fn list_all(&self) -> Result<Vec<Book>> {
        let items = self
            .store
            .scan(SORT_KEY, &Value::from(METADATA), self.config.scan_limit)
            .await?;
        items
            .iter()
            .map(|item| record::to_book(item).map_err(CatalogError::from))
            .collect()
    }

    async fn query_index(&self, index: &str, field: BookField, value: Value) -> Result<Vec<Book>> {
        let items = self
            .store
            .query_index(index, field.as_str(), &value)
            .await?;
        items
            .iter()
            .map(|item| record::to_book(item).map_err(CatalogError::from))
            .collect()
    }

    async fn query_denormalized(&self, kind: RecordKind, value: &str) -> Result<Vec<Book>> {
        let items = self
            .store
            .query_by_partition(&kind.entity_id(value))
            .await?;
        items
            .iter()
            .map(|item| {
                PhysicalRecord::from_item(item)
                    .map(PhysicalRecord::into_book)
                    .map_err(CatalogError::from)
            })
            .collect()
    }
}
