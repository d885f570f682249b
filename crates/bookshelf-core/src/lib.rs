//! # Bookshelf
//!
//! Storage-access layer for a book catalog kept in a single-table,
//! DynamoDB-style key-value store.
//!
//! One logical [`Book`](book::Book) is stored as one primary record keyed by
//! isbn plus one denormalized record per author, language and country, so the
//! catalog can be queried by any of those values without a join. The
//! [`Catalog`](catalog::Catalog) validates, projects, batches and writes those
//! records through a [`StoreClient`](store::StoreClient) handle.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use bookshelf_core::book::{Book, BookField};
//! use bookshelf_core::catalog::Catalog;
//! use bookshelf_core::config::CatalogConfig;
//! use bookshelf_core::store::memory::MemoryStore;
//!
//! # async fn run() -> Result<(), bookshelf_core::error::CatalogError> {
//! let catalog = Catalog::new(Arc::new(MemoryStore::new()), CatalogConfig::default());
//!
//! catalog
//!     .create(&Book {
//!         isbn: "3-932949-11-0".to_string(),
//!         name: "Rust in Practice".to_string(),
//!         pages: 320,
//!         release_date: "2021-04-01".to_string(),
//!         authors: vec!["Ada".to_string()],
//!         languages: vec!["English".to_string()],
//!         countries: vec!["Netherlands".to_string()],
//!     })
//!     .await?;
//!
//! let by_author = catalog.query_by_filter(BookField::Authors, "Ada").await?;
//! assert_eq!(by_author.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod book;
pub mod catalog;
pub mod config;
pub mod error;
pub mod record;
pub mod store;
pub mod validation;
