//! Integration tests for the catalog over the in-memory store.

use std::sync::Arc;

use serde_json::json;

use bookshelf_core::book::{Book, BookField, BookFilter, BookMutation};
use bookshelf_core::catalog::{Catalog, WriteMode};
use bookshelf_core::config::CatalogConfig;
use bookshelf_core::error::{CatalogError, StoreError};
use bookshelf_core::store::{RecordKey, StoreClient, WriteOp};
use bookshelf_core::store::memory::MemoryStore;

fn setup() -> (MemoryStore, Catalog) {
    setup_with(CatalogConfig::default())
}

fn setup_with(config: CatalogConfig) -> (MemoryStore, Catalog) {
    let store = MemoryStore::new();
    let catalog = Catalog::new(Arc::new(store.clone()), config);
    (store, catalog)
}

fn test_book() -> Book {
    Book {
        isbn: "3-932949-11-0".to_string(),
        name: "test mut".to_string(),
        pages: 1,
        release_date: "1000-12-02".to_string(),
        authors: vec!["Me;<)".to_string()],
        languages: vec!["Dutch".to_string(), "English".to_string()],
        countries: vec!["Netherlands".to_string()],
    }
}

/// A valid ISBN-13 for a sequence number.
fn isbn13(seq: u32) -> String {
    let body = format!("978{seq:09}");
    let sum: u32 = body
        .bytes()
        .enumerate()
        .map(|(i, b)| u32::from(b - b'0') * if i % 2 == 0 { 1 } else { 3 })
        .sum();
    format!("{body}{}", (10 - sum % 10) % 10)
}

fn record_count(book: &Book) -> usize {
    1 + book.authors.len() + book.languages.len() + book.countries.len()
}

#[tokio::test]
async fn test_create_then_query_by_isbn() {
    let (_store, catalog) = setup();
    let book = test_book();

    catalog.create(&book).await.unwrap();

    let found = catalog
        .query_by_filter(BookField::Isbn, &book.isbn)
        .await
        .unwrap();
    assert_eq!(found, vec![book.clone()]);
    assert_eq!(catalog.get_book(&book.isbn).await.unwrap(), book);
}

#[tokio::test]
async fn test_create_writes_every_record() {
    let (store, catalog) = setup();
    let book = test_book();

    catalog.create(&book).await.unwrap();

    assert_eq!(store.len(), record_count(&book));
    assert_eq!(store.committed_transactions(), 1);
    let keys = store.keys();
    assert!(keys.contains(&RecordKey::new("ISBN#3-932949-11-0", "METADATA")));
    assert!(keys.contains(&RecordKey::new("AUTHOR#Me;<)", "ISBN#3-932949-11-0")));
    assert!(keys.contains(&RecordKey::new("LANGUAGE#English", "ISBN#3-932949-11-0")));
    assert!(keys.contains(&RecordKey::new("COUNTRY#Netherlands", "ISBN#3-932949-11-0")));
}

#[tokio::test]
async fn test_create_twice_conflicts() {
    let (store, catalog) = setup();
    let book = test_book();

    catalog.create(&book).await.unwrap();
    let err = catalog
        .create(&Book {
            name: "another name".to_string(),
            ..test_book()
        })
        .await
        .unwrap_err();

    assert!(err.is_conflict(), "expected conflict, got {err:?}");
    assert_eq!(
        err.messages(),
        vec!["Book with isbn 3-932949-11-0 already exists"]
    );
    // The first version is untouched.
    assert_eq!(catalog.get_book(&book.isbn).await.unwrap().name, "test mut");
    assert_eq!(store.len(), record_count(&book));
}

#[tokio::test]
async fn test_concurrent_creates_exactly_one_wins() {
    let (store, catalog) = setup();
    let first = test_book();
    let second = Book {
        authors: vec!["Someone Else".to_string()],
        ..test_book()
    };

    let (a, b) = tokio::join!(catalog.create(&first), catalog.create(&second));

    assert_eq!(
        [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(),
        1
    );
    let loser = a.err().or(b.err()).unwrap();
    assert!(loser.is_conflict());
    assert_eq!(store.committed_transactions(), 1);
}

#[tokio::test]
async fn test_invalid_book_performs_no_io() {
    let (store, catalog) = setup();
    let book = Book {
        languages: vec![],
        pages: 0,
        release_date: String::new(),
        ..test_book()
    };

    let err = catalog.create(&book).await.unwrap_err();

    let CatalogError::Validation(errors) = &err else {
        panic!("expected validation error, got {err:?}");
    };
    assert_eq!(errors.len(), 3);
    assert_eq!(err.messages().len(), 3);
    assert!(store.is_empty());
    assert_eq!(store.committed_transactions(), 0);
}

#[tokio::test]
async fn test_invalid_isbn_rejected() {
    let (store, catalog) = setup();
    let book = Book {
        isbn: "123-123-1234-23456ASDF".to_string(),
        ..test_book()
    };

    let err = catalog.create(&book).await.unwrap_err();
    assert_eq!(
        err.messages(),
        vec!["isbn value 123-123-1234-23456ASDF is invalid"]
    );
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_query_by_author_with_punctuation() {
    let (_store, catalog) = setup();
    let book = test_book();
    let other = Book {
        isbn: isbn13(1),
        authors: vec!["Me".to_string()],
        ..test_book()
    };
    catalog.create(&book).await.unwrap();
    catalog.create(&other).await.unwrap();

    let found = catalog
        .query_by_filter(BookField::Authors, "Me;<)")
        .await
        .unwrap();
    assert_eq!(found, vec![book]);

    let found = catalog
        .query(&BookFilter::new(BookField::Authors, "Me"))
        .await
        .unwrap();
    assert_eq!(found, vec![other]);
}

#[tokio::test]
async fn test_query_by_language_and_country() {
    let (_store, catalog) = setup();
    let dutch = test_book();
    let german = Book {
        isbn: isbn13(2),
        languages: vec!["German".to_string()],
        countries: vec!["Germany".to_string(), "Netherlands".to_string()],
        ..test_book()
    };
    catalog.create(&dutch).await.unwrap();
    catalog.create(&german).await.unwrap();

    let by_language = catalog
        .query_by_filter(BookField::Languages, "German")
        .await
        .unwrap();
    assert_eq!(by_language, vec![german.clone()]);

    let mut by_country = catalog
        .query_by_filter(BookField::Countries, "Netherlands")
        .await
        .unwrap();
    by_country.sort_by(|a, b| a.isbn.cmp(&b.isbn));
    let mut expected = vec![dutch, german];
    expected.sort_by(|a, b| a.isbn.cmp(&b.isbn));
    assert_eq!(by_country, expected);

    let none = catalog
        .query_by_filter(BookField::Countries, "Belgium")
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn test_query_by_indexed_fields() {
    let (_store, catalog) = setup();
    let book = Book {
        pages: 320,
        ..test_book()
    };
    let other = Book {
        isbn: isbn13(3),
        name: "other".to_string(),
        pages: 12,
        release_date: "2021-04-01".to_string(),
        ..test_book()
    };
    catalog.create(&book).await.unwrap();
    catalog.create(&other).await.unwrap();

    let by_name = catalog
        .query_by_filter(BookField::Name, "test mut")
        .await
        .unwrap();
    assert_eq!(by_name, vec![book.clone()]);

    let by_pages = catalog
        .query_by_filter(BookField::Pages, "320")
        .await
        .unwrap();
    assert_eq!(by_pages, vec![book.clone()]);

    let by_date = catalog
        .query_by_filter(BookField::ReleaseDate, "2021-04-01")
        .await
        .unwrap();
    assert_eq!(by_date, vec![other]);
}

#[tokio::test]
async fn test_query_by_unparsable_pages() {
    let (_store, catalog) = setup();
    let err = catalog
        .query_by_filter(BookField::Pages, "many")
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::InvalidFilter(_)));
}

#[tokio::test]
async fn test_query_by_missing_isbn_is_empty() {
    let (_store, catalog) = setup();
    let found = catalog
        .query_by_filter(BookField::Isbn, "3-932949-11-0")
        .await
        .unwrap();
    assert!(found.is_empty());

    let err = catalog.get_book("3-932949-11-0").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_list_all_returns_primary_records_up_to_limit() {
    let (_store, catalog) = setup_with(CatalogConfig {
        scan_limit: 3,
        ..CatalogConfig::default()
    });
    for seq in 0..5 {
        catalog
            .create(&Book {
                isbn: isbn13(seq),
                ..test_book()
            })
            .await
            .unwrap();
    }

    let books = catalog.list_all().await.unwrap();
    assert_eq!(books.len(), 3);
    assert!(books.iter().all(|b| b.name == "test mut"));
}

#[tokio::test]
async fn test_list_all_skips_secondary_records() {
    let (store, catalog) = setup();
    catalog.create(&test_book()).await.unwrap();

    assert!(store.len() > 1);
    assert_eq!(catalog.list_all().await.unwrap(), vec![test_book()]);
}

#[tokio::test]
async fn test_delete_removes_every_record() {
    let (store, catalog) = setup();
    let book = test_book();
    let other = Book {
        isbn: isbn13(4),
        ..test_book()
    };
    catalog.create(&book).await.unwrap();
    catalog.create(&other).await.unwrap();

    catalog.delete(&book.isbn).await.unwrap();

    assert_eq!(store.len(), record_count(&other));
    assert!(
        catalog
            .query_by_filter(BookField::Isbn, &book.isbn)
            .await
            .unwrap()
            .is_empty()
    );
    let by_author = catalog
        .query_by_filter(BookField::Authors, "Me;<)")
        .await
        .unwrap();
    assert_eq!(by_author, vec![other]);
}

#[tokio::test]
async fn test_delete_missing_is_not_found() {
    let (store, catalog) = setup();

    let err = catalog.delete("3-932949-11-0").await.unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(
        err.messages(),
        vec!["Book with isbn 3-932949-11-0 not found"]
    );
    assert_eq!(store.committed_transactions(), 0);
}

#[tokio::test]
async fn test_create_after_delete_succeeds() {
    let (_store, catalog) = setup();
    let book = test_book();
    catalog.create(&book).await.unwrap();
    catalog.delete(&book.isbn).await.unwrap();

    catalog.create(&book).await.unwrap();
    assert_eq!(catalog.get_book(&book.isbn).await.unwrap(), book);
}

#[tokio::test]
async fn test_update_replaces_records_and_drops_stale_ones() {
    let (store, catalog) = setup();
    let book = test_book();
    catalog.create(&book).await.unwrap();

    let updated = catalog
        .update(
            &book.isbn,
            BookMutation {
                name: "second edition".to_string(),
                pages: 2,
                release_date: "2001-01-01".to_string(),
                authors: vec!["New Author".to_string()],
                languages: vec!["Dutch".to_string()],
                countries: vec!["Belgium".to_string()],
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.isbn, book.isbn);
    assert_eq!(catalog.get_book(&book.isbn).await.unwrap(), updated);
    assert_eq!(store.len(), record_count(&updated));

    for (field, value) in [
        (BookField::Authors, "Me;<)"),
        (BookField::Languages, "English"),
        (BookField::Countries, "Netherlands"),
    ] {
        assert!(
            catalog
                .query_by_filter(field, value)
                .await
                .unwrap()
                .is_empty(),
            "{field} {value} should have been removed"
        );
    }
    let dutch = catalog
        .query_by_filter(BookField::Languages, "Dutch")
        .await
        .unwrap();
    assert_eq!(dutch, vec![updated]);
}

#[tokio::test]
async fn test_update_of_missing_book_writes_it() {
    let (store, catalog) = setup();
    let book = test_book();

    catalog.save(&book, WriteMode::Update).await.unwrap();

    assert_eq!(store.len(), record_count(&book));
    assert_eq!(catalog.get_book(&book.isbn).await.unwrap(), book);
}

#[tokio::test]
async fn test_update_validates_mutation() {
    let (store, catalog) = setup();
    let mutation = BookMutation {
        countries: vec!["foo".to_string()],
        ..BookMutation::from(test_book())
    };

    let err = catalog.update("3-932949-11-0", mutation).await.unwrap_err();
    assert_eq!(
        err.messages(),
        vec!["Country name foo is invalid, please provide a english ISO 3166-1 country name"]
    );
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_large_book_spans_several_transactions() {
    let (store, catalog) = setup();
    let book = Book {
        authors: (0..30).map(|i| format!("Author {i}")).collect(),
        ..test_book()
    };
    let records = record_count(&book);
    assert!(records > 25);

    catalog.create(&book).await.unwrap();
    assert_eq!(store.len(), records);
    assert_eq!(store.committed_transactions(), 2);

    catalog.delete(&book.isbn).await.unwrap();
    assert!(store.is_empty());
    assert_eq!(store.committed_transactions(), 4);
}

#[tokio::test]
async fn test_store_failure_is_propagated() {
    let (store, catalog) = setup();
    store.fail_next_transactions(1);

    let err = catalog.create(&test_book()).await.unwrap_err();

    assert!(matches!(err, CatalogError::Store(StoreError::Backend(_))));
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_failed_batch_leaves_other_batches_committed() {
    let (store, catalog) = setup();
    let mutation = BookMutation {
        authors: (0..30).map(|i| format!("Author {i}")).collect(),
        ..BookMutation::from(test_book())
    };
    store.fail_next_transactions(1);

    let err = catalog.update(&isbn13(7), mutation).await.unwrap_err();

    assert!(matches!(err, CatalogError::Store(_)));
    // No cross-batch rollback: one batch committed, the other did not.
    assert_eq!(store.committed_transactions(), 1);
    assert!(!store.is_empty());
    assert!(store.len() < 1 + 30 + 2 + 1);
}

#[tokio::test]
async fn test_create_failure_in_primary_batch_writes_nothing() {
    let (store, catalog) = setup();
    let book = Book {
        authors: (0..30).map(|i| format!("Author {i}")).collect(),
        ..test_book()
    };
    store.fail_next_transactions(1);

    let err = catalog.create(&book).await.unwrap_err();

    assert!(matches!(err, CatalogError::Store(StoreError::Backend(_))));
    assert_eq!(store.committed_transactions(), 0);
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_conflicting_large_create_leaves_no_records() {
    let (store, catalog) = setup();
    let book = test_book();
    catalog.create(&book).await.unwrap();
    let stored = store.len();

    let rival = Book {
        name: "rival".to_string(),
        authors: (0..30).map(|i| format!("Rival {i}")).collect(),
        languages: vec!["German".to_string()],
        countries: vec!["Belgium".to_string()],
        ..book.clone()
    };
    assert!(record_count(&rival) > 25);

    let err = catalog.create(&rival).await.unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(store.len(), stored);
    assert_eq!(catalog.get_book(&book.isbn).await.unwrap(), book);
    for (field, value) in [
        (BookField::Authors, "Rival 29"),
        (BookField::Languages, "German"),
        (BookField::Countries, "Belgium"),
    ] {
        assert!(catalog.query_by_filter(field, value).await.unwrap().is_empty());
    }

    catalog.delete(&book.isbn).await.unwrap();
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_conflict_in_later_batch_rolls_back_create() {
    let (store, catalog) = setup();
    let book = Book {
        authors: (0..30).map(|i| format!("Author {i}")).collect(),
        countries: vec!["Belgium".to_string()],
        ..test_book()
    };
    // A stray country record for this isbn, left behind by an earlier write.
    let stray = RecordKey::new("COUNTRY#Belgium", format!("ISBN#{}", book.isbn));
    store
        .transact_write(vec![WriteOp::Put {
            item: json!({"entityId": stray.entity_id, "sortKey": stray.sort_key}),
            key: stray.clone(),
            condition: None,
        }])
        .await
        .unwrap();

    let err = catalog.create(&book).await.unwrap_err();

    assert!(err.is_conflict());
    assert_eq!(store.keys(), vec![stray]);
    assert!(catalog.get_book(&book.isbn).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_update_checks_only_mutation_fields() {
    let (store, catalog) = setup();
    let mutation = BookMutation::from(test_book());

    let book = catalog.update("legacy-0001", mutation).await.unwrap();

    assert_eq!(book.isbn, "legacy-0001");
    assert_eq!(store.len(), record_count(&book));
}

#[tokio::test]
async fn test_duplicate_list_values_are_written_once() {
    let (store, catalog) = setup();
    let book = Book {
        authors: vec!["Twin".to_string(), "Twin".to_string()],
        ..test_book()
    };

    catalog.create(&book).await.unwrap();
    assert_eq!(store.len(), record_count(&book) - 1);

    catalog.delete(&book.isbn).await.unwrap();
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_smaller_transaction_cap_from_config() {
    let (store, catalog) = setup_with(CatalogConfig {
        max_transaction_items: 2,
        ..CatalogConfig::default()
    });
    let book = test_book();

    catalog.create(&book).await.unwrap();

    assert_eq!(store.len(), record_count(&book));
    assert_eq!(
        store.committed_transactions(),
        record_count(&book).div_ceil(2)
    );
}
