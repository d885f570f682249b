//! Projection of a book onto its physical records, and back.
//!
//! A book is stored as one primary record plus one denormalized record per
//! author, language and country:
//!
//! | kind     | `entityId`         | `sortKey`       | payload                   |
//! |----------|--------------------|-----------------|---------------------------|
//! | primary  | `ISBN#<isbn>`      | `METADATA`      | book fields, flattened    |
//! | author   | `AUTHOR#<author>`  | `ISBN#<isbn>`   | whole book in `bookData`  |
//! | language | `LANGUAGE#<lang>`  | `ISBN#<isbn>`   | whole book in `bookData`  |
//! | country  | `COUNTRY#<country>`| `ISBN#<isbn>`   | whole book in `bookData`  |

use serde::Deserialize;
use serde_json::{Value, json};

use crate::book::Book;
use crate::error::RecordError;
use crate::store::{Item, RecordKey};

/// Partition key attribute name.
pub const ENTITY_ID: &str = "entityId";
/// Sort key attribute name.
pub const SORT_KEY: &str = "sortKey";
/// Sort key of every primary record.
pub const METADATA: &str = "METADATA";
/// Attribute holding the embedded book on secondary records.
pub const BOOK_DATA: &str = "bookData";

const ISBN_PREFIX: &str = "ISBN#";

/// Discriminant of a [`PhysicalRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Primary,
    Author,
    Language,
    Country,
}

impl RecordKind {
    /// Prefix of the `entityId` of records of this kind.
    pub fn prefix(self) -> &'static str {
        match self {
            RecordKind::Primary => ISBN_PREFIX,
            RecordKind::Author => "AUTHOR#",
            RecordKind::Language => "LANGUAGE#",
            RecordKind::Country => "COUNTRY#",
        }
    }

    /// Split an `entityId` into its kind and the value after the prefix.
    pub fn parse_entity_id(entity_id: &str) -> Option<(RecordKind, &str)> {
        [
            RecordKind::Primary,
            RecordKind::Author,
            RecordKind::Language,
            RecordKind::Country,
        ]
        .into_iter()
        .find_map(|kind| {
            entity_id
                .strip_prefix(kind.prefix())
                .map(|value| (kind, value))
        })
    }

    /// The `entityId` of the record of this kind for `value`.
    pub fn entity_id(self, value: &str) -> String {
        format!("{}{value}", self.prefix())
    }
}

/// Composite key of the primary record of `isbn`.
pub fn primary_key(isbn: &str) -> RecordKey {
    RecordKey::new(RecordKind::Primary.entity_id(isbn), METADATA)
}

/// One stored record derived from a book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhysicalRecord {
    pub kind: RecordKind,
    pub entity_id: String,
    pub sort_key: String,
    pub payload: Book,
}

impl PhysicalRecord {
    pub fn primary(book: &Book) -> Self {
        Self {
            kind: RecordKind::Primary,
            entity_id: RecordKind::Primary.entity_id(&book.isbn),
            sort_key: METADATA.to_string(),
            payload: book.clone(),
        }
    }

    /// A denormalized copy of `book` keyed by one author, language or country.
    pub fn secondary(kind: RecordKind, value: &str, book: &Book) -> Self {
        debug_assert_ne!(kind, RecordKind::Primary);
        Self {
            kind,
            entity_id: kind.entity_id(value),
            sort_key: RecordKind::Primary.entity_id(&book.isbn),
            payload: book.clone(),
        }
    }

    pub fn key(&self) -> RecordKey {
        RecordKey::new(self.entity_id.clone(), self.sort_key.clone())
    }

    /// Render the record as a store item.
    pub fn to_item(&self) -> Item {
        match self.kind {
            RecordKind::Primary => json!({
                ENTITY_ID: self.entity_id,
                SORT_KEY: self.sort_key,
                "name": self.payload.name,
                "pages": self.payload.pages,
                "releaseDate": self.payload.release_date,
                "authors": self.payload.authors,
                "languages": self.payload.languages,
                "countries": self.payload.countries,
            }),
            _ => json!({
                ENTITY_ID: self.entity_id,
                SORT_KEY: self.sort_key,
                BOOK_DATA: self.payload,
            }),
        }
    }

    /// Parse a store item of any kind.
    pub fn from_item(item: &Item) -> Result<Self, RecordError> {
        let entity_id = string_attribute(item, ENTITY_ID)?;
        let sort_key = string_attribute(item, SORT_KEY)?;
        let (kind, value) = RecordKind::parse_entity_id(entity_id)
            .ok_or_else(|| RecordError::UnknownEntity(entity_id.to_string()))?;

        let unexpected_sort_key = || RecordError::UnexpectedSortKey {
            entity_id: entity_id.to_string(),
            sort_key: sort_key.to_string(),
        };

        let payload = match kind {
            RecordKind::Primary => {
                if sort_key != METADATA {
                    return Err(unexpected_sort_key());
                }
                PrimaryFields::deserialize(item)?.into_book(value)
            }
            _ => {
                let isbn = sort_key
                    .strip_prefix(ISBN_PREFIX)
                    .ok_or_else(unexpected_sort_key)?;
                let data = item
                    .get(BOOK_DATA)
                    .ok_or(RecordError::MissingAttribute(BOOK_DATA))?;
                let book = Book::deserialize(data)?;
                if book.isbn != isbn {
                    return Err(unexpected_sort_key());
                }
                book
            }
        };

        Ok(Self {
            kind,
            entity_id: entity_id.to_string(),
            sort_key: sort_key.to_string(),
            payload,
        })
    }

    pub fn into_book(self) -> Book {
        self.payload
    }
}

/// Book attributes stored flat on a primary record.
///
/// The list attributes default to empty so items read through an index that
/// projects only some attributes still decode.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PrimaryFields {
    name: String,
    pages: u32,
    release_date: String,
    #[serde(default)]
    authors: Vec<String>,
    #[serde(default)]
    languages: Vec<String>,
    #[serde(default)]
    countries: Vec<String>,
}

impl PrimaryFields {
    fn into_book(self, isbn: &str) -> Book {
        Book {
            isbn: isbn.to_string(),
            name: self.name,
            pages: self.pages,
            release_date: self.release_date,
            authors: self.authors,
            languages: self.languages,
            countries: self.countries,
        }
    }
}

fn string_attribute<'a>(item: &'a Item, name: &'static str) -> Result<&'a str, RecordError> {
    item.get(name)
        .and_then(Value::as_str)
        .ok_or(RecordError::MissingAttribute(name))
}

/// Project a book onto its records: the primary record first, then one record
/// per author, per language and per country, each in list order.
pub fn to_records(book: &Book) -> Vec<PhysicalRecord> {
    let mut records =
        Vec::with_capacity(1 + book.authors.len() + book.languages.len() + book.countries.len());
    records.push(PhysicalRecord::primary(book));
    let secondaries = [
        (RecordKind::Author, &book.authors),
        (RecordKind::Language, &book.languages),
        (RecordKind::Country, &book.countries),
    ];
    for (kind, values) in secondaries {
        records.extend(
            values
                .iter()
                .map(|value| PhysicalRecord::secondary(kind, value, book)),
        );
    }
    records
}

/// Recover a book from a primary record item.
pub fn to_book(primary: &Item) -> Result<Book, RecordError> {
    let record = PhysicalRecord::from_item(primary)?;
    if record.kind != RecordKind::Primary {
        return Err(RecordError::UnknownEntity(record.entity_id));
    }
    Ok(record.into_book())
}
