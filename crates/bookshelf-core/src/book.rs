//! Logical book entity, mutation payload and filterable field names.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A book in the catalog, identified by its isbn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub isbn: String,
    pub name: String,
    pub pages: u32,
    /// ISO 8601 calendar date, `YYYY-MM-DD`.
    pub release_date: String,
    pub authors: Vec<String>,
    pub languages: Vec<String>,
    pub countries: Vec<String>,
}

/// A book without its isbn: the body of an update.
///
/// The isbn of an updated book is supplied separately and is never read from
/// the mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookMutation {
    pub name: String,
    pub pages: u32,
    pub release_date: String,
    pub authors: Vec<String>,
    pub languages: Vec<String>,
    pub countries: Vec<String>,
}

impl BookMutation {
    pub fn into_book(self, isbn: impl Into<String>) -> Book {
        Book {
            isbn: isbn.into(),
            name: self.name,
            pages: self.pages,
            release_date: self.release_date,
            authors: self.authors,
            languages: self.languages,
            countries: self.countries,
        }
    }
}

impl From<Book> for BookMutation {
    fn from(book: Book) -> Self {
        Self {
            name: book.name,
            pages: book.pages,
            release_date: book.release_date,
            authors: book.authors,
            languages: book.languages,
            countries: book.countries,
        }
    }
}

/// The fields a catalog query can filter on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BookField {
    Isbn,
    Name,
    Pages,
    ReleaseDate,
    Authors,
    Languages,
    Countries,
}

impl BookField {
    pub const ALL: [BookField; 7] = [
        BookField::Isbn,
        BookField::Name,
        BookField::Pages,
        BookField::ReleaseDate,
        BookField::Authors,
        BookField::Languages,
        BookField::Countries,
    ];

    /// The attribute name used on the wire and in stored records.
    pub fn as_str(self) -> &'static str {
        match self {
            BookField::Isbn => "isbn",
            BookField::Name => "name",
            BookField::Pages => "pages",
            BookField::ReleaseDate => "releaseDate",
            BookField::Authors => "authors",
            BookField::Languages => "languages",
            BookField::Countries => "countries",
        }
    }
}

impl fmt::Display for BookField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string does not name a [`BookField`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{0}' is not a book field")]
pub struct UnknownField(pub String);

impl FromStr for BookField {
    type Err = UnknownField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BookField::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| UnknownField(s.to_string()))
    }
}

/// A `(field, value)` pair selecting books.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookFilter {
    pub field: BookField,
    pub value: String,
}

impl BookFilter {
    pub fn new(field: BookField, value: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
        }
    }
}
