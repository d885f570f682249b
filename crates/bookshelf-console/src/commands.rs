use std::path::PathBuf;

use bookshelf_core::book::BookField;
use clap::Subcommand;

/// A console command.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the first page of books.
    List,
    /// Find books by one field: isbn, name, pages, releaseDate, authors,
    /// languages or countries.
    Get {
        #[arg(value_parser = parse_field)]
        field: BookField,
        value: String,
    },
    /// Create a book from a JSON file ("-" reads stdin).
    Create { file: PathBuf },
    /// Replace the book with the given isbn from a JSON file without an isbn
    /// ("-" reads stdin).
    Update { isbn: String, file: PathBuf },
    /// Delete the book with the given isbn.
    Delete { isbn: String },
}

fn parse_field(s: &str) -> Result<BookField, String> {
    s.parse::<BookField>().map_err(|e| e.to_string())
}
