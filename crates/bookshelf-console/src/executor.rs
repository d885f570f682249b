use std::io::Read;
use std::path::Path;

use bookshelf_core::book::{Book, BookMutation};
use bookshelf_core::catalog::Catalog;
use bookshelf_core::error::CatalogError;
use serde_json::Value;
use thiserror::Error;

use crate::commands::Command;

/// Structured result from executing a command.
pub enum CommandResult {
    /// Mutation succeeded (CREATE, UPDATE, DELETE).
    Ok(String),
    /// Books returned (LIST, GET).
    Books(Vec<Book>),
}

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid book JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl ExecError {
    /// One line per message; catalog errors may carry several.
    pub fn messages(&self) -> Vec<String> {
        match self {
            ExecError::Catalog(err) => err.messages(),
            other => vec![other.to_string()],
        }
    }
}

/// Execute a parsed command against the catalog.
pub async fn execute(catalog: &Catalog, cmd: Command) -> Result<CommandResult, ExecError> {
    match cmd {
        Command::List => Ok(CommandResult::Books(catalog.list_all().await?)),
        Command::Get { field, value } => Ok(CommandResult::Books(
            catalog.query_by_filter(field, &value).await?,
        )),
        Command::Create { file } => {
            let book: Book = serde_json::from_value(read_json(&file)?)?;
            catalog.create(&book).await?;
            Ok(CommandResult::Ok(format!("Book {} created.", book.isbn)))
        }
        Command::Update { isbn, file } => {
            let mutation: BookMutation = serde_json::from_value(read_json(&file)?)?;
            let book = catalog.update(&isbn, mutation).await?;
            Ok(CommandResult::Ok(format!("Book {} updated.", book.isbn)))
        }
        Command::Delete { isbn } => {
            catalog.delete(&isbn).await?;
            Ok(CommandResult::Ok(format!("Book {isbn} deleted.")))
        }
    }
}

fn read_json(path: &Path) -> Result<Value, ExecError> {
    let read_err = |source| ExecError::Read {
        path: path.display().to_string(),
        source,
    };
    let raw = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf).map_err(read_err)?;
        buf
    } else {
        std::fs::read_to_string(path).map_err(read_err)?
    };
    Ok(serde_json::from_str(&raw)?)
}
