use bookshelf_core::book::Book;
use serde_json::{Value, json};

use crate::executor::{CommandResult, ExecError};

/// How books and error lists are written out.
pub enum OutputMode {
    /// Indented book documents followed by a count; errors as `Error:` lines.
    Pretty,
    /// A single `{"books": [...], "count": n}` or `{"errors": [...]}` line.
    Json,
}

/// Write a command's books or confirmation to stdout.
pub fn render(result: &CommandResult, mode: &OutputMode) {
    match result {
        CommandResult::Ok(msg) => match mode {
            OutputMode::Pretty => print_ok(msg),
            OutputMode::Json => println!("{}", json!({"ok": true, "message": msg})),
        },
        CommandResult::Books(books) => match mode {
            OutputMode::Pretty => print_books(books),
            OutputMode::Json => {
                println!("{}", books_json(books));
            }
        },
    }
}

/// Write every message of a failed command to stderr.
pub fn render_error(err: &ExecError, mode: &OutputMode) {
    let messages = err.messages();
    match mode {
        OutputMode::Pretty => {
            for msg in &messages {
                print_error(msg);
            }
        }
        OutputMode::Json => {
            eprintln!("{}", errors_json(&messages));
        }
    }
}

/// Pretty-print a single book with 2-space indentation.
pub fn print_book(book: &Book) {
    match serde_json::to_string_pretty(book) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("Error formatting book: {e}"),
    }
}

pub fn print_books(books: &[Book]) {
    for book in books {
        print_book(book);
    }
    let n = books.len();
    println!("Returned {n} book(s).");
}

/// Print a success message.
pub fn print_ok(msg: &str) {
    println!("{msg}");
}

/// Print an error message to stderr.
pub fn print_error(err: &dyn std::fmt::Display) {
    eprintln!("Error: {err}");
}

fn books_json(books: &[Book]) -> Value {
    json!({"books": books, "count": books.len()})
}

fn errors_json(messages: &[String]) -> Value {
    json!({"errors": messages})
}
