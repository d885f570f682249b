//! Domain rules for book data.
//!
//! Every rule is checked independently so a caller sees all violations at
//! once, not just the first one.

pub mod codes;
pub mod isbn;

use std::sync::LazyLock;

use regex::Regex;

use crate::book::{Book, BookMutation};
use crate::error::ValidationErrors;

static RELEASE_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("release date pattern is a valid regex")
});

/// Something that can be checked against the catalog's domain rules.
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationErrors>;
}

impl Validate for Book {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if !isbn::is_valid(&self.isbn) {
            errors.push(format!("isbn value {} is invalid", self.isbn));
        }
        check_fields(
            &mut errors,
            Fields {
                pages: self.pages,
                release_date: &self.release_date,
                languages: &self.languages,
                countries: &self.countries,
            },
        );
        errors.into_result()
    }
}

impl Validate for BookMutation {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_fields(
            &mut errors,
            Fields {
                pages: self.pages,
                release_date: &self.release_date,
                languages: &self.languages,
                countries: &self.countries,
            },
        );
        errors.into_result()
    }
}

/// The rule-bearing fields shared by [`Book`] and [`BookMutation`].
struct Fields<'a> {
    pages: u32,
    release_date: &'a str,
    languages: &'a [String],
    countries: &'a [String],
}

fn check_fields(errors: &mut ValidationErrors, fields: Fields<'_>) {
    if fields.languages.is_empty() {
        errors.push("No language provided for book");
    }
    if fields.countries.is_empty() {
        errors.push("No country provided for book");
    }
    if fields.pages == 0 {
        errors.push("Book pages should be greather then 0");
    }
    if !RELEASE_DATE.is_match(fields.release_date) {
        errors.push("Invalid release date, provide date in ISO 8601 format YYYY-MM-DD");
    }
    for country in fields.countries {
        if codes::country_code(country).is_none() {
            errors.push(format!(
                "Country name {country} is invalid, please provide a english ISO 3166-1 country name"
            ));
        }
    }
    for language in fields.languages {
        if codes::language_code(language).is_none() {
            errors.push(format!(
                "Language name {language} is invalid, please provide a english ISO 639-1 language name"
            ));
        }
    }
}
