//! English names of ISO 3166-1 countries and ISO 639-1 languages.

use isolang::Language;

/// ISO 3166-1 alpha-2 code of the country called `name`.
///
/// Matching ignores ASCII case. A qualified short name such as
/// `"Netherlands, Kingdom of the"` also matches its base, `"Netherlands"`.
pub fn country_code(name: &str) -> Option<&'static str> {
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    rust_iso3166::ALL
        .iter()
        .find(|country| {
            country.name.eq_ignore_ascii_case(name)
                || base_name(country.name).eq_ignore_ascii_case(name)
        })
        .map(|country| country.alpha2)
}

/// ISO 639-1 code of the language called `name`.
///
/// Languages that only have an ISO 639-2/3 code are rejected.
pub fn language_code(name: &str) -> Option<&'static str> {
    let name = name.trim();
    Language::from_name(name)
        .or_else(|| Language::from_name(&capitalized(name)))
        .and_then(|language| language.to_639_1())
}

fn base_name(name: &str) -> &str {
    name.split([',', '('])
        .next()
        .map_or(name, str::trim_end)
}

fn capitalized(name: &str) -> String {
    let lower = name.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
