//! ISBN-10 and ISBN-13 checksum validation.

/// Check an isbn after removing hyphen separators.
pub fn is_valid(isbn: &str) -> bool {
    let stripped: String = isbn.chars().filter(|c| *c != '-').collect();
    match stripped.len() {
        10 => is_valid_isbn10(stripped.as_bytes()),
        13 => is_valid_isbn13(stripped.as_bytes()),
        _ => false,
    }
}

/// Weights 10 down to 1, sum divisible by 11. The check character may be `X`.
fn is_valid_isbn10(bytes: &[u8]) -> bool {
    let mut sum = 0u32;
    for (i, &b) in bytes.iter().enumerate() {
        let value = match b {
            b'0'..=b'9' => u32::from(b - b'0'),
            b'X' | b'x' if i == 9 => 10,
            _ => return false,
        };
        sum += (10 - i as u32) * value;
    }
    sum % 11 == 0
}

/// Alternating weights 1 and 3, sum divisible by 10.
fn is_valid_isbn13(bytes: &[u8]) -> bool {
    let mut sum = 0u32;
    for (i, &b) in bytes.iter().enumerate() {
        if !b.is_ascii_digit() {
            return false;
        }
        let weight = if i % 2 == 0 { 1 } else { 3 };
        sum += weight * u32::from(b - b'0');
    }
    sum % 10 == 0
}
