//! Input normalizers applied to raw keystrokes before a value reaches the record.

use serde::Serialize;

/// How raw input for a field is massaged before it is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "max")]
pub enum InputFilter {
    /// Stored exactly as entered.
    Verbatim,
    /// Digits only, grouped as `XXXXX-XXXXXXX-X`.
    Cnic,
    /// Digits only, truncated to the given length.
    Digits(usize),
}

impl InputFilter {
    pub fn apply(self, raw: &str) -> String {
        match self {
            InputFilter::Verbatim => raw.to_string(),
            InputFilter::Cnic => format_cnic(raw),
            InputFilter::Digits(max) => digits_only(raw, max),
        }
    }
}

/// Group the digits of a CNIC as they are typed: `1234512345671` becomes `12345-1234567-1`.
pub fn format_cnic(raw: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).take(13).collect();
    match digits.len() {
        0..=5 => digits,
        6..=12 => format!("{}-{}", &digits[..5], &digits[5..]),
        _ => format!("{}-{}-{}", &digits[..5], &digits[5..12], &digits[12..]),
    }
}

pub fn digits_only(raw: &str, max: usize) -> String {
    raw.chars().filter(char::is_ascii_digit).take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_full_cnic() {
        assert_eq!(format_cnic("1234512345671"), "12345-1234567-1");
    }

    #[test]
    fn formats_partial_cnic_progressively() {
        assert_eq!(format_cnic("123"), "123");
        assert_eq!(format_cnic("12345"), "12345");
        assert_eq!(format_cnic("123451"), "12345-1");
        assert_eq!(format_cnic("12345-1234567"), "12345-1234567");
    }

    #[test]
    fn cnic_ignores_noise_and_extra_digits() {
        assert_eq!(format_cnic("12345 1234567 1 99"), "12345-1234567-1");
        assert_eq!(format_cnic("abc"), "");
    }

    #[test]
    fn digit_filter_truncates() {
        assert_eq!(InputFilter::Digits(11).apply("0300-123 45678 9"), "03001234567");
        assert_eq!(InputFilter::Digits(5).apply("75-500a1"), "75500");
        assert_eq!(InputFilter::Verbatim.apply(" as typed "), " as typed ");
    }
}
