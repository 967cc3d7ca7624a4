//! Per-field validation and brand detection.
//!
//! This module provides:
//! - [`validate`] — score a display value for a given [`FieldType`]
//! - [`ValidationResult`] — the `empty` / `valid` / codes / brand tuple that
//!   travels in every `change` message
//! - [`brand`] — IIN table and Luhn checksum
//! - [`expiry`] — `MM/YY` parsing and the current UTC month
//!
//! Results are recomputed from scratch on every change; nothing is cached.

pub mod brand;
pub mod expiry;

use serde::Serialize;

use crate::params::FieldType;
pub use brand::CardBrand;
pub use expiry::YearMonth;

use expiry::ParsedExpiry;

/// Shortest and longest card number accepted when no brand matches.
const UNBRANDED_LENGTHS: std::ops::RangeInclusive<usize> = 12..=19;

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Why a value is not valid. Serialized in snake case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationErrorCode {
    /// Nothing entered.
    Empty,
    /// Card number contains a non-digit.
    InvalidNumber,
    /// Card number length does not fit its brand, or 12–19 when unbranded.
    InvalidLength,
    /// Card number fails the Luhn check.
    InvalidChecksum,
    /// Expiry is not a real `MM/YY` month.
    InvalidFormat,
    /// Expiry month is before the current UTC month.
    Expired,
    /// CVN contains a non-digit.
    InvalidCvn,
    /// CVN has fewer than three digits.
    TooShort,
    /// CVN has more than four digits.
    TooLong,
}

/// Outcome of validating one field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub empty: bool,
    pub valid: bool,
    pub error_codes: Vec<ValidationErrorCode>,
    pub card_brand: Option<CardBrand>,
}

impl ValidationResult {
    const fn ok(card_brand: Option<CardBrand>) -> Self {
        Self {
            empty: false,
            valid: true,
            error_codes: Vec::new(),
            card_brand,
        }
    }

    fn failed(code: ValidationErrorCode, card_brand: Option<CardBrand>) -> Self {
        Self {
            empty: false,
            valid: false,
            error_codes: vec![code],
            card_brand,
        }
    }

    fn empty() -> Self {
        Self {
            empty: true,
            valid: false,
            error_codes: vec![ValidationErrorCode::Empty],
            card_brand: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Validate `value` (the display string, separators included) as `field_type`.
///
/// `today` is the month expiry dates are compared against; callers pass
/// [`YearMonth::current_utc`] outside tests.
#[must_use]
pub fn validate(field_type: FieldType, value: &str, today: YearMonth) -> ValidationResult {
    match field_type {
        FieldType::CardNumber => validate_number(value),
        FieldType::CardExpiry => validate_expiry(value, today),
        FieldType::CardCvn => validate_cvn(value),
    }
}

fn validate_number(value: &str) -> ValidationResult {
    let digits: String = value.chars().filter(|c| !matches!(c, ' ' | '-')).collect();
    if digits.is_empty() {
        return ValidationResult::empty();
    }
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return ValidationResult::failed(ValidationErrorCode::InvalidNumber, None);
    }

    let length = digits.len();
    let brand = brand::detect(&digits);
    let length_ok = brand.map_or_else(
        || UNBRANDED_LENGTHS.contains(&length),
        |b| b.accepted_lengths().contains(&length),
    );

    if !length_ok {
        ValidationResult::failed(ValidationErrorCode::InvalidLength, brand)
    } else if !brand::luhn_valid(&digits) {
        ValidationResult::failed(ValidationErrorCode::InvalidChecksum, brand)
    } else {
        ValidationResult::ok(brand)
    }
}

fn validate_expiry(value: &str, today: YearMonth) -> ValidationResult {
    let value = value.trim();
    if value.is_empty() {
        return ValidationResult::empty();
    }
    match expiry::parse(value) {
        ParsedExpiry::Malformed => ValidationResult::failed(ValidationErrorCode::InvalidFormat, None),
        ParsedExpiry::Valid(month) if month < today => {
            ValidationResult::failed(ValidationErrorCode::Expired, None)
        }
        ParsedExpiry::Valid(_) => ValidationResult::ok(None),
    }
}

fn validate_cvn(value: &str) -> ValidationResult {
    let value = value.trim();
    if value.is_empty() {
        return ValidationResult::empty();
    }
    if !value.bytes().all(|b| b.is_ascii_digit()) {
        return ValidationResult::failed(ValidationErrorCode::InvalidCvn, None);
    }
    match value.len() {
        1..=2 => ValidationResult::failed(ValidationErrorCode::TooShort, None),
        3..=4 => ValidationResult::ok(None),
        _ => ValidationResult::failed(ValidationErrorCode::TooLong, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TODAY: YearMonth = YearMonth {
        year: 2026,
        month: 10,
    };

    fn number(v: &str) -> ValidationResult {
        validate(FieldType::CardNumber, v, TODAY)
    }

    fn codes(result: &ValidationResult) -> &[ValidationErrorCode] {
        &result.error_codes
    }

    // -- card number -------------------------------------------------------

    #[test]
    fn visa_test_number_is_valid() {
        let r = number("4111 1111 1111 1111 ");
        assert!(r.valid);
        assert!(!r.empty);
        assert!(r.error_codes.is_empty());
        assert_eq!(r.card_brand, Some(CardBrand::Visa));
    }

    #[test]
    fn bad_checksum_reports_brand() {
        let r = number("4111111111111112");
        assert!(!r.valid);
        assert_eq!(codes(&r), &[ValidationErrorCode::InvalidChecksum]);
        assert_eq!(r.card_brand, Some(CardBrand::Visa));
    }

    #[test]
    fn brand_length_mismatch_skips_checksum() {
        // 15 digits is not a VISA length.
        let r = number("411111111111116");
        assert_eq!(codes(&r), &[ValidationErrorCode::InvalidLength]);
        assert_eq!(r.card_brand, Some(CardBrand::Visa));
    }

    #[test]
    fn amex_needs_fifteen_digits() {
        assert!(number("3782 8224 6310 005").valid);
        let r = number("3782822463100050");
        assert_eq!(codes(&r), &[ValidationErrorCode::InvalidLength]);
        assert_eq!(r.card_brand, Some(CardBrand::Amex));
    }

    #[test]
    fn unbranded_number_outside_range_is_invalid_length() {
        let r = number("99999999999");
        assert_eq!(codes(&r), &[ValidationErrorCode::InvalidLength]);
        assert_eq!(r.card_brand, None);
        let r = number("99999999999999999999");
        assert_eq!(codes(&r), &[ValidationErrorCode::InvalidLength]);
    }

    #[test]
    fn unbranded_number_in_range_falls_back_to_luhn() {
        assert!(number("1234567890123452").valid);
        let r = number("1234567890123456");
        assert_eq!(codes(&r), &[ValidationErrorCode::InvalidChecksum]);
        assert_eq!(r.card_brand, None);
    }

    #[test]
    fn non_digits_are_invalid_number() {
        let r = number("4111 11x1 1111 1111");
        assert_eq!(codes(&r), &[ValidationErrorCode::InvalidNumber]);
        assert_eq!(r.card_brand, None);
    }

    #[test]
    fn empty_number() {
        for input in ["", "   "] {
            let r = number(input);
            assert!(r.empty);
            assert!(!r.valid);
            assert_eq!(codes(&r), &[ValidationErrorCode::Empty]);
        }
    }

    // -- expiry ------------------------------------------------------------

    #[test]
    fn expiry_rules() {
        let v = |s| validate(FieldType::CardExpiry, s, TODAY);
        assert!(v("12/34").valid);
        assert!(v("10/26").valid, "current month is still valid");
        assert_eq!(codes(&v("09/26")), &[ValidationErrorCode::Expired]);
        assert_eq!(codes(&v("13/30")), &[ValidationErrorCode::InvalidFormat]);
        assert_eq!(codes(&v("1")), &[ValidationErrorCode::InvalidFormat]);
        assert_eq!(codes(&v("12/")), &[ValidationErrorCode::InvalidFormat]);
        let empty = v("");
        assert!(empty.empty);
        assert_eq!(codes(&empty), &[ValidationErrorCode::Empty]);
    }

    // -- cvn ---------------------------------------------------------------

    #[test]
    fn cvn_rules() {
        let v = |s| validate(FieldType::CardCvn, s, TODAY);
        assert_eq!(codes(&v("12")), &[ValidationErrorCode::TooShort]);
        assert_eq!(codes(&v("1")), &[ValidationErrorCode::TooShort]);
        assert_eq!(codes(&v("12345")), &[ValidationErrorCode::TooLong]);
        assert!(v("123").valid);
        assert!(v("1234").valid);
        assert_eq!(codes(&v("12a")), &[ValidationErrorCode::InvalidCvn]);
        assert_eq!(codes(&v("")), &[ValidationErrorCode::Empty]);
    }

    #[test]
    fn serializes_camel_case_with_snake_codes() {
        let json = serde_json::to_value(number("4111111111111112")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "empty": false,
                "valid": false,
                "errorCodes": ["invalid_checksum"],
                "cardBrand": "VISA",
            })
        );
    }
}
