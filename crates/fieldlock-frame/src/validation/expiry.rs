//! `MM/YY` parsing and the calendar month used for the expiry check.

use std::time::{SystemTime, UNIX_EPOCH};

/// A calendar month. Ordering is chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct YearMonth {
    /// Four-digit year.
    pub year: u32,
    /// 1–12.
    pub month: u32,
}

impl YearMonth {
    /// Construct a month, rejecting months outside 1–12.
    #[must_use]
    pub fn new(year: u32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    /// The current month in UTC, read from the system clock.
    #[must_use]
    pub fn current_utc() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_secs());
        Self::from_epoch_secs(secs)
    }

    /// Month containing `epoch_secs` (seconds since 1970-01-01T00:00:00Z).
    #[must_use]
    pub fn from_epoch_secs(epoch_secs: u64) -> Self {
        let (year, month) = epoch_to_year_month(epoch_secs);
        Self {
            year: u32::try_from(year).unwrap_or(u32::MAX),
            month: u32::try_from(month).unwrap_or(1),
        }
    }
}

/// Civil year and month for a UTC timestamp (Howard Hinnant's
/// `civil_from_days`, valid for years 1970–9999).
#[allow(clippy::arithmetic_side_effects)]
const fn epoch_to_year_month(epoch_secs: u64) -> (u64, u64) {
    let z = epoch_secs / 86_400 + 719_468;
    let era = z / 146_097;
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146_096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = if m <= 2 { y + 1 } else { y };
    (year, m)
}

/// Outcome of parsing an expiry display value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedExpiry {
    /// Two-digit month, `/`, two-digit year, month 01–12.
    Valid(YearMonth),
    /// Anything else.
    Malformed,
}

/// Parse `MM/YY`. Years are taken as 2000 + `YY`.
#[must_use]
pub fn parse(value: &str) -> ParsedExpiry {
    let bytes = value.as_bytes();
    let shape_ok = bytes.len() == 5
        && bytes[2] == b'/'
        && bytes[..2].iter().all(u8::is_ascii_digit)
        && bytes[3..].iter().all(u8::is_ascii_digit);
    if !shape_ok {
        return ParsedExpiry::Malformed;
    }

    let (Ok(month), Ok(yy)) = (value[..2].parse::<u32>(), value[3..].parse::<u32>()) else {
        return ParsedExpiry::Malformed;
    };
    // yy ≤ 99
    #[allow(clippy::arithmetic_side_effects)]
    let year = 2000 + yy;
    YearMonth::new(year, month).map_or(ParsedExpiry::Malformed, ParsedExpiry::Valid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_start_is_january_1970() {
        assert_eq!(YearMonth::from_epoch_secs(0), YearMonth { year: 1970, month: 1 });
    }

    #[test]
    fn known_timestamps() {
        // 2026-02-09T00:00:00Z
        assert_eq!(
            YearMonth::from_epoch_secs(1_770_595_200),
            YearMonth { year: 2026, month: 2 }
        );
        // 2024-02-29T23:59:59Z (leap day)
        assert_eq!(
            YearMonth::from_epoch_secs(1_709_251_199),
            YearMonth { year: 2024, month: 2 }
        );
        // 2024-03-01T00:00:00Z
        assert_eq!(
            YearMonth::from_epoch_secs(1_709_251_200),
            YearMonth { year: 2024, month: 3 }
        );
    }

    #[test]
    fn ordering_is_chronological() {
        let a = YearMonth::new(2025, 12).unwrap();
        let b = YearMonth::new(2026, 1).unwrap();
        assert!(a < b);
        assert!(YearMonth::new(2026, 13).is_none());
        assert!(YearMonth::new(2026, 0).is_none());
    }

    #[test]
    fn parses_well_formed_values() {
        assert_eq!(
            parse("12/34"),
            ParsedExpiry::Valid(YearMonth { year: 2034, month: 12 })
        );
        assert_eq!(
            parse("01/00"),
            ParsedExpiry::Valid(YearMonth { year: 2000, month: 1 })
        );
    }

    #[test]
    fn rejects_malformed_values() {
        for input in ["", "1", "12/", "12/3", "1234", "12-34", "13/30", "00/30", "ab/cd", "12/345"] {
            assert_eq!(parse(input), ParsedExpiry::Malformed, "{input:?}");
        }
    }

    #[test]
    fn current_utc_is_plausible() {
        let now = YearMonth::current_utc();
        assert!(now.year >= 2024);
        assert!((1..=12).contains(&now.month));
    }
}
