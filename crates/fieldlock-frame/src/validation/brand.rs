//! Issuer detection from leading digits (IIN ranges) and the Luhn checksum.

use serde::Serialize;

/// Card brand reported to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CardBrand {
    #[serde(rename = "AMEX")]
    Amex,
    #[serde(rename = "DINERS_CLUB")]
    DinersClub,
    #[serde(rename = "JCB")]
    Jcb,
    #[serde(rename = "VISA")]
    Visa,
    #[serde(rename = "MASTERCARD")]
    Mastercard,
    #[serde(rename = "MAESTRO")]
    Maestro,
    #[serde(rename = "DISCOVER")]
    Discover,
    #[serde(rename = "UNIONPAY")]
    UnionPay,
}

impl CardBrand {
    /// Wire name, as serialized in `cardBrand`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Amex => "AMEX",
            Self::DinersClub => "DINERS_CLUB",
            Self::Jcb => "JCB",
            Self::Visa => "VISA",
            Self::Mastercard => "MASTERCARD",
            Self::Maestro => "MAESTRO",
            Self::Discover => "DISCOVER",
            Self::UnionPay => "UNIONPAY",
        }
    }

    /// Card number lengths this brand issues.
    #[must_use]
    pub fn accepted_lengths(self) -> &'static [usize] {
        BRANDS
            .iter()
            .find(|rule| rule.brand == self)
            .map(|rule| rule.lengths)
            .unwrap_or_default()
    }
}

/// Inclusive numeric range over the first `width` digits.
struct Prefix {
    width: usize,
    low: u32,
    high: u32,
}

const fn p(width: usize, low: u32, high: u32) -> Prefix {
    Prefix { width, low, high }
}

struct BrandRule {
    brand: CardBrand,
    prefixes: &'static [Prefix],
    lengths: &'static [usize],
}

/// Checked in order; the first matching brand wins. Narrow ranges that sit
/// inside broader ones (Discover's 622126–622925 inside UnionPay's 62) come first.
const BRANDS: &[BrandRule] = &[
    BrandRule {
        brand: CardBrand::Amex,
        prefixes: &[p(2, 34, 34), p(2, 37, 37)],
        lengths: &[15],
    },
    BrandRule {
        brand: CardBrand::DinersClub,
        prefixes: &[p(3, 300, 305), p(2, 36, 36), p(2, 38, 39)],
        lengths: &[14, 16, 19],
    },
    BrandRule {
        brand: CardBrand::Jcb,
        prefixes: &[p(4, 3528, 3589)],
        lengths: &[16, 17, 18, 19],
    },
    BrandRule {
        brand: CardBrand::Visa,
        prefixes: &[p(1, 4, 4)],
        lengths: &[13, 16, 19],
    },
    BrandRule {
        brand: CardBrand::Mastercard,
        prefixes: &[p(2, 51, 55), p(4, 2221, 2720)],
        lengths: &[16],
    },
    BrandRule {
        brand: CardBrand::Maestro,
        prefixes: &[
            p(4, 5018, 5018),
            p(4, 5020, 5020),
            p(4, 5038, 5038),
            p(4, 5893, 5893),
            p(4, 6304, 6304),
            p(4, 6759, 6759),
            p(4, 6761, 6763),
        ],
        lengths: &[12, 13, 14, 15, 16, 17, 18, 19],
    },
    BrandRule {
        brand: CardBrand::Discover,
        prefixes: &[p(4, 6011, 6011), p(6, 622_126, 622_925), p(3, 644, 649), p(2, 65, 65)],
        lengths: &[16, 19],
    },
    BrandRule {
        brand: CardBrand::UnionPay,
        prefixes: &[p(2, 62, 62)],
        lengths: &[16, 17, 18, 19],
    },
];

impl Prefix {
    fn matches(&self, digits: &str) -> bool {
        digits
            .get(..self.width)
            .and_then(|head| head.parse::<u32>().ok())
            .is_some_and(|n| (self.low..=self.high).contains(&n))
    }
}

/// Detect the brand of an all-digit string. Partial input is fine: `"4"` is
/// already `VISA`, while `"2"` waits for four digits before it can be
/// `MASTERCARD`.
#[must_use]
pub fn detect(digits: &str) -> Option<CardBrand> {
    BRANDS
        .iter()
        .find(|rule| rule.prefixes.iter().any(|prefix| prefix.matches(digits)))
        .map(|rule| rule.brand)
}

/// Luhn mod-10 check over an all-digit string.
///
/// Non-digit bytes make the check fail.
#[must_use]
#[allow(clippy::arithmetic_side_effects)] // digit values ≤ 18, at most 19 terms
pub fn luhn_valid(digits: &str) -> bool {
    let mut sum = 0u32;
    for (i, c) in digits.chars().rev().enumerate() {
        let Some(mut d) = c.to_digit(10) else {
            return false;
        };
        if i % 2 == 1 {
            d *= 2;
            if d > 9 {
                d -= 9;
            }
        }
        sum += d;
    }
    sum % 10 == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_common_brands() {
        assert_eq!(detect("4111111111111111"), Some(CardBrand::Visa));
        assert_eq!(detect("5555555555554444"), Some(CardBrand::Mastercard));
        assert_eq!(detect("2223003122003222"), Some(CardBrand::Mastercard));
        assert_eq!(detect("378282246310005"), Some(CardBrand::Amex));
        assert_eq!(detect("6011111111111117"), Some(CardBrand::Discover));
        assert_eq!(detect("30569309025904"), Some(CardBrand::DinersClub));
        assert_eq!(detect("3530111333300000"), Some(CardBrand::Jcb));
        assert_eq!(detect("6200000000000005"), Some(CardBrand::UnionPay));
        assert_eq!(detect("6759649826438453"), Some(CardBrand::Maestro));
    }

    #[test]
    fn discover_range_inside_unionpay_prefix() {
        assert_eq!(detect("6221260000000000"), Some(CardBrand::Discover));
        assert_eq!(detect("6229250000000000"), Some(CardBrand::Discover));
        assert_eq!(detect("6229260000000000"), Some(CardBrand::UnionPay));
    }

    #[test]
    fn partial_prefixes() {
        assert_eq!(detect("4"), Some(CardBrand::Visa));
        assert_eq!(detect("3"), None);
        assert_eq!(detect("37"), Some(CardBrand::Amex));
        assert_eq!(detect("2"), None);
        assert_eq!(detect("2221"), Some(CardBrand::Mastercard));
        assert_eq!(detect("2721"), None);
        assert_eq!(detect(""), None);
    }

    #[test]
    fn unknown_prefix() {
        assert_eq!(detect("9999999999999995"), None);
        assert_eq!(detect("1234567890123452"), None);
    }

    #[test]
    fn luhn_known_values() {
        assert!(luhn_valid("4111111111111111"));
        assert!(!luhn_valid("4111111111111112"));
        assert!(luhn_valid("378282246310005"));
        assert!(luhn_valid("79927398713"));
        assert!(!luhn_valid("79927398710"));
        assert!(!luhn_valid("4111-1111"));
    }

    #[test]
    fn accepted_lengths_lookup() {
        assert_eq!(CardBrand::Amex.accepted_lengths(), &[15]);
        assert_eq!(CardBrand::Visa.accepted_lengths(), &[13, 16, 19]);
    }

    #[test]
    fn serializes_wire_names() {
        assert_eq!(serde_json::to_string(&CardBrand::UnionPay).unwrap(), r#""UNIONPAY""#);
        assert_eq!(serde_json::to_string(&CardBrand::DinersClub).unwrap(), r#""DINERS_CLUB""#);
        assert_eq!(CardBrand::Visa.as_str(), "VISA");
    }
}
