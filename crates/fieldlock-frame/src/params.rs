//! Handshake parameters read from the frame URL query string.
//!
//! ```text
//! ?embedder=https://shop.example&session_id=…&pk=<b64>&sig=<b64>&input_type=credit_card_number
//!  [&appearance={"fontFamily":"Inter","fontSize":"16px"}]
//! ```
//!
//! Parsed exactly once when the frame loads. Every required parameter is
//! checked here, before any cryptography runs.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;

use crate::config::AppearanceLimits;
use crate::error::FrameError;

// ---------------------------------------------------------------------------
// Field type
// ---------------------------------------------------------------------------

/// The single card field a frame instance collects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// Primary account number.
    CardNumber,
    /// Expiry date, `MM/YY`.
    CardExpiry,
    /// Card verification number.
    CardCvn,
}

impl FieldType {
    /// Map the `input_type` query value.
    #[must_use]
    pub fn from_input_type(value: &str) -> Option<Self> {
        match value {
            "credit_card_number" => Some(Self::CardNumber),
            "credit_card_expiry" => Some(Self::CardExpiry),
            "credit_card_cvn" => Some(Self::CardCvn),
            _ => None,
        }
    }

    /// The `input_type` query value for this field.
    #[must_use]
    pub const fn as_input_type(self) -> &'static str {
        match self {
            Self::CardNumber => "credit_card_number",
            Self::CardExpiry => "credit_card_expiry",
            Self::CardCvn => "credit_card_cvn",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::CardNumber => "card_number",
            Self::CardExpiry => "card_expiry",
            Self::CardCvn => "card_cvn",
        })
    }
}

// ---------------------------------------------------------------------------
// Appearance
// ---------------------------------------------------------------------------

/// Host styling that survived sanitization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Appearance {
    /// CSS `font-family` value.
    pub font_family: Option<String>,
    /// CSS `font-size` value.
    pub font_size: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAppearance {
    font_family: Option<String>,
    font_size: Option<String>,
}

fn font_family_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"^[A-Za-z0-9 ,'"_-]+$"#).expect("font family pattern is valid")
    })
}

fn font_size_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[0-9]{1,3}(\.[0-9]{1,2})?(px|pt|em|rem|%)$").expect("font size pattern is valid")
    })
}

fn sanitize(value: Option<String>, pattern: &Regex, max_len: usize) -> Option<String> {
    let value = value?;
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.chars().count() > max_len || !pattern.is_match(trimmed) {
        tracing::warn!(len = value.len(), "appearance value rejected by allow-list");
        return None;
    }
    Some(trimmed.to_owned())
}

impl Appearance {
    /// Parse and sanitize the `appearance` JSON.
    ///
    /// Malformed JSON yields the default appearance; individual values that
    /// fail the allow-list or exceed the cap are dropped.
    #[must_use]
    pub fn parse(json: &str, limits: &AppearanceLimits) -> Self {
        let raw: RawAppearance = match serde_json::from_str(json) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring malformed appearance parameter");
                return Self::default();
            }
        };
        Self {
            font_family: sanitize(
                raw.font_family,
                font_family_pattern(),
                limits.max_font_family_len,
            ),
            font_size: sanitize(raw.font_size, font_size_pattern(), limits.max_font_size_len),
        }
    }
}

// ---------------------------------------------------------------------------
// Handshake parameters
// ---------------------------------------------------------------------------

/// Everything the frame learns from its URL. Immutable after parsing.
#[derive(Clone, PartialEq, Eq)]
pub struct HandshakeParameters {
    /// ASCII-serialized origin of the embedding page (`scheme://host[:port]`).
    pub embedder_origin: String,
    /// Opaque session id; HKDF info and AAD source.
    pub session_id: String,
    /// Relay's ECDH public key.
    pub counterpart_public_key: Vec<u8>,
    /// Pinning signature over `counterpart_public_key`.
    pub signature: Vec<u8>,
    /// Field collected by this frame.
    pub field_type: FieldType,
    /// Sanitized styling.
    pub appearance: Appearance,
}

impl fmt::Debug for HandshakeParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandshakeParameters")
            .field("embedder_origin", &self.embedder_origin)
            .field("session_id", &self.session_id)
            .field("field_type", &self.field_type)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
struct RawQuery {
    embedder: Option<String>,
    session_id: Option<String>,
    pk: Option<String>,
    sig: Option<String>,
    input_type: Option<String>,
    appearance: Option<String>,
}

impl RawQuery {
    fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut raw = Self::default();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let slot = match key.as_ref() {
                "embedder" => &mut raw.embedder,
                "session_id" => &mut raw.session_id,
                "pk" => &mut raw.pk,
                "sig" => &mut raw.sig,
                "input_type" => &mut raw.input_type,
                "appearance" => &mut raw.appearance,
                _ => continue,
            };
            if slot.is_none() && !value.is_empty() {
                *slot = Some(value.into_owned());
            }
        }
        raw
    }
}

fn required(value: Option<String>, name: &'static str) -> Result<String, FrameError> {
    value.ok_or(FrameError::ParameterMissing(name))
}

/// Decode base64 from a query value. Form decoding turns an unescaped `+`
/// into a space, so spaces are mapped back before decoding.
fn decode_base64(value: &str, name: &'static str) -> Result<Vec<u8>, FrameError> {
    let restored = value.replace(' ', "+");
    data_encoding::BASE64
        .decode(restored.trim().as_bytes())
        .map_err(|e| FrameError::InvalidParameter {
            name,
            reason: e.to_string(),
        })
}

fn parse_origin(value: &str) -> Result<String, FrameError> {
    let url = url::Url::parse(value).map_err(|e| FrameError::InvalidParameter {
        name: "embedder",
        reason: e.to_string(),
    })?;
    if !matches!(url.scheme(), "https" | "http") {
        return Err(FrameError::InvalidParameter {
            name: "embedder",
            reason: format!("unsupported scheme {}", url.scheme()),
        });
    }
    Ok(url.origin().ascii_serialization())
}

impl HandshakeParameters {
    /// Parse the frame's query string (with or without the leading `?`).
    ///
    /// # Errors
    ///
    /// - `FrameError::ParameterMissing` for an absent or empty required parameter
    /// - `FrameError::InvalidParameter` for a bad origin or bad base64
    /// - `FrameError::UnsupportedFieldType` for an unknown `input_type`
    pub fn from_query(query: &str, limits: &AppearanceLimits) -> Result<Self, FrameError> {
        let raw = RawQuery::parse(query);

        let embedder = required(raw.embedder, "embedder")?;
        let session_id = required(raw.session_id, "session_id")?;
        let pk = required(raw.pk, "pk")?;
        let sig = required(raw.sig, "sig")?;
        let input_type = required(raw.input_type, "input_type")?;

        let embedder_origin = parse_origin(&embedder)?;
        let counterpart_public_key = decode_base64(&pk, "pk")?;
        let signature = decode_base64(&sig, "sig")?;
        let field_type = FieldType::from_input_type(&input_type)
            .ok_or(FrameError::UnsupportedFieldType(input_type))?;
        let appearance = raw
            .appearance
            .map(|json| Appearance::parse(&json, limits))
            .unwrap_or_default();

        Ok(Self {
            embedder_origin,
            session_id,
            counterpart_public_key,
            signature,
            field_type,
            appearance,
        })
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const PK: &str = "BAECAwQ="; // 0x04 0x01 0x02 0x03 0x04
    const SIG: &str = "AAEC"; // 0x00 0x01 0x02

    fn query(pairs: &[(&str, &str)]) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish()
    }

    fn full() -> Vec<(&'static str, &'static str)> {
        vec![
            ("embedder", "https://shop.example:8443/checkout?x=1"),
            ("session_id", "sess-1"),
            ("pk", PK),
            ("sig", SIG),
            ("input_type", "credit_card_number"),
        ]
    }

    #[test]
    fn parses_complete_query() {
        let params =
            HandshakeParameters::from_query(&query(&full()), &AppearanceLimits::default()).unwrap();
        assert_eq!(params.embedder_origin, "https://shop.example:8443");
        assert_eq!(params.session_id, "sess-1");
        assert_eq!(params.counterpart_public_key, vec![4, 1, 2, 3, 4]);
        assert_eq!(params.signature, vec![0, 1, 2]);
        assert_eq!(params.field_type, FieldType::CardNumber);
        assert_eq!(params.appearance, Appearance::default());
    }

    #[test]
    fn accepts_leading_question_mark() {
        let q = format!("?{}", query(&full()));
        assert!(HandshakeParameters::from_query(&q, &AppearanceLimits::default()).is_ok());
    }

    #[test]
    fn each_missing_parameter_is_reported() {
        for name in ["embedder", "session_id", "pk", "sig", "input_type"] {
            let pairs: Vec<_> = full().into_iter().filter(|(k, _)| *k != name).collect();
            let err = HandshakeParameters::from_query(&query(&pairs), &AppearanceLimits::default())
                .unwrap_err();
            assert!(
                matches!(err, FrameError::ParameterMissing(n) if n == name),
                "expected missing {name}, got {err}"
            );
        }
    }

    #[test]
    fn empty_value_counts_as_missing() {
        let mut pairs = full();
        pairs[1] = ("session_id", "");
        let err = HandshakeParameters::from_query(&query(&pairs), &AppearanceLimits::default())
            .unwrap_err();
        assert!(matches!(err, FrameError::ParameterMissing("session_id")));
    }

    #[test]
    fn unsupported_field_type() {
        let mut pairs = full();
        pairs[4] = ("input_type", "iban");
        let err = HandshakeParameters::from_query(&query(&pairs), &AppearanceLimits::default())
            .unwrap_err();
        assert_eq!(err.code(), "E_TYPE");
    }

    #[test]
    fn rejects_non_http_origin() {
        let mut pairs = full();
        pairs[0] = ("embedder", "javascript:alert(1)");
        let err = HandshakeParameters::from_query(&query(&pairs), &AppearanceLimits::default())
            .unwrap_err();
        assert!(matches!(err, FrameError::InvalidParameter { name: "embedder", .. }));
    }

    #[test]
    fn rejects_bad_base64() {
        let mut pairs = full();
        pairs[2] = ("pk", "not base64!");
        let err = HandshakeParameters::from_query(&query(&pairs), &AppearanceLimits::default())
            .unwrap_err();
        assert!(matches!(err, FrameError::InvalidParameter { name: "pk", .. }));
    }

    #[test]
    fn unescaped_plus_in_base64_survives() {
        // "+/8=" encodes 0xFB 0xFF; the raw '+' becomes a space under form decoding.
        let q = "embedder=https://a.example&session_id=s&pk=+/8=&sig=AAEC&input_type=credit_card_cvn";
        let params = HandshakeParameters::from_query(q, &AppearanceLimits::default()).unwrap();
        assert_eq!(params.counterpart_public_key, vec![0xFB, 0xFF]);
        assert_eq!(params.field_type, FieldType::CardCvn);
    }

    #[test]
    fn unescaped_plus_at_either_end_of_signature_survives() {
        // "AAE+" ends in '+', which form decoding turns into a trailing space.
        let q = "embedder=https://a.example&session_id=s&pk=+/8=&sig=AAE+&input_type=credit_card_number";
        let params = HandshakeParameters::from_query(q, &AppearanceLimits::default()).unwrap();
        assert_eq!(params.counterpart_public_key, vec![0xFB, 0xFF]);
        assert_eq!(params.signature, vec![0x00, 0x01, 0x3E]);
    }

    #[test]
    fn appearance_values_are_sanitized() {
        let mut pairs = full();
        pairs.push((
            "appearance",
            r#"{"fontFamily":"Inter, 'Helvetica Neue', sans-serif","fontSize":"16px"}"#,
        ));
        let params =
            HandshakeParameters::from_query(&query(&pairs), &AppearanceLimits::default()).unwrap();
        assert_eq!(
            params.appearance.font_family.as_deref(),
            Some("Inter, 'Helvetica Neue', sans-serif")
        );
        assert_eq!(params.appearance.font_size.as_deref(), Some("16px"));
    }

    #[test]
    fn appearance_rejects_css_injection() {
        let limits = AppearanceLimits::default();
        let a = Appearance::parse(
            r#"{"fontFamily":"x;background:url(https://evil)","fontSize":"12px;}<script>"}"#,
            &limits,
        );
        assert_eq!(a, Appearance::default());
    }

    #[test]
    fn appearance_enforces_length_caps() {
        let limits = AppearanceLimits {
            max_font_family_len: 5,
            max_font_size_len: 4,
        };
        let a = Appearance::parse(r#"{"fontFamily":"Helvetica","fontSize":"16px"}"#, &limits);
        assert_eq!(a.font_family, None);
        assert_eq!(a.font_size.as_deref(), Some("16px"));
    }

    #[test]
    fn malformed_appearance_is_ignored() {
        let a = Appearance::parse("{", &AppearanceLimits::default());
        assert_eq!(a, Appearance::default());
    }

    #[test]
    fn debug_omits_key_material() {
        let params =
            HandshakeParameters::from_query(&query(&full()), &AppearanceLimits::default()).unwrap();
        let debug = format!("{params:?}");
        assert!(debug.contains("sess-1"));
        assert!(!debug.contains("counterpart_public_key"));
    }

    #[test]
    fn field_type_roundtrips_input_type() {
        for ft in [FieldType::CardNumber, FieldType::CardExpiry, FieldType::CardCvn] {
            assert_eq!(FieldType::from_input_type(ft.as_input_type()), Some(ft));
        }
        assert_eq!(FieldType::CardExpiry.to_string(), "card_expiry");
    }
}
