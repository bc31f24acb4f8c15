//! Status-token normalization.
//!
//! Every scorer reads cell values through [`classify_token`] and
//! [`extract_reason`]; nothing else in the engine inspects raw flag text.

use std::sync::LazyLock;

use regex::Regex;

const POSITIVE: &[&str] = &["yes", "y", "true", "1", "pass", "passed", "success", "ok"];

const NEGATIVE: &[&str] = &[
    "no",
    "n",
    "false",
    "0",
    "fail",
    "failed",
    "na",
    "n/a",
    "not applicable",
    "none",
    "",
];

/// Tokens a classic comparator treats as "could not compare".
const COMPARATOR_NA: &[&str] = &["na", "n/a", "missing"];

/// `failed-<tag>{<payload>}`; the payload stops at the first closing brace.
static BRACED_FAILURE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)^fail(?:ed)?[-_\s]?[a-z]*\{(.*?)\}").unwrap());

/// Marker must end at a non-alphanumeric boundary so "failover" stays free text.
static FAILURE_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:failed|failure|fail|error|exception)s?(?:[^a-z0-9]|$)").unwrap()
});

static MARKER_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:failed|failure|fail|error|exception)s?[:\-_\s]*").unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenClass {
    Positive,
    /// Negative or not-applicable, blank included.
    Negative,
    ExplicitFailure,
    /// Free text that is not a flag.
    Unrecognized,
}

impl TokenClass {
    /// Flag-shaped tokens participate in all-flags scoring.
    pub fn is_flag(self) -> bool {
        !matches!(self, TokenClass::Unrecognized)
    }
}

fn lowered(raw: &str) -> String {
    raw.trim().to_lowercase()
}

pub fn classify_token(raw: &str) -> TokenClass {
    let s = lowered(raw);
    if POSITIVE.contains(&s.as_str()) {
        TokenClass::Positive
    } else if NEGATIVE.contains(&s.as_str()) {
        TokenClass::Negative
    } else if FAILURE_MARKER.is_match(&s) {
        TokenClass::ExplicitFailure
    } else {
        TokenClass::Unrecognized
    }
}

pub fn is_positive(raw: &str) -> bool {
    classify_token(raw) == TokenClass::Positive
}

pub fn is_comparator_na(raw: &str) -> bool {
    COMPARATOR_NA.contains(&lowered(raw).as_str())
}

/// Diagnostic text embedded in a cell, if the cell has the explicit-failure shape.
pub fn extract_reason(raw: &str) -> Option<String> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    if let Some(caps) = BRACED_FAILURE.captures(value) {
        return Some(caps[1].trim().to_string());
    }

    if classify_token(value) != TokenClass::ExplicitFailure {
        return None;
    }

    let stripped = MARKER_PREFIX.replace(value, "");
    let stripped = stripped.trim();
    if stripped.is_empty() {
        Some(value.to_string())
    } else {
        Some(stripped.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_is_case_and_space_insensitive() {
        for v in ["Yes", "YES", " yes ", "y", "TRUE", "1", "Passed", "ok", "Success"] {
            assert_eq!(classify_token(v), TokenClass::Positive, "{v:?}");
        }
    }

    #[test]
    fn negative_covers_blank_and_na() {
        for v in ["", "   ", "NA", "n/a", "Not Applicable", "none", "No", "0", "failed", "FAIL"] {
            assert_eq!(classify_token(v), TokenClass::Negative, "{v:?}");
        }
    }

    #[test]
    fn explicit_failure_shapes() {
        for v in ["failed-json{x}", "fail-timeout", "Error: boom", "exception in thread", "failure"] {
            assert_eq!(classify_token(v), TokenClass::ExplicitFailure, "{v:?}");
        }
        assert_eq!(classify_token("pending review"), TokenClass::Unrecognized);
        assert_eq!(classify_token("failover complete"), TokenClass::Unrecognized);
        assert!(!TokenClass::Unrecognized.is_flag());
        assert!(TokenClass::Negative.is_flag());
    }

    #[test]
    fn braced_payload_is_extracted() {
        assert_eq!(
            extract_reason("failed-json{timeout after 30s}").as_deref(),
            Some("timeout after 30s")
        );
        assert_eq!(
            extract_reason("FAILED-cmp{ amount mismatch 10 vs 12 }").as_deref(),
            Some("amount mismatch 10 vs 12")
        );
    }

    #[test]
    fn braced_payload_spans_lines_and_stops_at_first_brace() {
        let v = "failed-diff{line one\nline two}";
        assert_eq!(extract_reason(v).as_deref(), Some("line one\nline two"));

        let v = "failed-diff{line one\n{\"amount\": 10}\nline three}";
        assert_eq!(extract_reason(v).as_deref(), Some("line one\n{\"amount\": 10"));
    }

    #[test]
    fn trailing_text_after_braced_payload_is_dropped() {
        assert_eq!(
            extract_reason("failed-json{timeout} see {ticket}").as_deref(),
            Some("timeout")
        );
    }

    #[test]
    fn marker_prefix_is_stripped() {
        assert_eq!(extract_reason("failed: upstream 503").as_deref(), Some("upstream 503"));
        assert_eq!(extract_reason("Error - bad schema").as_deref(), Some("bad schema"));
        assert_eq!(extract_reason("exception").as_deref(), Some("exception"));
    }

    #[test]
    fn unterminated_payload_is_opaque_text() {
        assert_eq!(extract_reason("failed-json{oops").as_deref(), Some("json{oops"));
    }

    #[test]
    fn absence_never_yields_a_reason() {
        for v in ["", "no", "NA", "n/a", "failed", "Yes", "pending"] {
            assert_eq!(extract_reason(v), None, "{v:?}");
        }
    }

    #[test]
    fn comparator_na_tokens() {
        assert!(is_comparator_na("Missing"));
        assert!(is_comparator_na(" n/a "));
        assert!(!is_comparator_na("no"));
    }
}
