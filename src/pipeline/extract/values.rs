//! Field-kind patterns and value coercion shared by all extraction layers.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::models::{FieldKind, FieldValue};

static AMOUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-(]?\$?\s?\d[\d,]*(?:\.\d{1,2})?\)?").unwrap());
static SSN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{3}[- ]\d{2}[- ]\d{4}\b").unwrap());
static EIN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\d{2}-\d{7}\b").unwrap());
static TIN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:\d{3}-\d{2}-\d{4}|\d{2}-\d{7})\b").unwrap());
static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:\(\d{3}\)\s?|\b\d{3}[-. ])\d{3}[-. ]\d{4}\b").unwrap());
static ZIP_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\d{5}(?:-\d{4})?\b").unwrap());
static YEAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(?:19|20)\d{2}\b").unwrap());
static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:\d{4}-\d{1,2}-\d{1,2}|\d{1,2}[/-]\d{1,2}[/-]\d{2,4}|\d{1,2}\.\d{1,2}\.\d{4}|(?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s\d{1,2},?\s\d{4})\b",
    )
    .unwrap()
});

/// Pattern locating a value of this kind. `Text` has none.
pub fn pattern_for(kind: FieldKind) -> Option<&'static Regex> {
    match kind {
        FieldKind::Amount => Some(&AMOUNT_RE),
        FieldKind::Ssn => Some(&SSN_RE),
        FieldKind::Ein => Some(&EIN_RE),
        FieldKind::Tin => Some(&TIN_RE),
        FieldKind::Phone => Some(&PHONE_RE),
        FieldKind::Zip => Some(&ZIP_RE),
        FieldKind::Year => Some(&YEAR_RE),
        FieldKind::Date => Some(&DATE_RE),
        FieldKind::Text => None,
    }
}

/// First occurrence of a kind's pattern in `text`. For amounts, a match that
/// looks like money (`$`, `,` or cents) is preferred over a bare number such
/// as a box label.
pub fn find_value(kind: FieldKind, text: &str) -> Option<String> {
    let pattern = pattern_for(kind)?;
    if kind == FieldKind::Amount {
        let mut first = None;
        for m in pattern.find_iter(text) {
            let s = m.as_str().trim();
            if looks_like_money(s) {
                return Some(s.to_string());
            }
            first.get_or_insert_with(|| s.to_string());
        }
        return first;
    }
    pattern.find(text).map(|m| m.as_str().trim().to_string())
}

/// `$`, a thousands separator or a decimal point.
pub fn looks_like_money(token: &str) -> bool {
    token.contains(['$', ',', '.'])
}

/// Every value of a kind in `text`, left to right. Bare one- and two-digit
/// integers are box numbers on printed forms, never amounts.
pub fn candidates(kind: FieldKind, text: &str) -> Vec<String> {
    let Some(pattern) = pattern_for(kind) else {
        return Vec::new();
    };
    pattern
        .find_iter(text)
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| kind != FieldKind::Amount || !is_box_number(s))
        .collect()
}

/// The candidate a lone label most likely refers to: money-looking amounts
/// first, otherwise the leftmost.
pub fn preferred(kind: FieldKind, candidates: Vec<String>) -> Option<String> {
    if kind == FieldKind::Amount {
        if let Some(money) = candidates.iter().find(|c| looks_like_money(c)) {
            return Some(money.clone());
        }
    }
    candidates.into_iter().next()
}

fn is_box_number(token: &str) -> bool {
    token.len() <= 2 && token.chars().all(|c| c.is_ascii_digit())
}

/// Coerce a raw string into the kind's typed value.
/// Years and identifiers stay text; blank input is `None`.
pub fn coerce(kind: FieldKind, raw: &str) -> Option<FieldValue> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("null") || raw.eq_ignore_ascii_case("n/a") {
        return None;
    }
    match kind {
        FieldKind::Amount => parse_amount(raw).map(FieldValue::Number),
        FieldKind::Date => parse_date(raw).map(FieldValue::Date),
        FieldKind::Text => Some(FieldValue::Text(raw.to_string())),
        _ => find_value(kind, raw)
            .or_else(|| bare_identifier(kind, raw))
            .or_else(|| malformed_taxpayer_id(kind, raw))
            .map(FieldValue::Text),
    }
}

/// A taxpayer id answer that carries digits but not the expected shape is
/// kept verbatim so validation can flag it.
fn malformed_taxpayer_id(kind: FieldKind, raw: &str) -> Option<String> {
    let taxpayer_id = matches!(kind, FieldKind::Ssn | FieldKind::Ein | FieldKind::Tin);
    (taxpayer_id && raw.chars().any(|c| c.is_ascii_digit())).then(|| raw.to_string())
}

/// Coerce a JSON value from a model response.
pub fn coerce_json(kind: FieldKind, value: &serde_json::Value) -> Option<FieldValue> {
    match value {
        serde_json::Value::Null | serde_json::Value::Bool(_) => None,
        serde_json::Value::Number(n) => match kind {
            FieldKind::Amount => n.as_f64().map(FieldValue::Number),
            _ => coerce(kind, &n.to_string()),
        },
        serde_json::Value::String(s) => coerce(kind, s),
        _ => None,
    }
}

/// `$50,000.00` → 50000.0, `(1,234.00)` → -1234.0, `-12.5` → -12.5.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let token = find_value(FieldKind::Amount, raw)?;
    let negative = token.starts_with('-') || (token.starts_with('(') && token.ends_with(')'));
    let digits: String = token
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let value: f64 = digits.parse().ok()?;
    Some(if negative { -value } else { value })
}

/// ISO first, then US (month first), then European day-first forms,
/// then month names. Two-digit years are tried before four-digit ones.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let token = DATE_RE.find(raw).map(|m| m.as_str()).unwrap_or(raw.trim());
    const FORMATS: &[&str] = &[
        "%Y-%m-%d",
        "%m/%d/%y",
        "%m/%d/%Y",
        "%m-%d-%Y",
        "%d/%m/%Y",
        "%d-%m-%Y",
        "%d.%m.%Y",
        "%B %d, %Y",
        "%B %d %Y",
        "%b %d, %Y",
        "%b %d %Y",
        "%b. %d, %Y",
    ];
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(token, fmt).ok())
}

/// Identifiers sometimes arrive as bare digit strings (`123456789`).
fn bare_identifier(kind: FieldKind, raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    let expected = match kind {
        FieldKind::Ssn | FieldKind::Ein | FieldKind::Tin => 9,
        FieldKind::Zip => 5,
        FieldKind::Phone => 10,
        FieldKind::Year => 4,
        _ => return None,
    };
    (digits.len() == expected && digits.len() == raw.len()).then_some(digits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_currency_amounts() {
        assert_eq!(parse_amount("$50,000.00"), Some(50000.0));
        assert_eq!(parse_amount("8,500.00"), Some(8500.0));
        assert_eq!(parse_amount("(1,234.00)"), Some(-1234.0));
        assert_eq!(parse_amount("-12.50"), Some(-12.5));
        assert_eq!(parse_amount("USD 1200"), Some(1200.0));
        assert_eq!(parse_amount("none"), None);
    }

    #[test]
    fn money_match_beats_box_number() {
        assert_eq!(
            find_value(FieldKind::Amount, "(box 1) $50,000.00").as_deref(),
            Some("$50,000.00")
        );
        assert_eq!(find_value(FieldKind::Amount, "total 1200").as_deref(), Some("1200"));
    }

    #[test]
    fn box_numbers_are_not_amount_candidates() {
        assert_eq!(
            candidates(FieldKind::Amount, "1 50000.00 2 8500.00 12"),
            vec!["50000.00", "8500.00"]
        );
        assert_eq!(candidates(FieldKind::Amount, " 2 "), Vec::<String>::new());
        assert_eq!(candidates(FieldKind::Amount, "total 120"), vec!["120"]);
        assert!(candidates(FieldKind::Text, "anything").is_empty());
    }

    #[test]
    fn preferred_amount_looks_like_money() {
        let found = candidates(FieldKind::Amount, "box 100 $1,520.10");
        assert_eq!(preferred(FieldKind::Amount, found).as_deref(), Some("$1,520.10"));
        let found = candidates(FieldKind::Year, "2023 then 2024");
        assert_eq!(preferred(FieldKind::Year, found).as_deref(), Some("2023"));
    }

    #[test]
    fn parses_dates_in_common_formats() {
        let jan15 = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(parse_date("2024-01-15"), Some(jan15));
        assert_eq!(parse_date("01/15/2024"), Some(jan15));
        assert_eq!(parse_date("15/01/2024"), Some(jan15));
        assert_eq!(parse_date("15.01.2024"), Some(jan15));
        assert_eq!(parse_date("Pay date: January 15, 2024"), Some(jan15));
        assert_eq!(parse_date("Jan 15, 2024"), Some(jan15));
        assert_eq!(parse_date("soon"), None);
    }

    #[test]
    fn us_order_wins_when_ambiguous() {
        assert_eq!(parse_date("02/03/2024"), NaiveDate::from_ymd_opt(2024, 2, 3));
    }

    #[test]
    fn identifiers_stay_text() {
        assert_eq!(
            coerce(FieldKind::Ssn, "SSN: 123-45-6789"),
            Some(FieldValue::Text("123-45-6789".into()))
        );
        assert_eq!(
            coerce(FieldKind::Ein, "12-3456789"),
            Some(FieldValue::Text("12-3456789".into()))
        );
        assert_eq!(
            coerce(FieldKind::Tin, "123456789"),
            Some(FieldValue::Text("123456789".into()))
        );
        assert_eq!(coerce(FieldKind::Ssn, "unknown"), None);
        assert_eq!(
            coerce(FieldKind::Ssn, "XXX-XX-1234"),
            Some(FieldValue::Text("XXX-XX-1234".into()))
        );
    }

    #[test]
    fn year_is_text() {
        assert_eq!(coerce(FieldKind::Year, "Tax year 2024"), Some(FieldValue::Text("2024".into())));
    }

    #[test]
    fn json_values_coerce_by_kind() {
        let v = serde_json::json!(50000);
        assert_eq!(coerce_json(FieldKind::Amount, &v), Some(FieldValue::Number(50000.0)));
        assert_eq!(coerce_json(FieldKind::Year, &v), None);
        assert_eq!(
            coerce_json(FieldKind::Year, &serde_json::json!(2024)),
            Some(FieldValue::Text("2024".into()))
        );
        assert_eq!(coerce_json(FieldKind::Amount, &serde_json::Value::Null), None);
        assert_eq!(
            coerce_json(FieldKind::Text, &serde_json::json!(" ACME Corp ")),
            Some(FieldValue::Text("ACME Corp".into()))
        );
    }

    #[test]
    fn blank_and_null_strings_are_absent() {
        assert_eq!(coerce(FieldKind::Text, "  "), None);
        assert_eq!(coerce(FieldKind::Amount, "null"), None);
    }
}
