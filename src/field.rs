use std::sync::OnceLock;

use chrono::NaiveDate;

use crate::config::Messages;
use crate::regex::Regex;
use crate::rules::Bounds;

pub const PHONE_DIGITS: usize = 10;

const EMAIL_PATTERN: &str = r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$";

/// Validity record of one bound field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FieldState {
    #[default]
    Unvalidated,
    Valid,
    Invalid(String),
}

impl FieldState {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, Self::Invalid(_))
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Invalid(reason) => Some(reason.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldIssue {
    PhoneLength,
    InvalidEmail,
    PastDate,
}

impl FieldIssue {
    pub fn message<'a>(&self, messages: &'a Messages) -> &'a str {
        match self {
            Self::PhoneLength => &messages.phone,
            Self::InvalidEmail => &messages.email,
            Self::PastDate => &messages.past_date,
        }
    }
}

/// Outcome of a rule check on blur or change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Drop the rule's custom message and any invalid marker.
    Clear,
    Reject(FieldIssue),
}

/// Keeps ASCII digits only, at most [`PHONE_DIGITS`] of them.
pub fn sanitize_phone(raw: &str) -> String {
    raw.chars()
        .filter(char::is_ascii_digit)
        .take(PHONE_DIGITS)
        .collect()
}

pub fn phone_verdict(value: &str) -> Verdict {
    let len = value.chars().count();
    if len > 0 && len != PHONE_DIGITS {
        Verdict::Reject(FieldIssue::PhoneLength)
    } else {
        Verdict::Clear
    }
}

fn email_regex() -> Option<&'static Regex> {
    static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
    EMAIL
        .get_or_init(|| Regex::new(EMAIL_PATTERN).ok())
        .as_ref()
}

pub fn email_verdict(value: &str) -> Verdict {
    let email = value.trim();
    if email.is_empty() {
        return Verdict::Clear;
    }
    let matched = email_regex().is_some_and(|regex| matches!(regex.is_match(email), Ok(true)));
    if matched {
        Verdict::Clear
    } else {
        Verdict::Reject(FieldIssue::InvalidEmail)
    }
}

/// Longest numeric prefix after leading whitespace, as `parseFloat` reads it.
/// `None` stands for not-a-number.
pub fn parse_float(raw: &str) -> Option<f64> {
    float_prefix(raw.trim_start()).map(|(value, _)| value)
}

/// Whole-string conversion, as `Number(value)` coerces a string: surrounding
/// whitespace is ignored, empty text is zero, and trailing garbage is
/// not-a-number.
pub fn parse_number(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() {
        return Some(0.0);
    }
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16).ok().map(|value| value as f64);
    }
    match float_prefix(s) {
        Some((value, len)) if len == s.len() => Some(value),
        _ => None,
    }
}

/// Value and byte length of the numeric literal at the start of `s`.
fn float_prefix(s: &str) -> Option<(f64, usize)> {
    let bytes = s.as_bytes();
    let mut i = 0usize;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        i += 1;
    }
    if s[i..].starts_with("Infinity") {
        let value = if s.starts_with('-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
        return Some((value, i + "Infinity".len()));
    }

    let int_start = i;
    while bytes.get(i).is_some_and(u8::is_ascii_digit) {
        i += 1;
    }
    let mut digits = i - int_start;
    if bytes.get(i) == Some(&b'.') {
        let frac_start = i + 1;
        let mut j = frac_start;
        while bytes.get(j).is_some_and(u8::is_ascii_digit) {
            j += 1;
        }
        digits += j - frac_start;
        if digits > 0 {
            i = j;
        }
    }
    if digits == 0 {
        return None;
    }

    if matches!(bytes.get(i), Some(b'e') | Some(b'E')) {
        let mut j = i + 1;
        if matches!(bytes.get(j), Some(b'+') | Some(b'-')) {
            j += 1;
        }
        let exp_start = j;
        while bytes.get(j).is_some_and(u8::is_ascii_digit) {
            j += 1;
        }
        if j > exp_start {
            i = j;
        }
    }

    s[..i].parse::<f64>().ok().map(|value| (value, i))
}

/// Same rendering a number input uses: integral values without a fraction,
/// others without trailing zeros.
pub fn format_number(value: f64) -> String {
    if value.fract().abs() < 1e-9 {
        format!("{value:.0}")
    } else {
        let mut out = value.to_string();
        if out.contains('.') {
            while out.ends_with('0') {
                out.pop();
            }
            if out.ends_with('.') {
                out.pop();
            }
        }
        out
    }
}

/// New value for a bounded number field, or `None` to leave `raw` untouched.
/// Bounds with a max read the numeric prefix; a lone lower bound needs the
/// whole text to be a number.
pub fn clamp_number(raw: &str, bounds: &Bounds) -> Option<String> {
    let value = if bounds.max.is_some() {
        parse_float(raw)?
    } else {
        parse_number(raw)?
    };
    bounds.clamp(value).map(format_number)
}

/// Strict `YYYY-MM-DD`, the value format of a date input.
pub fn parse_date_input(raw: &str) -> Option<NaiveDate> {
    let bytes = raw.as_bytes();
    let shaped = bytes.len() == 10
        && bytes.iter().enumerate().all(|(idx, b)| match idx {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !shaped {
        return None;
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

pub fn format_date_input(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Rejects dates strictly before `today`; empty or unparseable values pass.
pub fn date_verdict(value: &str, today: NaiveDate) -> Verdict {
    match parse_date_input(value) {
        Some(date) if date < today => Verdict::Reject(FieldIssue::PastDate),
        _ => Verdict::Clear,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
    }

    #[test]
    fn sanitize_phone_strips_and_truncates() {
        assert_eq!(sanitize_phone("(555) 010-9999"), "5550109999");
        assert_eq!(sanitize_phone("+1 555 010 9999 22"), "1555010999");
        assert_eq!(sanitize_phone("call me"), "");
        assert_eq!(sanitize_phone("٣٤٥"), "");
    }

    #[test]
    fn phone_verdict_requires_exactly_ten() {
        assert_eq!(phone_verdict(""), Verdict::Clear);
        assert_eq!(phone_verdict("5550109999"), Verdict::Clear);
        assert_eq!(
            phone_verdict("555"),
            Verdict::Reject(FieldIssue::PhoneLength)
        );
        assert_eq!(
            phone_verdict("55501099991"),
            Verdict::Reject(FieldIssue::PhoneLength)
        );
    }

    #[test]
    fn email_verdict_examples() {
        assert_eq!(email_verdict("a@b.co"), Verdict::Clear);
        assert_eq!(email_verdict("  a@b.co  "), Verdict::Clear);
        assert_eq!(email_verdict(""), Verdict::Clear);
        assert_eq!(email_verdict("   "), Verdict::Clear);
        assert_eq!(
            email_verdict("a@b"),
            Verdict::Reject(FieldIssue::InvalidEmail)
        );
        assert_eq!(
            email_verdict("a b@c.de"),
            Verdict::Reject(FieldIssue::InvalidEmail)
        );
        assert_eq!(
            email_verdict("x@y.c"),
            Verdict::Reject(FieldIssue::InvalidEmail)
        );
    }

    #[test]
    fn parse_float_reads_numeric_prefix() {
        assert_eq!(parse_float("42"), Some(42.0));
        assert_eq!(parse_float("  -5.5kg"), Some(-5.5));
        assert_eq!(parse_float(".5"), Some(0.5));
        assert_eq!(parse_float("5."), Some(5.0));
        assert_eq!(parse_float("1e3x"), Some(1000.0));
        assert_eq!(parse_float("2e"), Some(2.0));
        assert_eq!(parse_float("-Infinity"), Some(f64::NEG_INFINITY));
        assert_eq!(parse_float("abc"), None);
        assert_eq!(parse_float(""), None);
        assert_eq!(parse_float("-"), None);
        assert_eq!(parse_float("."), None);
    }

    #[test]
    fn parse_number_needs_the_whole_text() {
        assert_eq!(parse_number(" -5 "), Some(-5.0));
        assert_eq!(parse_number(""), Some(0.0));
        assert_eq!(parse_number("1e3"), Some(1000.0));
        assert_eq!(parse_number("0x10"), Some(16.0));
        assert_eq!(parse_number("-Infinity"), Some(f64::NEG_INFINITY));
        assert_eq!(parse_number("-5abc"), None);
        assert_eq!(parse_number("2e"), None);
        assert_eq!(parse_number("inf"), None);
    }

    #[test]
    fn clamp_number_examples() {
        let percent = Bounds::percentage();
        assert_eq!(clamp_number("150", &percent).as_deref(), Some("100"));
        assert_eq!(clamp_number("-5", &percent).as_deref(), Some("0"));
        assert_eq!(clamp_number("50", &percent), None);
        assert_eq!(clamp_number("abc", &percent), None);
        assert_eq!(clamp_number("Infinity", &percent).as_deref(), Some("100"));

        let non_negative = Bounds::non_negative();
        assert_eq!(clamp_number("-0.5", &non_negative).as_deref(), Some("0"));
        assert_eq!(clamp_number("1000000", &non_negative), None);
        assert_eq!(clamp_number("-5abc", &non_negative), None);
        assert_eq!(clamp_number("-5abc", &percent).as_deref(), Some("0"));
    }

    #[test]
    fn format_number_drops_trailing_zeros() {
        assert_eq!(format_number(100.0), "100");
        assert_eq!(format_number(0.0), "0");
        assert_eq!(format_number(12.5), "12.5");
    }

    #[test]
    fn date_input_is_strict() {
        assert_eq!(parse_date_input("2026-03-10"), Some(date(2026, 3, 10)));
        assert_eq!(parse_date_input("2026-3-10"), None);
        assert_eq!(parse_date_input("2026-02-30"), None);
        assert_eq!(parse_date_input("10/03/2026"), None);
        assert_eq!(format_date_input(date(2026, 3, 1)), "2026-03-01");
    }

    #[test]
    fn date_verdict_rejects_only_the_past() {
        let today = date(2026, 3, 10);
        assert_eq!(
            date_verdict("2026-03-09", today),
            Verdict::Reject(FieldIssue::PastDate)
        );
        assert_eq!(date_verdict("2026-03-10", today), Verdict::Clear);
        assert_eq!(date_verdict("2027-01-01", today), Verdict::Clear);
        assert_eq!(date_verdict("", today), Verdict::Clear);
    }

    #[test]
    fn field_state_helpers() {
        let invalid = FieldState::Invalid("bad".into());
        assert!(invalid.is_invalid());
        assert_eq!(invalid.reason(), Some("bad"));
        assert!(FieldState::Valid.is_valid());
        assert_eq!(FieldState::default(), FieldState::Unvalidated);
    }
}
