use chrono::{Duration, NaiveDate};
use form_guard::{
    Bounds, FieldIssue, GuardConfig, Page, Verdict, clamp_number, date_verdict, email_verdict,
    format_date_input, phone_verdict, sanitize_phone,
};
use proptest::collection::vec;
use proptest::prelude::*;
use proptest::test_runner::{FileFailurePersistence, TestCaseError, TestCaseResult};

const FIELD_PROPTEST_REGRESSION_FILE: &str = "tests/proptest-regressions/field_property_test.txt";
const DEFAULT_FIELD_PROPTEST_CASES: u32 = 128;

const SIGNUP_HTML: &str = r#"
<form id="signup" novalidate>
  <input id="phone" name="phone" type="text" pattern="[0-9]{10}">
  <input id="email" name="email" type="email" required>
  <input id="discount" name="discount" type="number" min="0" max="100">
  <input id="travel" name="travel" type="date" min="today">
  <button id="go">Go</button>
</form>
"#;

fn field_proptest_cases() -> u32 {
    std::env::var("FORM_GUARD_PROPTEST_CASES")
        .ok()
        .and_then(|raw| raw.parse::<u32>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_FIELD_PROPTEST_CASES)
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 10).unwrap_or_default()
}

fn phone_text_strategy() -> BoxedStrategy<String> {
    vec(
        prop_oneof![
            4 => proptest::char::range('0', '9'),
            1 => Just(' '),
            1 => Just('-'),
            1 => Just('('),
            1 => Just(')'),
            1 => Just('+'),
            1 => Just('x'),
            1 => Just('٣'),
        ],
        0..=24,
    )
    .prop_map(|chars| chars.into_iter().collect())
    .boxed()
}

fn valid_email_strategy() -> BoxedStrategy<String> {
    (
        "[A-Za-z0-9._%+-]{1,12}",
        "[A-Za-z0-9-]{1,10}",
        "[A-Za-z]{2,6}",
        "[ ]{0,3}",
    )
        .prop_map(|(local, domain, tld, pad)| format!("{pad}{local}@{domain}.{tld}{pad}"))
        .boxed()
}

fn near_miss_email_strategy() -> BoxedStrategy<String> {
    let local = "[A-Za-z0-9._%+-]{1,8}";
    let label = "[A-Za-z0-9-]{1,8}";
    prop_oneof![
        1 => (local, label, "[A-Za-z]").prop_map(|(l, d, t)| format!("{l}@{d}.{t}")),
        1 => (local, label, "[A-Za-z]{2,4}").prop_map(|(l, d, t)| format!("{l}@@{d}.{t}")),
        1 => (local, label).prop_map(|(l, d)| format!("{l}@{d}")),
        1 => (label, "[A-Za-z]{2,4}").prop_map(|(d, t)| format!("@{d}.{t}")),
        1 => (local, label, "[A-Za-z]{2,4}").prop_map(|(l, d, t)| format!("{l}@{d}.{t}1")),
        1 => (local, label, "[A-Za-z]{2,4}").prop_map(|(l, d, t)| format!("{l} x@{d}.{t}")),
        1 => (local, label, "[A-Za-z]{1,4}").prop_map(|(l, d, t)| format!("{l}@{d}.{t}")),
    ]
    .boxed()
}

/// Character-level reading of `^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$`.
fn email_shape_matches(email: &str) -> bool {
    let local_char = |ch: char| ch.is_ascii_alphanumeric() || "._%+-".contains(ch);
    let domain_char = |ch: char| ch.is_ascii_alphanumeric() || ".-".contains(ch);
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || !local.chars().all(local_char) {
        return false;
    }
    domain.char_indices().any(|(dot, ch)| {
        let (host, tld) = (&domain[..dot], &domain[dot + 1..]);
        ch == '.'
            && !host.is_empty()
            && host.chars().all(domain_char)
            && tld.len() >= 2
            && tld.chars().all(|c| c.is_ascii_alphabetic())
    })
}

#[derive(Clone, Debug)]
enum FormAction {
    TypePhone(String),
    TypeEmail(String),
    TypeDiscount(String),
    PickDate(i64),
    Blur(&'static str),
    Submit,
}

fn form_action_strategy() -> BoxedStrategy<FormAction> {
    prop_oneof![
        3 => phone_text_strategy().prop_map(FormAction::TypePhone),
        3 => "[a-z@. ]{0,12}".prop_map(FormAction::TypeEmail),
        2 => "-?[0-9]{1,4}|[a-z]{1,3}".prop_map(FormAction::TypeDiscount),
        2 => (-30i64..30).prop_map(FormAction::PickDate),
        2 => prop_oneof![Just("#phone"), Just("#email"), Just("#discount"), Just("#travel")]
            .prop_map(FormAction::Blur),
        1 => Just(FormAction::Submit),
    ]
    .boxed()
}

fn run_form_action(page: &mut Page, action: &FormAction) -> form_guard::Result<()> {
    match action {
        FormAction::TypePhone(text) => page.type_text("#phone", text),
        FormAction::TypeEmail(text) => page.type_text("#email", text),
        FormAction::TypeDiscount(text) => page.type_text("#discount", text),
        FormAction::PickDate(offset) => {
            let date = today() + Duration::days(*offset);
            page.set_date("#travel", &format_date_input(date))
        }
        FormAction::Blur(selector) => page.blur(selector),
        FormAction::Submit => page.submit("#signup"),
    }
}

fn assert_markers_stay_exclusive(actions: &[FormAction]) -> TestCaseResult {
    let config = GuardConfig::default().with_today(today());
    let mut page = Page::from_html_with(SIGNUP_HTML, config)
        .map_err(|err| TestCaseError::fail(format!("{err:?}")))?;

    for (step, action) in actions.iter().enumerate() {
        if let Err(error) = run_form_action(&mut page, action) {
            prop_assert!(
                false,
                "action returned error at step {step}: {action:?}, error={error:?}"
            );
        }
        for selector in ["#phone", "#email", "#discount", "#travel"] {
            let valid = page
                .has_class(selector, "is-valid")
                .map_err(|err| TestCaseError::fail(format!("{err:?}")))?;
            let invalid = page
                .has_class(selector, "is-invalid")
                .map_err(|err| TestCaseError::fail(format!("{err:?}")))?;
            prop_assert!(
                !(valid && invalid),
                "{selector} carries both markers after step {step}: {action:?}"
            );
        }
        let phone = page
            .value("#phone")
            .map_err(|err| TestCaseError::fail(format!("{err:?}")))?;
        prop_assert!(phone.len() <= 10 && phone.chars().all(|ch| ch.is_ascii_digit()));
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: field_proptest_cases(),
        failure_persistence: Some(Box::new(
            FileFailurePersistence::Direct(FIELD_PROPTEST_REGRESSION_FILE),
        )),
        .. ProptestConfig::default()
    })]

    #[test]
    fn phone_sanitizer_keeps_first_ten_digits(raw in phone_text_strategy()) {
        let expected = raw
            .chars()
            .filter(|ch| ch.is_ascii_digit())
            .take(10)
            .collect::<String>();
        let sanitized = sanitize_phone(&raw);
        prop_assert_eq!(&sanitized, &expected);
        prop_assert!(sanitized.chars().count() <= 10);
    }

    #[test]
    fn phone_blur_rejects_only_partial_numbers(raw in phone_text_strategy()) {
        let sanitized = sanitize_phone(&raw);
        let partial = !sanitized.is_empty() && sanitized.len() < 10;
        prop_assert_eq!(
            phone_verdict(&sanitized) == Verdict::Reject(FieldIssue::PhoneLength),
            partial
        );
    }

    #[test]
    fn well_formed_emails_pass(email in valid_email_strategy()) {
        prop_assert_eq!(email_verdict(&email), Verdict::Clear);
    }

    #[test]
    fn emails_without_at_sign_are_rejected(raw in "[A-Za-z0-9. ]{0,16}") {
        let expected = if raw.trim().is_empty() {
            Verdict::Clear
        } else {
            Verdict::Reject(FieldIssue::InvalidEmail)
        };
        prop_assert_eq!(email_verdict(&raw), expected);
    }

    #[test]
    fn near_miss_emails_follow_the_address_shape(raw in near_miss_email_strategy()) {
        let expected = if email_shape_matches(raw.trim()) {
            Verdict::Clear
        } else {
            Verdict::Reject(FieldIssue::InvalidEmail)
        };
        prop_assert_eq!(email_verdict(&raw), expected, "raw={:?}", raw);
    }

    #[test]
    fn percentage_clamp_matches_min_max(x in -1000i32..1000) {
        let raw = x.to_string();
        let expected = if x > 100 {
            Some("100".to_string())
        } else if x < 0 {
            Some("0".to_string())
        } else {
            None
        };
        prop_assert_eq!(clamp_number(&raw, &Bounds::percentage()), expected);
    }

    #[test]
    fn non_numeric_text_is_left_alone(raw in "[a-zA-Z ]{0,8}") {
        prop_assert_eq!(clamp_number(&raw, &Bounds::percentage()), None);
        prop_assert_eq!(clamp_number(&raw, &Bounds::non_negative()), None);
    }

    #[test]
    fn clamp_is_idempotent(raw in "[-+ ]?[0-9]{0,5}(\\.[0-9]{0,3})?(e[-+]?[0-9]{1,3})?[a-z]?") {
        for bounds in [Bounds::percentage(), Bounds::non_negative()] {
            let once = clamp_number(&raw, &bounds).unwrap_or_else(|| raw.clone());
            prop_assert_eq!(clamp_number(&once, &bounds), None, "raw={:?} once={:?}", raw, once);
        }
    }

    #[test]
    fn future_date_rejects_exactly_the_past(offset in -800i64..800) {
        let date = today() + Duration::days(offset);
        let verdict = date_verdict(&format_date_input(date), today());
        prop_assert_eq!(
            verdict == Verdict::Reject(FieldIssue::PastDate),
            offset < 0
        );
    }

    #[test]
    fn typed_phone_matches_the_sanitizer(raw in phone_text_strategy()) {
        let mut page = Page::from_html(SIGNUP_HTML)
            .map_err(|err| TestCaseError::fail(format!("{err:?}")))?;
        page.type_text("#phone", &raw)
            .map_err(|err| TestCaseError::fail(format!("{err:?}")))?;
        let value = page
            .value("#phone")
            .map_err(|err| TestCaseError::fail(format!("{err:?}")))?;
        prop_assert_eq!(value, sanitize_phone(&raw));
    }

    #[test]
    fn marker_classes_stay_mutually_exclusive(actions in vec(form_action_strategy(), 1..=20)) {
        assert_markers_stay_exclusive(&actions)?;
    }
}
