use form_guard::{Error, GuardConfig, Page};

const PHONE_FORM_HTML: &str = r#"
<form id="contact" novalidate>
  <input id="phone" name="phone" type="text" pattern="[0-9]{10}">
  <select id="topic" name="topic"><option>General</option></select>
</form>
"#;

#[test]
fn trace_logs_binding_rule_work_and_events() -> form_guard::Result<()> {
    let mut page = Page::parse(PHONE_FORM_HTML, GuardConfig::default())?;
    page.enable_trace(true);
    page.set_trace_stderr(false);

    assert!(page.ready()?);
    let logs = page.take_trace_logs();
    assert!(
        logs.iter().any(|line| line == "[guard] bind phone fields=1"),
        "{logs:?}"
    );
    assert!(
        logs.iter().any(|line| line == "[guard] bind email fields=0"),
        "{logs:?}"
    );
    assert!(
        logs.iter()
            .any(|line| line.starts_with("[guard] ready forms=1 controls=2")),
        "{logs:?}"
    );

    page.type_text("#phone", "12a3")?;
    let logs = page.take_trace_logs();
    assert!(
        logs.iter()
            .any(|line| line == r#"[guard] phone input#phone input "12a3" -> "123""#),
        "{logs:?}"
    );
    assert!(
        logs.iter()
            .any(|line| line.starts_with("[event] done input target=input#phone")),
        "{logs:?}"
    );

    page.set_trace_events(false);
    page.blur("#phone")?;
    let logs = page.take_trace_logs();
    assert!(logs.iter().all(|line| !line.starts_with("[event]")), "{logs:?}");
    assert!(
        logs.iter().any(|line| line.contains("verdict=Reject(PhoneLength)")),
        "{logs:?}"
    );

    page.set_trace_guard(false);
    page.type_text("#phone", "x")?;
    assert!(page.take_trace_logs().is_empty());
    Ok(())
}

#[test]
fn trace_is_off_by_default() -> form_guard::Result<()> {
    let mut page = Page::from_html(PHONE_FORM_HTML)?;
    page.type_text("#phone", "555")?;
    page.blur("#phone")?;
    assert!(page.take_trace_logs().is_empty());
    Ok(())
}

#[test]
fn trace_log_limit_keeps_newest_lines() -> form_guard::Result<()> {
    let mut page = Page::from_html(PHONE_FORM_HTML)?;
    page.enable_trace(true);
    page.set_trace_stderr(false);

    assert!(matches!(
        page.set_trace_log_limit(0),
        Err(Error::InvalidConfig(_))
    ));

    page.set_trace_log_limit(2)?;
    page.type_text("#phone", "(555) 010")?;
    page.blur("#phone")?;
    let logs = page.take_trace_logs();
    assert_eq!(logs.len(), 2, "{logs:?}");
    assert!(logs[1].starts_with("[event] done blur"), "{logs:?}");
    Ok(())
}

#[test]
fn host_misuse_is_reported_as_errors() -> form_guard::Result<()> {
    let mut page = Page::from_html(PHONE_FORM_HTML)?;

    assert_eq!(
        page.value("#missing"),
        Err(Error::SelectorNotFound("#missing".into()))
    );
    assert!(matches!(
        page.value("input["),
        Err(Error::UnsupportedSelector(_))
    ));
    assert!(matches!(
        page.type_text("#topic", "x"),
        Err(Error::TypeMismatch { .. })
    ));
    assert!(matches!(
        page.set_date("#phone", "2026-01-01"),
        Err(Error::TypeMismatch { .. })
    ));
    assert!(matches!(
        page.set_checked("#phone", true),
        Err(Error::TypeMismatch { .. })
    ));
    assert!(matches!(
        Page::from_html("<form><input id='a'"),
        Err(Error::HtmlParse(_))
    ));
    Ok(())
}

#[test]
fn failed_assertions_carry_a_dom_snippet() -> form_guard::Result<()> {
    let mut page = Page::from_html(PHONE_FORM_HTML)?;
    page.type_text("#phone", "123")?;

    match page.assert_value("#phone", "999") {
        Err(Error::AssertionFailed {
            selector,
            expected,
            actual,
            dom_snippet,
        }) => {
            assert_eq!(selector, "#phone");
            assert_eq!(expected, "999");
            assert_eq!(actual, "123");
            assert!(dom_snippet.starts_with("<input"), "{dom_snippet}");
        }
        other => panic!("expected assertion failure, got {other:?}"),
    }

    assert!(matches!(
        page.assert_focused("#topic"),
        Err(Error::AssertionFailed { .. })
    ));
    assert!(matches!(
        page.assert_valid("#phone"),
        Err(Error::AssertionFailed { .. })
    ));
    Ok(())
}

#[test]
fn invalid_configuration_is_rejected_before_parsing() {
    let mut config = GuardConfig::default();
    config.markers.invalid = "is-valid".into();
    assert!(matches!(
        Page::from_html_with(PHONE_FORM_HTML, config),
        Err(Error::InvalidConfig(_))
    ));
}

#[test]
fn select_option_fires_input_and_change() -> form_guard::Result<()> {
    let html = r#"
    <div id="wrap">
      <select id="size" name="size" required>
        <option value="">Pick</option>
        <option value="s">Small</option>
      </select>
    </div>
    "#;
    let mut page = Page::from_html(html)?;
    page.record_events("#wrap", "input")?;
    page.record_events("#wrap", "change")?;

    page.select_option("#size", "s")?;
    page.assert_value("#size", "s")?;
    page.assert_valid("#size")?;
    assert_eq!(page.active_element().as_deref(), Some("select#size"));

    let kinds = page
        .recorded_events()
        .iter()
        .map(|event| event.event_type.as_str())
        .collect::<Vec<_>>();
    assert_eq!(kinds, vec!["input", "change"]);
    Ok(())
}

#[test]
fn validity_queries_expose_constraint_flags() -> form_guard::Result<()> {
    let mut page = Page::from_html(PHONE_FORM_HTML)?;
    page.type_text("#phone", "12")?;

    let validity = page.validity("#phone")?;
    assert!(validity.pattern_mismatch);
    assert!(!validity.valid);
    assert_eq!(
        page.validation_message("#phone")?,
        "Please match the requested format."
    );
    assert!(!page.is_validated("#contact")?);
    assert!(page.has_class("#contact", "was-validated").map(|has| !has)?);
    Ok(())
}
