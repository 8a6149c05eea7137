//! Client-side validation rules for HTML forms.
//!
//! `form_guard` binds a fixed table of field rules to a document once it is
//! ready: phone inputs are sanitized to digits, email and phone inputs are
//! checked on blur, bounded number inputs are clamped while typing, travel
//! dates may not lie in the past, and every form gates its submission on
//! constraint validation. Validity is tracked per field as a [`FieldState`]
//! and rendered into marker classes (`is-valid`, `is-invalid`,
//! `was-validated`).
//!
//! [`Page`] hosts the rules on a deterministic in-memory DOM so the whole
//! behavior can be driven and asserted from Rust tests:
//!
//! ```
//! use form_guard::Page;
//!
//! let html = r#"
//! <form id="booking" novalidate>
//!   <input id="phone" type="text" pattern="[0-9]{10}">
//! </form>
//! "#;
//!
//! let mut page = Page::from_html(html)?;
//! page.type_text("#phone", "(555) 010-9999 ext 4")?;
//! page.assert_value("#phone", "5550109999")?;
//! # Ok::<(), form_guard::Error>(())
//! ```
//!
//! On `wasm32` targets the same rules can be installed on the real browser
//! document through [`web::install`].

use std::error::Error as StdError;
use std::fmt;

mod config;
mod dom;
mod events;
mod field;
mod guard;
mod html;
mod markers;
mod page;
mod regex;
mod rules;
mod selector;
mod validity;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use config::{Clock, GuardConfig, MarkerClasses, Messages};
pub use field::{
    FieldIssue, FieldState, PHONE_DIGITS, Verdict, clamp_number, date_verdict, email_verdict,
    format_date_input, format_number, parse_date_input, parse_float, parse_number, phone_verdict,
    sanitize_phone,
};
pub use markers::{MarkerChange, marker_change};
pub use page::{Page, RecordedEvent, ScrollBehavior, ScrollBlock, ScrollIntoView, Submission};
pub use rules::{AttrSource, Bounds, FIELD_RULES, FieldKind, FieldRule};
pub use validity::ValidityState;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    HtmlParse(String),
    SelectorNotFound(String),
    UnsupportedSelector(String),
    TypeMismatch {
        selector: String,
        expected: String,
        actual: String,
    },
    AssertionFailed {
        selector: String,
        expected: String,
        actual: String,
        dom_snippet: String,
    },
    InvalidConfig(String),
    Runtime(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HtmlParse(msg) => write!(f, "html parse error: {msg}"),
            Self::SelectorNotFound(selector) => write!(f, "selector not found: {selector}"),
            Self::UnsupportedSelector(selector) => write!(f, "unsupported selector: {selector}"),
            Self::TypeMismatch {
                selector,
                expected,
                actual,
            } => write!(
                f,
                "type mismatch for {selector}: expected {expected}, actual {actual}"
            ),
            Self::AssertionFailed {
                selector,
                expected,
                actual,
                dom_snippet,
            } => write!(
                f,
                "assertion failed for {selector}: expected {expected}, actual {actual}, snippet {dom_snippet}"
            ),
            Self::InvalidConfig(msg) => write!(f, "invalid configuration: {msg}"),
            Self::Runtime(msg) => write!(f, "runtime error: {msg}"),
        }
    }
}

impl StdError for Error {}
