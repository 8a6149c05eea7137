use std::collections::HashMap;

use chrono::NaiveDate;

use crate::field::{
    Verdict, clamp_number, date_verdict, email_verdict, format_date_input, phone_verdict,
    sanitize_phone,
};

/// Read access to an element's attributes, shared by the in-memory host and
/// the browser adapter.
pub trait AttrSource {
    fn attr(&self, name: &str) -> Option<String>;
}

impl AttrSource for HashMap<String, String> {
    fn attr(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// Closed numeric interval a number field is clamped into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Bounds {
    pub const fn non_negative() -> Self {
        Self {
            min: Some(0.0),
            max: None,
        }
    }

    pub const fn percentage() -> Self {
        Self {
            min: Some(0.0),
            max: Some(100.0),
        }
    }

    /// The bound `value` violates, or `None` when it is inside.
    pub fn clamp(&self, value: f64) -> Option<f64> {
        if let Some(min) = self.min.filter(|min| value < *min) {
            return Some(min);
        }
        self.max.filter(|max| value > *max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    Phone,
    Email,
    BoundedNumber(Bounds),
    FutureDate,
}

impl FieldKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Phone => "phone",
            Self::Email => "email",
            Self::BoundedNumber(_) => "bounded-number",
            Self::FutureDate => "future-date",
        }
    }

    /// Event types the rule listens to.
    pub fn events(&self) -> &'static [&'static str] {
        match self {
            Self::Phone => &["input", "blur"],
            Self::Email => &["blur"],
            Self::BoundedNumber(_) => &["input"],
            Self::FutureDate => &["change"],
        }
    }

    /// Attribute rewrite applied once when the rule is bound.
    pub fn bind_patch(&self, today: NaiveDate) -> Option<(&'static str, String)> {
        match self {
            Self::FutureDate => Some(("min", format_date_input(today))),
            _ => None,
        }
    }

    /// Replacement value for an `input` event, `None` when the value stays.
    pub fn transform_input(&self, value: &str) -> Option<String> {
        match self {
            Self::Phone => {
                let digits = sanitize_phone(value);
                (digits != value).then_some(digits)
            }
            Self::BoundedNumber(bounds) => clamp_number(value, bounds),
            Self::Email | Self::FutureDate => None,
        }
    }

    pub fn blur_verdict(&self, value: &str) -> Option<Verdict> {
        match self {
            Self::Phone => Some(phone_verdict(value)),
            Self::Email => Some(email_verdict(value)),
            Self::BoundedNumber(_) | Self::FutureDate => None,
        }
    }

    pub fn change_verdict(&self, value: &str, today: NaiveDate) -> Option<Verdict> {
        match self {
            Self::FutureDate => Some(date_verdict(value, today)),
            _ => None,
        }
    }

    pub fn verdict_for(&self, event: &str, value: &str, today: NaiveDate) -> Option<Verdict> {
        match event {
            "blur" => self.blur_verdict(value),
            "change" => self.change_verdict(value, today),
            _ => None,
        }
    }
}

/// One row of the binding table: elements matching `selector` are refined
/// into a [`FieldKind`] from their attributes.
#[derive(Clone, Copy)]
pub struct FieldRule {
    pub name: &'static str,
    pub selector: &'static str,
    pub refine: fn(&dyn AttrSource) -> Option<FieldKind>,
}

impl std::fmt::Debug for FieldRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldRule")
            .field("name", &self.name)
            .field("selector", &self.selector)
            .finish_non_exhaustive()
    }
}

fn refine_phone(_: &dyn AttrSource) -> Option<FieldKind> {
    Some(FieldKind::Phone)
}

fn refine_email(_: &dyn AttrSource) -> Option<FieldKind> {
    Some(FieldKind::Email)
}

fn refine_bounded_number(attrs: &dyn AttrSource) -> Option<FieldKind> {
    let min = attrs.attr("min");
    let percentage = attrs.attr("max").as_deref() == Some("100");
    match min.as_deref() {
        Some("0") if percentage => Some(FieldKind::BoundedNumber(Bounds::percentage())),
        Some("0") => Some(FieldKind::BoundedNumber(Bounds::non_negative())),
        None if percentage => Some(FieldKind::BoundedNumber(Bounds::percentage())),
        _ => None,
    }
}

fn refine_future_date(_: &dyn AttrSource) -> Option<FieldKind> {
    Some(FieldKind::FutureDate)
}

pub const FIELD_RULES: &[FieldRule] = &[
    FieldRule {
        name: "phone",
        selector: r#"input[type="text"][pattern="[0-9]{10}"]"#,
        refine: refine_phone,
    },
    FieldRule {
        name: "email",
        selector: r#"input[type="email"]"#,
        refine: refine_email,
    },
    FieldRule {
        name: "bounded-number",
        selector: r#"input[type="number"][min="0"], input[type="number"][max="100"]"#,
        refine: refine_bounded_number,
    },
    FieldRule {
        name: "future-date",
        selector: r#"input[type="date"][min="today"]"#,
        refine: refine_future_date,
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldIssue;

    fn attrs(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn rule(name: &str) -> Option<&'static FieldRule> {
        FIELD_RULES.iter().find(|rule| rule.name == name)
    }

    #[test]
    fn bounded_number_refinement() {
        let refine = |pairs: &[(&str, &str)]| {
            rule("bounded-number").and_then(|rule| (rule.refine)(&attrs(pairs)))
        };
        assert_eq!(
            refine(&[("min", "0")]),
            Some(FieldKind::BoundedNumber(Bounds::non_negative()))
        );
        assert_eq!(
            refine(&[("min", "0"), ("max", "100")]),
            Some(FieldKind::BoundedNumber(Bounds::percentage()))
        );
        assert_eq!(
            refine(&[("max", "100")]),
            Some(FieldKind::BoundedNumber(Bounds::percentage()))
        );
        assert_eq!(refine(&[("min", "5"), ("max", "100")]), None);
    }

    #[test]
    fn bounds_clamp() {
        let percent = Bounds::percentage();
        assert_eq!(percent.clamp(-1.0), Some(0.0));
        assert_eq!(percent.clamp(101.0), Some(100.0));
        assert_eq!(percent.clamp(100.0), None);
        assert_eq!(Bounds::non_negative().clamp(1e9), None);
    }

    #[test]
    fn kinds_route_events_to_their_checks() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap_or_default();

        assert_eq!(FieldKind::Phone.events(), &["input", "blur"]);
        assert_eq!(
            FieldKind::Phone.transform_input("555-0101").as_deref(),
            Some("5550101")
        );
        assert_eq!(FieldKind::Phone.transform_input("5550101"), None);
        assert_eq!(
            FieldKind::Phone.verdict_for("blur", "5550101", today),
            Some(Verdict::Reject(FieldIssue::PhoneLength))
        );

        assert_eq!(FieldKind::Email.verdict_for("input", "x", today), None);
        assert_eq!(
            FieldKind::FutureDate.verdict_for("change", "2026-03-09", today),
            Some(Verdict::Reject(FieldIssue::PastDate))
        );
        assert_eq!(
            FieldKind::FutureDate.bind_patch(today),
            Some(("min", "2026-03-10".to_string()))
        );
        assert_eq!(FieldKind::Email.bind_patch(today), None);
    }
}
