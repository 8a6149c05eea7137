use chrono::NaiveDate;

use crate::dom::{Dom, NodeId};
use crate::field::parse_date_input;
use crate::regex::Regex;

/// Constraint-validation flags of one form control.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidityState {
    pub value_missing: bool,
    pub type_mismatch: bool,
    pub pattern_mismatch: bool,
    pub too_long: bool,
    pub too_short: bool,
    pub range_underflow: bool,
    pub range_overflow: bool,
    pub step_mismatch: bool,
    pub bad_input: bool,
    pub custom_error: bool,
    pub valid: bool,
}

impl ValidityState {
    fn passing() -> Self {
        Self {
            valid: true,
            ..Self::default()
        }
    }

    fn settle(mut self) -> Self {
        self.valid = !(self.value_missing
            || self.type_mismatch
            || self.pattern_mismatch
            || self.too_long
            || self.too_short
            || self.range_underflow
            || self.range_overflow
            || self.step_mismatch
            || self.bad_input
            || self.custom_error);
        self
    }
}

fn input_is_candidate(kind: &str) -> bool {
    !matches!(kind, "button" | "submit" | "reset" | "hidden" | "image")
}

fn parse_number_value(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    raw.parse::<f64>().ok().filter(|value| value.is_finite())
}

fn is_simple_email(value: &str) -> bool {
    let trimmed = value.trim();
    let Some((local, domain)) = trimmed.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && !domain.contains('@')
        && !trimmed.chars().any(char::is_whitespace)
}

fn is_url_like(value: &str) -> bool {
    let Some((scheme, rest)) = value.trim().split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|first| first.is_ascii_alphabetic())
        && chars.all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '+' | '-' | '.'))
        && !rest.is_empty()
}

impl Dom {
    /// Whether the control takes part in constraint validation at all.
    pub(crate) fn will_validate(&self, node: NodeId) -> bool {
        let Some(tag) = self.tag_name(node) else {
            return false;
        };
        let candidate = match tag.to_ascii_lowercase().as_str() {
            "input" => input_is_candidate(&self.input_type(node)),
            "textarea" | "select" => true,
            "button" => self.is_submit_control(node),
            _ => false,
        };
        if !candidate || self.is_effectively_disabled(node) {
            return false;
        }
        let honors_readonly = self.is_tag(node, "textarea")
            || (self.is_tag(node, "input")
                && !matches!(self.input_type(node).as_str(), "checkbox" | "radio" | "file"));
        !(honors_readonly && self.readonly(node))
    }

    pub(crate) fn validity(&self, node: NodeId) -> ValidityState {
        if !self.will_validate(node) {
            return ValidityState::passing();
        }

        let mut validity = ValidityState {
            custom_error: !self.custom_validity(node).is_empty(),
            ..ValidityState::default()
        };

        if self.is_tag(node, "button") {
            return validity.settle();
        }

        let value = self.element(node).map(|e| e.value.clone()).unwrap_or_default();
        let required = self.required(node);

        if self.is_tag(node, "textarea") {
            validity.value_missing = required && value.is_empty();
            self.check_length(node, &value, &mut validity);
            return validity.settle();
        }

        if self.is_tag(node, "select") {
            validity.value_missing = required && value.is_empty();
            return validity.settle();
        }

        let input_type = self.input_type(node);
        if required {
            validity.value_missing = match input_type.as_str() {
                "checkbox" => !self.checked(node),
                "radio" => !self.is_radio_group_checked(node),
                _ => value.is_empty(),
            };
        }

        if value.is_empty() {
            return validity.settle();
        }

        let multiple = self.attr(node, "multiple").is_some();
        let email_parts = || {
            value
                .split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>()
        };

        match input_type.as_str() {
            "email" => {
                validity.type_mismatch = if multiple {
                    let parts = email_parts();
                    parts.is_empty() || !parts.iter().all(|part| is_simple_email(part))
                } else {
                    !is_simple_email(&value)
                };
            }
            "url" => validity.type_mismatch = !is_url_like(&value),
            _ => {}
        }

        if matches!(
            input_type.as_str(),
            "text" | "search" | "url" | "tel" | "email" | "password"
        ) {
            self.check_length(node, &value, &mut validity);

            if let Some(pattern) = self.attr(node, "pattern").filter(|p| !p.is_empty()) {
                // An uncompilable pattern imposes no constraint.
                if let Ok(regex) = Regex::full_match(&pattern) {
                    let candidates = if input_type == "email" && multiple {
                        email_parts()
                    } else {
                        vec![value.as_str()]
                    };
                    validity.pattern_mismatch = candidates
                        .iter()
                        .any(|candidate| matches!(regex.is_match(candidate), Ok(false)));
                }
            }
        }

        match input_type.as_str() {
            "number" | "range" => match parse_number_value(&value) {
                Some(numeric) => self.check_numeric_range(node, numeric, &mut validity),
                None => validity.bad_input = true,
            },
            "date" => match parse_date_input(&value) {
                Some(date) => self.check_date_range(node, date, &mut validity),
                None => validity.bad_input = true,
            },
            _ => {}
        }

        validity.settle()
    }

    pub(crate) fn check_validity(&self, node: NodeId) -> bool {
        self.validity(node).valid
    }

    /// Browser-style message for the first failing constraint, empty when valid.
    pub(crate) fn validation_message(&self, node: NodeId) -> String {
        let validity = self.validity(node);
        if validity.valid {
            return String::new();
        }
        if validity.custom_error {
            return self.custom_validity(node).to_string();
        }
        if validity.value_missing {
            return match self.input_type(node).as_str() {
                "checkbox" => "Please check this box if you want to proceed.".into(),
                "radio" => "Please select one of these options.".into(),
                _ if self.is_tag(node, "select") => "Please select an item in the list.".into(),
                _ => "Please fill out this field.".into(),
            };
        }
        if validity.type_mismatch {
            return if self.input_type(node) == "url" {
                "Please enter a URL.".into()
            } else {
                "Please enter an email address.".into()
            };
        }
        if validity.bad_input {
            return if self.input_type(node) == "date" {
                "Please enter a valid date.".into()
            } else {
                "Please enter a number.".into()
            };
        }
        if validity.pattern_mismatch {
            return "Please match the requested format.".into();
        }
        let length = self.element(node).map(|e| e.value.chars().count()).unwrap_or(0);
        if validity.too_long {
            let max = self.attr(node, "maxlength").unwrap_or_default();
            return format!(
                "Please shorten this text to {max} characters or less (you are currently using {length} characters)."
            );
        }
        if validity.too_short {
            let min = self.attr(node, "minlength").unwrap_or_default();
            return format!(
                "Please lengthen this text to {min} characters or more (you are currently using {length} characters)."
            );
        }
        if validity.range_underflow {
            let min = self.attr(node, "min").unwrap_or_default();
            return format!("Value must be greater than or equal to {}.", min.trim());
        }
        if validity.range_overflow {
            let max = self.attr(node, "max").unwrap_or_default();
            return format!("Value must be less than or equal to {}.", max.trim());
        }
        "Please enter a valid value.".into()
    }

    /// Invalid controls owned by `form`, in document order.
    pub(crate) fn invalid_controls(&self, form: NodeId) -> Vec<NodeId> {
        self.all_element_nodes()
            .into_iter()
            .filter(|node| *node != form && self.form_owner(*node) == Some(form))
            .filter(|node| self.will_validate(*node) && !self.check_validity(*node))
            .collect()
    }

    fn check_length(&self, node: NodeId, value: &str, validity: &mut ValidityState) {
        let length = value.chars().count();
        if let Some(min_len) = self.parse_attr_usize(node, "minlength") {
            validity.too_short = length > 0 && length < min_len;
        }
        if let Some(max_len) = self.parse_attr_usize(node, "maxlength") {
            validity.too_long = length > max_len;
        }
    }

    fn check_numeric_range(&self, node: NodeId, numeric: f64, validity: &mut ValidityState) {
        let min = self.parse_attr_f64(node, "min");
        if let Some(min) = min {
            validity.range_underflow = numeric < min;
        }
        if let Some(max) = self.parse_attr_f64(node, "max") {
            validity.range_overflow = numeric > max;
        }

        let step_attr = self.attr(node, "step").unwrap_or_default();
        if step_attr.eq_ignore_ascii_case("any") {
            return;
        }
        let step = parse_number_value(&step_attr)
            .filter(|value| *value > 0.0)
            .unwrap_or(1.0);
        let base = min
            .or_else(|| self.parse_attr_f64(node, "value"))
            .unwrap_or(0.0);
        let ratio = (numeric - base) / step;
        validity.step_mismatch = (ratio - ratio.round()).abs() > 1e-7;
    }

    fn check_date_range(&self, node: NodeId, date: NaiveDate, validity: &mut ValidityState) {
        let min = self.attr(node, "min").and_then(|raw| parse_date_input(&raw));
        if let Some(min) = min {
            validity.range_underflow = date < min;
        }
        if let Some(max) = self.attr(node, "max").and_then(|raw| parse_date_input(&raw)) {
            validity.range_overflow = date > max;
        }

        let step = self
            .attr(node, "step")
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .filter(|step| *step > 0);
        if let (Some(step), Some(base)) = (step, min) {
            validity.step_mismatch = (date - base).num_days() % step != 0;
        }
    }

    fn is_radio_group_checked(&self, node: NodeId) -> bool {
        let name = self.attr(node, "name").unwrap_or_default();
        if name.is_empty() {
            return self.checked(node);
        }
        let form = self.form_owner(node);
        self.all_element_nodes().into_iter().any(|candidate| {
            self.input_type(candidate) == "radio"
                && self.attr(candidate, "name").as_deref() == Some(name.as_str())
                && self.form_owner(candidate) == form
                && self.checked(candidate)
        })
    }

    fn parse_attr_f64(&self, node: NodeId, name: &str) -> Option<f64> {
        self.attr(node, name)
            .and_then(|raw| parse_number_value(&raw))
    }

    fn parse_attr_usize(&self, node: NodeId, name: &str) -> Option<usize> {
        self.attr(node, name)
            .and_then(|raw| raw.trim().parse::<usize>().ok())
    }
}
