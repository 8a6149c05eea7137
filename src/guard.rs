//! Binding of the field rule table and the handlers it installs.

use crate::Result;
use crate::dom::{Dom, NodeId};
use crate::events::{EventState, Handler};
use crate::field::{FieldState, Verdict};
use crate::markers::marker_change;
use crate::page::Page;
use crate::rules::{AttrSource, FIELD_RULES, FieldKind};

const FEEDBACK_CONTROLS: &str = "input, textarea, select";

struct ElementAttrs<'a> {
    dom: &'a Dom,
    node: NodeId,
}

impl AttrSource for ElementAttrs<'_> {
    fn attr(&self, name: &str) -> Option<String> {
        self.dom.attr(self.node, name)
    }
}

impl Page {
    /// Binds every rule to the elements currently in the document. Runs once;
    /// later calls return `Ok(false)` and change nothing.
    pub fn ready(&mut self) -> Result<bool> {
        if self.bound {
            self.trace_guard_line("[guard] ready ignored: already bound".into());
            return Ok(false);
        }
        self.bound = true;
        let today = self.config.clock.today();

        for rule in FIELD_RULES {
            let mut bound = 0usize;
            for node in self.dom.query_selector_all(rule.selector)? {
                let refined = (rule.refine)(&ElementAttrs {
                    dom: &self.dom,
                    node,
                });
                let Some(kind) = refined else {
                    continue;
                };
                if let Some((name, value)) = kind.bind_patch(today) {
                    self.dom.set_attr(node, name, &value)?;
                }
                for event in kind.events() {
                    self.listeners.add(node, event, Handler::Field(kind));
                }
                bound += 1;
            }
            self.trace_guard_line(format!("[guard] bind {} fields={bound}", rule.name));
        }

        let forms = self.dom.query_selector_all("form")?;
        for form in &forms {
            self.listeners.add(*form, "submit", Handler::SubmitGate);
        }

        let controls = self.dom.query_selector_all(FEEDBACK_CONTROLS)?;
        for control in &controls {
            self.listeners.add(*control, "blur", Handler::LiveFeedback);
            self.listeners.add(*control, "input", Handler::LiveFeedback);
        }

        let listener_count = self.listeners.len();
        self.trace_guard_line(format!(
            "[guard] ready forms={} controls={} listeners={listener_count}",
            forms.len(),
            controls.len()
        ));
        Ok(true)
    }

    pub(crate) fn run_handler(
        &mut self,
        handler: Handler,
        node: NodeId,
        event: &mut EventState,
    ) -> Result<()> {
        match handler {
            Handler::Field(kind) => self.run_field_rule(kind, node, &event.event_type),
            Handler::LiveFeedback => self.live_feedback(node, &event.event_type),
            Handler::SubmitGate => self.submit_gate(node, event),
            Handler::Record => {
                self.record_event(event, node);
                Ok(())
            }
        }
    }

    fn run_field_rule(&mut self, kind: FieldKind, node: NodeId, event_type: &str) -> Result<()> {
        let mut value = self.dom.value(node)?;
        if event_type == "input" {
            if let Some(next) = kind.transform_input(&value) {
                self.trace_guard_line(format!(
                    "[guard] {} {} input {value:?} -> {next:?}",
                    kind.name(),
                    self.dom.node_label(node)
                ));
                self.dom.set_value(node, &next)?;
                value = next;
            }
        }

        let today = self.config.clock.today();
        if let Some(verdict) = kind.verdict_for(event_type, &value, today) {
            self.trace_guard_line(format!(
                "[guard] {} {} {event_type} verdict={verdict:?}",
                kind.name(),
                self.dom.node_label(node)
            ));
            self.apply_verdict(node, verdict)?;
        }
        Ok(())
    }

    fn apply_verdict(&mut self, node: NodeId, verdict: Verdict) -> Result<()> {
        match verdict {
            Verdict::Reject(issue) => {
                let message = issue.message(&self.config.messages).to_string();
                self.dom.set_custom_validity(node, &message)?;
                self.set_field_state(node, FieldState::Invalid(message))
            }
            Verdict::Clear => {
                self.dom.set_custom_validity(node, "")?;
                if self.state_of(node).is_invalid() {
                    self.set_field_state(node, FieldState::Unvalidated)?;
                }
                Ok(())
            }
        }
    }

    /// Blur renders the constraint-validation result either way; input only
    /// promotes a field that has become valid.
    fn live_feedback(&mut self, node: NodeId, event_type: &str) -> Result<()> {
        let valid = self.dom.check_validity(node);
        match event_type {
            "blur" if valid => self.set_field_state(node, FieldState::Valid),
            "blur" => {
                let message = self.dom.validation_message(node);
                self.set_field_state(node, FieldState::Invalid(message))
            }
            "input" if valid => self.set_field_state(node, FieldState::Valid),
            _ => Ok(()),
        }
    }

    fn submit_gate(&mut self, form: NodeId, event: &mut EventState) -> Result<()> {
        if !self.form_check_validity(form)? {
            event.prevent_default();
            event.stop_propagation();

            let invalid = self.dom.query_selector_all_from(form, ":invalid")?;
            self.trace_guard_line(format!(
                "[guard] submit blocked {} invalid={}",
                self.dom.node_label(form),
                invalid.len()
            ));
            for node in &invalid {
                let message = self.dom.validation_message(*node);
                self.set_field_state(*node, FieldState::Invalid(message))?;
            }
            if let Some(first) = invalid.first().copied() {
                self.record_scroll_into_view(first);
                self.focus_node(first)?;
            }
        }

        let validated = self.config.markers.validated.clone();
        self.dom.class_add(form, &validated)
    }

    /// Fires `invalid` at each failing control and reports whether none failed.
    fn form_check_validity(&mut self, form: NodeId) -> Result<bool> {
        let invalid = self.dom.invalid_controls(form);
        for node in &invalid {
            self.dispatch_event(*node, "invalid")?;
        }
        Ok(invalid.is_empty())
    }

    fn set_field_state(&mut self, node: NodeId, state: FieldState) -> Result<()> {
        marker_change(&state, &self.config.markers).apply(&mut self.dom, node)?;
        self.field_states.insert(node, state);
        Ok(())
    }
}
