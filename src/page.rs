use std::collections::HashMap;

use chrono::NaiveDate;

use crate::config::{Clock, GuardConfig};
use crate::dom::{Dom, NodeId, truncate_chars};
use crate::events::{EventState, Handler, ListenerStore, TraceState};
use crate::field::FieldState;
use crate::html::parse_html;
use crate::validity::ValidityState;
use crate::{Error, Result};

const ACTION_STACK: usize = 32 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollBehavior {
    Auto,
    Smooth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollBlock {
    Start,
    Center,
    End,
    Nearest,
}

/// A scroll-into-view request made while handling events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrollIntoView {
    pub target: String,
    pub behavior: ScrollBehavior,
    pub block: ScrollBlock,
}

/// A form submission that was not cancelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub form: String,
    pub entries: Vec<(String, String)>,
}

/// An event as seen by a recorder registered with [`Page::record_events`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEvent {
    pub event_type: String,
    pub target: String,
    pub current_target: String,
    pub default_prevented: bool,
}

/// In-memory document hosting the form rules.
#[derive(Debug)]
pub struct Page {
    pub(crate) dom: Dom,
    pub(crate) config: GuardConfig,
    pub(crate) listeners: ListenerStore,
    pub(crate) field_states: HashMap<NodeId, FieldState>,
    pub(crate) active_element: Option<NodeId>,
    pub(crate) bound: bool,
    pub(crate) scroll_log: Vec<ScrollIntoView>,
    pub(crate) submissions: Vec<Submission>,
    pub(crate) recorded_events: Vec<RecordedEvent>,
    pub(crate) trace_state: TraceState,
}

impl Page {
    /// Parses `html` and binds the rules with the default configuration.
    pub fn from_html(html: &str) -> Result<Self> {
        Self::from_html_with(html, GuardConfig::default())
    }

    pub fn from_html_with(html: &str, config: GuardConfig) -> Result<Self> {
        let mut page = Self::parse(html, config)?;
        page.ready()?;
        Ok(page)
    }

    /// Parses `html` without binding; call [`Page::ready`] to bind.
    pub fn parse(html: &str, config: GuardConfig) -> Result<Self> {
        config.validate()?;
        let dom = parse_html(html)?;
        Ok(Self {
            dom,
            config,
            listeners: ListenerStore::default(),
            field_states: HashMap::new(),
            active_element: None,
            bound: false,
            scroll_log: Vec::new(),
            submissions: Vec::new(),
            recorded_events: Vec::new(),
            trace_state: TraceState::default(),
        })
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// Pins "today" for future-date checks. Already-bound `min` attributes
    /// keep the date they were bound with.
    pub fn set_today(&mut self, today: NaiveDate) {
        self.config.clock = Clock::Fixed(today);
    }

    pub fn enable_trace(&mut self, enabled: bool) {
        self.trace_state.enabled = enabled;
    }

    pub fn set_trace_stderr(&mut self, enabled: bool) {
        self.trace_state.to_stderr = enabled;
    }

    pub fn set_trace_events(&mut self, enabled: bool) {
        self.trace_state.events = enabled;
    }

    pub fn set_trace_guard(&mut self, enabled: bool) {
        self.trace_state.guard = enabled;
    }

    pub fn set_trace_log_limit(&mut self, max_entries: usize) -> Result<()> {
        if max_entries == 0 {
            return Err(Error::InvalidConfig(
                "set_trace_log_limit requires at least 1 entry".into(),
            ));
        }
        self.trace_state.log_limit = max_entries;
        while self.trace_state.logs.len() > self.trace_state.log_limit {
            self.trace_state.logs.pop_front();
        }
        Ok(())
    }

    pub fn take_trace_logs(&mut self) -> Vec<String> {
        self.trace_state.logs.drain(..).collect()
    }

    pub fn type_text(&mut self, selector: &str, text: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        if self.dom.is_effectively_disabled(target) || self.dom.readonly(target) {
            return Ok(());
        }
        self.expect_tag(selector, target, &["input", "textarea"])?;

        stacker::grow(ACTION_STACK, || {
            self.focus_node(target)?;
            self.dom.set_value(target, text)?;
            self.dispatch_event(target, "input")?;
            Ok(())
        })
    }

    pub fn select_option(&mut self, selector: &str, value: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        if self.dom.is_effectively_disabled(target) {
            return Ok(());
        }
        self.expect_tag(selector, target, &["select"])?;

        stacker::grow(ACTION_STACK, || {
            self.focus_node(target)?;
            self.dom.set_value(target, value)?;
            self.dispatch_event(target, "input")?;
            self.dispatch_event(target, "change")?;
            Ok(())
        })
    }

    /// Picks a date in a date input: sets the value and fires `input` then `change`.
    pub fn set_date(&mut self, selector: &str, value: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        if self.dom.is_effectively_disabled(target) || self.dom.readonly(target) {
            return Ok(());
        }
        let kind = self.dom.input_type(target);
        if kind != "date" {
            return Err(Error::TypeMismatch {
                selector: selector.to_string(),
                expected: "input[type=date]".into(),
                actual: self.dom.node_label(target),
            });
        }

        stacker::grow(ACTION_STACK, || {
            self.focus_node(target)?;
            self.dom.set_value(target, value)?;
            self.dispatch_event(target, "input")?;
            self.dispatch_event(target, "change")?;
            Ok(())
        })
    }

    pub fn set_checked(&mut self, selector: &str, checked: bool) -> Result<()> {
        let target = self.select_one(selector)?;
        if self.dom.is_effectively_disabled(target) {
            return Ok(());
        }
        let kind = self.dom.input_type(target);
        if kind != "checkbox" && kind != "radio" {
            return Err(Error::TypeMismatch {
                selector: selector.to_string(),
                expected: "input[type=checkbox|radio]".into(),
                actual: self.dom.node_label(target),
            });
        }

        stacker::grow(ACTION_STACK, || {
            if self.dom.checked(target) != checked {
                self.apply_checked(target, checked)?;
                self.dispatch_event(target, "input")?;
                self.dispatch_event(target, "change")?;
            }
            Ok(())
        })
    }

    pub fn focus(&mut self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        stacker::grow(ACTION_STACK, || self.focus_node(target))
    }

    pub fn blur(&mut self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        stacker::grow(ACTION_STACK, || self.blur_node(target))
    }

    /// Clicks an element; submit controls submit their form.
    pub fn click(&mut self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        stacker::grow(ACTION_STACK, || self.click_node(target))
    }

    /// Requests submission of a form, or of the form owning the selected control.
    pub fn submit(&mut self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let form = self
            .dom
            .form_owner(target)
            .ok_or_else(|| Error::TypeMismatch {
                selector: selector.to_string(),
                expected: "form or form-associated control".into(),
                actual: self.dom.node_label(target),
            })?;
        stacker::grow(ACTION_STACK, || self.request_submit(form))
    }

    pub fn dispatch(&mut self, selector: &str, event: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        stacker::grow(ACTION_STACK, || {
            self.dispatch_event(target, event)?;
            Ok(())
        })
    }

    /// Sets an attribute. Rule membership is fixed at bind time and is not
    /// re-evaluated.
    pub fn set_attribute(&mut self, selector: &str, name: &str, value: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        self.dom.set_attr(target, name, value)
    }

    /// Records every `event_type` event reaching the selected element.
    pub fn record_events(&mut self, selector: &str, event_type: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        self.listeners.add(target, event_type, Handler::Record);
        Ok(())
    }

    pub fn value(&self, selector: &str) -> Result<String> {
        let target = self.select_one(selector)?;
        self.dom.value(target)
    }

    pub fn has_class(&self, selector: &str, class_name: &str) -> Result<bool> {
        let target = self.select_one(selector)?;
        Ok(self.dom.class_contains(target, class_name))
    }

    pub fn field_state(&self, selector: &str) -> Result<FieldState> {
        let target = self.select_one(selector)?;
        Ok(self.state_of(target))
    }

    pub fn validity(&self, selector: &str) -> Result<ValidityState> {
        let target = self.select_one(selector)?;
        Ok(self.dom.validity(target))
    }

    pub fn validation_message(&self, selector: &str) -> Result<String> {
        let target = self.select_one(selector)?;
        Ok(self.dom.validation_message(target))
    }

    /// Label of the focused element, such as `input#email`.
    pub fn active_element(&self) -> Option<String> {
        self.active_element.map(|node| self.dom.node_label(node))
    }

    /// Whether a submission of the selected form has been attempted.
    pub fn is_validated(&self, selector: &str) -> Result<bool> {
        let target = self.select_one(selector)?;
        Ok(self
            .dom
            .class_contains(target, &self.config.markers.validated))
    }

    pub fn take_scroll_log(&mut self) -> Vec<ScrollIntoView> {
        std::mem::take(&mut self.scroll_log)
    }

    pub fn submissions(&self) -> &[Submission] {
        &self.submissions
    }

    pub fn recorded_events(&self) -> &[RecordedEvent] {
        &self.recorded_events
    }

    pub fn dump_dom(&self, selector: &str) -> Result<String> {
        let target = self.select_one(selector)?;
        Ok(self.dom.dump_node(target))
    }

    pub fn assert_value(&self, selector: &str, expected: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.dom.value(target)?;
        if actual != expected {
            return Err(self.assertion_failed(selector, target, expected, actual));
        }
        Ok(())
    }

    pub fn assert_class(&self, selector: &str, class_name: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        if !self.dom.class_contains(target, class_name) {
            let actual = self.dom.attr(target, "class").unwrap_or_default();
            return Err(self.assertion_failed(
                selector,
                target,
                &format!("class containing {class_name}"),
                format!("class={actual:?}"),
            ));
        }
        Ok(())
    }

    pub fn assert_no_class(&self, selector: &str, class_name: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        if self.dom.class_contains(target, class_name) {
            let actual = self.dom.attr(target, "class").unwrap_or_default();
            return Err(self.assertion_failed(
                selector,
                target,
                &format!("class without {class_name}"),
                format!("class={actual:?}"),
            ));
        }
        Ok(())
    }

    pub fn assert_focused(&self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        if self.active_element != Some(target) {
            let actual = self.active_element().unwrap_or_else(|| "nothing".into());
            return Err(self.assertion_failed(selector, target, "focused", actual));
        }
        Ok(())
    }

    pub fn assert_valid(&self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let state = self.state_of(target);
        if !state.is_valid() {
            return Err(self.assertion_failed(selector, target, "Valid", format!("{state:?}")));
        }
        Ok(())
    }

    pub fn assert_invalid(&self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let state = self.state_of(target);
        if !state.is_invalid() {
            return Err(self.assertion_failed(
                selector,
                target,
                "Invalid",
                format!("{state:?}"),
            ));
        }
        Ok(())
    }

    pub fn assert_exists(&self, selector: &str) -> Result<()> {
        let _ = self.select_one(selector)?;
        Ok(())
    }

    pub(crate) fn select_one(&self, selector: &str) -> Result<NodeId> {
        self.dom
            .query_selector(selector)?
            .ok_or_else(|| Error::SelectorNotFound(selector.to_string()))
    }

    pub(crate) fn state_of(&self, node: NodeId) -> FieldState {
        self.field_states.get(&node).cloned().unwrap_or_default()
    }

    fn expect_tag(&self, selector: &str, target: NodeId, tags: &[&str]) -> Result<()> {
        if tags.iter().any(|tag| self.dom.is_tag(target, tag)) {
            return Ok(());
        }
        Err(Error::TypeMismatch {
            selector: selector.to_string(),
            expected: tags.join(" or "),
            actual: self
                .dom
                .tag_name(target)
                .unwrap_or("non-element")
                .to_string(),
        })
    }

    fn assertion_failed(
        &self,
        selector: &str,
        target: NodeId,
        expected: &str,
        actual: String,
    ) -> Error {
        Error::AssertionFailed {
            selector: selector.to_string(),
            expected: expected.to_string(),
            actual,
            dom_snippet: self.node_snippet(target),
        }
    }

    pub(crate) fn node_snippet(&self, node_id: NodeId) -> String {
        truncate_chars(&self.dom.dump_node(node_id), 200)
    }

    pub(crate) fn dispatch_event(
        &mut self,
        target: NodeId,
        event_type: &str,
    ) -> Result<EventState> {
        let mut event = EventState::new(event_type, target);

        let mut path = vec![target];
        if event.bubbles {
            let mut cursor = self.dom.parent(target);
            while let Some(node) = cursor {
                path.push(node);
                cursor = self.dom.parent(node);
            }
        }

        for node in path {
            event.current_target = node;
            for handler in self.listeners.get(node, event_type) {
                if self.trace_state.enabled {
                    self.trace_event_line(format!(
                        "[event] {} target={} current={} handler={:?} default_prevented={}",
                        event.event_type,
                        self.dom.node_label(event.target),
                        self.dom.node_label(node),
                        handler,
                        event.default_prevented
                    ));
                }
                self.run_handler(handler, node, &mut event)?;
            }
            if event.propagation_stopped {
                self.trace_event_done(&event, "propagation_stopped");
                return Ok(event);
            }
        }

        self.trace_event_done(&event, "completed");
        Ok(event)
    }

    pub(crate) fn focus_node(&mut self, node: NodeId) -> Result<()> {
        if self.dom.is_effectively_disabled(node) || self.active_element == Some(node) {
            return Ok(());
        }
        if let Some(current) = self.active_element {
            self.blur_node(current)?;
        }
        self.active_element = Some(node);
        self.dispatch_event(node, "focusin")?;
        self.dispatch_event(node, "focus")?;
        Ok(())
    }

    pub(crate) fn blur_node(&mut self, node: NodeId) -> Result<()> {
        if self.active_element != Some(node) {
            return Ok(());
        }
        self.dispatch_event(node, "focusout")?;
        self.dispatch_event(node, "blur")?;
        self.active_element = None;
        Ok(())
    }

    pub(crate) fn record_scroll_into_view(&mut self, node: NodeId) {
        self.scroll_log.push(ScrollIntoView {
            target: self.dom.node_label(node),
            behavior: ScrollBehavior::Smooth,
            block: ScrollBlock::Center,
        });
    }

    pub(crate) fn record_event(&mut self, event: &EventState, current: NodeId) {
        self.recorded_events.push(RecordedEvent {
            event_type: event.event_type.clone(),
            target: self.dom.node_label(event.target),
            current_target: self.dom.node_label(current),
            default_prevented: event.default_prevented,
        });
    }

    fn click_node(&mut self, target: NodeId) -> Result<()> {
        if self.dom.is_effectively_disabled(target) {
            return Ok(());
        }
        if self.is_focusable(target) {
            self.focus_node(target)?;
        }

        let outcome = self.dispatch_event(target, "click")?;
        if outcome.default_prevented {
            return Ok(());
        }

        match self.dom.input_type(target).as_str() {
            "checkbox" => {
                let next = !self.dom.checked(target);
                self.apply_checked(target, next)?;
                self.dispatch_event(target, "input")?;
                self.dispatch_event(target, "change")?;
            }
            "radio" if !self.dom.checked(target) => {
                self.apply_checked(target, true)?;
                self.dispatch_event(target, "input")?;
                self.dispatch_event(target, "change")?;
            }
            _ => {}
        }

        if self.dom.is_submit_control(target) {
            if let Some(form) = self.dom.form_owner(target) {
                self.request_submit(form)?;
            }
        }
        Ok(())
    }

    fn is_focusable(&self, node: NodeId) -> bool {
        ["input", "select", "textarea", "button"]
            .iter()
            .any(|tag| self.dom.is_tag(node, tag))
            && self.dom.input_type(node) != "hidden"
    }

    /// Checking a radio unchecks the rest of its group.
    fn apply_checked(&mut self, node: NodeId, checked: bool) -> Result<()> {
        if checked && self.dom.input_type(node) == "radio" {
            let name = self.dom.attr(node, "name").unwrap_or_default();
            if !name.is_empty() {
                let form = self.dom.form_owner(node);
                for other in self.dom.all_element_nodes() {
                    if other != node
                        && self.dom.input_type(other) == "radio"
                        && self.dom.attr(other, "name").as_deref() == Some(name.as_str())
                        && self.dom.form_owner(other) == form
                    {
                        self.dom.set_checked(other, false)?;
                    }
                }
            }
        }
        self.dom.set_checked(node, checked)
    }

    fn request_submit(&mut self, form: NodeId) -> Result<()> {
        let outcome = self.dispatch_event(form, "submit")?;
        if outcome.default_prevented {
            return Ok(());
        }
        let submission = Submission {
            form: self.dom.node_label(form),
            entries: self.form_entries(form),
        };
        self.trace_guard_line(format!(
            "[guard] submitted {} entries={}",
            submission.form,
            submission.entries.len()
        ));
        self.submissions.push(submission);
        Ok(())
    }

    fn form_entries(&self, form: NodeId) -> Vec<(String, String)> {
        let mut entries = Vec::new();
        for node in self.dom.all_element_nodes() {
            if node == form || self.dom.form_owner(node) != Some(form) {
                continue;
            }
            if self.dom.is_effectively_disabled(node) {
                continue;
            }
            let Some(name) = self.dom.attr(node, "name").filter(|name| !name.is_empty()) else {
                continue;
            };
            let value = if self.dom.is_tag(node, "select") || self.dom.is_tag(node, "textarea") {
                self.dom.value(node).unwrap_or_default()
            } else if self.dom.is_tag(node, "input") {
                match self.dom.input_type(node).as_str() {
                    "submit" | "reset" | "button" | "image" | "file" => continue,
                    "checkbox" | "radio" if !self.dom.checked(node) => continue,
                    "checkbox" | "radio" => self
                        .dom
                        .attr(node, "value")
                        .unwrap_or_else(|| "on".into()),
                    _ => self.dom.value(node).unwrap_or_default(),
                }
            } else {
                continue;
            };
            entries.push((name, value));
        }
        entries
    }

    fn trace_event_done(&mut self, event: &EventState, outcome: &str) {
        if !self.trace_state.enabled {
            return;
        }
        let target_label = self.dom.node_label(event.target);
        let current_label = self.dom.node_label(event.current_target);
        self.trace_event_line(format!(
            "[event] done {} target={} current={} outcome={} default_prevented={} propagation_stopped={}",
            event.event_type,
            target_label,
            current_label,
            outcome,
            event.default_prevented,
            event.propagation_stopped
        ));
    }

    fn trace_event_line(&mut self, line: String) {
        if self.trace_state.enabled && self.trace_state.events {
            self.trace_line(line);
        }
    }

    pub(crate) fn trace_guard_line(&mut self, line: String) {
        if self.trace_state.enabled && self.trace_state.guard {
            self.trace_line(line);
        }
    }

    fn trace_line(&mut self, line: String) {
        if self.trace_state.enabled {
            if self.trace_state.to_stderr {
                eprintln!("{line}");
            }
            if self.trace_state.logs.len() >= self.trace_state.log_limit {
                self.trace_state.logs.pop_front();
            }
            self.trace_state.logs.push_back(line);
        }
    }
}
