//! Browser adapter: binds the rule table to the live document.

use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{
    Document, Element, Event, HtmlElement, HtmlFormElement, HtmlInputElement, HtmlSelectElement,
    HtmlTextAreaElement, ScrollBehavior, ScrollIntoViewOptions, ScrollLogicalPosition,
};

use crate::config::GuardConfig;
use crate::field::{FieldState, Verdict};
use crate::markers::marker_change;
use crate::rules::{AttrSource, FIELD_RULES, FieldKind};

impl AttrSource for Element {
    fn attr(&self, name: &str) -> Option<String> {
        self.get_attribute(name)
    }
}

/// Binds the rules with the default configuration once the document is ready.
#[wasm_bindgen]
pub fn install() -> Result<(), JsValue> {
    install_with(GuardConfig::default())
}

pub fn install_with(config: GuardConfig) -> Result<(), JsValue> {
    config
        .validate()
        .map_err(|err| JsValue::from_str(&err.to_string()))?;
    let document = web_sys::window()
        .and_then(|window| window.document())
        .ok_or_else(|| JsValue::from_str("no document"))?;
    let config = Rc::new(config);

    if document.ready_state() != "loading" {
        return bind_document(&document, &config);
    }

    let target = document.clone();
    let on_ready = Closure::<dyn FnMut()>::new(move || {
        report(bind_document(&target, &config));
    });
    document.add_event_listener_with_callback_and_bool(
        "DOMContentLoaded",
        on_ready.as_ref().unchecked_ref(),
        false,
    )?;
    on_ready.forget();
    Ok(())
}

fn bind_document(document: &Document, config: &Rc<GuardConfig>) -> Result<(), JsValue> {
    let today = config.clock.today();

    for rule in FIELD_RULES {
        for element in query_all(document, rule.selector)? {
            let Some(kind) = (rule.refine)(&element) else {
                continue;
            };
            if let Some((name, value)) = kind.bind_patch(today) {
                element.set_attribute(name, &value)?;
            }
            for event in kind.events() {
                let config = Rc::clone(config);
                let field = element.clone();
                listen(&element, event, move |event: Event| {
                    run_field_rule(kind, &field, &event.type_(), &config);
                })?;
            }
        }
    }

    for form in query_all(document, "form")? {
        let config = Rc::clone(config);
        let target = form.clone();
        listen(&form, "submit", move |event: Event| {
            submit_gate(&target, &event, &config);
        })?;
    }

    for control in query_all(document, "input, textarea, select")? {
        for event in ["blur", "input"] {
            let config = Rc::clone(config);
            let field = control.clone();
            listen(&control, event, move |event: Event| {
                let valid = check_validity(&field);
                match (event.type_().as_str(), valid) {
                    (_, true) => render(&field, &FieldState::Valid, &config),
                    ("blur", false) => render(&field, &FieldState::Invalid(String::new()), &config),
                    _ => {}
                }
            })?;
        }
    }
    Ok(())
}

fn query_all(root: &Document, selector: &str) -> Result<Vec<Element>, JsValue> {
    let list = root.query_selector_all(selector)?;
    Ok((0..list.length())
        .filter_map(|idx| list.item(idx))
        .filter_map(|node| node.dyn_into::<Element>().ok())
        .collect())
}

fn listen<F>(element: &Element, event: &str, handler: F) -> Result<(), JsValue>
where
    F: FnMut(Event) + 'static,
{
    let closure = Closure::<dyn FnMut(Event)>::new(handler);
    element.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())?;
    closure.forget();
    Ok(())
}

fn run_field_rule(kind: FieldKind, element: &Element, event_type: &str, config: &GuardConfig) {
    let Some(input) = element.dyn_ref::<HtmlInputElement>() else {
        return;
    };
    let mut value = input.value();
    if event_type == "input" {
        if let Some(next) = kind.transform_input(&value) {
            input.set_value(&next);
            value = next;
        }
    }
    match kind.verdict_for(event_type, &value, config.clock.today()) {
        Some(Verdict::Reject(issue)) => {
            let message = issue.message(&config.messages);
            input.set_custom_validity(message);
            render(element, &FieldState::Invalid(message.to_string()), config);
        }
        Some(Verdict::Clear) => {
            input.set_custom_validity("");
            if element.class_list().contains(&config.markers.invalid) {
                render(element, &FieldState::Unvalidated, config);
            }
        }
        None => {}
    }
}

fn submit_gate(form: &Element, event: &Event, config: &GuardConfig) {
    let Some(form_element) = form.dyn_ref::<HtmlFormElement>() else {
        return;
    };
    if !form_element.check_validity() {
        event.prevent_default();
        event.stop_propagation();

        let invalid = form
            .query_selector_all(":invalid")
            .map(|list| {
                (0..list.length())
                    .filter_map(|idx| list.item(idx))
                    .filter_map(|node| node.dyn_into::<Element>().ok())
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        for field in &invalid {
            render(field, &FieldState::Invalid(String::new()), config);
        }
        if let Some(first) = invalid.first() {
            let options = ScrollIntoViewOptions::new();
            options.set_behavior(ScrollBehavior::Smooth);
            options.set_block(ScrollLogicalPosition::Center);
            first.scroll_into_view_with_scroll_into_view_options(&options);
            if let Some(focusable) = first.dyn_ref::<HtmlElement>() {
                report(focusable.focus());
            }
        }
    }
    report(form.class_list().add_1(&config.markers.validated));
}

fn check_validity(element: &Element) -> bool {
    if let Some(input) = element.dyn_ref::<HtmlInputElement>() {
        return input.check_validity();
    }
    if let Some(textarea) = element.dyn_ref::<HtmlTextAreaElement>() {
        return textarea.check_validity();
    }
    if let Some(select) = element.dyn_ref::<HtmlSelectElement>() {
        return select.check_validity();
    }
    true
}

fn render(element: &Element, state: &FieldState, config: &GuardConfig) {
    let change = marker_change(state, &config.markers);
    let classes = element.class_list();
    for class_name in &change.remove {
        report(classes.remove_1(class_name));
    }
    if let Some(class_name) = change.add {
        report(classes.add_1(class_name));
    }
}

fn report(result: Result<(), JsValue>) {
    if let Err(err) = result {
        web_sys::console::error_1(&err);
    }
}
