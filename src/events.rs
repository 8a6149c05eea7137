use std::collections::{HashMap, VecDeque};

use crate::dom::NodeId;
use crate::rules::FieldKind;

/// Work attached to an element for one event type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Handler {
    Field(FieldKind),
    LiveFeedback,
    SubmitGate,
    Record,
}

#[derive(Debug, Default)]
pub(crate) struct ListenerStore {
    map: HashMap<NodeId, HashMap<String, Vec<Handler>>>,
}

impl ListenerStore {
    /// Registering the same handler twice for a node and event type is a no-op.
    pub(crate) fn add(&mut self, node_id: NodeId, event: &str, handler: Handler) {
        let handlers = self
            .map
            .entry(node_id)
            .or_default()
            .entry(event.to_string())
            .or_default();
        if !handlers.contains(&handler) {
            handlers.push(handler);
        }
    }

    pub(crate) fn get(&self, node_id: NodeId, event: &str) -> Vec<Handler> {
        self.map
            .get(&node_id)
            .and_then(|events| events.get(event))
            .cloned()
            .unwrap_or_default()
    }

    pub(crate) fn len(&self) -> usize {
        self.map
            .values()
            .flat_map(HashMap::values)
            .map(Vec::len)
            .sum()
    }
}

#[derive(Debug, Clone)]
pub(crate) struct EventState {
    pub(crate) event_type: String,
    pub(crate) target: NodeId,
    pub(crate) current_target: NodeId,
    pub(crate) bubbles: bool,
    pub(crate) cancelable: bool,
    pub(crate) default_prevented: bool,
    pub(crate) propagation_stopped: bool,
}

impl EventState {
    pub(crate) fn new(event_type: &str, target: NodeId) -> Self {
        Self {
            event_type: event_type.to_string(),
            target,
            current_target: target,
            bubbles: event_bubbles(event_type),
            cancelable: event_cancelable(event_type),
            default_prevented: false,
            propagation_stopped: false,
        }
    }

    pub(crate) fn prevent_default(&mut self) {
        if self.cancelable {
            self.default_prevented = true;
        }
    }

    pub(crate) fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }
}

fn event_bubbles(event_type: &str) -> bool {
    matches!(
        event_type,
        "input"
            | "change"
            | "submit"
            | "reset"
            | "click"
            | "focusin"
            | "focusout"
            | "keydown"
            | "keyup"
    )
}

fn event_cancelable(event_type: &str) -> bool {
    matches!(
        event_type,
        "submit" | "reset" | "click" | "invalid" | "keydown" | "keyup"
    )
}

#[derive(Debug)]
pub(crate) struct TraceState {
    pub(crate) enabled: bool,
    pub(crate) events: bool,
    pub(crate) guard: bool,
    pub(crate) logs: VecDeque<String>,
    pub(crate) log_limit: usize,
    pub(crate) to_stderr: bool,
}

impl Default for TraceState {
    fn default() -> Self {
        Self {
            enabled: false,
            events: true,
            guard: true,
            logs: VecDeque::new(),
            log_limit: 10_000,
            to_stderr: true,
        }
    }
}
