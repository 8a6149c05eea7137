use crate::Result;
use crate::config::MarkerClasses;
use crate::dom::{Dom, NodeId};
use crate::field::FieldState;

/// Class edits that render a [`FieldState`]; removals apply before the addition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerChange<'a> {
    pub add: Option<&'a str>,
    pub remove: Vec<&'a str>,
}

pub fn marker_change<'a>(state: &FieldState, markers: &'a MarkerClasses) -> MarkerChange<'a> {
    match state {
        FieldState::Unvalidated => MarkerChange {
            add: None,
            remove: vec![markers.valid.as_str(), markers.invalid.as_str()],
        },
        FieldState::Valid => MarkerChange {
            add: Some(markers.valid.as_str()),
            remove: vec![markers.invalid.as_str()],
        },
        FieldState::Invalid(_) => MarkerChange {
            add: Some(markers.invalid.as_str()),
            remove: vec![markers.valid.as_str()],
        },
    }
}

impl MarkerChange<'_> {
    pub(crate) fn apply(&self, dom: &mut Dom, node: NodeId) -> Result<()> {
        for class_name in &self.remove {
            dom.class_remove(node, class_name)?;
        }
        if let Some(class_name) = self.add {
            dom.class_add(node, class_name)?;
        }
        Ok(())
    }
}
