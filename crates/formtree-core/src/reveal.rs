//! Conditional Reveal Engine
//!
//! Choice-style fields (select, radio buttons, checkbox, declaration) carry
//! condition branches: child fields revealed when a given value is selected.
//! This module decides which branch is revealed from the field's current
//! value and keeps that decision up to date as value-change events arrive.
//!
//! ## Invariants
//!
//! - Every condition produces a branch, in definition order
//! - At most one branch per field is revealed
//! - A change flips exactly the previously revealed branch and the newly
//!   matching one; no other branch changes
//!
//! Multi-valued controls are tracked by a single discriminator: the first
//! selected value.
//!
//! ## Field paths
//!
//! Reveal state is keyed by field path, not bare name, since the same name
//! may appear in different groups. A path joins the enclosing structural
//! field names with `.` (`species_group.purpose`); fields inside a condition
//! branch add the branch value in brackets (`purpose[research].detail`).
//! A top-level field's path is its name.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::definition::FieldDefinition;
use crate::types::{NodeAttributes, NodeKind, RenderNode};

/// Discriminator a checked checkbox reports.
pub const CHECKED_VALUE: &str = "on";

/// Path of a field named `name` under the field path `parent`.
pub fn child_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", parent, name)
    }
}

/// Path prefix for children of the branch `condition_value` of `field_path`.
pub fn branch_path(field_path: &str, condition_value: &str) -> String {
    format!("{}[{}]", field_path, condition_value)
}

/// Reduce a field value to the single key compared against condition keys.
///
/// Returns `None` for unset values, which reveal no branch.
pub fn discriminator(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(true) => Some(CHECKED_VALUE.to_string()),
        Value::Bool(false) => None,
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => items.first().and_then(discriminator),
        Value::Object(_) => None,
    }
}

/// One condition branch with its rendered children.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionBranch {
    pub condition_value: String,
    pub children: Vec<RenderNode>,
    pub revealed: bool,
}

impl ConditionBranch {
    /// Wrap the branch into a node the hosting UI can show or hide.
    ///
    /// The node is named after the field `name`; `path` addresses it for
    /// value changes.
    pub fn into_node(self, name: &str, path: &str) -> RenderNode {
        RenderNode {
            attrs: NodeAttributes {
                name: format!("cons_{}_{}", name, self.condition_value),
                path: path.to_string(),
                ..NodeAttributes::default()
            },
            kind: NodeKind::ConditionBranch {
                field: path.to_string(),
                condition_value: self.condition_value,
                revealed: self.revealed,
            },
            children: self.children,
        }
    }
}

/// Build every condition branch of `field` for its current value.
///
/// `render_child` renders one child definition of the branch with the given
/// condition value; it is called for every child of every branch, revealed
/// or not, so hidden branches are ready to show without another walk.
pub fn branches_for<F>(
    field: &FieldDefinition,
    current: &Value,
    mut render_child: F,
) -> Vec<ConditionBranch>
where
    F: FnMut(&str, &FieldDefinition) -> Vec<RenderNode>,
{
    let Some(conditions) = field.kind.conditions() else {
        return Vec::new();
    };

    let selected = discriminator(current);

    conditions
        .iter()
        .map(|branch| ConditionBranch {
            condition_value: branch.value.clone(),
            children: branch
                .children
                .iter()
                .flat_map(|child| render_child(&branch.value, child))
                .collect(),
            revealed: selected.as_deref() == Some(branch.value.as_str()),
        })
        .collect()
}

/// A value-change event forwarded by the hosting UI.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueChanged {
    /// Path of the changed field
    pub field: String,

    pub value: Value,
}

impl ValueChanged {
    pub fn new(field: impl Into<String>, value: Value) -> Self {
        Self {
            field: field.into(),
            value,
        }
    }

    /// A select or radio selection.
    pub fn selected(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(field, Value::String(value.into()))
    }

    /// A checkbox or declaration toggle.
    pub fn checked(field: impl Into<String>, checked: bool) -> Self {
        Self::new(field, Value::Bool(checked))
    }
}

/// Branch flips produced by one value-change event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevealDelta {
    pub field: String,

    /// Branch that was revealed and is now hidden
    pub hidden: Option<String>,

    /// Branch that is now revealed
    pub revealed: Option<String>,
}

impl RevealDelta {
    fn unchanged(field: &str) -> Self {
        Self {
            field: field.to_string(),
            hidden: None,
            revealed: None,
        }
    }

    pub fn is_noop(&self) -> bool {
        self.hidden.is_none() && self.revealed.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct FieldReveal {
    keys: Vec<String>,
    revealed: Option<String>,
}

/// Currently revealed branch per choice field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RevealState {
    fields: BTreeMap<String, FieldReveal>,
}

impl RevealState {
    /// Record a field's branch keys and the branch its current value reveals.
    ///
    /// Paths are unique in a validated definition. If one repeats anyway the
    /// first registration wins.
    pub fn register(&mut self, field: &str, keys: Vec<String>, current: &Value) {
        if self.fields.contains_key(field) {
            tracing::warn!(
                field = %field,
                "Choice field path already registered, keeping first"
            );
            return;
        }

        let revealed = discriminator(current).filter(|d| keys.contains(d));
        self.fields
            .insert(field.to_string(), FieldReveal { keys, revealed });
    }

    pub fn is_registered(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// The branch key currently revealed for a field.
    pub fn revealed(&self, field: &str) -> Option<&str> {
        self.fields.get(field)?.revealed.as_deref()
    }

    pub fn is_revealed(&self, field: &str, key: &str) -> bool {
        self.revealed(field) == Some(key)
    }

    /// Per-branch reveal flags for a field, in definition order.
    pub fn branches(&self, field: &str) -> Vec<(&str, bool)> {
        match self.fields.get(field) {
            Some(entry) => entry
                .keys
                .iter()
                .map(|k| (k.as_str(), entry.revealed.as_deref() == Some(k.as_str())))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Apply a value change, hiding the old branch and revealing the new one.
    pub fn apply(&mut self, event: &ValueChanged) -> RevealDelta {
        let Some(entry) = self.fields.get_mut(&event.field) else {
            tracing::debug!(
                field = %event.field,
                "Value change for field without condition branches ignored"
            );
            return RevealDelta::unchanged(&event.field);
        };

        let next = discriminator(&event.value).filter(|d| entry.keys.contains(d));
        if next == entry.revealed {
            return RevealDelta::unchanged(&event.field);
        }

        let hidden = std::mem::replace(&mut entry.revealed, next.clone());
        RevealDelta {
            field: event.field.clone(),
            hidden,
            revealed: next,
        }
    }
}
