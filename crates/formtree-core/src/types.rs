//! Core types for form rendering.
//!
//! These are the data structures handed to the hosting UI: render nodes,
//! the section and tab side collections, and the outcome of a render pass.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::definition::{AnnotationRole, SelectOption};
use crate::reveal::{RevealDelta, RevealState, ValueChanged};

/// Submitted answers keyed by field name.
///
/// Groups, sections and tabs store a sequence whose first element is the
/// nested answer map for their children.
pub type SubmittedValues = Map<String, Value>;

/// Input flavour of a single-line text widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputType {
    Text,
    Number,
    Email,
}

/// What kind of UI element a node describes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeKind {
    TextInput {
        input_type: InputType,
    },
    TextArea,
    Select {
        options: Vec<SelectOption>,
        multiple: bool,
    },
    RadioButtons {
        options: Vec<SelectOption>,
    },
    Checkbox,
    Declaration,
    File {
        repeatable: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        docs_url: Option<String>,
    },
    Date,
    Label,
    Group,
    Section,
    TabPane {
        id: String,
        active: bool,
    },
    /// Children revealed by one value of a choice field
    ConditionBranch {
        field: String,
        condition_value: String,
        revealed: bool,
    },
    /// An assessor or referral answer box layered over a field
    Annotation {
        role: AnnotationRole,
    },
    /// Wrapper grouping a field's annotation boxes into one row
    AnnotationRow,
}

/// Attributes passed through to the rendering collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct NodeAttributes {
    pub name: String,

    /// Field path, the key value-change events for this field use
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Current answer, `null` when nothing was submitted
    #[serde(default)]
    pub value: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment_value: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_text_assessor: Option<String>,

    #[serde(default)]
    pub readonly: bool,

    /// Whether the assessor comment/answer affordances are read-only
    #[serde(default)]
    pub assessor_readonly: bool,

    #[serde(default)]
    pub assessor_mode: bool,
}

/// One UI element to be materialized by the hosting framework.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderNode {
    #[serde(flatten)]
    pub kind: NodeKind,

    pub attrs: NodeAttributes,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RenderNode>,
}

impl RenderNode {
    pub fn leaf(kind: NodeKind, attrs: NodeAttributes) -> Self {
        Self {
            kind,
            attrs,
            children: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.attrs.name
    }

    /// Depth-first search for a node by name, including this node.
    pub fn find(&self, name: &str) -> Option<&RenderNode> {
        if self.attrs.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(name))
    }

    /// Visit this node and all descendants in depth-first pre-order.
    pub fn visit<'a>(&'a self, f: &mut impl FnMut(&'a RenderNode)) {
        f(self);
        for child in &self.children {
            child.visit(f);
        }
    }

    fn visit_mut(&mut self, f: &mut impl FnMut(&mut RenderNode)) {
        f(self);
        for child in &mut self.children {
            child.visit_mut(f);
        }
    }
}

/// A section header encountered during a walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionEntry {
    pub name: String,
    pub label: Option<String>,
}

/// A tab header encountered during a walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabEntry {
    pub name: String,
    pub label: Option<String>,
    pub id: String,
}

/// Result of one complete render pass.
#[derive(Debug, Clone, Serialize)]
pub struct FormRender {
    /// Render nodes for all top-level fields, in definition order
    pub nodes: Vec<RenderNode>,

    /// Section headers in the order first encountered
    pub sections: Vec<SectionEntry>,

    /// Tab headers in the order first encountered
    pub tabs: Vec<TabEntry>,

    /// Which condition branch each choice field currently reveals
    pub reveal: RevealState,

    /// When the pass ran
    pub rendered_at: DateTime<Utc>,
}

impl FormRender {
    /// Depth-first search across all top-level nodes.
    pub fn find(&self, name: &str) -> Option<&RenderNode> {
        self.nodes.iter().find_map(|n| n.find(name))
    }

    /// Apply a value-change event from the hosting UI.
    ///
    /// `event.field` is the field path. Updates the reveal state and flips
    /// the affected condition branch nodes in place. Definitions are not
    /// re-walked.
    pub fn apply_value_change(&mut self, event: &ValueChanged) -> RevealDelta {
        let delta = self.reveal.apply(event);
        if delta.is_noop() {
            return delta;
        }

        for node in &mut self.nodes {
            node.visit_mut(&mut |n: &mut RenderNode| {
                if let NodeKind::ConditionBranch {
                    field,
                    condition_value,
                    revealed,
                } = &mut n.kind
                {
                    if *field == delta.field {
                        if delta.hidden.as_deref() == Some(condition_value.as_str()) {
                            *revealed = false;
                        }
                        if delta.revealed.as_deref() == Some(condition_value.as_str()) {
                            *revealed = true;
                        }
                    }
                }
            });
        }

        delta
    }
}
