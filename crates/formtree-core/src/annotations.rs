//! Annotation Node Generator
//!
//! Layers assessor and referral answer boxes over a primary field so that
//! several reviewers can record a parallel answer to the same question.
//!
//! Two regimes apply, keyed on whether the role context already holds an
//! assessor record for the field:
//!
//! - **Historical**: one assessor box seeded from the record, one box per
//!   recorded referral, plus a fresh box for a referral viewer who has not
//!   answered yet.
//! - **Fresh**: an assessor box, and for a referral viewer their own box.
//!
//! Box names follow [`assessor_box_name`] and [`referral_box_name`] so that
//! posted values can be mapped back with [`AnnotationName::parse`].
//!
//! [`AnnotationName::parse`]: crate::definition::AnnotationName::parse

use serde_json::Value;

use crate::config::AnnotationConfig;
use crate::definition::{assessor_box_name, referral_box_name, AnnotationRole, FieldDefinition};
use crate::role::{AssessorLevel, AssessorRecord, RoleContext};
use crate::types::{NodeAttributes, NodeKind, RenderNode};
use crate::visibility::{assessor_can_edit, referral_can_edit};

/// Builds annotation boxes for one role context.
pub struct AnnotationGenerator<'a> {
    ctx: &'a RoleContext,
    assessor_label: &'a str,
}

impl<'a> AnnotationGenerator<'a> {
    pub fn new(ctx: &'a RoleContext, config: &'a AnnotationConfig) -> Self {
        Self {
            ctx,
            assessor_label: &config.assessor_label,
        }
    }

    /// Annotation boxes for `field`, wrapped in a single row.
    ///
    /// Returns an empty sequence when no box applies; the row is never
    /// emitted empty.
    pub fn generate(&self, field: &FieldDefinition, value: &Value) -> Vec<RenderNode> {
        let boxes = self.boxes(field, value);
        if boxes.is_empty() {
            return Vec::new();
        }

        vec![RenderNode {
            kind: NodeKind::AnnotationRow,
            attrs: NodeAttributes {
                name: format!("{}-annotations", field.name),
                ..NodeAttributes::default()
            },
            children: boxes,
        }]
    }

    /// The unwrapped annotation boxes for `field`, in display order.
    pub fn boxes(&self, field: &FieldDefinition, value: &Value) -> Vec<RenderNode> {
        // The submitter is still answering; nothing to review yet
        if self.ctx.can_user_edit {
            return Vec::new();
        }

        match self.ctx.assessor_record(&field.name) {
            Some(record) => self.historical_boxes(field, value, record),
            None => self.fresh_boxes(field, value),
        }
    }

    fn historical_boxes(
        &self,
        field: &FieldDefinition,
        value: &Value,
        record: &AssessorRecord,
    ) -> Vec<RenderNode> {
        let seed = if is_blank(&record.assessor_value) {
            value
        } else {
            &record.assessor_value
        };

        let mut boxes = vec![self.assessor_box(field, seed.clone(), !assessor_can_edit(self.ctx))];

        for referral in &record.referrals {
            boxes.push(annotation_box(
                referral_box_name(&field.name, &referral.email),
                AnnotationRole::Referral {
                    email: referral.email.clone(),
                },
                referral.full_name.clone(),
                referral.value.clone(),
                field.help_text.clone(),
                !referral_can_edit(self.ctx, &referral.email),
            ));
        }

        if self.ctx.level() == AssessorLevel::Referral {
            if let Some(identity) = &self.ctx.identity {
                let answered = record.referrals.iter().any(|r| r.email == identity.email);
                if !answered {
                    boxes.push(annotation_box(
                        referral_box_name(&field.name, &identity.email),
                        AnnotationRole::Referral {
                            email: identity.email.clone(),
                        },
                        identity.name.clone(),
                        seed.clone(),
                        None,
                        !self.ctx.assessor_status.can_assess,
                    ));
                }
            }
        }

        boxes
    }

    fn fresh_boxes(&self, field: &FieldDefinition, value: &Value) -> Vec<RenderNode> {
        match self.ctx.level() {
            AssessorLevel::Assessor => {
                vec![self.assessor_box(field, value.clone(), !assessor_can_edit(self.ctx))]
            }
            AssessorLevel::Referral => {
                let mut boxes = vec![self.assessor_box(field, value.clone(), true)];
                match &self.ctx.identity {
                    Some(identity) => boxes.push(annotation_box(
                        referral_box_name(&field.name, &identity.email),
                        AnnotationRole::Referral {
                            email: identity.email.clone(),
                        },
                        identity.name.clone(),
                        value.clone(),
                        None,
                        false,
                    )),
                    None => {
                        tracing::warn!(
                            field = %field.name,
                            "Referral viewer without identity, referral box skipped"
                        );
                    }
                }
                boxes
            }
            AssessorLevel::None => Vec::new(),
        }
    }

    fn assessor_box(&self, field: &FieldDefinition, value: Value, readonly: bool) -> RenderNode {
        annotation_box(
            assessor_box_name(&field.name),
            AnnotationRole::Assessor,
            self.assessor_label.to_string(),
            value,
            field.help_text.clone(),
            readonly,
        )
    }
}

fn annotation_box(
    name: String,
    role: AnnotationRole,
    label: String,
    value: Value,
    help_text: Option<String>,
    readonly: bool,
) -> RenderNode {
    RenderNode::leaf(
        NodeKind::Annotation { role },
        NodeAttributes {
            name,
            label: Some(label),
            value,
            help_text,
            readonly,
            ..NodeAttributes::default()
        },
    )
}

/// Null and empty strings count as no stored answer.
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}
