//! # formtree-core
//!
//! Role-aware render engine for declarative form definitions.
//!
//! This crate turns a nested form definition plus already-loaded answers
//! into a tree of render nodes for a hosting UI, answering for each field:
//! - Is it shown to this viewer?
//! - May this viewer edit it?
//! - Which of its condition branches is revealed?
//! - Which assessor and referral boxes sit alongside it?
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: Same definition, values and role context always
//!    produce the same nodes and headers
//! 2. **Single source of visibility**: Every show/edit decision goes through
//!    [`visibility::resolve`]
//! 3. **No ambient state**: Section and tab headers live in a per-pass
//!    accumulator, never on the renderer
//! 4. **Permissive rendering**: Unknown kinds and missing values never fail
//!    a pass; only a missing role context does
//!
//! ## Example
//!
//! ```rust,ignore
//! use formtree_core::{FormDefinition, FormRenderer, RenderConfig, RoleContext};
//!
//! let config = RenderConfig::from_yaml_file("formtree.yaml")?;
//! let form = FormDefinition::from_yaml_file("licence.yaml", &config.validation)?;
//!
//! let mut renderer = FormRenderer::new(config);
//! renderer.set_role_context(RoleContext::submitter(false, true))?;
//!
//! let output = renderer.render(&form, &values)?;
//! for section in &output.sections {
//!     println!("{}", section.name);
//! }
//! ```

pub mod annotations;
pub mod config;
pub mod definition;
pub mod renderer;
pub mod reveal;
pub mod role;
pub mod types;
pub mod visibility;

// Re-export main types at crate root
pub use annotations::AnnotationGenerator;
pub use config::{AnnotationConfig, ConfigError, DeterminismConfig, RenderConfig, ValidationConfig};
pub use definition::{
    assessor_box_name, referral_box_name, AnnotationName, AnnotationRole, ConditionBranchDef,
    Conditions, DefinitionError, DefinitionWarning, FieldDefinition, FieldKind, FormDefinition,
    SelectOption,
};
pub use renderer::{FormRenderer, RenderPass, StandardWidgets, WidgetMapping};
pub use reveal::{
    branch_path, child_path, discriminator, ConditionBranch, RevealDelta, RevealState, ValueChanged,
};
pub use role::{
    AssessorLevel, AssessorRecord, AssessorStatus, Assignment, CustomerStatus, Identity,
    ProcessingStatus, ReferralEntry, RoleContext, RoleContextError,
};
pub use types::{
    FormRender, InputType, NodeAttributes, NodeKind, RenderNode, SectionEntry, SubmittedValues,
    TabEntry,
};
pub use visibility::Visibility;

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur during a render pass
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("No role context established before rendering")]
    RoleContextMissing,

    #[error("Invalid role context: {0}")]
    RoleContext(#[from] RoleContextError),
}

/// Render a form for one role context with the default configuration.
///
/// # Determinism
///
/// This function uses the current system time for `rendered_at`.
/// For fully deterministic results, use [`render_form_at`] instead.
pub fn render_form(
    form: &FormDefinition,
    values: &SubmittedValues,
    ctx: RoleContext,
) -> Result<FormRender, RenderError> {
    render_form_at(form, values, ctx, Utc::now())
}

/// Render a form with an explicit timestamp.
///
/// This function is fully deterministic: same inputs always produce same output.
pub fn render_form_at(
    form: &FormDefinition,
    values: &SubmittedValues,
    ctx: RoleContext,
    rendered_at: DateTime<Utc>,
) -> Result<FormRender, RenderError> {
    let mut renderer = FormRenderer::new(RenderConfig::default());
    renderer.set_role_context(ctx)?;
    renderer.render_at(form, values, rendered_at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn at() -> DateTime<Utc> {
        use chrono::TimeZone;
        Utc.with_ymd_and_hms(2025, 12, 20, 10, 0, 0).unwrap()
    }

    #[test]
    fn test_basic_render() {
        let yaml = r#"
- name: "applicant_name"
  type: "text"
  label: "Full name"
- name: "contact"
  type: "email"
"#;
        let form = FormDefinition::from_yaml(yaml, &ValidationConfig::default()).unwrap();
        let values = match json!({"applicant_name": "Jo Bloggs"}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        let output = render_form_at(&form, &values, RoleContext::submitter(false, true), at())
            .unwrap();

        assert_eq!(output.nodes.len(), 2);
        assert_eq!(output.nodes[0].attrs.value, json!("Jo Bloggs"));
        assert_eq!(output.nodes[1].attrs.value, Value::Null);
        assert!(!output.nodes[0].attrs.readonly);
    }

    #[test]
    fn test_invalid_role_context_rejected() {
        let mut ctx = RoleContext::referral(Identity::new("r@x.com", "Rae"), true);
        ctx.identity = None;

        let result = render_form(&FormDefinition::new(vec![]), &SubmittedValues::new(), ctx);
        assert!(matches!(
            result,
            Err(RenderError::RoleContext(RoleContextError::MissingIdentity { .. }))
        ));
    }
}
