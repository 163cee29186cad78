//! Tree Renderer
//!
//! Walks a form definition depth-first and produces render nodes for the
//! hosting UI, consulting the visibility resolver for every field, the
//! reveal engine for choice fields and the annotation generator for fields
//! assessors may answer.
//!
//! ## Render pass
//!
//! Each pass owns a fresh [`RenderPass`] accumulator holding the section and
//! tab headers and the reveal state. Nothing is carried between passes, so
//! rendering the same inputs twice yields the same nodes and headers.
//!
//! ## Widgets
//!
//! Which node kind a field becomes is decided by a [`WidgetMapping`].
//! Structural kinds (group, section, tab) are always laid out by the
//! renderer itself.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::annotations::AnnotationGenerator;
use crate::config::RenderConfig;
use crate::definition::{FieldDefinition, FieldKind, FormDefinition};
use crate::reveal::{branch_path, branches_for, child_path, RevealState};
use crate::role::RoleContext;
use crate::types::{
    FormRender, InputType, NodeAttributes, NodeKind, RenderNode, SectionEntry, SubmittedValues,
    TabEntry,
};
use crate::visibility::{assessor_can_edit, resolve};
use crate::RenderError;

/// Maps a non-structural field to the node kind the hosting UI materializes.
pub trait WidgetMapping {
    /// Node kind for `field`, or `None` to render nothing.
    fn widget_for(&self, field: &FieldDefinition) -> Option<NodeKind>;
}

/// One widget per field kind.
#[derive(Debug, Clone, Default)]
pub struct StandardWidgets {
    docs_url: Option<String>,
}

impl StandardWidgets {
    pub fn new(docs_url: Option<String>) -> Self {
        Self { docs_url }
    }
}

impl WidgetMapping for StandardWidgets {
    fn widget_for(&self, field: &FieldDefinition) -> Option<NodeKind> {
        let kind = match &field.kind {
            FieldKind::Text => NodeKind::TextInput {
                input_type: InputType::Text,
            },
            FieldKind::Number => NodeKind::TextInput {
                input_type: InputType::Number,
            },
            FieldKind::Email => NodeKind::TextInput {
                input_type: InputType::Email,
            },
            FieldKind::TextArea => NodeKind::TextArea,
            FieldKind::Label => NodeKind::Label,
            FieldKind::File => NodeKind::File {
                repeatable: field.is_repeatable,
                docs_url: self.docs_url.clone(),
            },
            FieldKind::Date => NodeKind::Date,
            FieldKind::Select { options, .. } => NodeKind::Select {
                options: options.clone(),
                multiple: false,
            },
            FieldKind::MultiSelect { options } => NodeKind::Select {
                options: options.clone(),
                multiple: true,
            },
            FieldKind::RadioButtons { options, .. } => NodeKind::RadioButtons {
                options: options.clone(),
            },
            FieldKind::Checkbox { .. } => NodeKind::Checkbox,
            FieldKind::Declaration { .. } => NodeKind::Declaration,
            FieldKind::Group { .. }
            | FieldKind::Section { .. }
            | FieldKind::Tab { .. }
            | FieldKind::Unknown { .. } => return None,
        };
        Some(kind)
    }
}

/// Accumulator threaded through one render pass.
#[derive(Debug, Clone, Default)]
pub struct RenderPass {
    /// Section headers in the order first encountered
    pub sections: Vec<SectionEntry>,

    /// Tab headers in the order first encountered
    pub tabs: Vec<TabEntry>,

    pub reveal: RevealState,
}

impl RenderPass {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Renders form definitions for one role context at a time.
pub struct FormRenderer<W = StandardWidgets> {
    config: RenderConfig,
    widgets: W,
    role_context: Option<RoleContext>,
}

impl FormRenderer<StandardWidgets> {
    pub fn new(config: RenderConfig) -> Self {
        let widgets = StandardWidgets::new(config.docs_url.clone());
        Self::with_widgets(config, widgets)
    }
}

impl<W: WidgetMapping> FormRenderer<W> {
    /// Create a renderer with a custom widget mapping.
    pub fn with_widgets(config: RenderConfig, widgets: W) -> Self {
        Self {
            config,
            widgets,
            role_context: None,
        }
    }

    /// Install the role context used by subsequent passes.
    ///
    /// The snapshot is validated and then replaced wholesale; it is never
    /// mutated while a pass runs.
    pub fn set_role_context(&mut self, ctx: RoleContext) -> Result<(), RenderError> {
        ctx.validate()?;
        self.role_context = Some(ctx);
        Ok(())
    }

    pub fn role_context(&self) -> Option<&RoleContext> {
        self.role_context.as_ref()
    }

    /// Render a complete form.
    ///
    /// Uses `determinism.rendered_at` from the config when set, otherwise
    /// the current system time. Use [`FormRenderer::render_at`] for fully
    /// deterministic output.
    pub fn render(
        &self,
        form: &FormDefinition,
        values: &SubmittedValues,
    ) -> Result<FormRender, RenderError> {
        let rendered_at = self
            .config
            .determinism
            .rendered_at
            .unwrap_or_else(Utc::now);
        self.render_at(form, values, rendered_at)
    }

    /// Render a complete form with an explicit timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::RoleContextMissing`] if no role context has
    /// been installed.
    pub fn render_at(
        &self,
        form: &FormDefinition,
        values: &SubmittedValues,
        rendered_at: DateTime<Utc>,
    ) -> Result<FormRender, RenderError> {
        let walker = self.walker()?;
        let mut pass = RenderPass::new();

        let nodes: Vec<RenderNode> = form
            .fields
            .iter()
            .flat_map(|field| walker.render(field, "", Some(values), &mut pass))
            .collect();

        tracing::debug!(
            form = form.name.as_deref().unwrap_or(""),
            nodes = nodes.len(),
            sections = pass.sections.len(),
            tabs = pass.tabs.len(),
            "Render pass complete"
        );

        Ok(FormRender {
            nodes,
            sections: pass.sections,
            tabs: pass.tabs,
            reveal: pass.reveal,
            rendered_at,
        })
    }

    /// Render one field against its enclosing value scope.
    ///
    /// A field may expand into several nodes: the primary node, its
    /// condition branches and its annotation row. The field is addressed
    /// as a top-level field.
    pub fn render_field(
        &self,
        field: &FieldDefinition,
        scope: Option<&SubmittedValues>,
        pass: &mut RenderPass,
    ) -> Result<Vec<RenderNode>, RenderError> {
        Ok(self.walker()?.render(field, "", scope, pass))
    }

    fn walker(&self) -> Result<TreeWalker<'_, W>, RenderError> {
        let ctx = self
            .role_context
            .as_ref()
            .ok_or(RenderError::RoleContextMissing)?;

        Ok(TreeWalker {
            ctx,
            widgets: &self.widgets,
            annotations: AnnotationGenerator::new(ctx, &self.config.annotations),
        })
    }
}

struct TreeWalker<'a, W> {
    ctx: &'a RoleContext,
    widgets: &'a W,
    annotations: AnnotationGenerator<'a>,
}

impl<'a, W: WidgetMapping> TreeWalker<'a, W> {
    /// Render `field`, whose enclosing field path is `parent`.
    fn render(
        &self,
        field: &FieldDefinition,
        parent: &str,
        scope: Option<&SubmittedValues>,
        pass: &mut RenderPass,
    ) -> Vec<RenderNode> {
        let visibility = resolve(field, self.ctx);
        if !visibility.visible {
            return Vec::new();
        }

        let path = child_path(parent, &field.name);

        let stored = scope.and_then(|s| s.get(&field.name));
        let value = stored.cloned().unwrap_or(Value::Null);

        let attrs = NodeAttributes {
            name: field.name.clone(),
            path: path.clone(),
            label: field.label.clone(),
            value: Value::Null,
            comment_value: self.ctx.comment_for(&field.name).map(str::to_string),
            help_text: field.help_text.clone(),
            help_text_assessor: field.help_text_assessor.clone(),
            readonly: visibility.readonly(),
            assessor_readonly: !assessor_can_edit(self.ctx),
            assessor_mode: self.ctx.assessor_active(),
        };

        let mut nodes = match &field.kind {
            FieldKind::Group { children } => {
                let children = self.render_children(children, &path, stored, pass);
                vec![RenderNode {
                    kind: NodeKind::Group,
                    attrs,
                    children,
                }]
            }
            FieldKind::Section { children } => {
                pass.sections.push(SectionEntry {
                    name: field.name.clone(),
                    label: field.label.clone(),
                });
                let children = self.render_children(children, &path, stored, pass);
                vec![RenderNode {
                    kind: NodeKind::Section,
                    attrs,
                    children,
                }]
            }
            FieldKind::Tab { children } => {
                let id = field.id.clone().unwrap_or_else(|| field.name.clone());
                let active = pass.tabs.is_empty();
                pass.tabs.push(TabEntry {
                    name: field.name.clone(),
                    label: field.label.clone(),
                    id: id.clone(),
                });
                let children = self.render_children(children, &path, stored, pass);
                vec![RenderNode {
                    kind: NodeKind::TabPane { id, active },
                    attrs,
                    children,
                }]
            }
            FieldKind::Unknown { type_name } => {
                tracing::debug!(
                    field = %path,
                    type_name = %type_name,
                    "Unknown field type, rendering nothing"
                );
                return Vec::new();
            }
            _ => match self.widgets.widget_for(field) {
                Some(kind) => {
                    let primary = RenderNode::leaf(
                        kind,
                        NodeAttributes {
                            value: value.clone(),
                            ..attrs
                        },
                    );
                    let mut nodes = vec![primary];
                    nodes.extend(self.render_branches(field, &path, &value, scope, pass));
                    nodes
                }
                None => {
                    tracing::debug!(
                        field = %path,
                        type_name = %field.kind.type_name(),
                        "No widget for field, rendering nothing"
                    );
                    return Vec::new();
                }
            },
        };

        if self.ctx.assessor_active()
            && field.kind.accepts_annotations()
            && field.can_be_edited_by_assessor
        {
            nodes.extend(self.annotations.generate(field, &value));
        }

        nodes
    }

    /// Render structural children against the first stored instance.
    fn render_children(
        &self,
        children: &[FieldDefinition],
        parent: &str,
        stored: Option<&Value>,
        pass: &mut RenderPass,
    ) -> Vec<RenderNode> {
        let nested = stored
            .and_then(Value::as_array)
            .and_then(|instances| instances.first())
            .and_then(Value::as_object);

        children
            .iter()
            .flat_map(|child| self.render(child, parent, nested, pass))
            .collect()
    }

    fn render_branches(
        &self,
        field: &FieldDefinition,
        path: &str,
        value: &Value,
        scope: Option<&SubmittedValues>,
        pass: &mut RenderPass,
    ) -> Vec<RenderNode> {
        let Some(conditions) = field.kind.conditions() else {
            return Vec::new();
        };

        pass.reveal.register(
            path,
            conditions.keys().map(str::to_string).collect(),
            value,
        );

        // Declaration children answer inside the declaration's own value
        let branch_scope = match field.kind {
            FieldKind::Declaration { .. } => value.as_object(),
            _ => scope,
        };

        branches_for(field, value, |condition, child| {
            self.render(child, &branch_path(path, condition), branch_scope, pass)
        })
        .into_iter()
        .map(|branch| branch.into_node(&field.name, path))
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValidationConfig;
    use crate::role::Identity;
    use serde_json::json;

    const LICENCE_FORM: &str = r#"
name: "Wildlife licence application"
fields:
  - name: "tabs_1"
    type: "tab"
    label: "Applicant"
    id: "tab-applicant"
    children:
      - name: "section_1"
        type: "section"
        label: "Purpose"
        children:
          - name: "purpose"
            type: "radiobuttons"
            label: "Purpose of licence"
            canBeEditedByAssessor: true
            options:
              - label: "Research"
                value: "research"
              - label: "Education"
                value: "education"
            conditions:
              research:
                - name: "institution"
                  type: "text"
                  label: "Institution"
              education:
                - name: "school"
                  type: "text"
                  label: "School"
          - name: "officer_notes"
            type: "text_area"
            label: "Officer notes"
            isVisibleForAssessorOnly: true
  - name: "tabs_2"
    type: "tab"
    label: "Species"
    children:
      - name: "species_group"
        type: "group"
        label: "Species"
        children:
          - name: "wildlife_species"
            type: "text"
            label: "Species name"
            canBeEditedByAssessor: true
          - name: "permit"
            type: "file"
            isRepeatable: true
"#;

    fn form() -> FormDefinition {
        FormDefinition::from_yaml(LICENCE_FORM, &ValidationConfig::default()).unwrap()
    }

    fn values() -> SubmittedValues {
        let values = json!({
            "tabs_1": [{
                "section_1": [{
                    "purpose": "education",
                    "school": "Northside High"
                }]
            }],
            "tabs_2": [{
                "species_group": [{
                    "wildlife_species": "Numbat"
                }]
            }]
        });
        match values {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn renderer(ctx: RoleContext) -> FormRenderer {
        let mut renderer = FormRenderer::new(RenderConfig {
            docs_url: Some("https://docs.example.org/".to_string()),
            ..RenderConfig::default()
        });
        renderer.set_role_context(ctx).unwrap();
        renderer
    }

    fn at() -> DateTime<Utc> {
        use chrono::TimeZone;
        Utc.with_ymd_and_hms(2025, 12, 20, 10, 0, 0).unwrap()
    }

    #[test]
    fn test_missing_role_context_is_an_error() {
        let renderer = FormRenderer::new(RenderConfig::default());
        let result = renderer.render(&form(), &values());
        assert!(matches!(result, Err(RenderError::RoleContextMissing)));

        let mut pass = RenderPass::new();
        let field = FieldDefinition::new("q1", FieldKind::Text);
        assert!(matches!(
            renderer.render_field(&field, None, &mut pass),
            Err(RenderError::RoleContextMissing)
        ));
    }

    #[test]
    fn test_nested_values_reach_leaf_fields() {
        let output = renderer(RoleContext::submitter(false, true))
            .render_at(&form(), &values(), at())
            .unwrap();

        assert_eq!(output.find("wildlife_species").unwrap().attrs.value, json!("Numbat"));
        assert_eq!(output.find("school").unwrap().attrs.value, json!("Northside High"));
        assert_eq!(output.find("purpose").unwrap().attrs.value, json!("education"));
        // Absent keys are null
        assert_eq!(output.find("institution").unwrap().attrs.value, Value::Null);
        // Structural nodes carry no value of their own
        assert_eq!(output.find("species_group").unwrap().attrs.value, Value::Null);
        assert_eq!(output.rendered_at, at());
    }

    #[test]
    fn test_tabs_and_sections_collected() {
        let output = renderer(RoleContext::submitter(false, true))
            .render_at(&form(), &values(), at())
            .unwrap();

        let tab_ids: Vec<&str> = output.tabs.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(tab_ids, vec!["tab-applicant", "tabs_2"]);
        assert_eq!(output.sections.len(), 1);
        assert_eq!(output.sections[0].name, "section_1");
        assert_eq!(output.sections[0].label.as_deref(), Some("Purpose"));

        let active: Vec<bool> = output
            .nodes
            .iter()
            .map(|n| matches!(n.kind, NodeKind::TabPane { active: true, .. }))
            .collect();
        assert_eq!(active, vec![true, false]);
    }

    #[test]
    fn test_condition_branches_follow_value() {
        let output = renderer(RoleContext::submitter(false, true))
            .render_at(&form(), &values(), at())
            .unwrap();

        let research = output.find("cons_purpose_research").unwrap();
        let education = output.find("cons_purpose_education").unwrap();
        assert!(matches!(
            research.kind,
            NodeKind::ConditionBranch { revealed: false, .. }
        ));
        assert!(matches!(
            education.kind,
            NodeKind::ConditionBranch { revealed: true, .. }
        ));
        assert_eq!(
            output.reveal.revealed("tabs_1.section_1.purpose"),
            Some("education")
        );
        assert_eq!(output.reveal.revealed("purpose"), None);
    }

    #[test]
    fn test_nodes_carry_field_paths() {
        let output = renderer(RoleContext::submitter(false, true))
            .render_at(&form(), &values(), at())
            .unwrap();

        assert_eq!(output.find("tabs_1").unwrap().attrs.path, "tabs_1");
        assert_eq!(
            output.find("purpose").unwrap().attrs.path,
            "tabs_1.section_1.purpose"
        );
        assert_eq!(
            output.find("school").unwrap().attrs.path,
            "tabs_1.section_1.purpose[education].school"
        );
        assert_eq!(
            output.find("cons_purpose_education").unwrap().attrs.path,
            "tabs_1.section_1.purpose"
        );
        assert_eq!(
            output.find("wildlife_species").unwrap().attrs.path,
            "tabs_2.species_group.wildlife_species"
        );
    }

    #[test]
    fn test_value_change_flips_rendered_branches() {
        let mut output = renderer(RoleContext::submitter(false, true))
            .render_at(&form(), &values(), at())
            .unwrap();

        let path = output.find("purpose").unwrap().attrs.path.clone();
        let delta = output.apply_value_change(&crate::reveal::ValueChanged::selected(
            path.as_str(),
            "research",
        ));
        assert_eq!(delta.hidden.as_deref(), Some("education"));
        assert_eq!(delta.revealed.as_deref(), Some("research"));

        let research = output.find("cons_purpose_research").unwrap();
        let education = output.find("cons_purpose_education").unwrap();
        assert!(matches!(
            research.kind,
            NodeKind::ConditionBranch { revealed: true, .. }
        ));
        assert!(matches!(
            education.kind,
            NodeKind::ConditionBranch { revealed: false, .. }
        ));

        // The bare name does not address a nested field
        let delta = output.apply_value_change(&crate::reveal::ValueChanged::selected(
            "purpose",
            "education",
        ));
        assert!(delta.is_noop());
    }

    #[test]
    fn test_assessor_only_field_hidden_from_submitter() {
        let output = renderer(RoleContext::submitter(true, false))
            .render_at(&form(), &values(), at())
            .unwrap();
        assert!(output.find("officer_notes").is_none());
    }

    #[test]
    fn test_assessor_sees_annotations() {
        let ctx = RoleContext::assessor(Identity::new("a@x.com", "Ash"), true, true);
        let output = renderer(ctx).render_at(&form(), &values(), at()).unwrap();

        let notes = output.find("officer_notes").unwrap();
        assert!(!notes.attrs.readonly);
        assert!(notes.attrs.assessor_mode);

        let species = output.find("wildlife_species").unwrap();
        assert!(species.attrs.readonly);
        assert!(!species.attrs.assessor_readonly);

        let assessor_box = output.find("wildlife_species-Assessor").unwrap();
        assert_eq!(assessor_box.attrs.value, json!("Numbat"));
        assert!(output.find("purpose-Assessor").is_some());
        // Files are not flagged as assessor-editable
        assert!(output.find("permit-Assessor").is_none());
    }

    #[test]
    fn test_annotation_rows_only_for_annotatable_kinds() {
        let yaml = r#"
- name: "decl"
  type: "declaration"
  label: "I declare"
  canBeEditedByAssessor: true
- name: "grp"
  type: "group"
  canBeEditedByAssessor: true
  children:
    - name: "inner"
      type: "text"
- name: "sec"
  type: "section"
  canBeEditedByAssessor: true
  children: []
- name: "intro"
  type: "label"
  label: "Read this first"
  canBeEditedByAssessor: true
- name: "tab_a"
  type: "tab"
  canBeEditedByAssessor: true
  children: []
"#;
        let form = FormDefinition::from_yaml(yaml, &ValidationConfig::default()).unwrap();
        let ctx = RoleContext::assessor(Identity::new("a@x.com", "Ash"), true, true);
        let output = renderer(ctx)
            .render_at(&form, &SubmittedValues::new(), at())
            .unwrap();

        for name in ["decl", "grp", "sec", "intro"] {
            assert!(output.find(name).is_some(), "{} should render", name);
            assert!(
                output.find(&format!("{}-annotations", name)).is_none(),
                "{} should not be annotated",
                name
            );
        }

        let row = output.find("tab_a-annotations").unwrap();
        assert_eq!(row.kind, NodeKind::AnnotationRow);
        assert!(output.find("tab_a-Assessor").is_some());
    }

    #[test]
    fn test_comment_and_assessor_help_reach_nodes() {
        let yaml = r#"
- name: "q1"
  type: "text"
  help_text: "Describe the site"
  help_text_assessor: "Check against the survey map"
- name: "q2"
  type: "text"
"#;
        let form = FormDefinition::from_yaml(yaml, &ValidationConfig::default()).unwrap();

        let mut comments = std::collections::BTreeMap::new();
        comments.insert("q1".to_string(), "Map attached".to_string());
        let ctx = RoleContext::assessor(Identity::new("a@x.com", "Ash"), true, true)
            .with_comment_data(comments);

        let renderer = renderer(ctx);
        assert_eq!(
            renderer.role_context().and_then(|c| c.comment_for("q1")),
            Some("Map attached")
        );

        let output = renderer
            .render_at(&form, &SubmittedValues::new(), at())
            .unwrap();

        let q1 = output.find("q1").unwrap();
        assert_eq!(q1.attrs.comment_value.as_deref(), Some("Map attached"));
        assert_eq!(q1.attrs.help_text.as_deref(), Some("Describe the site"));
        assert_eq!(
            q1.attrs.help_text_assessor.as_deref(),
            Some("Check against the survey map")
        );

        let q2 = output.find("q2").unwrap();
        assert_eq!(q2.attrs.comment_value, None);
        assert_eq!(q2.attrs.help_text_assessor, None);
    }

    #[test]
    fn test_single_comment_via_builder() {
        let ctx = RoleContext::submitter(true, false).with_comment("q1", "Looks fine");
        let form = FormDefinition::new(vec![FieldDefinition::new("q1", FieldKind::Text)]);
        let output = renderer(ctx)
            .render_at(&form, &SubmittedValues::new(), at())
            .unwrap();
        assert_eq!(
            output.find("q1").unwrap().attrs.comment_value.as_deref(),
            Some("Looks fine")
        );
    }

    #[test]
    fn test_role_context_is_replaced_wholesale() {
        let mut renderer = FormRenderer::new(RenderConfig::default());
        assert!(renderer.role_context().is_none());

        renderer
            .set_role_context(RoleContext::submitter(false, true).with_comment("q1", "old"))
            .unwrap();
        renderer
            .set_role_context(RoleContext::submitter(true, false))
            .unwrap();

        let ctx = renderer.role_context().unwrap();
        assert!(ctx.readonly);
        assert_eq!(ctx.comment_for("q1"), None);
    }

    #[test]
    fn test_file_node_carries_docs_url() {
        let output = renderer(RoleContext::submitter(false, true))
            .render_at(&form(), &values(), at())
            .unwrap();
        let permit = output.find("permit").unwrap();
        assert_eq!(
            permit.kind,
            NodeKind::File {
                repeatable: true,
                docs_url: Some("https://docs.example.org/".to_string())
            }
        );
    }

    #[test]
    fn test_unknown_kind_renders_nothing() {
        let yaml = r#"
- name: "q1"
  type: "signature"
- name: "q2"
  type: "text"
"#;
        let config = ValidationConfig {
            strict_field_types: false,
        };
        let form = FormDefinition::from_yaml(yaml, &config).unwrap();
        let output = renderer(RoleContext::submitter(false, true))
            .render_at(&form, &SubmittedValues::new(), at())
            .unwrap();
        assert_eq!(output.nodes.len(), 1);
        assert_eq!(output.nodes[0].name(), "q2");
    }

    #[test]
    fn test_declaration_children_use_nested_scope() {
        let yaml = r#"
- name: "decl"
  type: "declaration"
  label: "I declare"
  conditions:
    "on":
      - name: "signed_by"
        type: "text"
"#;
        let form = FormDefinition::from_yaml(yaml, &ValidationConfig::default()).unwrap();
        let values = match json!({"decl": {"signed_by": "Jo"}, "signed_by": "wrong"}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        let output = renderer(RoleContext::submitter(false, true))
            .render_at(&form, &values, at())
            .unwrap();
        assert_eq!(output.find("signed_by").unwrap().attrs.value, json!("Jo"));
    }

    struct NoDates;

    impl WidgetMapping for NoDates {
        fn widget_for(&self, field: &FieldDefinition) -> Option<NodeKind> {
            match field.kind {
                FieldKind::Date => None,
                _ => StandardWidgets::default().widget_for(field),
            }
        }
    }

    #[test]
    fn test_custom_widget_mapping() {
        let form = FormDefinition::new(vec![
            FieldDefinition::new("when", FieldKind::Date),
            FieldDefinition::new("where", FieldKind::Text),
        ]);
        let mut renderer = FormRenderer::with_widgets(RenderConfig::default(), NoDates);
        renderer
            .set_role_context(RoleContext::submitter(false, true))
            .unwrap();

        let output = renderer
            .render_at(&form, &SubmittedValues::new(), at())
            .unwrap();
        let names: Vec<&str> = output.nodes.iter().map(|n| n.name()).collect();
        assert_eq!(names, vec!["where"]);
    }

    #[test]
    fn test_configured_timestamp() {
        use chrono::TimeZone;
        let mut renderer = FormRenderer::new(RenderConfig {
            determinism: crate::config::DeterminismConfig {
                rendered_at: Some(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()),
            },
            ..RenderConfig::default()
        });
        renderer
            .set_role_context(RoleContext::submitter(false, true))
            .unwrap();
        let output = renderer.render(&form(), &values()).unwrap();
        assert_eq!(
            output.rendered_at,
            Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()
        );
    }
}
