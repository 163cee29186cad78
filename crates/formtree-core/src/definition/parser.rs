//! Form definition parsing from YAML/JSON.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;
use thiserror::Error;

use super::names::is_valid_field_name;
use crate::config::ValidationConfig;

/// Errors that can occur when loading form definitions.
#[derive(Error, Debug)]
pub enum DefinitionError {
    #[error("Failed to read definition file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Field '{name}' has unknown type '{type_name}'")]
    UnknownFieldType { name: String, type_name: String },

    #[error("Duplicate field name '{name}' in scope '{scope}'")]
    DuplicateFieldName { scope: String, name: String },

    #[error("Invalid field name: {0:?}")]
    InvalidFieldName(String),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

/// Non-fatal findings from definition validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefinitionWarning {
    /// A condition key with no matching option. The branch can never reveal.
    UnmatchedCondition {
        field: String,
        condition_value: String,
    },
}

impl fmt::Display for DefinitionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefinitionWarning::UnmatchedCondition {
                field,
                condition_value,
            } => write!(
                f,
                "condition '{}' on field '{}' matches no option",
                condition_value, field
            ),
        }
    }
}

/// One selectable option of a select or radio field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SelectOption {
    pub label: String,
    pub value: String,
}

/// A condition branch: the children revealed when `value` is selected.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionBranchDef {
    pub value: String,
    pub children: Vec<FieldDefinition>,
}

/// Ordered condition branches of a choice-style field.
///
/// Serialized as a map from option value to child fields. Document order of
/// the map is preserved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conditions(Vec<ConditionBranchDef>);

impl Conditions {
    pub fn new(branches: Vec<ConditionBranchDef>) -> Self {
        Self(branches)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ConditionBranchDef> {
        self.0.iter()
    }

    /// Condition keys in definition order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|b| b.value.as_str())
    }

    fn insert(&mut self, value: String, children: Vec<FieldDefinition>) {
        match self.0.iter_mut().find(|b| b.value == value) {
            Some(existing) => existing.children = children,
            None => self.0.push(ConditionBranchDef { value, children }),
        }
    }
}

struct ConditionsVisitor;

impl<'de> Visitor<'de> for ConditionsVisitor {
    type Value = Conditions;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map from option value to child fields")
    }

    fn visit_unit<E>(self) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Ok(Conditions::default())
    }

    fn visit_none<E>(self) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Ok(Conditions::default())
    }

    fn visit_map<M>(self, mut access: M) -> Result<Self::Value, M::Error>
    where
        M: MapAccess<'de>,
    {
        let mut conditions = Conditions::default();
        while let Some((value, children)) = access.next_entry::<String, Vec<FieldDefinition>>()? {
            conditions.insert(value, children);
        }
        Ok(conditions)
    }
}

impl<'de> Deserialize<'de> for Conditions {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(ConditionsVisitor)
    }
}

impl Serialize for Conditions {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for branch in &self.0 {
            map.serialize_entry(&branch.value, &branch.children)?;
        }
        map.end()
    }
}

/// The kind of a field, carrying only the attributes that kind uses.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Text,
    Number,
    Email,
    TextArea,
    Label,
    File,
    Date,
    Select {
        options: Vec<SelectOption>,
        conditions: Conditions,
    },
    MultiSelect {
        options: Vec<SelectOption>,
    },
    RadioButtons {
        options: Vec<SelectOption>,
        conditions: Conditions,
    },
    Checkbox {
        conditions: Conditions,
    },
    Declaration {
        conditions: Conditions,
    },
    Group {
        children: Vec<FieldDefinition>,
    },
    Section {
        children: Vec<FieldDefinition>,
    },
    Tab {
        children: Vec<FieldDefinition>,
    },
    /// A `type` tag no other variant matches. Renders nothing.
    Unknown {
        type_name: String,
    },
}

impl FieldKind {
    /// The `type` tag this kind is written as in a definition.
    pub fn type_name(&self) -> &str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Number => "number",
            FieldKind::Email => "email",
            FieldKind::TextArea => "text_area",
            FieldKind::Label => "label",
            FieldKind::File => "file",
            FieldKind::Date => "date",
            FieldKind::Select { .. } => "select",
            FieldKind::MultiSelect { .. } => "multi-select",
            FieldKind::RadioButtons { .. } => "radiobuttons",
            FieldKind::Checkbox { .. } => "checkbox",
            FieldKind::Declaration { .. } => "declaration",
            FieldKind::Group { .. } => "group",
            FieldKind::Section { .. } => "section",
            FieldKind::Tab { .. } => "tab",
            FieldKind::Unknown { type_name } => type_name,
        }
    }

    /// Child fields of a structural kind (group, section, tab).
    pub fn children(&self) -> &[FieldDefinition] {
        match self {
            FieldKind::Group { children }
            | FieldKind::Section { children }
            | FieldKind::Tab { children } => children,
            _ => &[],
        }
    }

    /// Condition branches of a choice-style kind.
    pub fn conditions(&self) -> Option<&Conditions> {
        match self {
            FieldKind::Select { conditions, .. }
            | FieldKind::RadioButtons { conditions, .. }
            | FieldKind::Checkbox { conditions }
            | FieldKind::Declaration { conditions } => Some(conditions),
            _ => None,
        }
    }

    pub fn options(&self) -> Option<&[SelectOption]> {
        match self {
            FieldKind::Select { options, .. }
            | FieldKind::MultiSelect { options }
            | FieldKind::RadioButtons { options, .. } => Some(options),
            _ => None,
        }
    }

    /// Whether assessor and referral annotation boxes may be layered over this kind.
    pub fn accepts_annotations(&self) -> bool {
        !matches!(
            self,
            FieldKind::Declaration { .. }
                | FieldKind::Group { .. }
                | FieldKind::Section { .. }
                | FieldKind::Label
                | FieldKind::Unknown { .. }
        )
    }
}

/// A single field of a form definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawField", into = "RawField")]
pub struct FieldDefinition {
    /// Lookup key into submitted values, comments and assessor data
    pub name: String,

    pub label: Option<String>,

    pub help_text: Option<String>,

    /// Help text shown only to assessor-capable viewers
    pub help_text_assessor: Option<String>,

    /// Pane id for tabs
    pub id: Option<String>,

    pub kind: FieldKind,

    pub is_repeatable: bool,

    pub is_visible_for_assessor_only: bool,

    pub can_be_edited_by_assessor: bool,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            label: None,
            help_text: None,
            help_text_assessor: None,
            id: None,
            kind,
            is_repeatable: false,
            is_visible_for_assessor_only: false,
            can_be_edited_by_assessor: false,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn assessor_only(mut self) -> Self {
        self.is_visible_for_assessor_only = true;
        self
    }

    pub fn editable_by_assessor(mut self) -> Self {
        self.can_be_edited_by_assessor = true;
        self
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Wire shape of a field, with the kind as a string tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawField {
    #[serde(default)]
    name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    label: Option<String>,

    #[serde(rename = "type")]
    type_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    help_text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    help_text_assessor: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    options: Vec<SelectOption>,

    #[serde(default, skip_serializing_if = "Conditions::is_empty")]
    conditions: Conditions,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    children: Vec<FieldDefinition>,

    #[serde(rename = "isRepeatable", default, skip_serializing_if = "is_false")]
    is_repeatable: bool,

    #[serde(rename = "isVisibleForAssessorOnly", default, skip_serializing_if = "is_false")]
    is_visible_for_assessor_only: bool,

    #[serde(rename = "canBeEditedByAssessor", default, skip_serializing_if = "is_false")]
    can_be_edited_by_assessor: bool,
}

impl From<RawField> for FieldDefinition {
    fn from(raw: RawField) -> Self {
        let RawField {
            name,
            label,
            type_name,
            help_text,
            help_text_assessor,
            id,
            options,
            conditions,
            children,
            is_repeatable,
            is_visible_for_assessor_only,
            can_be_edited_by_assessor,
        } = raw;

        let kind = match type_name.as_str() {
            "text" => FieldKind::Text,
            "number" => FieldKind::Number,
            "email" => FieldKind::Email,
            "text_area" => FieldKind::TextArea,
            "label" => FieldKind::Label,
            "file" => FieldKind::File,
            "date" => FieldKind::Date,
            "select" => FieldKind::Select {
                options,
                conditions,
            },
            "multi-select" => FieldKind::MultiSelect { options },
            "radiobuttons" => FieldKind::RadioButtons {
                options,
                conditions,
            },
            "checkbox" => FieldKind::Checkbox { conditions },
            "declaration" => FieldKind::Declaration { conditions },
            "group" => FieldKind::Group { children },
            "section" => FieldKind::Section { children },
            "tab" => FieldKind::Tab { children },
            _ => FieldKind::Unknown { type_name },
        };

        FieldDefinition {
            name,
            label,
            help_text,
            help_text_assessor,
            id,
            kind,
            is_repeatable,
            is_visible_for_assessor_only,
            can_be_edited_by_assessor,
        }
    }
}

impl From<FieldDefinition> for RawField {
    fn from(field: FieldDefinition) -> Self {
        let type_name = field.kind.type_name().to_string();
        let (options, conditions, children) = match field.kind {
            FieldKind::Select {
                options,
                conditions,
            }
            | FieldKind::RadioButtons {
                options,
                conditions,
            } => (options, conditions, Vec::new()),
            FieldKind::MultiSelect { options } => (options, Conditions::default(), Vec::new()),
            FieldKind::Checkbox { conditions } | FieldKind::Declaration { conditions } => {
                (Vec::new(), conditions, Vec::new())
            }
            FieldKind::Group { children }
            | FieldKind::Section { children }
            | FieldKind::Tab { children } => (Vec::new(), Conditions::default(), children),
            _ => (Vec::new(), Conditions::default(), Vec::new()),
        };

        RawField {
            name: field.name,
            label: field.label,
            type_name,
            help_text: field.help_text,
            help_text_assessor: field.help_text_assessor,
            id: field.id,
            options,
            conditions,
            children,
            is_repeatable: field.is_repeatable,
            is_visible_for_assessor_only: field.is_visible_for_assessor_only,
            can_be_edited_by_assessor: field.can_be_edited_by_assessor,
        }
    }
}

/// Top-level document shape: a bare field list or a named form.
#[derive(Deserialize)]
#[serde(untagged)]
enum FormDocument {
    Fields(Vec<FieldDefinition>),
    Named {
        #[serde(default)]
        name: Option<String>,
        fields: Vec<FieldDefinition>,
    },
}

/// A complete form template definition.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FormDefinition {
    /// Human-readable template name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Top-level fields in render order
    pub fields: Vec<FieldDefinition>,
}

impl From<FormDocument> for FormDefinition {
    fn from(document: FormDocument) -> Self {
        match document {
            FormDocument::Fields(fields) => FormDefinition { name: None, fields },
            FormDocument::Named { name, fields } => FormDefinition { name, fields },
        }
    }
}

impl FormDefinition {
    pub fn new(fields: Vec<FieldDefinition>) -> Self {
        Self { name: None, fields }
    }

    /// Parse a definition from a YAML string and validate it.
    pub fn from_yaml(yaml: &str, config: &ValidationConfig) -> Result<Self, DefinitionError> {
        let document: FormDocument = serde_yaml::from_str(yaml)?;
        Self::checked(document.into(), config)
    }

    /// Parse a definition from a JSON string and validate it.
    pub fn from_json(json: &str, config: &ValidationConfig) -> Result<Self, DefinitionError> {
        let document: FormDocument = serde_json::from_str(json)?;
        Self::checked(document.into(), config)
    }

    pub fn from_yaml_file(
        path: impl AsRef<Path>,
        config: &ValidationConfig,
    ) -> Result<Self, DefinitionError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents, config)
    }

    pub fn from_json_file(
        path: impl AsRef<Path>,
        config: &ValidationConfig,
    ) -> Result<Self, DefinitionError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents, config)
    }

    fn checked(form: FormDefinition, config: &ValidationConfig) -> Result<Self, DefinitionError> {
        for warning in form.validate(config)? {
            tracing::warn!(%warning, "Form definition warning");
        }
        Ok(form)
    }

    /// Validate the definition tree.
    ///
    /// Fatal problems are returned as errors. Condition keys that match no
    /// option are returned as warnings: such branches simply never reveal.
    pub fn validate(
        &self,
        config: &ValidationConfig,
    ) -> Result<Vec<DefinitionWarning>, DefinitionError> {
        let mut warnings = Vec::new();
        validate_fields(&self.fields, "$", config, &mut warnings)?;
        Ok(warnings)
    }

    /// Total number of fields, including condition children.
    pub fn field_count(&self) -> usize {
        count_fields(&self.fields)
    }
}

fn count_fields(fields: &[FieldDefinition]) -> usize {
    fields
        .iter()
        .map(|field| {
            let branches: usize = field
                .kind
                .conditions()
                .map(|c| c.iter().map(|b| count_fields(&b.children)).sum())
                .unwrap_or(0);
            1 + branches + count_fields(field.kind.children())
        })
        .sum()
}

fn validate_fields(
    fields: &[FieldDefinition],
    scope: &str,
    config: &ValidationConfig,
    warnings: &mut Vec<DefinitionWarning>,
) -> Result<(), DefinitionError> {
    let mut seen = HashSet::new();

    for field in fields {
        if field.name.is_empty() {
            return Err(DefinitionError::MissingField(format!("{}.name", scope)));
        }

        if !is_valid_field_name(&field.name) {
            return Err(DefinitionError::InvalidFieldName(field.name.clone()));
        }

        if !seen.insert(field.name.as_str()) {
            return Err(DefinitionError::DuplicateFieldName {
                scope: scope.to_string(),
                name: field.name.clone(),
            });
        }

        if let FieldKind::Unknown { type_name } = &field.kind {
            if config.strict_field_types {
                return Err(DefinitionError::UnknownFieldType {
                    name: field.name.clone(),
                    type_name: type_name.clone(),
                });
            }
            tracing::warn!(
                field = %field.name,
                type_name = %type_name,
                "Unknown field type will render nothing"
            );
        }

        let path = format!("{}.{}", scope, field.name);

        if let Some(conditions) = field.kind.conditions() {
            let options = field.kind.options();
            for branch in conditions.iter() {
                let matched = options
                    .map(|opts| opts.iter().any(|o| o.value == branch.value))
                    .unwrap_or(true);
                if !matched {
                    warnings.push(DefinitionWarning::UnmatchedCondition {
                        field: field.name.clone(),
                        condition_value: branch.value.clone(),
                    });
                }
                let branch_scope = format!("{}[{}]", path, branch.value);
                validate_fields(&branch.children, &branch_scope, config, warnings)?;
            }
        }

        validate_fields(field.kind.children(), &path, config, warnings)?;
    }

    Ok(())
}
