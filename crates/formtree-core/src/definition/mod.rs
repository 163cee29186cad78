//! Form definition parsing and validation.
//!
//! Form definitions are the declarative, nested field trees supplied per form
//! template. This module handles parsing YAML/JSON definitions into typed
//! field kinds, validating them, and the naming convention for synthesized
//! annotation fields.

mod names;
mod parser;

pub use names::{
    assessor_box_name, is_valid_field_name, referral_box_name, AnnotationName, AnnotationRole,
};
pub use parser::{
    ConditionBranchDef, Conditions, DefinitionError, DefinitionWarning, FieldDefinition,
    FieldKind, FormDefinition, SelectOption,
};
