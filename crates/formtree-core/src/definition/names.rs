//! Naming convention for synthesized annotation fields.
//!
//! Annotation boxes are named `{field}-Assessor` and
//! `{field}-Referral-{email}`. Persistence posts annotation values back under
//! these names, so [`AnnotationName::parse`] must stay the exact inverse of
//! the builders below for every valid field name.
//!
//! A valid field name contains no whitespace, no `@` and none of the path
//! separators `.`, `[`, `]`. It may not contain `-Referral-` or end in
//! `-Referral` or `-Assessor`. With those rules a field name never overlaps
//! the suffix a builder appends.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

lazy_static! {
    static ref FIELD_NAME_PATTERN: Regex = Regex::new(r"^[^\s@.\[\]]+$").unwrap();

    static ref REFERRAL_NAME_PATTERN: Regex =
        Regex::new(r"^(?P<field>[^\s@]+?)-Referral-(?P<email>[^@\s]+@\S+)$").unwrap();
}

const ASSESSOR_SUFFIX: &str = "-Assessor";
const REFERRAL_MARKER: &str = "-Referral-";

/// Check that a field name is usable as a lookup key and path segment.
pub fn is_valid_field_name(name: &str) -> bool {
    FIELD_NAME_PATTERN.is_match(name)
        && !name.contains(REFERRAL_MARKER)
        && !name.ends_with(&REFERRAL_MARKER[..REFERRAL_MARKER.len() - 1])
        && !name.ends_with(ASSESSOR_SUFFIX)
}

/// Name of the assessor annotation box for a field.
pub fn assessor_box_name(field: &str) -> String {
    format!("{}{}", field, ASSESSOR_SUFFIX)
}

/// Name of a referral annotation box for a field and reviewer email.
pub fn referral_box_name(field: &str, email: &str) -> String {
    format!("{}{}{}", field, REFERRAL_MARKER, email)
}

/// Who an annotation box belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum AnnotationRole {
    Assessor,
    Referral { email: String },
}

/// A parsed annotation field name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationName {
    /// The primary field the annotation is layered over
    pub field: String,

    pub role: AnnotationRole,
}

impl AnnotationName {
    pub fn assessor(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            role: AnnotationRole::Assessor,
        }
    }

    pub fn referral(field: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            role: AnnotationRole::Referral {
                email: email.into(),
            },
        }
    }

    /// Recover the field and role from a synthesized annotation name.
    ///
    /// Returns `None` for names that are not annotation names, including
    /// names whose field part is not a valid field name.
    pub fn parse(name: &str) -> Option<Self> {
        if let Some(field) = name.strip_suffix(ASSESSOR_SUFFIX) {
            if is_valid_field_name(field) {
                return Some(Self::assessor(field));
            }
        }

        let caps = REFERRAL_NAME_PATTERN.captures(name)?;
        let field = caps.name("field")?.as_str();
        if !is_valid_field_name(field) {
            return None;
        }
        let email = caps.name("email")?.as_str();
        Some(Self::referral(field, email))
    }
}

impl fmt::Display for AnnotationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.role {
            AnnotationRole::Assessor => f.write_str(&assessor_box_name(&self.field)),
            AnnotationRole::Referral { email } => {
                f.write_str(&referral_box_name(&self.field, email))
            }
        }
    }
}
