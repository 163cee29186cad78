//! Role context: who is viewing a form and in what capacity.
//!
//! A [`RoleContext`] is an immutable snapshot built once per render pass.
//! It carries the viewer's permission flags, their assessor status, and the
//! already-loaded comment and assessor/referral history for the form.
//!
//! The processing and customer status enums derive those flags from the
//! lifecycle state of an application, so callers don't need to repeat the
//! permission rules at every call site.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur when loading a role context.
#[derive(Error, Debug)]
pub enum RoleContextError {
    #[error("Failed to read role context file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("A {level:?}-level role context requires a viewer identity")]
    MissingIdentity { level: AssessorLevel },
}

/// The capacity an assessor-capable viewer acts in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AssessorLevel {
    #[default]
    #[serde(alias = "")]
    None,
    Assessor,
    Referral,
}

/// Assessor capability flags for the current viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AssessorStatus {
    /// An assessor-capable role is active for this view
    #[serde(rename = "assessor_mode", default)]
    pub active: bool,

    /// The viewer holds assessor mode on this application
    #[serde(default)]
    pub has_assessor_mode: bool,

    /// The viewer can act in their assessor capacity right now
    #[serde(rename = "assessor_can_assess", default)]
    pub can_assess: bool,

    #[serde(rename = "assessor_level", default)]
    pub level: AssessorLevel,
}

/// Whether, and to whom, an application is assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assignment {
    Unassigned,
    AssignedToViewer,
    AssignedToOther,
}

impl AssessorStatus {
    /// No assessor-capable role.
    pub fn inactive() -> Self {
        Self::default()
    }

    /// Status for an internal officer viewing at assessor level.
    pub fn for_assessor(
        status: ProcessingStatus,
        assignment: Assignment,
        in_assessor_group: bool,
        in_approver_group: bool,
    ) -> Self {
        let has_assessor_mode = status.allows_assessor_mode()
            && match assignment {
                Assignment::Unassigned | Assignment::AssignedToViewer => in_assessor_group,
                Assignment::AssignedToOther => false,
            };

        let can_assess = if status.is_assessable() {
            in_assessor_group
        } else if status == ProcessingStatus::WithApprover {
            in_approver_group
        } else {
            false
        };

        Self {
            active: true,
            has_assessor_mode,
            can_assess,
            level: AssessorLevel::Assessor,
        }
    }

    /// Status for a referral reviewer.
    pub fn for_referral(status: ProcessingStatus) -> Self {
        Self {
            active: true,
            has_assessor_mode: false,
            can_assess: status.allows_referral_assessment(),
            level: AssessorLevel::Referral,
        }
    }
}

/// Processing status of an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    Temp,
    Draft,
    WithOfficer,
    WithAssessor,
    WithReferral,
    WithAssessorConditions,
    WithApprover,
    Renewal,
    LicenceAmendment,
    AwaitingApplicantResponse,
    AwaitingAssessorResponse,
    AwaitingResponses,
    ReadyForConditions,
    ReadyToIssue,
    Approved,
    Declined,
    Discarded,
}

impl ProcessingStatus {
    /// States in which the assessor group works the application.
    pub fn is_assessable(&self) -> bool {
        matches!(
            self,
            ProcessingStatus::WithAssessor
                | ProcessingStatus::WithReferral
                | ProcessingStatus::WithAssessorConditions
        )
    }

    pub fn allows_assessor_mode(&self) -> bool {
        !matches!(
            self,
            ProcessingStatus::WithApprover | ProcessingStatus::Approved | ProcessingStatus::Declined
        )
    }

    pub fn allows_referral_assessment(&self) -> bool {
        matches!(self, ProcessingStatus::WithReferral)
    }
}

/// Customer-facing status of an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomerStatus {
    Temp,
    Draft,
    UnderReview,
    AmendmentRequired,
    Accepted,
    PartiallyAccepted,
    Declined,
}

impl CustomerStatus {
    /// States in which the submitter may still edit their answers.
    pub fn allows_editing(&self) -> bool {
        matches!(
            self,
            CustomerStatus::Temp | CustomerStatus::Draft | CustomerStatus::AmendmentRequired
        )
    }
}

/// Identity of the assessor or referral reviewer viewing the form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub email: String,

    /// Full name, used as the referral box label
    pub name: String,
}

impl Identity {
    pub fn new(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
        }
    }
}

/// One referral reviewer's answer to a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferralEntry {
    pub email: String,

    pub full_name: String,

    #[serde(default)]
    pub value: Value,
}

/// Stored assessor and referral answers for one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessorRecord {
    #[serde(rename = "name")]
    pub field_name: String,

    #[serde(rename = "assessor", default)]
    pub assessor_value: Value,

    #[serde(default)]
    pub referrals: Vec<ReferralEntry>,
}

/// Snapshot of viewer identity, permissions and review data for a render pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RoleContext {
    /// Global default editability
    #[serde(default)]
    pub readonly: bool,

    /// Whether the primary submitter may edit
    #[serde(default)]
    pub can_user_edit: bool,

    #[serde(default)]
    pub assessor_status: AssessorStatus,

    /// Assessor/referral history, one record per annotated field
    #[serde(default)]
    pub assessor_data: Vec<AssessorRecord>,

    /// Comments keyed by field name (BTreeMap for deterministic iteration)
    #[serde(default)]
    pub comment_data: BTreeMap<String, String>,

    /// Current assessor or referral viewer
    #[serde(default)]
    pub identity: Option<Identity>,
}

impl RoleContext {
    /// The primary submitter, with no assessor-capable role.
    pub fn submitter(readonly: bool, can_user_edit: bool) -> Self {
        Self {
            readonly,
            can_user_edit,
            ..Self::default()
        }
    }

    /// The submitter, with editability derived from the customer status.
    pub fn submitter_for(status: CustomerStatus) -> Self {
        let editable = status.allows_editing();
        Self::submitter(!editable, editable)
    }

    /// An internal officer at assessor level.
    pub fn assessor(identity: Identity, has_assessor_mode: bool, can_assess: bool) -> Self {
        Self::with_status(
            identity,
            AssessorStatus {
                active: true,
                has_assessor_mode,
                can_assess,
                level: AssessorLevel::Assessor,
            },
        )
    }

    /// A referral reviewer.
    pub fn referral(identity: Identity, can_assess: bool) -> Self {
        Self::with_status(
            identity,
            AssessorStatus {
                active: true,
                has_assessor_mode: false,
                can_assess,
                level: AssessorLevel::Referral,
            },
        )
    }

    /// An internal viewer with an explicit assessor status.
    pub fn with_status(identity: Identity, assessor_status: AssessorStatus) -> Self {
        Self {
            readonly: true,
            can_user_edit: false,
            assessor_status,
            identity: Some(identity),
            ..Self::default()
        }
    }

    pub fn with_assessor_data(mut self, records: Vec<AssessorRecord>) -> Self {
        self.assessor_data = records;
        self
    }

    pub fn with_comment_data(mut self, comments: BTreeMap<String, String>) -> Self {
        self.comment_data = comments;
        self
    }

    pub fn with_comment(mut self, field: impl Into<String>, comment: impl Into<String>) -> Self {
        self.comment_data.insert(field.into(), comment.into());
        self
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, RoleContextError> {
        let context: RoleContext = serde_yaml::from_str(yaml)?;
        context.validate()?;
        Ok(context)
    }

    pub fn from_json(json: &str) -> Result<Self, RoleContextError> {
        let context: RoleContext = serde_json::from_str(json)?;
        context.validate()?;
        Ok(context)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, RoleContextError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, RoleContextError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Check the snapshot is usable for a render pass.
    ///
    /// A referral viewer must have an identity, since referral boxes are
    /// named after the reviewer's email.
    pub fn validate(&self) -> Result<(), RoleContextError> {
        if self.assessor_status.active
            && self.assessor_status.level == AssessorLevel::Referral
            && self.identity.is_none()
        {
            return Err(RoleContextError::MissingIdentity {
                level: AssessorLevel::Referral,
            });
        }
        Ok(())
    }

    /// Whether an assessor-capable role is active.
    pub fn assessor_active(&self) -> bool {
        self.assessor_status.active
    }

    pub fn level(&self) -> AssessorLevel {
        self.assessor_status.level
    }

    pub fn comment_for(&self, field: &str) -> Option<&str> {
        self.comment_data.get(field).map(String::as_str)
    }

    pub fn assessor_record(&self, field: &str) -> Option<&AssessorRecord> {
        self.assessor_data.iter().find(|r| r.field_name == field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_referral_context() {
        let yaml = r#"
readonly: true
can_user_edit: false
assessor_status:
  assessor_mode: true
  assessor_can_assess: true
  assessor_level: referral
identity:
  email: "r@x.com"
  name: "Rae Referee"
assessor_data:
  - name: "q1"
    assessor: "looks fine"
    referrals:
      - email: "r@x.com"
        full_name: "Rae Referee"
        value: "agree"
comment_data:
  q1: "check the licence class"
"#;
        let ctx = RoleContext::from_yaml(yaml).unwrap();
        assert!(ctx.assessor_active());
        assert_eq!(ctx.level(), AssessorLevel::Referral);
        assert!(ctx.assessor_status.can_assess);
        assert!(!ctx.assessor_status.has_assessor_mode);
        assert_eq!(ctx.comment_for("q1"), Some("check the licence class"));

        let record = ctx.assessor_record("q1").unwrap();
        assert_eq!(record.assessor_value, Value::from("looks fine"));
        assert_eq!(record.referrals[0].full_name, "Rae Referee");
        assert!(ctx.assessor_record("q2").is_none());
    }

    #[test]
    fn test_empty_level_is_none() {
        let json = r#"{"assessor_status": {"assessor_mode": false, "assessor_level": ""}}"#;
        let ctx = RoleContext::from_json(json).unwrap();
        assert_eq!(ctx.level(), AssessorLevel::None);
        assert!(!ctx.assessor_active());
    }

    #[test]
    fn test_referral_without_identity_rejected() {
        let yaml = r#"
assessor_status:
  assessor_mode: true
  assessor_level: referral
"#;
        assert!(matches!(
            RoleContext::from_yaml(yaml),
            Err(RoleContextError::MissingIdentity { .. })
        ));
    }

    #[test]
    fn test_submitter_for_customer_status() {
        let draft = RoleContext::submitter_for(CustomerStatus::Draft);
        assert!(draft.can_user_edit);
        assert!(!draft.readonly);

        let review = RoleContext::submitter_for(CustomerStatus::UnderReview);
        assert!(!review.can_user_edit);
        assert!(review.readonly);
        assert!(!review.assessor_active());
    }

    #[test]
    fn test_assessor_status_from_processing_status() {
        let status = AssessorStatus::for_assessor(
            ProcessingStatus::WithAssessor,
            Assignment::Unassigned,
            true,
            false,
        );
        assert!(status.active);
        assert!(status.has_assessor_mode);
        assert!(status.can_assess);
        assert_eq!(status.level, AssessorLevel::Assessor);

        // Assigned to another officer: may still assess, but holds no assessor mode
        let status = AssessorStatus::for_assessor(
            ProcessingStatus::WithAssessor,
            Assignment::AssignedToOther,
            true,
            false,
        );
        assert!(!status.has_assessor_mode);
        assert!(status.can_assess);

        // With approver: approver group assesses, assessor mode is off
        let status = AssessorStatus::for_assessor(
            ProcessingStatus::WithApprover,
            Assignment::AssignedToViewer,
            true,
            true,
        );
        assert!(!status.has_assessor_mode);
        assert!(status.can_assess);

        let status = AssessorStatus::for_assessor(
            ProcessingStatus::Approved,
            Assignment::Unassigned,
            true,
            true,
        );
        assert!(!status.has_assessor_mode);
        assert!(!status.can_assess);
    }

    #[test]
    fn test_referral_status_from_processing_status() {
        assert!(AssessorStatus::for_referral(ProcessingStatus::WithReferral).can_assess);
        assert!(!AssessorStatus::for_referral(ProcessingStatus::WithAssessor).can_assess);
        assert_eq!(
            AssessorStatus::for_referral(ProcessingStatus::WithReferral).level,
            AssessorLevel::Referral
        );
    }

    #[test]
    fn test_builders() {
        let ctx = RoleContext::assessor(Identity::new("a@x.com", "Ash"), true, true)
            .with_comment("q1", "see attachment");
        assert!(ctx.readonly);
        assert!(!ctx.can_user_edit);
        assert_eq!(ctx.level(), AssessorLevel::Assessor);
        assert_eq!(ctx.identity.as_ref().map(|i| i.email.as_str()), Some("a@x.com"));
        assert_eq!(ctx.comment_for("q1"), Some("see attachment"));
    }
}
