//! Visibility Resolver
//!
//! Maps a field definition and a role context to whether the field is shown
//! and whether it may be edited. This is the only place role-derived
//! visibility and editability are decided; the renderer and the annotation
//! generator both ask here.
//!
//! ## Policy
//!
//! | Assessor role active | Assessor-only field | Visible | Editable |
//! |----------------------|---------------------|---------|----------|
//! | yes | yes | `!can_user_edit` | `has_assessor_mode && can_assess` |
//! | yes | no | yes | `!readonly` |
//! | no | yes | no | no |
//! | no | no | yes | `!readonly` |

use serde::{Deserialize, Serialize};

use crate::definition::FieldDefinition;
use crate::role::{AssessorLevel, RoleContext};

/// Resolved visibility of one field for one viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visibility {
    pub visible: bool,
    pub editable: bool,
}

impl Visibility {
    pub const HIDDEN: Visibility = Visibility {
        visible: false,
        editable: false,
    };

    pub fn readonly(&self) -> bool {
        !self.editable
    }
}

/// Resolve whether a field is visible and editable for the viewer.
pub fn resolve(field: &FieldDefinition, ctx: &RoleContext) -> Visibility {
    let status = &ctx.assessor_status;

    if field.is_visible_for_assessor_only {
        if !status.active {
            return Visibility::HIDDEN;
        }
        return Visibility {
            visible: !ctx.can_user_edit,
            editable: status.has_assessor_mode && status.can_assess,
        };
    }

    Visibility {
        visible: true,
        editable: !ctx.readonly,
    }
}

/// Whether the viewer may write into assessor annotation boxes.
pub fn assessor_can_edit(ctx: &RoleContext) -> bool {
    ctx.level() == AssessorLevel::Assessor && ctx.assessor_status.has_assessor_mode
}

/// Whether the viewer may write into the referral box belonging to `email`.
pub fn referral_can_edit(ctx: &RoleContext, email: &str) -> bool {
    ctx.level() == AssessorLevel::Referral
        && ctx.assessor_status.can_assess
        && ctx
            .identity
            .as_ref()
            .map(|identity| identity.email == email)
            .unwrap_or(false)
}
