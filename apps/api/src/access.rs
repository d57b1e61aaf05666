//! Capability checks shared by every workflow entry point.

use uuid::Uuid;

use crate::errors::AppError;
use crate::models::profile::{ProfileRow, UserRole};

/// Something a caller is attempting to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    PostDoubt,
    ClaimDoubt,
    StartDoubt { assignee: Option<Uuid> },
    ResolveDoubt { student_id: Uuid, assignee: Option<Uuid> },
    RateDoubt { student_id: Uuid },
    ViewAllDoubts,
    CreateEvent,
    RegisterForEvent,
    CreateOpportunity,
}

impl Action {
    fn denial(&self) -> &'static str {
        match self {
            Action::PostDoubt => "Only students can post doubts",
            Action::ClaimDoubt => "Only alumni can take doubts",
            Action::StartDoubt { .. } => "Only the assigned alumni can start this doubt",
            Action::ResolveDoubt { .. } => {
                "Only the assigned alumni, the asking student or an admin can resolve this doubt"
            }
            Action::RateDoubt { .. } => "Only the asking student can rate this doubt",
            Action::ViewAllDoubts => "Only alumni and admins can view all doubts",
            Action::CreateEvent => "Only alumni and admins can create events",
            Action::RegisterForEvent => "A profile is required to register for events",
            Action::CreateOpportunity => "Only alumni and admins can post opportunities",
        }
    }
}

/// Pure allow/deny decision for `role` (acting as profile `caller_id`).
pub fn is_allowed(role: UserRole, caller_id: Uuid, action: &Action) -> bool {
    use UserRole::*;

    match *action {
        Action::PostDoubt => role == Student,
        Action::ClaimDoubt | Action::ViewAllDoubts | Action::CreateEvent | Action::CreateOpportunity => {
            matches!(role, Alumni | Admin)
        }
        Action::StartDoubt { assignee } => {
            role == Admin || (role == Alumni && assignee == Some(caller_id))
        }
        Action::ResolveDoubt {
            student_id,
            assignee,
        } => {
            role == Admin
                || (role == Alumni && assignee == Some(caller_id))
                || (role == Student && student_id == caller_id)
        }
        Action::RateDoubt { student_id } => role == Student && student_id == caller_id,
        Action::RegisterForEvent => true,
    }
}

/// Roles an anonymous visitor may pick at sign-up. Admins are provisioned
/// out of band.
pub fn can_self_register(role: UserRole) -> bool {
    matches!(role, UserRole::Student | UserRole::Alumni)
}

/// Returns `Forbidden` unless `profile` may perform `action`.
pub fn authorize(profile: &ProfileRow, action: &Action) -> Result<(), AppError> {
    if is_allowed(profile.role, profile.id, action) {
        Ok(())
    } else {
        tracing::debug!(
            "Denied {:?} for profile {} ({})",
            action,
            profile.id,
            profile.role
        );
        Err(AppError::Forbidden(action.denial().to_string()))
    }
}
