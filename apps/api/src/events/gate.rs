use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::event::EventRow;

/// Reason a registration is refused before any row is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationBlock {
    Inactive,
    EventPassed,
    DeadlinePassed,
    Full,
}

impl RegistrationBlock {
    pub fn message(&self) -> &'static str {
        match self {
            RegistrationBlock::Inactive => "Event is no longer active",
            RegistrationBlock::EventPassed => "Event has already taken place",
            RegistrationBlock::DeadlinePassed => "Registration deadline has passed",
            RegistrationBlock::Full => "Event is full",
        }
    }
}

/// Decides whether `event` still accepts registrations at `now`.
///
/// Registration is open while `current_attendees < max_attendees` (uncapped
/// events never fill) and `now` is strictly before the registration deadline.
pub fn check_registration(event: &EventRow, now: DateTime<Utc>) -> Result<(), RegistrationBlock> {
    if !event.is_active {
        return Err(RegistrationBlock::Inactive);
    }
    if event.is_past(now) {
        return Err(RegistrationBlock::EventPassed);
    }
    if let Some(deadline) = event.registration_deadline {
        if now >= deadline {
            return Err(RegistrationBlock::DeadlinePassed);
        }
    }
    if let Some(max) = event.max_attendees {
        if event.current_attendees >= max {
            return Err(RegistrationBlock::Full);
        }
    }
    Ok(())
}
