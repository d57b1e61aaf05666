//! Event creation, listing and registration.
//!
//! Registration runs the pure gate first so obvious refusals never open a
//! transaction, then hands over to `PortalStore::register_for_event`, which
//! re-checks the gate under a row lock before writing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::access::{authorize, Action};
use crate::errors::AppError;
use crate::events::gate::{check_registration, RegistrationBlock};
use crate::leaderboard::points::{self, EVENT_REGISTRATION};
use crate::models::event::{EventRegistrationRow, EventRow, EventType};
use crate::models::profile::ProfileRow;
use crate::search::{filter_by_query, Searchable};
use crate::store::{EventWindow, NewEvent, PortalStore, RegistrationOutcome};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateEventRequest {
    pub title: String,
    pub description: String,
    pub event_type: EventType,
    pub location: String,
    pub event_date: DateTime<Utc>,
    pub max_attendees: Option<i32>,
    pub registration_deadline: Option<DateTime<Utc>>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventFilter {
    /// `upcoming` (default), `past` or `all`.
    pub when: Option<String>,
    pub search: Option<String>,
    #[serde(rename = "type")]
    pub event_type: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventListing {
    #[serde(flatten)]
    pub event: EventRow,
    pub seats_remaining: Option<i32>,
    /// Only present for signed-in callers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_registered: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegistrationReceipt {
    pub registration: EventRegistrationRow,
    pub current_attendees: i32,
}

impl Searchable for EventRow {
    fn search_fields(&self) -> Vec<&str> {
        vec![
            self.title.as_str(),
            self.description.as_str(),
            self.location.as_str(),
        ]
    }
}

fn required(value: &str, field: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

pub async fn create_event(
    store: &dyn PortalStore,
    caller: &ProfileRow,
    req: CreateEventRequest,
) -> Result<EventRow, AppError> {
    authorize(caller, &Action::CreateEvent)?;

    if let Some(max) = req.max_attendees {
        if max < 1 {
            return Err(AppError::Validation(
                "max_attendees must be at least 1".to_string(),
            ));
        }
    }
    if let Some(deadline) = req.registration_deadline {
        if deadline > req.event_date {
            return Err(AppError::Validation(
                "registration_deadline must not be after event_date".to_string(),
            ));
        }
    }

    let event = store
        .insert_event(&NewEvent {
            organizer_id: caller.id,
            title: required(&req.title, "title")?,
            description: required(&req.description, "description")?,
            event_type: req.event_type,
            location: required(&req.location, "location")?,
            event_date: req.event_date,
            max_attendees: req.max_attendees,
            registration_deadline: req.registration_deadline,
            image_url: req
                .image_url
                .map(|u| u.trim().to_string())
                .filter(|u| !u.is_empty()),
        })
        .await?;

    info!("Event {} created by {}", event.id, caller.id);
    Ok(event)
}

fn already_registered() -> AppError {
    AppError::Conflict("Already registered for this event".to_string())
}

fn block_error(block: RegistrationBlock) -> AppError {
    match block {
        RegistrationBlock::Full => AppError::Conflict(block.message().to_string()),
        _ => AppError::UnprocessableEntity(block.message().to_string()),
    }
}

/// Registers the caller for an event and bumps its attendee count.
pub async fn register(
    store: &dyn PortalStore,
    caller: &ProfileRow,
    event_id: Uuid,
    now: DateTime<Utc>,
) -> Result<RegistrationReceipt, AppError> {
    authorize(caller, &Action::RegisterForEvent)?;

    let event = store
        .find_event(event_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Event {event_id} not found")))?;
    if store.registered_event_ids(caller.id).await?.contains(&event_id) {
        return Err(already_registered());
    }
    check_registration(&event, now).map_err(block_error)?;

    let receipt = match store.register_for_event(event_id, caller.id, now).await? {
        RegistrationOutcome::Registered {
            registration,
            current_attendees,
        } => RegistrationReceipt {
            registration,
            current_attendees,
        },
        RegistrationOutcome::AlreadyRegistered => return Err(already_registered()),
        RegistrationOutcome::Blocked(block) => return Err(block_error(block)),
        RegistrationOutcome::EventNotFound => {
            return Err(AppError::NotFound(format!("Event {event_id} not found")))
        }
    };
    info!(
        "Profile {} registered for event {event_id} ({} attending)",
        caller.id, receipt.current_attendees
    );

    let mut reward = points::reward(caller.id, EVENT_REGISTRATION);
    reward.event_id = Some(event_id);
    points::award(store, reward).await;

    Ok(receipt)
}

pub fn parse_window(raw: Option<&str>) -> Result<EventWindow, AppError> {
    match raw.map(str::trim) {
        None | Some("") | Some("upcoming") => Ok(EventWindow::Upcoming),
        Some("past") => Ok(EventWindow::Past),
        Some("all") => Ok(EventWindow::All),
        Some(other) => Err(AppError::Validation(format!(
            "unknown event window '{other}'"
        ))),
    }
}

fn parse_type(raw: Option<&str>) -> Result<Option<EventType>, AppError> {
    match raw.map(str::trim) {
        None | Some("") | Some("all") => Ok(None),
        Some(s) => s.parse().map(Some).map_err(AppError::Validation),
    }
}

/// Active events in the requested window. `caller` is `None` for anonymous
/// visitors, in which case listings carry no registration flag.
pub async fn list_events(
    store: &dyn PortalStore,
    caller: Option<&ProfileRow>,
    filter: &EventFilter,
    now: DateTime<Utc>,
) -> Result<Vec<EventListing>, AppError> {
    let window = parse_window(filter.when.as_deref())?;
    let event_type = parse_type(filter.event_type.as_deref())?;

    let events = store.list_events(window, now, None).await?;
    let events: Vec<EventRow> = match event_type {
        Some(t) => events.into_iter().filter(|e| e.event_type == t).collect(),
        None => events,
    };
    let events = filter_by_query(events, filter.search.as_deref());

    let registered = match caller {
        Some(profile) => Some(store.registered_event_ids(profile.id).await?),
        None => None,
    };
    Ok(events
        .into_iter()
        .map(|event| EventListing {
            seats_remaining: event.seats_remaining(),
            is_registered: registered.as_ref().map(|ids| ids.contains(&event.id)),
            event,
        })
        .collect())
}

pub async fn registered_event_ids(
    store: &dyn PortalStore,
    caller: &ProfileRow,
) -> Result<Vec<Uuid>, AppError> {
    store.registered_event_ids(caller.id).await
}
