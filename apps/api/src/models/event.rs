use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "event_type", rename_all = "snake_case")]
pub enum EventType {
    Networking,
    Workshop,
    Seminar,
    CareerFair,
    Meetup,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Networking => "networking",
            EventType::Workshop => "workshop",
            EventType::Seminar => "seminar",
            EventType::CareerFair => "career_fair",
            EventType::Meetup => "meetup",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "networking" => Ok(EventType::Networking),
            "workshop" => Ok(EventType::Workshop),
            "seminar" => Ok(EventType::Seminar),
            "career_fair" => Ok(EventType::CareerFair),
            "meetup" => Ok(EventType::Meetup),
            other => Err(format!("unknown event type '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EventRow {
    pub id: Uuid,
    pub organizer_id: Uuid,
    pub title: String,
    pub description: String,
    pub event_type: EventType,
    pub location: String,
    pub event_date: DateTime<Utc>,
    pub max_attendees: Option<i32>,
    pub current_attendees: i32,
    pub registration_deadline: Option<DateTime<Utc>>,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EventRow {
    pub fn is_past(&self, now: DateTime<Utc>) -> bool {
        self.event_date < now
    }

    /// Seats left, or `None` when the event has no attendee cap.
    pub fn seats_remaining(&self) -> Option<i32> {
        self.max_attendees
            .map(|max| (max - self.current_attendees).max(0))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EventRegistrationRow {
    pub id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub registered_at: DateTime<Utc>,
}
