//! Data access layer.
//!
//! Every workflow reaches the database through `PortalStore`, carried in
//! `AppState` as `Arc<dyn PortalStore>`. Operations that touch more than one
//! row (account creation, event registration) or that must not race
//! (doubt transitions) are single trait methods so that an implementation can
//! make them atomic.

pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::events::gate::RegistrationBlock;
use crate::models::doubt::{DoubtRow, DoubtUrgency};
use crate::models::event::{EventRegistrationRow, EventRow, EventType};
use crate::models::leaderboard::{LeaderboardPointRow, PointsTotal};
use crate::models::opportunity::{OpportunityRow, OpportunityType};
use crate::models::profile::{AlumniDirectoryEntry, ProfileRow, UserRole};

pub use postgres::PgStore;

#[derive(Debug, Clone)]
pub struct NewProfile {
    pub user_id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub phone: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewStudentProfile {
    pub enrollment_number: String,
    pub department: String,
    pub semester: i32,
}

#[derive(Debug, Clone)]
pub struct NewAlumniProfile {
    pub graduation_year: i32,
    pub department: String,
    pub current_company: Option<String>,
    pub current_position: Option<String>,
}

/// Role-specific row written alongside the identity row at sign-up.
#[derive(Debug, Clone)]
pub enum RoleDetails {
    Student(NewStudentProfile),
    Alumni(NewAlumniProfile),
}

#[derive(Debug, Clone)]
pub struct NewDoubt {
    pub student_id: Uuid,
    pub title: String,
    pub description: String,
    pub domain_tags: Vec<String>,
    pub urgency: DoubtUrgency,
}

/// Which doubts a caller may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoubtScope {
    OwnedBy(Uuid),
    All,
}

#[derive(Debug, Clone)]
pub struct NewEvent {
    pub organizer_id: Uuid,
    pub title: String,
    pub description: String,
    pub event_type: EventType,
    pub location: String,
    pub event_date: DateTime<Utc>,
    pub max_attendees: Option<i32>,
    pub registration_deadline: Option<DateTime<Utc>>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventWindow {
    Upcoming,
    Past,
    All,
}

#[derive(Debug, Clone)]
pub enum RegistrationOutcome {
    Registered {
        registration: EventRegistrationRow,
        current_attendees: i32,
    },
    AlreadyRegistered,
    Blocked(RegistrationBlock),
    EventNotFound,
}

#[derive(Debug, Clone)]
pub struct NewOpportunity {
    pub posted_by: Uuid,
    pub title: String,
    pub description: String,
    pub company_name: String,
    pub opportunity_type: OpportunityType,
    pub location: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
    pub skills_required: Vec<String>,
    pub requirements: Vec<String>,
    pub application_url: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NewPoints {
    pub user_id: Uuid,
    pub action: String,
    pub points: i32,
    pub domain: Option<String>,
    pub doubt_id: Option<Uuid>,
    pub event_id: Option<Uuid>,
    pub opportunity_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DashboardCounts {
    pub total_users: i64,
    pub active_opportunities: i64,
    pub active_events: i64,
    pub open_doubts: i64,
}

#[async_trait]
pub trait PortalStore: Send + Sync {
    // Profiles
    async fn find_profile_by_user_id(&self, user_id: Uuid) -> Result<Option<ProfileRow>, AppError>;

    /// Inserts the identity row and the role row together, or neither.
    async fn create_account_profile(
        &self,
        profile: &NewProfile,
        details: &RoleDetails,
    ) -> Result<ProfileRow, AppError>;

    async fn list_alumni(&self) -> Result<Vec<AlumniDirectoryEntry>, AppError>;

    async fn newest_alumni(&self, limit: i64) -> Result<Vec<AlumniDirectoryEntry>, AppError>;

    // Doubts
    async fn insert_doubt(&self, doubt: &NewDoubt) -> Result<DoubtRow, AppError>;

    async fn find_doubt(&self, id: Uuid) -> Result<Option<DoubtRow>, AppError>;

    /// Newest first.
    async fn list_doubts(&self, scope: DoubtScope) -> Result<Vec<DoubtRow>, AppError>;

    /// Assigns the doubt only while it is still open. `None` means no row
    /// matched (missing or no longer open).
    async fn claim_doubt(&self, id: Uuid, alumni_id: Uuid) -> Result<Option<DoubtRow>, AppError>;

    /// `assigned -> in_progress`.
    async fn start_doubt(&self, id: Uuid) -> Result<Option<DoubtRow>, AppError>;

    /// `assigned | in_progress -> resolved`, stamping `resolved_at`.
    async fn resolve_doubt(
        &self,
        id: Uuid,
        resolved_at: DateTime<Utc>,
    ) -> Result<Option<DoubtRow>, AppError>;

    /// Records a rating on a resolved doubt.
    async fn rate_doubt(
        &self,
        id: Uuid,
        rating: i32,
        feedback: Option<&str>,
    ) -> Result<Option<DoubtRow>, AppError>;

    // Events
    async fn insert_event(&self, event: &NewEvent) -> Result<EventRow, AppError>;

    async fn find_event(&self, id: Uuid) -> Result<Option<EventRow>, AppError>;

    /// Active events ordered by event date.
    async fn list_events(
        &self,
        window: EventWindow,
        now: DateTime<Utc>,
        limit: Option<i64>,
    ) -> Result<Vec<EventRow>, AppError>;

    async fn registered_event_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>, AppError>;

    /// Re-checks the registration gate, inserts the registration and bumps
    /// `current_attendees` as one unit. An existing registration is reported
    /// as `AlreadyRegistered` before the gate is consulted.
    async fn register_for_event(
        &self,
        event_id: Uuid,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<RegistrationOutcome, AppError>;

    // Opportunities
    async fn insert_opportunity(&self, opportunity: &NewOpportunity)
        -> Result<OpportunityRow, AppError>;

    async fn find_opportunity(&self, id: Uuid) -> Result<Option<OpportunityRow>, AppError>;

    /// Active opportunities, newest first.
    async fn list_opportunities(&self, limit: Option<i64>) -> Result<Vec<OpportunityRow>, AppError>;

    // Leaderboard
    async fn award_points(&self, points: &NewPoints) -> Result<LeaderboardPointRow, AppError>;

    /// Per-user totals, highest first.
    async fn points_totals(&self, limit: i64) -> Result<Vec<PointsTotal>, AppError>;

    async fn points_for_user(&self, user_id: Uuid) -> Result<Vec<LeaderboardPointRow>, AppError>;

    // Dashboard
    async fn dashboard_counts(&self) -> Result<DashboardCounts, AppError>;
}
