//! In-memory doubles for `PortalStore` and `AuthProvider`.
//!
//! `MemoryStore` keeps every table behind one mutex, so each trait method is
//! atomic in the same way the Postgres implementation's statements and
//! transactions are.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::auth_client::{AuthError, AuthProvider, AuthSession, AuthUser, SignUpResult};
use crate::errors::AppError;
use crate::events::gate::check_registration;
use crate::models::doubt::{DoubtRow, DoubtStatus};
use crate::models::event::{EventRegistrationRow, EventRow, EventType};
use crate::models::leaderboard::{LeaderboardPointRow, PointsTotal};
use crate::models::opportunity::OpportunityRow;
use crate::models::profile::{
    AlumniDirectoryEntry, ProfileRow, UserRole,
};
use crate::store::{
    DashboardCounts, DoubtScope, EventWindow, NewAlumniProfile, NewDoubt, NewEvent,
    NewOpportunity, NewPoints, NewProfile, PortalStore, RegistrationOutcome, RoleDetails,
};

/// Role rows as `create_account_profile` writes them; only counted and
/// joined here, so they carry just the columns the doubles read.
#[allow(dead_code)]
#[derive(Debug, Clone)]
struct StudentProfileRow {
    profile_id: Uuid,
    enrollment_number: String,
    department: String,
    semester: i32,
}

#[derive(Debug, Clone)]
struct AlumniProfileRow {
    profile_id: Uuid,
    graduation_year: i32,
    department: String,
    current_company: Option<String>,
    current_position: Option<String>,
    location: Option<String>,
    bio: Option<String>,
    linkedin_url: Option<String>,
    domains: Vec<String>,
    created_at: DateTime<Utc>,
}

#[derive(Default)]
struct Tables {
    profiles: Vec<ProfileRow>,
    students: Vec<StudentProfileRow>,
    alumni: Vec<AlumniProfileRow>,
    doubts: Vec<DoubtRow>,
    events: Vec<EventRow>,
    registrations: Vec<EventRegistrationRow>,
    opportunities: Vec<OpportunityRow>,
    points: Vec<LeaderboardPointRow>,
    fail_next_account_write: bool,
    fail_profile_lookups: bool,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

fn profile_row(role: UserRole, first_name: &str, last_name: &str) -> ProfileRow {
    let now = Utc::now();
    let id = Uuid::new_v4();
    ProfileRow {
        id,
        user_id: Uuid::new_v4(),
        email: format!("{}.{}@campus.edu", first_name.to_lowercase(), &id.to_string()[..8]),
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        role,
        phone: None,
        avatar_url: None,
        is_verified: false,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

fn alumni_row(profile_id: Uuid, details: &NewAlumniProfile) -> AlumniProfileRow {
    AlumniProfileRow {
        profile_id,
        graduation_year: details.graduation_year,
        department: details.department.clone(),
        current_company: details.current_company.clone(),
        current_position: details.current_position.clone(),
        location: None,
        bio: None,
        linkedin_url: None,
        domains: Vec::new(),
        created_at: Utc::now(),
    }
}

impl MemoryStore {
    fn tables(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().unwrap()
    }

    /// Inserts an identity row with no role row.
    pub fn seed_profile(&self, role: UserRole) -> ProfileRow {
        self.seed_named(role, role.as_str(), "Tester")
    }

    pub fn seed_named(&self, role: UserRole, first_name: &str, last_name: &str) -> ProfileRow {
        let profile = profile_row(role, first_name, last_name);
        self.tables().profiles.push(profile.clone());
        profile
    }

    /// Inserts an alumni identity row plus its alumni profile.
    pub fn seed_alumni(
        &self,
        first_name: &str,
        last_name: &str,
        details: NewAlumniProfile,
        domains: &[&str],
    ) -> ProfileRow {
        let profile = self.seed_named(UserRole::Alumni, first_name, last_name);
        let mut row = alumni_row(profile.id, &details);
        row.domains = domains.iter().map(|d| d.to_string()).collect();
        self.tables().alumni.push(row);
        profile
    }

    /// Inserts an active event one week out with no cap or deadline, after
    /// letting `customize` adjust it.
    pub fn seed_event(&self, organizer_id: Uuid, customize: impl FnOnce(&mut EventRow)) -> EventRow {
        let now = Utc::now();
        let mut event = EventRow {
            id: Uuid::new_v4(),
            organizer_id,
            title: "Alumni Meetup".to_string(),
            description: "Annual gathering of graduates".to_string(),
            event_type: EventType::Meetup,
            location: "Main Auditorium".to_string(),
            event_date: now + Duration::days(7),
            max_attendees: None,
            current_attendees: 0,
            registration_deadline: None,
            image_url: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        customize(&mut event);
        self.tables().events.push(event.clone());
        event
    }

    pub fn profile_count(&self) -> usize {
        self.tables().profiles.len()
    }

    pub fn student_profile_count(&self) -> usize {
        self.tables().students.len()
    }

    pub fn alumni_profile_count(&self) -> usize {
        self.tables().alumni.len()
    }

    pub fn registration_count(&self, event_id: Uuid) -> usize {
        self.tables()
            .registrations
            .iter()
            .filter(|r| r.event_id == event_id)
            .count()
    }

    /// Makes the next `create_account_profile` fail after writing nothing.
    pub fn fail_next_account_write(&self) {
        self.tables().fail_next_account_write = true;
    }

    /// Makes every `find_profile_by_user_id` fail, as during a database outage.
    pub fn fail_profile_lookups(&self) {
        self.tables().fail_profile_lookups = true;
    }
}

fn update_doubt(
    tables: &mut Tables,
    id: Uuid,
    allowed: &[DoubtStatus],
    apply: impl FnOnce(&mut DoubtRow),
) -> Option<DoubtRow> {
    let doubt = tables
        .doubts
        .iter_mut()
        .find(|d| d.id == id && allowed.contains(&d.status))?;
    apply(doubt);
    doubt.updated_at = Utc::now();
    Some(doubt.clone())
}

fn directory_entry(profile: &ProfileRow, alumni: &AlumniProfileRow) -> AlumniDirectoryEntry {
    AlumniDirectoryEntry {
        profile_id: profile.id,
        first_name: profile.first_name.clone(),
        last_name: profile.last_name.clone(),
        email: profile.email.clone(),
        avatar_url: profile.avatar_url.clone(),
        graduation_year: alumni.graduation_year,
        department: alumni.department.clone(),
        current_company: alumni.current_company.clone(),
        current_position: alumni.current_position.clone(),
        location: alumni.location.clone(),
        bio: alumni.bio.clone(),
        linkedin_url: alumni.linkedin_url.clone(),
        domains: alumni.domains.clone(),
        created_at: alumni.created_at,
    }
}

fn take<T>(rows: impl Iterator<Item = T>, limit: Option<i64>) -> Vec<T> {
    match limit {
        Some(n) => rows.take(n.max(0) as usize).collect(),
        None => rows.collect(),
    }
}

#[async_trait]
impl PortalStore for MemoryStore {
    async fn find_profile_by_user_id(&self, user_id: Uuid) -> Result<Option<ProfileRow>, AppError> {
        let tables = self.tables();
        if tables.fail_profile_lookups {
            return Err(AppError::Internal(anyhow::anyhow!("simulated lookup failure")));
        }
        Ok(tables
            .profiles
            .iter()
            .find(|p| p.user_id == user_id)
            .cloned())
    }

    async fn create_account_profile(
        &self,
        profile: &NewProfile,
        details: &RoleDetails,
    ) -> Result<ProfileRow, AppError> {
        let mut tables = self.tables();
        if std::mem::take(&mut tables.fail_next_account_write) {
            return Err(AppError::Internal(anyhow::anyhow!("simulated write failure")));
        }
        if tables.profiles.iter().any(|p| p.user_id == profile.user_id) {
            return Err(AppError::Conflict("Profile already exists".to_string()));
        }

        let mut row = profile_row(profile.role, &profile.first_name, &profile.last_name);
        row.user_id = profile.user_id;
        row.email = profile.email.clone();
        row.phone = profile.phone.clone();

        match details {
            RoleDetails::Student(student) => {
                tables.students.push(StudentProfileRow {
                    profile_id: row.id,
                    enrollment_number: student.enrollment_number.clone(),
                    department: student.department.clone(),
                    semester: student.semester,
                });
            }
            RoleDetails::Alumni(alumni) => {
                let alumni = alumni_row(row.id, alumni);
                tables.alumni.push(alumni);
            }
        }
        tables.profiles.push(row.clone());
        Ok(row)
    }

    async fn list_alumni(&self) -> Result<Vec<AlumniDirectoryEntry>, AppError> {
        let tables = self.tables();
        Ok(tables
            .alumni
            .iter()
            .rev()
            .filter_map(|a| {
                tables
                    .profiles
                    .iter()
                    .find(|p| p.id == a.profile_id && p.is_active)
                    .map(|p| directory_entry(p, a))
            })
            .collect())
    }

    async fn newest_alumni(&self, limit: i64) -> Result<Vec<AlumniDirectoryEntry>, AppError> {
        let all = self.list_alumni().await?;
        Ok(take(all.into_iter(), Some(limit)))
    }

    async fn insert_doubt(&self, doubt: &NewDoubt) -> Result<DoubtRow, AppError> {
        let now = Utc::now();
        let row = DoubtRow {
            id: Uuid::new_v4(),
            student_id: doubt.student_id,
            assigned_alumni_id: None,
            title: doubt.title.clone(),
            description: doubt.description.clone(),
            domain_tags: doubt.domain_tags.clone(),
            urgency: doubt.urgency,
            status: DoubtStatus::Open,
            rating: None,
            feedback: None,
            resolved_at: None,
            created_at: now,
            updated_at: now,
        };
        self.tables().doubts.push(row.clone());
        Ok(row)
    }

    async fn find_doubt(&self, id: Uuid) -> Result<Option<DoubtRow>, AppError> {
        Ok(self.tables().doubts.iter().find(|d| d.id == id).cloned())
    }

    async fn list_doubts(&self, scope: DoubtScope) -> Result<Vec<DoubtRow>, AppError> {
        Ok(self
            .tables()
            .doubts
            .iter()
            .rev()
            .filter(|d| match scope {
                DoubtScope::OwnedBy(student_id) => d.student_id == student_id,
                DoubtScope::All => true,
            })
            .cloned()
            .collect())
    }

    async fn claim_doubt(&self, id: Uuid, alumni_id: Uuid) -> Result<Option<DoubtRow>, AppError> {
        Ok(update_doubt(&mut self.tables(), id, &[DoubtStatus::Open], |d| {
            d.assigned_alumni_id = Some(alumni_id);
            d.status = DoubtStatus::Assigned;
        }))
    }

    async fn start_doubt(&self, id: Uuid) -> Result<Option<DoubtRow>, AppError> {
        Ok(update_doubt(&mut self.tables(), id, &[DoubtStatus::Assigned], |d| {
            d.status = DoubtStatus::InProgress;
        }))
    }

    async fn resolve_doubt(
        &self,
        id: Uuid,
        resolved_at: DateTime<Utc>,
    ) -> Result<Option<DoubtRow>, AppError> {
        Ok(update_doubt(
            &mut self.tables(),
            id,
            &[DoubtStatus::Assigned, DoubtStatus::InProgress],
            |d| {
                d.status = DoubtStatus::Resolved;
                d.resolved_at = Some(resolved_at);
            },
        ))
    }

    async fn rate_doubt(
        &self,
        id: Uuid,
        rating: i32,
        feedback: Option<&str>,
    ) -> Result<Option<DoubtRow>, AppError> {
        Ok(update_doubt(&mut self.tables(), id, &[DoubtStatus::Resolved], |d| {
            d.rating = Some(rating);
            d.feedback = feedback.map(String::from);
        }))
    }

    async fn insert_event(&self, event: &NewEvent) -> Result<EventRow, AppError> {
        let now = Utc::now();
        let row = EventRow {
            id: Uuid::new_v4(),
            organizer_id: event.organizer_id,
            title: event.title.clone(),
            description: event.description.clone(),
            event_type: event.event_type,
            location: event.location.clone(),
            event_date: event.event_date,
            max_attendees: event.max_attendees,
            current_attendees: 0,
            registration_deadline: event.registration_deadline,
            image_url: event.image_url.clone(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.tables().events.push(row.clone());
        Ok(row)
    }

    async fn find_event(&self, id: Uuid) -> Result<Option<EventRow>, AppError> {
        Ok(self.tables().events.iter().find(|e| e.id == id).cloned())
    }

    async fn list_events(
        &self,
        window: EventWindow,
        now: DateTime<Utc>,
        limit: Option<i64>,
    ) -> Result<Vec<EventRow>, AppError> {
        let mut events: Vec<EventRow> = self
            .tables()
            .events
            .iter()
            .filter(|e| e.is_active)
            .filter(|e| match window {
                EventWindow::Upcoming => e.event_date >= now,
                EventWindow::Past => e.event_date < now,
                EventWindow::All => true,
            })
            .cloned()
            .collect();
        events.sort_by_key(|e| e.event_date);
        if window == EventWindow::Past {
            events.reverse();
        }
        Ok(take(events.into_iter(), limit))
    }

    async fn registered_event_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        Ok(self
            .tables()
            .registrations
            .iter()
            .filter(|r| r.user_id == user_id)
            .map(|r| r.event_id)
            .collect())
    }

    async fn register_for_event(
        &self,
        event_id: Uuid,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<RegistrationOutcome, AppError> {
        let mut tables = self.tables();
        let Some(event) = tables.events.iter().find(|e| e.id == event_id) else {
            return Ok(RegistrationOutcome::EventNotFound);
        };
        if tables
            .registrations
            .iter()
            .any(|r| r.event_id == event_id && r.user_id == user_id)
        {
            return Ok(RegistrationOutcome::AlreadyRegistered);
        }
        if let Err(block) = check_registration(event, now) {
            return Ok(RegistrationOutcome::Blocked(block));
        }

        let registration = EventRegistrationRow {
            id: Uuid::new_v4(),
            event_id,
            user_id,
            registered_at: now,
        };
        tables.registrations.push(registration.clone());

        let mut current_attendees = 0;
        if let Some(event) = tables.events.iter_mut().find(|e| e.id == event_id) {
            event.current_attendees += 1;
            event.updated_at = now;
            current_attendees = event.current_attendees;
        }
        Ok(RegistrationOutcome::Registered {
            registration,
            current_attendees,
        })
    }

    async fn insert_opportunity(
        &self,
        opportunity: &NewOpportunity,
    ) -> Result<OpportunityRow, AppError> {
        let now = Utc::now();
        let row = OpportunityRow {
            id: Uuid::new_v4(),
            posted_by: opportunity.posted_by,
            title: opportunity.title.clone(),
            description: opportunity.description.clone(),
            company_name: opportunity.company_name.clone(),
            opportunity_type: opportunity.opportunity_type,
            location: opportunity.location.clone(),
            deadline: opportunity.deadline,
            skills_required: opportunity.skills_required.clone(),
            requirements: opportunity.requirements.clone(),
            application_url: opportunity.application_url.clone(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.tables().opportunities.push(row.clone());
        Ok(row)
    }

    async fn find_opportunity(&self, id: Uuid) -> Result<Option<OpportunityRow>, AppError> {
        Ok(self
            .tables()
            .opportunities
            .iter()
            .find(|o| o.id == id)
            .cloned())
    }

    async fn list_opportunities(&self, limit: Option<i64>) -> Result<Vec<OpportunityRow>, AppError> {
        let tables = self.tables();
        Ok(take(
            tables.opportunities.iter().rev().filter(|o| o.is_active).cloned(),
            limit,
        ))
    }

    async fn award_points(&self, points: &NewPoints) -> Result<LeaderboardPointRow, AppError> {
        let row = LeaderboardPointRow {
            id: Uuid::new_v4(),
            user_id: points.user_id,
            action: points.action.clone(),
            points: points.points,
            domain: points.domain.clone(),
            doubt_id: points.doubt_id,
            event_id: points.event_id,
            opportunity_id: points.opportunity_id,
            created_at: Utc::now(),
        };
        self.tables().points.push(row.clone());
        Ok(row)
    }

    async fn points_totals(&self, limit: i64) -> Result<Vec<PointsTotal>, AppError> {
        let tables = self.tables();
        let mut sums: HashMap<Uuid, (i64, i64)> = HashMap::new();
        for row in &tables.points {
            let entry = sums.entry(row.user_id).or_default();
            entry.0 += i64::from(row.points);
            entry.1 += 1;
        }
        let mut totals: Vec<PointsTotal> = sums
            .into_iter()
            .filter_map(|(user_id, (total_points, entries))| {
                let profile = tables.profiles.iter().find(|p| p.id == user_id)?;
                Some(PointsTotal {
                    user_id,
                    first_name: profile.first_name.clone(),
                    last_name: profile.last_name.clone(),
                    role: profile.role,
                    total_points,
                    entries,
                })
            })
            .collect();
        totals.sort_by(|a, b| {
            b.total_points
                .cmp(&a.total_points)
                .then_with(|| a.first_name.cmp(&b.first_name))
                .then_with(|| a.last_name.cmp(&b.last_name))
        });
        Ok(take(totals.into_iter(), Some(limit)))
    }

    async fn points_for_user(&self, user_id: Uuid) -> Result<Vec<LeaderboardPointRow>, AppError> {
        Ok(self
            .tables()
            .points
            .iter()
            .rev()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn dashboard_counts(&self) -> Result<DashboardCounts, AppError> {
        let tables = self.tables();
        Ok(DashboardCounts {
            total_users: tables.profiles.len() as i64,
            active_opportunities: tables.opportunities.iter().filter(|o| o.is_active).count()
                as i64,
            active_events: tables.events.iter().filter(|e| e.is_active).count() as i64,
            open_doubts: tables
                .doubts
                .iter()
                .filter(|d| d.status == DoubtStatus::Open)
                .count() as i64,
        })
    }
}

/// Auth service double. Tokens are opaque strings mapped to user ids.
#[derive(Default)]
pub struct StubAuth {
    users: Mutex<HashMap<Uuid, (String, String)>>,
    tokens: Mutex<HashMap<String, Uuid>>,
}

pub fn auth_user(user_id: Uuid) -> AuthUser {
    AuthUser {
        id: user_id,
        email: Some(format!("{user_id}@campus.edu")),
        user_metadata: Value::Null,
        email_confirmed_at: None,
    }
}

pub fn session_for(user_id: Uuid) -> AuthSession {
    AuthSession {
        access_token: format!("access-{user_id}"),
        token_type: "bearer".to_string(),
        expires_in: 3600,
        refresh_token: format!("refresh-{user_id}"),
        user: auth_user(user_id),
    }
}

fn rejected(status: u16, message: &str) -> AuthError {
    AuthError::Rejected {
        status,
        message: message.to_string(),
    }
}

impl StubAuth {
    pub fn issue_token(&self, user_id: Uuid) -> String {
        let token = format!("token-{}", Uuid::new_v4());
        self.tokens.lock().unwrap().insert(token.clone(), user_id);
        token
    }

    pub fn user_count(&self) -> usize {
        self.users.lock().unwrap().len()
    }
}

#[async_trait]
impl AuthProvider for StubAuth {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        _metadata: &Value,
    ) -> Result<SignUpResult, AuthError> {
        let mut users = self.users.lock().unwrap();
        if users.values().any(|(e, _)| e == email) {
            return Err(rejected(422, "User already registered"));
        }
        let id = Uuid::new_v4();
        users.insert(id, (email.to_string(), password.to_string()));
        let mut user = auth_user(id);
        user.email = Some(email.to_string());
        Ok(SignUpResult {
            user,
            session: None,
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let id = self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|(_, (e, p))| e == email && p == password)
            .map(|(id, _)| *id)
            .ok_or_else(|| rejected(400, "Invalid login credentials"))?;
        let session = session_for(id);
        self.tokens
            .lock()
            .unwrap()
            .insert(session.access_token.clone(), id);
        Ok(session)
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        self.tokens
            .lock()
            .unwrap()
            .remove(access_token)
            .map(|_| ())
            .ok_or_else(|| rejected(401, "invalid JWT"))
    }

    async fn refresh(&self, refresh_token: &str) -> Result<AuthSession, AuthError> {
        let id = refresh_token
            .strip_prefix("refresh-")
            .and_then(|raw| raw.parse::<Uuid>().ok())
            .ok_or_else(|| rejected(400, "Invalid Refresh Token"))?;
        let session = session_for(id);
        self.tokens
            .lock()
            .unwrap()
            .insert(session.access_token.clone(), id);
        Ok(session)
    }

    async fn get_user(&self, access_token: &str) -> Result<AuthUser, AuthError> {
        self.tokens
            .lock()
            .unwrap()
            .get(access_token)
            .map(|id| auth_user(*id))
            .ok_or_else(|| rejected(401, "invalid JWT"))
    }

    async fn delete_user(&self, user_id: Uuid) -> Result<(), AuthError> {
        self.users.lock().unwrap().remove(&user_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_failed_account_write_leaves_no_rows() {
        let store = MemoryStore::default();
        store.fail_next_account_write();
        let profile = NewProfile {
            user_id: Uuid::new_v4(),
            email: "a@b.c".to_string(),
            first_name: "A".to_string(),
            last_name: "B".to_string(),
            role: UserRole::Alumni,
            phone: None,
        };
        let details = RoleDetails::Alumni(NewAlumniProfile {
            graduation_year: 2018,
            department: "Physics".to_string(),
            current_company: None,
            current_position: None,
        });

        assert!(store.create_account_profile(&profile, &details).await.is_err());
        assert_eq!(store.profile_count(), 0);
        assert_eq!(store.alumni_profile_count(), 0);
        assert!(store.create_account_profile(&profile, &details).await.is_ok());
    }

    #[tokio::test]
    async fn test_registration_counts_attendee_once() {
        let store = MemoryStore::default();
        let event: EventRow = store.seed_event(Uuid::new_v4(), |e| e.max_attendees = Some(2));
        let user = Uuid::new_v4();

        let first = store.register_for_event(event.id, user, Utc::now()).await.unwrap();
        let second = store.register_for_event(event.id, user, Utc::now()).await.unwrap();

        assert!(matches!(
            first,
            RegistrationOutcome::Registered {
                current_attendees: 1,
                ..
            }
        ));
        assert!(matches!(second, RegistrationOutcome::AlreadyRegistered));
        assert_eq!(store.registration_count(event.id), 1);
    }
}
