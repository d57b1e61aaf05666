use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::events::gate::check_registration;
use crate::models::doubt::DoubtRow;
use crate::models::event::{EventRegistrationRow, EventRow};
use crate::models::leaderboard::{LeaderboardPointRow, PointsTotal};
use crate::models::opportunity::OpportunityRow;
use crate::models::profile::{AlumniDirectoryEntry, ProfileRow};
use crate::store::{
    DashboardCounts, DoubtScope, EventWindow, NewDoubt, NewEvent, NewOpportunity, NewPoints,
    NewProfile, PortalStore, RegistrationOutcome, RoleDetails,
};

const UNIQUE_VIOLATION: &str = "23505";

const ALUMNI_DIRECTORY_QUERY: &str = r#"
    SELECT p.id AS profile_id, p.first_name, p.last_name, p.email, p.avatar_url,
           a.graduation_year, a.department, a.current_company, a.current_position,
           a.location, a.bio, a.linkedin_url, a.domains, a.created_at
    FROM alumni_profiles a
    JOIN profiles p ON p.id = a.profile_id
    WHERE p.is_active
    ORDER BY a.created_at DESC
    LIMIT $1
"#;

/// `PortalStore` backed by the hosted PostgreSQL database.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Turns a unique-constraint violation into a 409 with `message`.
fn conflict_on_duplicate(err: sqlx::Error, message: &str) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            AppError::Conflict(message.to_string())
        }
        _ => AppError::Database(err),
    }
}

#[async_trait]
impl PortalStore for PgStore {
    async fn find_profile_by_user_id(&self, user_id: Uuid) -> Result<Option<ProfileRow>, AppError> {
        Ok(
            sqlx::query_as::<_, ProfileRow>("SELECT * FROM profiles WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn create_account_profile(
        &self,
        profile: &NewProfile,
        details: &RoleDetails,
    ) -> Result<ProfileRow, AppError> {
        let mut tx = self.pool.begin().await?;

        let row: ProfileRow = sqlx::query_as(
            r#"
            INSERT INTO profiles (user_id, email, first_name, last_name, role, phone)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(profile.user_id)
        .bind(&profile.email)
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .bind(profile.role)
        .bind(&profile.phone)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| conflict_on_duplicate(e, "A profile already exists for this account"))?;

        match details {
            RoleDetails::Student(student) => {
                sqlx::query(
                    r#"
                    INSERT INTO student_profiles (profile_id, enrollment_number, department, semester)
                    VALUES ($1, $2, $3, $4)
                    "#,
                )
                .bind(row.id)
                .bind(&student.enrollment_number)
                .bind(&student.department)
                .bind(student.semester)
                .execute(&mut *tx)
                .await?;
            }
            RoleDetails::Alumni(alumni) => {
                sqlx::query(
                    r#"
                    INSERT INTO alumni_profiles
                        (profile_id, graduation_year, department, current_company, current_position)
                    VALUES ($1, $2, $3, $4, $5)
                    "#,
                )
                .bind(row.id)
                .bind(alumni.graduation_year)
                .bind(&alumni.department)
                .bind(&alumni.current_company)
                .bind(&alumni.current_position)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        info!("Created {} profile {} for user {}", row.role, row.id, row.user_id);
        Ok(row)
    }

    async fn list_alumni(&self) -> Result<Vec<AlumniDirectoryEntry>, AppError> {
        Ok(sqlx::query_as::<_, AlumniDirectoryEntry>(ALUMNI_DIRECTORY_QUERY)
            .bind(None::<i64>)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn newest_alumni(&self, limit: i64) -> Result<Vec<AlumniDirectoryEntry>, AppError> {
        Ok(sqlx::query_as::<_, AlumniDirectoryEntry>(ALUMNI_DIRECTORY_QUERY)
            .bind(Some(limit))
            .fetch_all(&self.pool)
            .await?)
    }

    async fn insert_doubt(&self, doubt: &NewDoubt) -> Result<DoubtRow, AppError> {
        Ok(sqlx::query_as::<_, DoubtRow>(
            r#"
            INSERT INTO doubts (student_id, title, description, domain_tags, urgency)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(doubt.student_id)
        .bind(&doubt.title)
        .bind(&doubt.description)
        .bind(&doubt.domain_tags)
        .bind(doubt.urgency)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn find_doubt(&self, id: Uuid) -> Result<Option<DoubtRow>, AppError> {
        Ok(
            sqlx::query_as::<_, DoubtRow>("SELECT * FROM doubts WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn list_doubts(&self, scope: DoubtScope) -> Result<Vec<DoubtRow>, AppError> {
        let owner = match scope {
            DoubtScope::OwnedBy(student_id) => Some(student_id),
            DoubtScope::All => None,
        };
        Ok(sqlx::query_as::<_, DoubtRow>(
            r#"
            SELECT * FROM doubts
            WHERE ($1::uuid IS NULL OR student_id = $1)
            ORDER BY created_at DESC
            "#,
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn claim_doubt(&self, id: Uuid, alumni_id: Uuid) -> Result<Option<DoubtRow>, AppError> {
        Ok(sqlx::query_as::<_, DoubtRow>(
            r#"
            UPDATE doubts
            SET assigned_alumni_id = $2, status = 'assigned', updated_at = now()
            WHERE id = $1 AND status = 'open'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(alumni_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn start_doubt(&self, id: Uuid) -> Result<Option<DoubtRow>, AppError> {
        Ok(sqlx::query_as::<_, DoubtRow>(
            r#"
            UPDATE doubts
            SET status = 'in_progress', updated_at = now()
            WHERE id = $1 AND status = 'assigned'
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn resolve_doubt(
        &self,
        id: Uuid,
        resolved_at: DateTime<Utc>,
    ) -> Result<Option<DoubtRow>, AppError> {
        Ok(sqlx::query_as::<_, DoubtRow>(
            r#"
            UPDATE doubts
            SET status = 'resolved', resolved_at = $2, updated_at = now()
            WHERE id = $1 AND status IN ('assigned', 'in_progress')
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(resolved_at)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn rate_doubt(
        &self,
        id: Uuid,
        rating: i32,
        feedback: Option<&str>,
    ) -> Result<Option<DoubtRow>, AppError> {
        Ok(sqlx::query_as::<_, DoubtRow>(
            r#"
            UPDATE doubts
            SET rating = $2, feedback = $3, updated_at = now()
            WHERE id = $1 AND status = 'resolved'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(rating)
        .bind(feedback)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn insert_event(&self, event: &NewEvent) -> Result<EventRow, AppError> {
        Ok(sqlx::query_as::<_, EventRow>(
            r#"
            INSERT INTO events
                (organizer_id, title, description, event_type, location, event_date,
                 max_attendees, registration_deadline, image_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(event.organizer_id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.event_type)
        .bind(&event.location)
        .bind(event.event_date)
        .bind(event.max_attendees)
        .bind(event.registration_deadline)
        .bind(&event.image_url)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn find_event(&self, id: Uuid) -> Result<Option<EventRow>, AppError> {
        Ok(
            sqlx::query_as::<_, EventRow>("SELECT * FROM events WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn list_events(
        &self,
        window: EventWindow,
        now: DateTime<Utc>,
        limit: Option<i64>,
    ) -> Result<Vec<EventRow>, AppError> {
        let query = match window {
            EventWindow::Upcoming => sqlx::query_as::<_, EventRow>(
                "SELECT * FROM events WHERE is_active AND event_date >= $1 ORDER BY event_date ASC LIMIT $2",
            )
            .bind(now)
            .bind(limit),
            EventWindow::Past => sqlx::query_as::<_, EventRow>(
                "SELECT * FROM events WHERE is_active AND event_date < $1 ORDER BY event_date DESC LIMIT $2",
            )
            .bind(now)
            .bind(limit),
            EventWindow::All => sqlx::query_as::<_, EventRow>(
                "SELECT * FROM events WHERE is_active ORDER BY event_date ASC LIMIT $1",
            )
            .bind(limit),
        };
        Ok(query.fetch_all(&self.pool).await?)
    }

    async fn registered_event_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        Ok(
            sqlx::query_scalar("SELECT event_id FROM event_registrations WHERE user_id = $1")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?,
        )
    }

    async fn register_for_event(
        &self,
        event_id: Uuid,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<RegistrationOutcome, AppError> {
        let mut tx = self.pool.begin().await?;

        // Row lock serialises concurrent registrations for the same event.
        let event: Option<EventRow> =
            sqlx::query_as("SELECT * FROM events WHERE id = $1 FOR UPDATE")
                .bind(event_id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(event) = event else {
            return Ok(RegistrationOutcome::EventNotFound);
        };

        // An existing registration wins over capacity and deadline refusals.
        let already: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM event_registrations WHERE event_id = $1 AND user_id = $2)",
        )
        .bind(event_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;
        if already {
            return Ok(RegistrationOutcome::AlreadyRegistered);
        }

        if let Err(block) = check_registration(&event, now) {
            debug!("Registration for event {event_id} blocked: {block:?}");
            return Ok(RegistrationOutcome::Blocked(block));
        }

        let registration: Option<EventRegistrationRow> = sqlx::query_as(
            r#"
            INSERT INTO event_registrations (event_id, user_id, registered_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (event_id, user_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(event_id)
        .bind(user_id)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(registration) = registration else {
            return Ok(RegistrationOutcome::AlreadyRegistered);
        };

        let current_attendees: i32 = sqlx::query_scalar(
            r#"
            UPDATE events
            SET current_attendees = current_attendees + 1, updated_at = now()
            WHERE id = $1
            RETURNING current_attendees
            "#,
        )
        .bind(event_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(RegistrationOutcome::Registered {
            registration,
            current_attendees,
        })
    }

    async fn insert_opportunity(
        &self,
        opportunity: &NewOpportunity,
    ) -> Result<OpportunityRow, AppError> {
        Ok(sqlx::query_as::<_, OpportunityRow>(
            r#"
            INSERT INTO opportunities
                (posted_by, title, description, company_name, type, location, deadline,
                 skills_required, requirements, application_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(opportunity.posted_by)
        .bind(&opportunity.title)
        .bind(&opportunity.description)
        .bind(&opportunity.company_name)
        .bind(opportunity.opportunity_type)
        .bind(&opportunity.location)
        .bind(opportunity.deadline)
        .bind(&opportunity.skills_required)
        .bind(&opportunity.requirements)
        .bind(&opportunity.application_url)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn find_opportunity(&self, id: Uuid) -> Result<Option<OpportunityRow>, AppError> {
        Ok(
            sqlx::query_as::<_, OpportunityRow>("SELECT * FROM opportunities WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn list_opportunities(&self, limit: Option<i64>) -> Result<Vec<OpportunityRow>, AppError> {
        Ok(sqlx::query_as::<_, OpportunityRow>(
            "SELECT * FROM opportunities WHERE is_active ORDER BY created_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn award_points(&self, points: &NewPoints) -> Result<LeaderboardPointRow, AppError> {
        Ok(sqlx::query_as::<_, LeaderboardPointRow>(
            r#"
            INSERT INTO leaderboard_points
                (user_id, action, points, domain, doubt_id, event_id, opportunity_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(points.user_id)
        .bind(&points.action)
        .bind(points.points)
        .bind(&points.domain)
        .bind(points.doubt_id)
        .bind(points.event_id)
        .bind(points.opportunity_id)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn points_totals(&self, limit: i64) -> Result<Vec<PointsTotal>, AppError> {
        Ok(sqlx::query_as::<_, PointsTotal>(
            r#"
            SELECT lp.user_id, p.first_name, p.last_name, p.role,
                   SUM(lp.points)::BIGINT AS total_points,
                   COUNT(*) AS entries
            FROM leaderboard_points lp
            JOIN profiles p ON p.id = lp.user_id
            GROUP BY lp.user_id, p.first_name, p.last_name, p.role
            ORDER BY total_points DESC, p.first_name ASC, p.last_name ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn points_for_user(&self, user_id: Uuid) -> Result<Vec<LeaderboardPointRow>, AppError> {
        Ok(sqlx::query_as::<_, LeaderboardPointRow>(
            "SELECT * FROM leaderboard_points WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn dashboard_counts(&self) -> Result<DashboardCounts, AppError> {
        let (total_users, active_opportunities, active_events, open_doubts) = tokio::try_join!(
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM profiles").fetch_one(&self.pool),
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM opportunities WHERE is_active")
                .fetch_one(&self.pool),
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM events WHERE is_active")
                .fetch_one(&self.pool),
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM doubts WHERE status = 'open'")
                .fetch_one(&self.pool),
        )?;

        Ok(DashboardCounts {
            total_users,
            active_opportunities,
            active_events,
            open_doubts,
        })
    }
}
