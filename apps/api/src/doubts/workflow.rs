//! Doubt lifecycle: a student posts, an alumni claims, the assignee works on
//! it, and the assignee, the student or an admin resolves it.
//!
//! Every transition is a conditional update in the store, so a doubt moves
//! forward at most once per step even under concurrent requests.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::access::{authorize, Action};
use crate::errors::AppError;
use crate::leaderboard::points::{self, DOUBT_RESOLVED};
use crate::models::doubt::{DoubtRow, DoubtStatus, DoubtUrgency};
use crate::models::profile::{ProfileRow, UserRole};
use crate::search::{filter_by_query, normalize_list, Searchable};
use crate::store::{DoubtScope, NewDoubt, PortalStore};

const MAX_TITLE_LEN: usize = 200;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateDoubtRequest {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub domain_tags: Vec<String>,
    #[serde(default)]
    pub urgency: DoubtUrgency,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateDoubtRequest {
    pub rating: i32,
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DoubtFilter {
    pub search: Option<String>,
    /// A status name, or `all`.
    pub status: Option<String>,
}

impl Searchable for DoubtRow {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.title.as_str(), self.description.as_str()];
        fields.extend(self.domain_tags.iter().map(String::as_str));
        fields
    }
}

pub async fn create_doubt(
    store: &dyn PortalStore,
    caller: &ProfileRow,
    req: CreateDoubtRequest,
) -> Result<DoubtRow, AppError> {
    authorize(caller, &Action::PostDoubt)?;

    let title = req.title.trim();
    let description = req.description.trim();
    if title.is_empty() || description.is_empty() {
        return Err(AppError::Validation(
            "title and description are required".to_string(),
        ));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(AppError::Validation(format!(
            "title must be at most {MAX_TITLE_LEN} characters"
        )));
    }

    let doubt = store
        .insert_doubt(&NewDoubt {
            student_id: caller.id,
            title: title.to_string(),
            description: description.to_string(),
            domain_tags: normalize_list(&req.domain_tags),
            urgency: req.urgency,
        })
        .await?;

    info!("Student {} posted doubt {}", caller.id, doubt.id);
    Ok(doubt)
}

/// Fetches a doubt the caller is allowed to see.
pub async fn get_doubt(
    store: &dyn PortalStore,
    caller: &ProfileRow,
    id: Uuid,
) -> Result<DoubtRow, AppError> {
    let doubt = find_or_404(store, id).await?;
    if caller.role == UserRole::Student && doubt.student_id != caller.id {
        return Err(AppError::NotFound(format!("Doubt {id} not found")));
    }
    Ok(doubt)
}

/// Assigns an open doubt to the caller. A doubt that has already been
/// claimed keeps its first assignee and the second claim gets a conflict.
pub async fn claim_doubt(
    store: &dyn PortalStore,
    caller: &ProfileRow,
    id: Uuid,
) -> Result<DoubtRow, AppError> {
    authorize(caller, &Action::ClaimDoubt)?;

    match store.claim_doubt(id, caller.id).await? {
        Some(doubt) => {
            info!("Doubt {id} claimed by {}", caller.id);
            Ok(doubt)
        }
        None => Err(transition_failure(store, id, "claimed").await),
    }
}

/// `assigned -> in_progress`, by the assignee or an admin.
pub async fn start_doubt(
    store: &dyn PortalStore,
    caller: &ProfileRow,
    id: Uuid,
) -> Result<DoubtRow, AppError> {
    let doubt = find_or_404(store, id).await?;
    authorize(
        caller,
        &Action::StartDoubt {
            assignee: doubt.assigned_alumni_id,
        },
    )?;

    match store.start_doubt(id).await? {
        Some(doubt) => {
            info!("Doubt {id} in progress");
            Ok(doubt)
        }
        None => Err(transition_failure(store, id, "started").await),
    }
}

/// Marks an assigned or in-progress doubt resolved and rewards the assignee.
pub async fn resolve_doubt(
    store: &dyn PortalStore,
    caller: &ProfileRow,
    id: Uuid,
    now: DateTime<Utc>,
) -> Result<DoubtRow, AppError> {
    let doubt = find_or_404(store, id).await?;
    authorize(
        caller,
        &Action::ResolveDoubt {
            student_id: doubt.student_id,
            assignee: doubt.assigned_alumni_id,
        },
    )?;
    if !doubt.status.is_resolvable() {
        return Err(AppError::Conflict(format!(
            "Doubt {id} cannot be resolved while {}",
            doubt.status
        )));
    }

    let resolved = match store.resolve_doubt(id, now).await? {
        Some(doubt) => doubt,
        None => return Err(transition_failure(store, id, "resolved").await),
    };
    info!("Doubt {id} resolved by {}", caller.id);

    if let Some(assignee) = resolved.assigned_alumni_id {
        let mut reward = points::reward(assignee, DOUBT_RESOLVED);
        reward.doubt_id = Some(resolved.id);
        reward.domain = resolved.domain_tags.first().cloned();
        points::award(store, reward).await;
    }
    Ok(resolved)
}

/// Lets the asking student rate a resolved doubt.
pub async fn rate_doubt(
    store: &dyn PortalStore,
    caller: &ProfileRow,
    id: Uuid,
    req: RateDoubtRequest,
) -> Result<DoubtRow, AppError> {
    if !(1..=5).contains(&req.rating) {
        return Err(AppError::Validation(
            "rating must be between 1 and 5".to_string(),
        ));
    }
    let doubt = find_or_404(store, id).await?;
    authorize(
        caller,
        &Action::RateDoubt {
            student_id: doubt.student_id,
        },
    )?;

    let feedback = req
        .feedback
        .as_deref()
        .map(str::trim)
        .filter(|f| !f.is_empty());
    match store.rate_doubt(id, req.rating, feedback).await? {
        Some(doubt) => Ok(doubt),
        None => Err(transition_failure(store, id, "rated").await),
    }
}

/// Students see their own doubts, everyone else sees all of them.
pub async fn list_doubts(
    store: &dyn PortalStore,
    caller: &ProfileRow,
    filter: &DoubtFilter,
) -> Result<Vec<DoubtRow>, AppError> {
    let status = parse_status_filter(filter.status.as_deref())?;
    let scope = if caller.role == UserRole::Student {
        DoubtScope::OwnedBy(caller.id)
    } else {
        authorize(caller, &Action::ViewAllDoubts)?;
        DoubtScope::All
    };
    let doubts = store.list_doubts(scope).await?;
    Ok(apply_filter(doubts, filter.search.as_deref(), status))
}

/// `None` and `all` disable status filtering.
pub fn parse_status_filter(raw: Option<&str>) -> Result<Option<DoubtStatus>, AppError> {
    match raw.map(str::trim) {
        None | Some("") | Some("all") => Ok(None),
        Some(s) => s.parse().map(Some).map_err(AppError::Validation),
    }
}

pub fn apply_filter(
    doubts: Vec<DoubtRow>,
    search: Option<&str>,
    status: Option<DoubtStatus>,
) -> Vec<DoubtRow> {
    let doubts = match status {
        Some(status) => doubts.into_iter().filter(|d| d.status == status).collect(),
        None => doubts,
    };
    filter_by_query(doubts, search)
}

async fn find_or_404(store: &dyn PortalStore, id: Uuid) -> Result<DoubtRow, AppError> {
    store
        .find_doubt(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Doubt {id} not found")))
}

/// Explains why a conditional update matched no row.
async fn transition_failure(store: &dyn PortalStore, id: Uuid, verb: &str) -> AppError {
    match store.find_doubt(id).await {
        Ok(Some(doubt)) => AppError::Conflict(format!(
            "Doubt {id} cannot be {verb} while {}",
            doubt.status
        )),
        Ok(None) => AppError::NotFound(format!("Doubt {id} not found")),
        Err(e) => e,
    }
}
