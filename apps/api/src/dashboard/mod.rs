//! Landing page summary: headline counts, previews of the newest content and
//! two highlight reels.

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::carousel::Carousel;
use crate::errors::AppError;
use crate::models::event::{EventRow, EventType};
use crate::models::opportunity::OpportunityRow;
use crate::models::profile::AlumniDirectoryEntry;
use crate::state::AppState;
use crate::store::{DashboardCounts, EventWindow, PortalStore};

const PREVIEW_LEN: i64 = 3;
const REEL_LEN: i64 = 5;

#[derive(Debug, Clone, Serialize)]
pub struct Slide {
    pub event_id: Uuid,
    pub title: String,
    pub event_type: EventType,
    pub location: String,
    pub event_date: DateTime<Utc>,
    pub image_url: Option<String>,
}

impl From<&EventRow> for Slide {
    fn from(event: &EventRow) -> Self {
        Slide {
            event_id: event.id,
            title: event.title.clone(),
            event_type: event.event_type,
            location: event.location.clone(),
            event_date: event.event_date,
            image_url: event.image_url.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Reel<T> {
    pub slides: Vec<T>,
    pub carousel: Carousel,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub counts: DashboardCounts,
    pub upcoming_events: Vec<EventRow>,
    pub latest_opportunities: Vec<OpportunityRow>,
    pub newest_alumni: Vec<AlumniDirectoryEntry>,
    /// Auto-advancing reel of upcoming events.
    pub highlights: Reel<Slide>,
    /// Manually browsed reel of recently joined alumni.
    pub spotlight: Reel<AlumniDirectoryEntry>,
}

pub async fn build_dashboard(
    store: &dyn PortalStore,
    now: DateTime<Utc>,
) -> Result<Dashboard, AppError> {
    let (counts, upcoming, latest_opportunities, alumni) = tokio::try_join!(
        store.dashboard_counts(),
        store.list_events(EventWindow::Upcoming, now, Some(REEL_LEN)),
        store.list_opportunities(Some(PREVIEW_LEN)),
        store.newest_alumni(REEL_LEN),
    )?;
    debug!(
        "Dashboard: {} upcoming, {} opportunities, {} alumni",
        upcoming.len(),
        latest_opportunities.len(),
        alumni.len()
    );

    let slides: Vec<Slide> = upcoming.iter().map(Slide::from).collect();
    Ok(Dashboard {
        counts,
        highlights: Reel {
            carousel: Carousel::auto(slides.len()),
            slides,
        },
        spotlight: Reel {
            carousel: Carousel::manual(alumni.len()),
            slides: alumni.clone(),
        },
        upcoming_events: upcoming.into_iter().take(PREVIEW_LEN as usize).collect(),
        latest_opportunities,
        newest_alumni: alumni.into_iter().take(PREVIEW_LEN as usize).collect(),
    })
}

/// GET /api/v1/dashboard
pub async fn handle_dashboard(State(state): State<AppState>) -> Result<Json<Dashboard>, AppError> {
    Ok(Json(build_dashboard(state.store.as_ref(), Utc::now()).await?))
}
