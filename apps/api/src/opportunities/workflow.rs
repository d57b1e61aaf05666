use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;
use url::Url;
use uuid::Uuid;

use crate::access::{authorize, Action};
use crate::errors::AppError;
use crate::leaderboard::points::{self, OPPORTUNITY_POSTED};
use crate::models::opportunity::{OpportunityRow, OpportunityType};
use crate::models::profile::ProfileRow;
use crate::search::{filter_by_query, split_list, Searchable};
use crate::store::{NewOpportunity, PortalStore};

/// Form input. Skills arrive comma-separated, requirements one per line.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOpportunityRequest {
    pub title: String,
    pub description: String,
    pub company_name: String,
    #[serde(rename = "type")]
    pub opportunity_type: OpportunityType,
    pub location: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub skills_required: String,
    #[serde(default)]
    pub requirements: String,
    pub application_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpportunityFilter {
    pub search: Option<String>,
    #[serde(rename = "type")]
    pub opportunity_type: Option<String>,
}

impl Searchable for OpportunityRow {
    fn search_fields(&self) -> Vec<&str> {
        vec![
            self.title.as_str(),
            self.company_name.as_str(),
            self.description.as_str(),
        ]
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Accepts only absolute http(s) URLs with a host. Returns the normalised
/// form that gets stored and later redirected to.
pub fn validate_application_url(raw: &str) -> Result<String, AppError> {
    let url = Url::parse(raw.trim()).map_err(|e| {
        AppError::Validation(format!("application_url is not a valid URL: {e}"))
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(AppError::Validation(
            "application_url must use http or https".to_string(),
        ));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(AppError::Validation(
            "application_url must include a host".to_string(),
        ));
    }
    Ok(url.as_str().to_string())
}

pub async fn create_opportunity(
    store: &dyn PortalStore,
    caller: &ProfileRow,
    req: CreateOpportunityRequest,
) -> Result<OpportunityRow, AppError> {
    authorize(caller, &Action::CreateOpportunity)?;

    let title = req.title.trim();
    let description = req.description.trim();
    let company_name = req.company_name.trim();
    if title.is_empty() || description.is_empty() || company_name.is_empty() {
        return Err(AppError::Validation(
            "title, description and company_name are required".to_string(),
        ));
    }
    let application_url = non_blank(req.application_url)
        .map(|url| validate_application_url(&url))
        .transpose()?;

    let opportunity = store
        .insert_opportunity(&NewOpportunity {
            posted_by: caller.id,
            title: title.to_string(),
            description: description.to_string(),
            company_name: company_name.to_string(),
            opportunity_type: req.opportunity_type,
            location: non_blank(req.location),
            deadline: req.deadline,
            skills_required: split_list(&req.skills_required, ','),
            requirements: split_list(&req.requirements, '\n'),
            application_url,
        })
        .await?;
    info!(
        "Opportunity {} ({}) posted by {}",
        opportunity.id, opportunity.opportunity_type, caller.id
    );

    let mut reward = points::reward(caller.id, OPPORTUNITY_POSTED);
    reward.opportunity_id = Some(opportunity.id);
    points::award(store, reward).await;

    Ok(opportunity)
}

/// Active opportunities, newest first.
pub async fn list_opportunities(
    store: &dyn PortalStore,
    filter: &OpportunityFilter,
) -> Result<Vec<OpportunityRow>, AppError> {
    let wanted: Option<OpportunityType> = match filter.opportunity_type.as_deref().map(str::trim) {
        None | Some("") | Some("all") => None,
        Some(s) => Some(s.parse().map_err(AppError::Validation)?),
    };
    let opportunities = store.list_opportunities(None).await?;
    let opportunities = match wanted {
        Some(t) => opportunities
            .into_iter()
            .filter(|o| o.opportunity_type == t)
            .collect(),
        None => opportunities,
    };
    Ok(filter_by_query(opportunities, filter.search.as_deref()))
}

/// External URL to send an applicant to.
pub async fn application_target(store: &dyn PortalStore, id: Uuid) -> Result<String, AppError> {
    let opportunity = store
        .find_opportunity(id)
        .await?
        .filter(|o| o.is_active)
        .ok_or_else(|| AppError::NotFound(format!("Opportunity {id} not found")))?;
    opportunity.application_url.ok_or_else(|| {
        AppError::UnprocessableEntity("This opportunity has no application link".to_string())
    })
}
