use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "opportunity_type", rename_all = "snake_case")]
pub enum OpportunityType {
    Internship,
    Job,
    Volunteering,
}

impl OpportunityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpportunityType::Internship => "internship",
            OpportunityType::Job => "job",
            OpportunityType::Volunteering => "volunteering",
        }
    }
}

impl fmt::Display for OpportunityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OpportunityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "internship" => Ok(OpportunityType::Internship),
            "job" => Ok(OpportunityType::Job),
            "volunteering" => Ok(OpportunityType::Volunteering),
            other => Err(format!("unknown opportunity type '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OpportunityRow {
    pub id: Uuid,
    pub posted_by: Uuid,
    pub title: String,
    pub description: String,
    pub company_name: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub opportunity_type: OpportunityType,
    pub location: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
    pub skills_required: Vec<String>,
    pub requirements: Vec<String>,
    pub application_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
