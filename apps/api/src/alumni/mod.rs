//! Alumni directory.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::profile::AlumniDirectoryEntry;
use crate::search::{filter_by_query, Searchable};
use crate::store::PortalStore;
use crate::state::AppState;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DirectoryFilter {
    pub search: Option<String>,
    pub department: Option<String>,
    pub graduation_year: Option<i32>,
}

impl Searchable for AlumniDirectoryEntry {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.first_name.as_str(), self.last_name.as_str()];
        fields.extend(self.current_company.as_deref());
        fields.extend(self.current_position.as_deref());
        fields.push(self.department.as_str());
        fields.extend(self.domains.iter().map(String::as_str));
        fields
    }
}

/// Active alumni, newest first. Department matches ignore case.
pub async fn directory(
    store: &dyn PortalStore,
    filter: &DirectoryFilter,
) -> Result<Vec<AlumniDirectoryEntry>, AppError> {
    let department = filter
        .department
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty() && *d != "all");

    let entries: Vec<AlumniDirectoryEntry> = store
        .list_alumni()
        .await?
        .into_iter()
        .filter(|a| department.map_or(true, |d| a.department.eq_ignore_ascii_case(d)))
        .filter(|a| {
            filter
                .graduation_year
                .map_or(true, |year| a.graduation_year == year)
        })
        .collect();
    Ok(filter_by_query(entries, filter.search.as_deref()))
}

/// GET /api/v1/alumni?search=&department=&graduation_year=
pub async fn handle_directory(
    State(state): State<AppState>,
    Query(filter): Query<DirectoryFilter>,
) -> Result<Json<Vec<AlumniDirectoryEntry>>, AppError> {
    Ok(Json(directory(state.store.as_ref(), &filter).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::NewAlumniProfile;
    use crate::test_support::MemoryStore;

    fn seed(store: &MemoryStore) {
        store.seed_alumni(
            "Meera",
            "Iyer",
            NewAlumniProfile {
                graduation_year: 2015,
                department: "Computer Science".to_string(),
                current_company: Some("Initech".to_string()),
                current_position: Some("Staff Engineer".to_string()),
            },
            &["Distributed Systems"],
        );
        store.seed_alumni(
            "Arjun",
            "Shah",
            NewAlumniProfile {
                graduation_year: 2019,
                department: "Mechanical".to_string(),
                current_company: None,
                current_position: None,
            },
            &["Robotics"],
        );
    }

    #[tokio::test]
    async fn test_search_covers_company_and_domains() {
        let store = MemoryStore::default();
        seed(&store);

        let by_company = directory(
            &store,
            &DirectoryFilter {
                search: Some("initech".to_string()),
                ..DirectoryFilter::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(by_company.len(), 1);
        assert_eq!(by_company[0].first_name, "Meera");

        let by_domain = directory(
            &store,
            &DirectoryFilter {
                search: Some("robot".to_string()),
                ..DirectoryFilter::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(by_domain.len(), 1);
        assert_eq!(by_domain[0].last_name, "Shah");
    }

    #[tokio::test]
    async fn test_department_and_year_filters() {
        let store = MemoryStore::default();
        seed(&store);

        let cs = directory(
            &store,
            &DirectoryFilter {
                department: Some("computer science".to_string()),
                ..DirectoryFilter::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(cs.len(), 1);

        let class_of_2019 = directory(
            &store,
            &DirectoryFilter {
                graduation_year: Some(2019),
                ..DirectoryFilter::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(class_of_2019.len(), 1);
        assert_eq!(class_of_2019[0].department, "Mechanical");
    }

    #[tokio::test]
    async fn test_newest_first() {
        let store = MemoryStore::default();
        seed(&store);
        let all = directory(&store, &DirectoryFilter::default()).await.unwrap();
        assert_eq!(all[0].first_name, "Arjun");
        assert_eq!(all[1].first_name, "Meera");
    }
}
