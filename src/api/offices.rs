use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use std::str::FromStr;

use crate::{
    constants::DEFAULT_PAGE_LIMIT,
    error::{AppError, Result},
    models::{OfficeListResponse, OfficeWithRelations, Service},
    services::{office_search::OfficeFilters, OfficeSearchService},
};

use super::AppState;

/// Raw query parameters for the public search. Every field arrives as a
/// string and is coerced permissively: an invalid number behaves as if the
/// filter were absent, never as a 400.
#[derive(Debug, Default, Deserialize)]
pub struct OfficeSearchQuery {
    pub arr: Option<String>,
    #[serde(rename = "minPosts")]
    pub min_posts: Option<String>,
    #[serde(rename = "maxPosts")]
    pub max_posts: Option<String>,
    #[serde(rename = "minPrice")]
    pub min_price: Option<String>,
    #[serde(rename = "maxPrice")]
    pub max_price: Option<String>,
    pub services: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
    #[serde(rename = "sortBy")]
    pub sort_by: Option<String>,
    #[serde(rename = "sortOrder")]
    pub sort_order: Option<String>,
}

fn parse_number<T: FromStr>(value: Option<&String>) -> Option<T> {
    value.and_then(|raw| raw.trim().parse().ok())
}

/// Comma-separated service IDs; garbage entries are skipped and duplicates
/// dropped so the intersection count stays well-defined.
fn parse_service_ids(raw: Option<&String>) -> Vec<i64> {
    let mut ids = Vec::new();
    if let Some(raw) = raw {
        for part in raw.split(',') {
            if let Ok(id) = part.trim().parse::<i64>() {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }
    }
    ids
}

impl OfficeSearchQuery {
    pub fn into_filters(self) -> OfficeFilters {
        OfficeFilters {
            arrondissement: parse_number(self.arr.as_ref()),
            min_posts: parse_number(self.min_posts.as_ref()),
            max_posts: parse_number(self.max_posts.as_ref()),
            min_price: parse_number(self.min_price.as_ref()),
            max_price: parse_number(self.max_price.as_ref()),
            services: parse_service_ids(self.services.as_ref()),
            page: parse_number(self.page.as_ref()).unwrap_or(1),
            limit: parse_number(self.limit.as_ref()).unwrap_or(DEFAULT_PAGE_LIMIT),
            sort_by: self.sort_by.unwrap_or_else(|| "created_at".to_string()),
            sort_order: self.sort_order.unwrap_or_else(|| "desc".to_string()),
        }
    }
}

/// GET /api/v1/offices
pub async fn search_offices(
    State(state): State<AppState>,
    Query(query): Query<OfficeSearchQuery>,
) -> Result<Json<OfficeListResponse>> {
    let filters = query.into_filters();
    let service = OfficeSearchService::new(state.db.clone());
    let response = service.get_offices(filters).await?;
    Ok(Json(response))
}

/// GET /api/v1/offices/{id_or_slug}
pub async fn get_office(
    State(state): State<AppState>,
    Path(id_or_slug): Path<String>,
) -> Result<Json<OfficeWithRelations>> {
    let service = OfficeSearchService::new(state.db.clone());
    let office = service
        .get_office_detail(&id_or_slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Office '{}' not found", id_or_slug)))?;
    Ok(Json(office))
}

/// GET /api/v1/services
pub async fn list_services(State(state): State<AppState>) -> Result<Json<Vec<Service>>> {
    let services = state.db.list_services().await?;
    Ok(Json(services))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn invalid_numeric_strings_become_absent_filters() {
        let query = OfficeSearchQuery {
            arr: Some("abc".to_string()),
            min_posts: Some("".to_string()),
            min_price: Some("12,5".to_string()), // comma is not a decimal point here
            ..OfficeSearchQuery::default()
        };
        let filters = query.into_filters();
        assert!(filters.arrondissement.is_none());
        assert!(filters.min_posts.is_none());
        assert!(filters.min_price.is_none());
    }

    #[test]
    fn valid_strings_are_coerced() {
        let query = OfficeSearchQuery {
            arr: Some(" 11 ".to_string()),
            max_posts: Some("20".to_string()),
            max_price: Some("1500.50".to_string()),
            ..OfficeSearchQuery::default()
        };
        let filters = query.into_filters();
        assert_eq!(filters.arrondissement, Some(11));
        assert_eq!(filters.max_posts, Some(20));
        assert_eq!(filters.max_price, Some(Decimal::new(150_050, 2)));
    }

    #[test]
    fn pagination_and_sort_fall_back_to_defaults() {
        let query = OfficeSearchQuery {
            page: Some("not-a-page".to_string()),
            limit: None,
            sort_by: None,
            sort_order: Some("asc".to_string()),
            ..OfficeSearchQuery::default()
        };
        let filters = query.into_filters();
        assert_eq!(filters.page, 1);
        assert_eq!(filters.limit, DEFAULT_PAGE_LIMIT);
        assert_eq!(filters.sort_by, "created_at");
        assert_eq!(filters.sort_order, "asc");
    }

    #[test]
    fn service_ids_are_parsed_deduplicated_and_garbage_skipped() {
        let raw = Some("1, 2,x,2,3".to_string());
        assert_eq!(parse_service_ids(raw.as_ref()), vec![1, 2, 3]);
        assert!(parse_service_ids(None).is_empty());
        assert!(parse_service_ids(Some(&"".to_string())).is_empty());
    }
}
