use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ==================== OFFICE ====================
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Office {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub address: Option<String>,
    pub arrondissement: i32,
    /// Monthly price in cents. Search filters arrive in euros and are
    /// converted before comparison.
    pub price_cents: i64,
    pub nb_posts: i32,
    /// Seed/test listings are excluded from every public query.
    pub is_fake: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OfficePhoto {
    pub id: i64,
    pub office_id: i64,
    pub url: String,
    pub alt: Option<String>,
    pub position: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Service {
    pub id: i64,
    pub name: String,
}

/// An office with its eagerly loaded relations, as returned by the public
/// search and detail endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct OfficeWithRelations {
    #[serde(flatten)]
    pub office: Office,
    pub photos: Vec<OfficePhoto>,
    pub services: Vec<Service>,
}

// ==================== PAGINATION ====================
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

#[derive(Debug, Serialize)]
pub struct OfficeListResponse {
    pub offices: Vec<OfficeWithRelations>,
    pub pagination: Pagination,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_serializes_camel_case() {
        let pagination = Pagination {
            page: 1,
            limit: 10,
            total: 25,
            total_pages: 3,
            has_next: true,
            has_prev: false,
        };
        let value = serde_json::to_value(&pagination).unwrap();
        assert_eq!(value["totalPages"], 3);
        assert_eq!(value["hasNext"], true);
        assert_eq!(value["hasPrev"], false);
    }

    #[test]
    fn office_relations_flatten_into_the_office_object() {
        let office = Office {
            id: 1,
            title: "Bureau Sentier".to_string(),
            slug: "bureau-sentier".to_string(),
            description: None,
            address: Some("12 rue du Sentier".to_string()),
            arrondissement: 2,
            price_cents: 250_000,
            nb_posts: 8,
            is_fake: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let with_relations = OfficeWithRelations {
            office,
            photos: vec![],
            services: vec![],
        };
        let value = serde_json::to_value(&with_relations).unwrap();
        assert_eq!(value["slug"], "bureau-sentier");
        assert!(value["photos"].as_array().unwrap().is_empty());
    }
}
