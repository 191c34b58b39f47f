use crate::{
    constants::{CENTS_PER_EURO, DEFAULT_PAGE_LIMIT},
    db::Database,
    error::Result,
    models::{Office, OfficeListResponse, OfficePhoto, OfficeWithRelations, Service},
    utils::{create_pagination, normalize_pagination},
};
use rust_decimal::{prelude::ToPrimitive, Decimal};
use std::collections::HashMap;

/// Validated search filters for the public offices endpoint. Price bounds are
/// caller-facing euros; storage compares cents.
#[derive(Debug, Clone)]
pub struct OfficeFilters {
    pub arrondissement: Option<i32>,
    pub min_posts: Option<i32>,
    pub max_posts: Option<i32>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub services: Vec<i64>,
    pub page: i64,
    pub limit: i64,
    pub sort_by: String,
    pub sort_order: String,
}

impl Default for OfficeFilters {
    fn default() -> Self {
        Self {
            arrondissement: None,
            min_posts: None,
            max_posts: None,
            min_price: None,
            max_price: None,
            services: Vec::new(),
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
            sort_by: "created_at".to_string(),
            sort_order: "desc".to_string(),
        }
    }
}

pub fn euros_to_cents(value: Decimal) -> i64 {
    (value * Decimal::from(CENTS_PER_EURO))
        .round()
        .to_i64()
        .unwrap_or(i64::MAX)
}

/// Total function: unknown sort keys fall back to the creation timestamp.
pub fn sort_column(sort_by: &str) -> &'static str {
    match sort_by {
        "price" => "price_cents",
        "posts" => "nb_posts",
        _ => "created_at",
    }
}

/// Total function: anything but "asc" sorts descending.
pub fn sort_direction(sort_order: &str) -> &'static str {
    if sort_order == "asc" {
        "ASC"
    } else {
        "DESC"
    }
}

/// Assemble the WHERE predicates and their bind values. The base predicate
/// excluding seed/test listings is unconditional; every other predicate is
/// appended only when its filter value is present. All predicates are ANDed.
pub fn build_filter_conditions(filters: &OfficeFilters) -> (Vec<String>, Vec<i64>) {
    let mut conditions = vec!["is_fake = false".to_string()];
    let mut params: Vec<i64> = Vec::new();

    if let Some(arrondissement) = filters.arrondissement {
        params.push(arrondissement as i64);
        conditions.push(format!("arrondissement = ${}", params.len()));
    }
    if let Some(min_posts) = filters.min_posts {
        params.push(min_posts as i64);
        conditions.push(format!("nb_posts >= ${}", params.len()));
    }
    if let Some(max_posts) = filters.max_posts {
        params.push(max_posts as i64);
        conditions.push(format!("nb_posts <= ${}", params.len()));
    }
    if let Some(min_price) = filters.min_price {
        params.push(euros_to_cents(min_price));
        conditions.push(format!("price_cents >= ${}", params.len()));
    }
    if let Some(max_price) = filters.max_price {
        params.push(euros_to_cents(max_price));
        conditions.push(format!("price_cents <= ${}", params.len()));
    }

    (conditions, params)
}

#[derive(sqlx::FromRow)]
struct OfficeServiceRow {
    office_id: i64,
    id: i64,
    name: String,
}

pub struct OfficeSearchService {
    db: Database,
}

impl OfficeSearchService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// IDs of offices linked to every requested service ("has all", not
    /// "has any"). Callers must skip the call when no services were
    /// requested: with an empty list the count equality degenerates to 0 = 0.
    pub async fn offices_with_services(&self, service_ids: &[i64]) -> Result<Vec<i64>> {
        let office_ids: Vec<i64> = sqlx::query_scalar(
            "SELECT office_id FROM office_services
             WHERE service_id = ANY($1)
             GROUP BY office_id
             HAVING COUNT(DISTINCT service_id) = $2",
        )
        .bind(service_ids.to_vec())
        .bind(service_ids.len() as i64)
        .fetch_all(self.db.pool())
        .await?;
        Ok(office_ids)
    }

    /// Run the filtered, paginated search and assemble the response envelope.
    pub async fn get_offices(&self, filters: OfficeFilters) -> Result<OfficeListResponse> {
        let (mut conditions, params) = build_filter_conditions(&filters);

        let mut matching_ids: Option<Vec<i64>> = None;
        if !filters.services.is_empty() {
            let office_ids = self.offices_with_services(&filters.services).await?;
            if office_ids.is_empty() {
                // No office carries every requested service; skip the main
                // query instead of issuing an impossible IN () predicate.
                let (page, limit) = normalize_pagination(filters.page, filters.limit);
                return Ok(OfficeListResponse {
                    offices: Vec::new(),
                    pagination: create_pagination(page, limit, 0),
                });
            }
            conditions.push(format!("id = ANY(${})", params.len() + 1));
            matching_ids = Some(office_ids);
        }

        let where_clause = conditions.join(" AND ");

        let count_sql = format!("SELECT COUNT(*) FROM offices WHERE {}", where_clause);
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        for param in &params {
            count_query = count_query.bind(*param);
        }
        if let Some(ids) = &matching_ids {
            count_query = count_query.bind(ids.clone());
        }
        let total = count_query.fetch_one(self.db.pool()).await?;

        let (page, limit) = normalize_pagination(filters.page, filters.limit);
        let offset = (page - 1) * limit;

        let bound_so_far = params.len() + if matching_ids.is_some() { 1 } else { 0 };
        let select_sql = format!(
            "SELECT * FROM offices WHERE {} ORDER BY {} {} LIMIT ${} OFFSET ${}",
            where_clause,
            sort_column(&filters.sort_by),
            sort_direction(&filters.sort_order),
            bound_so_far + 1,
            bound_so_far + 2,
        );
        let mut select_query = sqlx::query_as::<_, Office>(&select_sql);
        for param in &params {
            select_query = select_query.bind(*param);
        }
        if let Some(ids) = &matching_ids {
            select_query = select_query.bind(ids.clone());
        }
        let offices = select_query
            .bind(limit)
            .bind(offset)
            .fetch_all(self.db.pool())
            .await?;

        let offices = self.attach_relations(offices).await?;

        Ok(OfficeListResponse {
            offices,
            pagination: create_pagination(page, limit, total),
        })
    }

    /// Detail lookup for the public office page: a numeric segment is an id,
    /// anything else a slug.
    pub async fn get_office_detail(
        &self,
        id_or_slug: &str,
    ) -> Result<Option<OfficeWithRelations>> {
        let office = match id_or_slug.parse::<i64>() {
            Ok(id) => self.db.get_office(id).await?,
            Err(_) => self.db.get_office_by_slug(id_or_slug).await?,
        };

        let Some(office) = office else {
            return Ok(None);
        };

        let mut detailed = self.attach_relations(vec![office]).await?;
        Ok(detailed.pop())
    }

    /// Batched eager loading of photo and service relations.
    async fn attach_relations(
        &self,
        offices: Vec<Office>,
    ) -> Result<Vec<OfficeWithRelations>> {
        if offices.is_empty() {
            return Ok(Vec::new());
        }

        let office_ids: Vec<i64> = offices.iter().map(|office| office.id).collect();

        let mut photos_by_office: HashMap<i64, Vec<OfficePhoto>> = HashMap::new();
        for photo in self.db.get_photos_for_offices(&office_ids).await? {
            photos_by_office
                .entry(photo.office_id)
                .or_default()
                .push(photo);
        }

        let service_rows = sqlx::query_as::<_, OfficeServiceRow>(
            "SELECT os.office_id, s.id, s.name
             FROM office_services os
             JOIN services s ON s.id = os.service_id
             WHERE os.office_id = ANY($1)
             ORDER BY s.name ASC",
        )
        .bind(office_ids)
        .fetch_all(self.db.pool())
        .await?;

        let mut services_by_office: HashMap<i64, Vec<Service>> = HashMap::new();
        for row in service_rows {
            services_by_office
                .entry(row.office_id)
                .or_default()
                .push(Service {
                    id: row.id,
                    name: row.name,
                });
        }

        Ok(offices
            .into_iter()
            .map(|office| {
                let photos = photos_by_office.remove(&office.id).unwrap_or_default();
                let services = services_by_office.remove(&office.id).unwrap_or_default();
                OfficeWithRelations {
                    office,
                    photos,
                    services,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_condition_always_excludes_fake_listings() {
        let (conditions, params) = build_filter_conditions(&OfficeFilters::default());
        assert_eq!(conditions, vec!["is_fake = false".to_string()]);
        assert!(params.is_empty());
    }

    #[test]
    fn price_bounds_are_converted_to_cents() {
        let filters = OfficeFilters {
            min_price: Some(Decimal::from(500)),
            max_price: Some(Decimal::from(1000)),
            ..OfficeFilters::default()
        };
        let (conditions, params) = build_filter_conditions(&filters);

        assert_eq!(params, vec![50_000, 100_000]);
        assert!(conditions.iter().any(|c| c == "price_cents >= $1"));
        assert!(conditions.iter().any(|c| c == "price_cents <= $2"));
    }

    #[test]
    fn fractional_euro_prices_round_to_whole_cents() {
        assert_eq!(euros_to_cents(Decimal::new(125, 1)), 1250); // 12.5 EUR
        assert_eq!(euros_to_cents(Decimal::new(99999, 3)), 10_000); // 99.999 EUR
    }

    #[test]
    fn placeholders_are_numbered_in_bind_order() {
        let filters = OfficeFilters {
            arrondissement: Some(11),
            min_posts: Some(4),
            max_posts: Some(20),
            min_price: Some(Decimal::from(300)),
            ..OfficeFilters::default()
        };
        let (conditions, params) = build_filter_conditions(&filters);

        assert_eq!(params, vec![11, 4, 20, 30_000]);
        assert_eq!(
            conditions,
            vec![
                "is_fake = false".to_string(),
                "arrondissement = $1".to_string(),
                "nb_posts >= $2".to_string(),
                "nb_posts <= $3".to_string(),
                "price_cents >= $4".to_string(),
            ]
        );
    }

    #[test]
    fn sort_column_is_default_safe() {
        assert_eq!(sort_column("price"), "price_cents");
        assert_eq!(sort_column("posts"), "nb_posts");
        assert_eq!(sort_column("created_at"), "created_at");
        assert_eq!(sort_column("unknown-value"), "created_at");
    }

    #[test]
    fn sort_direction_defaults_to_descending() {
        assert_eq!(sort_direction("asc"), "ASC");
        assert_eq!(sort_direction("desc"), "DESC");
        assert_eq!(sort_direction("sideways"), "DESC");
    }
}
