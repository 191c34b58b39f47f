use super::AppState;
use crate::{
    constants::{ARRONDISSEMENT_MAX, ARRONDISSEMENT_MIN},
    error::{AppError, Result},
    models::{ApiResponse, Lead, Office, UpdateLeadStatusRequest},
    services::{lead_service::LeadListResponse, LeadService},
    utils::ensure_page_limit,
};
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderName, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

const ADMIN_KEY_HEADER: &str = "x-admin-key";

fn require_admin_key(headers: &HeaderMap, state: &AppState) -> Result<()> {
    let expected = state
        .config
        .admin_api_key
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            AppError::BadRequest(
                "ADMIN_API_KEY is not configured on the backend. Admin endpoints are disabled."
                    .to_string(),
            )
        })?;

    let header_name = HeaderName::from_static(ADMIN_KEY_HEADER);
    let provided = headers
        .get(&header_name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            AppError::AuthError(format!(
                "Missing admin key. Send header '{}' to access this endpoint.",
                ADMIN_KEY_HEADER
            ))
        })?;

    if provided != expected {
        return Err(AppError::AuthError("Invalid admin key".to_string()));
    }
    Ok(())
}

// ==================== OFFICE CRUD ====================

#[derive(Debug, Deserialize)]
pub struct PhotoInput {
    pub url: String,
    pub alt: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateOfficeRequest {
    pub title: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub address: Option<String>,
    pub arrondissement: i32,
    pub price_cents: i64,
    pub nb_posts: i32,
    pub is_fake: Option<bool>,
    pub service_ids: Option<Vec<i64>>,
    pub photos: Option<Vec<PhotoInput>>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateOfficeRequest {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub address: Option<String>,
    pub arrondissement: Option<i32>,
    pub price_cents: Option<i64>,
    pub nb_posts: Option<i32>,
    pub is_fake: Option<bool>,
    pub service_ids: Option<Vec<i64>>,
}

#[derive(Debug, Serialize)]
pub struct CreateOfficeResponse {
    pub id: i64,
    pub slug: String,
}

fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut pending_dash = false;
    for c in value.to_lowercase().chars() {
        let mapped = match c {
            'à' | 'â' | 'ä' => Some('a'),
            'é' | 'è' | 'ê' | 'ë' => Some('e'),
            'î' | 'ï' => Some('i'),
            'ô' | 'ö' => Some('o'),
            'ù' | 'û' | 'ü' => Some('u'),
            'ç' => Some('c'),
            c if c.is_ascii_alphanumeric() => Some(c),
            _ => None,
        };
        match mapped {
            Some(c) => {
                if pending_dash && !slug.is_empty() {
                    slug.push('-');
                }
                pending_dash = false;
                slug.push(c);
            }
            None => pending_dash = true,
        }
    }
    slug
}

fn validate_office_fields(
    arrondissement: Option<i32>,
    price_cents: Option<i64>,
    nb_posts: Option<i32>,
) -> Vec<String> {
    let mut details = Vec::new();
    if let Some(arrondissement) = arrondissement {
        if !(ARRONDISSEMENT_MIN..=ARRONDISSEMENT_MAX).contains(&arrondissement) {
            details.push(format!(
                "arrondissement must be between {} and {}",
                ARRONDISSEMENT_MIN, ARRONDISSEMENT_MAX
            ));
        }
    }
    if let Some(price_cents) = price_cents {
        if price_cents < 0 {
            details.push("price_cents must be >= 0".to_string());
        }
    }
    if let Some(nb_posts) = nb_posts {
        if nb_posts < 0 {
            details.push("nb_posts must be >= 0".to_string());
        }
    }
    details
}

async fn ensure_known_services(state: &AppState, service_ids: &[i64]) -> Result<()> {
    if service_ids.is_empty() {
        return Ok(());
    }
    let known = state.db.count_existing_services(service_ids).await?;
    if known != service_ids.len() as i64 {
        return Err(AppError::BadRequest(
            "service_ids contains unknown services".to_string(),
        ));
    }
    Ok(())
}

/// POST /api/v1/admin/offices
pub async fn create_office(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateOfficeRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CreateOfficeResponse>>)> {
    require_admin_key(&headers, &state)?;

    let title = request.title.trim();
    let mut details = validate_office_fields(
        Some(request.arrondissement),
        Some(request.price_cents),
        Some(request.nb_posts),
    );
    if title.is_empty() {
        details.push("title must not be empty".to_string());
    }

    let slug = match request.slug.as_deref().map(str::trim) {
        Some(slug) if !slug.is_empty() => slug.to_string(),
        _ => slugify(title),
    };
    if slug.is_empty() {
        details.push("slug could not be derived from title".to_string());
    }

    if let Some(photos) = &request.photos {
        if photos.iter().any(|photo| photo.url.trim().is_empty()) {
            details.push("photo urls must not be empty".to_string());
        }
    }

    if !details.is_empty() {
        return Err(AppError::Validation {
            message: "Invalid office payload".to_string(),
            details,
        });
    }

    if state.db.slug_in_use(&slug, None).await? {
        return Err(AppError::BadRequest(format!(
            "Slug '{}' is already in use",
            slug
        )));
    }

    let service_ids = request.service_ids.unwrap_or_default();
    ensure_known_services(&state, &service_ids).await?;

    let id = state
        .db
        .create_office(
            title,
            &slug,
            request.description.as_deref(),
            request.address.as_deref(),
            request.arrondissement,
            request.price_cents,
            request.nb_posts,
            request.is_fake.unwrap_or(false),
        )
        .await?;

    let photos = request.photos.unwrap_or_default();
    for (position, photo) in photos.iter().enumerate() {
        state
            .db
            .add_office_photo(id, photo.url.trim(), photo.alt.as_deref(), position as i32)
            .await?;
    }

    if !service_ids.is_empty() {
        state.db.replace_office_services(id, &service_ids).await?;
    }

    tracing::info!("Created office {} ({})", id, slug);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(CreateOfficeResponse { id, slug })),
    ))
}

/// PUT /api/v1/admin/offices/{id}
pub async fn update_office(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(request): Json<UpdateOfficeRequest>,
) -> Result<Json<ApiResponse<String>>> {
    require_admin_key(&headers, &state)?;

    let mut details = validate_office_fields(
        request.arrondissement,
        request.price_cents,
        request.nb_posts,
    );
    if let Some(title) = request.title.as_deref() {
        if title.trim().is_empty() {
            details.push("title must not be empty".to_string());
        }
    }
    let slug = request.slug.as_deref().map(str::trim);
    if let Some(slug) = slug {
        if slug.is_empty() {
            details.push("slug must not be empty".to_string());
        }
    }
    if !details.is_empty() {
        return Err(AppError::Validation {
            message: "Invalid office payload".to_string(),
            details,
        });
    }

    if let Some(slug) = slug {
        if state.db.slug_in_use(slug, Some(id)).await? {
            return Err(AppError::BadRequest(format!(
                "Slug '{}' is already in use",
                slug
            )));
        }
    }

    if let Some(service_ids) = &request.service_ids {
        ensure_known_services(&state, service_ids).await?;
    }

    let updated = state
        .db
        .update_office(
            id,
            request.title.as_deref().map(str::trim),
            slug,
            request.description.as_deref(),
            request.address.as_deref(),
            request.arrondissement,
            request.price_cents,
            request.nb_posts,
            request.is_fake,
        )
        .await?;
    if !updated {
        return Err(AppError::NotFound(format!("Office {} not found", id)));
    }

    if let Some(service_ids) = &request.service_ids {
        state.db.replace_office_services(id, service_ids).await?;
    }

    Ok(Json(ApiResponse::success("Office updated".to_string())))
}

/// DELETE /api/v1/admin/offices/{id}
pub async fn delete_office(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<String>>> {
    require_admin_key(&headers, &state)?;

    if !state.db.delete_office(id).await? {
        return Err(AppError::NotFound(format!("Office {} not found", id)));
    }

    tracing::info!("Deleted office {}", id);
    Ok(Json(ApiResponse::success("Office deleted".to_string())))
}

// ==================== CSV EXPORT ====================

fn csv_header() -> &'static str {
    "Id,Title,Slug,Arrondissement,Price Cents,Posts,Fake,Created At\n"
}

fn format_csv_row(office: &Office) -> String {
    format!(
        "{},\"{}\",{},{},{},{},{},{}\n",
        office.id,
        office.title.replace('"', "\"\""),
        office.slug,
        office.arrondissement,
        office.price_cents,
        office.nb_posts,
        office.is_fake,
        office.created_at.format("%Y-%m-%d %H:%M:%S"),
    )
}

/// GET /api/v1/admin/offices/export
pub async fn export_offices_csv(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse> {
    require_admin_key(&headers, &state)?;

    let offices = state.db.export_offices().await?;
    let mut csv = String::from(csv_header());
    for office in &offices {
        csv.push_str(&format_csv_row(office));
    }

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"offices.csv\"",
            ),
        ],
        csv,
    ))
}

// ==================== LEAD MANAGEMENT ====================

#[derive(Debug, Deserialize)]
pub struct AdminLeadsQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<String>,
}

/// GET /api/v1/admin/leads
pub async fn list_leads(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<AdminLeadsQuery>,
) -> Result<Json<ApiResponse<LeadListResponse>>> {
    require_admin_key(&headers, &state)?;

    let page = query.page.unwrap_or(1);
    let limit = query.limit.unwrap_or(20);
    ensure_page_limit(page, limit)?;

    let service = LeadService::new(state.db.clone());
    let response = service
        .list_leads(query.status.as_deref(), page, limit)
        .await?;
    Ok(Json(ApiResponse::success(response)))
}

/// PUT /api/v1/admin/leads/{id}/status
pub async fn update_lead_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(request): Json<UpdateLeadStatusRequest>,
) -> Result<Json<ApiResponse<Lead>>> {
    require_admin_key(&headers, &state)?;

    let service = LeadService::new(state.db.clone());
    let lead = service.update_status(id, request.status.trim()).await?;
    Ok(Json(ApiResponse::success(lead)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn slugify_handles_french_titles() {
        assert_eq!(slugify("Bureau élégant, Café du 2e"), "bureau-elegant-cafe-du-2e");
        assert_eq!(slugify("  Le Marais  "), "le-marais");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn validate_office_fields_collects_every_issue() {
        let details = validate_office_fields(Some(21), Some(-1), Some(-3));
        assert_eq!(details.len(), 3);
        assert!(validate_office_fields(Some(11), Some(0), Some(0)).is_empty());
        assert!(validate_office_fields(None, None, None).is_empty());
    }

    #[test]
    fn csv_row_quotes_the_title() {
        let office = Office {
            id: 7,
            title: "Bureau \"Le Sentier\", 2e".to_string(),
            slug: "bureau-le-sentier".to_string(),
            description: None,
            address: None,
            arrondissement: 2,
            price_cents: 250_000,
            nb_posts: 8,
            is_fake: false,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        };
        let row = format_csv_row(&office);
        assert!(row.starts_with("7,\"Bureau \"\"Le Sentier\"\", 2e\",bureau-le-sentier,2,"));
        assert!(csv_header().starts_with("Id,Title"));
    }
}
