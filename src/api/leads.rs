use axum::{extract::State, http::StatusCode, Json};

use crate::{
    error::Result,
    models::{ApiResponse, CreateLeadRequest, Lead},
    services::LeadService,
};

use super::AppState;

/// POST /api/v1/leads
///
/// Public contact-form submission. CAPTCHA verification happens upstream of
/// this handler and is not re-checked here.
pub async fn create_lead(
    State(state): State<AppState>,
    Json(request): Json<CreateLeadRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Lead>>)> {
    let service = LeadService::new(state.db.clone());
    let lead = service.create_lead(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(lead))))
}
