use crate::{
    constants::{LEAD_STATUSES, LEAD_STATUS_NEW},
    db::Database,
    error::{AppError, Result},
    models::{CreateLeadRequest, Lead, Pagination},
    utils::create_pagination,
};
use serde::Serialize;

pub fn is_valid_status(status: &str) -> bool {
    LEAD_STATUSES.contains(&status)
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}

#[derive(Debug, Serialize)]
pub struct LeadListResponse {
    pub leads: Vec<Lead>,
    pub pagination: Pagination,
}

pub struct LeadService {
    db: Database,
}

impl LeadService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Store a contact-form submission. New leads always enter the pipeline
    /// in the `new` status.
    pub async fn create_lead(&self, request: CreateLeadRequest) -> Result<Lead> {
        let name = request.name.trim();
        let email = request.email.trim();

        let mut details = Vec::new();
        if name.is_empty() {
            details.push("name must not be empty".to_string());
        }
        if !is_plausible_email(email) {
            details.push("email is not a valid address".to_string());
        }
        if !details.is_empty() {
            return Err(AppError::Validation {
                message: "Invalid lead payload".to_string(),
                details,
            });
        }

        if let Some(office_id) = request.office_id {
            if self.db.get_office(office_id).await?.is_none() {
                return Err(AppError::BadRequest(format!(
                    "Unknown office: {}",
                    office_id
                )));
            }
        }

        let lead = self
            .db
            .create_lead(
                request.office_id,
                name,
                email,
                request.phone.as_deref().map(str::trim),
                request.message.as_deref(),
                LEAD_STATUS_NEW,
            )
            .await?;

        tracing::info!("New lead {} for office {:?}", lead.id, lead.office_id);
        Ok(lead)
    }

    /// Paginated lead listing for the back-office, optionally scoped to one
    /// pipeline status. Pagination has already passed the strict admin guard.
    pub async fn list_leads(
        &self,
        status: Option<&str>,
        page: i64,
        limit: i64,
    ) -> Result<LeadListResponse> {
        if let Some(status) = status {
            if !is_valid_status(status) {
                return Err(AppError::BadRequest(format!(
                    "Unknown lead status '{}', expected one of: {}",
                    status,
                    LEAD_STATUSES.join(", ")
                )));
            }
        }

        let offset = (page - 1) * limit;
        let leads = self.db.list_leads(status, limit, offset).await?;
        let total = self.db.count_leads(status).await?;

        Ok(LeadListResponse {
            leads,
            pagination: create_pagination(page, limit, total),
        })
    }

    pub async fn update_status(&self, id: i64, status: &str) -> Result<Lead> {
        if !is_valid_status(status) {
            return Err(AppError::BadRequest(format!(
                "Unknown lead status '{}', expected one of: {}",
                status,
                LEAD_STATUSES.join(", ")
            )));
        }

        self.db
            .update_lead_status(id, status)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Lead {} not found", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_statuses_are_accepted() {
        for status in LEAD_STATUSES {
            assert!(is_valid_status(status));
        }
        assert!(!is_valid_status("archived"));
        assert!(!is_valid_status(""));
    }

    #[test]
    fn email_plausibility_check() {
        assert!(is_plausible_email("claire@exemple.fr"));
        assert!(!is_plausible_email("claire"));
        assert!(!is_plausible_email("@exemple.fr"));
        assert!(!is_plausible_email("claire@exemple"));
        assert!(!is_plausible_email("claire durand@exemple.fr"));
    }
}
