// src/models/mod.rs
pub mod lead;
pub mod office;

// Re-export commonly used types so other modules can use `crate::models::X`
pub use lead::{CreateLeadRequest, Lead, UpdateLeadStatusRequest};
pub use office::{
    Office,
    OfficeListResponse,
    OfficePhoto,
    OfficeWithRelations,
    Pagination,
    Service,
};

use serde::Serialize;

// ==================== API RESPONSE ====================
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}
