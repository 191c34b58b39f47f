// All service modules
pub mod lead_service;
pub mod office_search;

// Re-export for convenience
pub use lead_service::LeadService;
pub use office_search::OfficeSearchService;
