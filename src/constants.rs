/// Application constants

// Search rate limiting (public search API)
pub const SEARCH_RATE_LIMIT_MAX_REQUESTS: u32 = 100;
pub const SEARCH_RATE_LIMIT_WINDOW_SECS: u64 = 3600; // 1 hour

// Pagination bounds
pub const DEFAULT_PAGE_LIMIT: i64 = 10;
pub const MAX_PAGE_LIMIT: i64 = 100;
pub const MAX_PAGE: i64 = 999_999;

// Prices are stored in cents, entered in euros
pub const CENTS_PER_EURO: i64 = 100;

// Paris arrondissements
pub const ARRONDISSEMENT_MIN: i32 = 1;
pub const ARRONDISSEMENT_MAX: i32 = 20;

// Lead pipeline statuses
pub const LEAD_STATUS_NEW: &str = "new";
pub const LEAD_STATUSES: &[&str] = &["new", "contacted", "converted", "lost"];

// API version
pub const API_VERSION: &str = "v1";
