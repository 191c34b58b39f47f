// src/api/mod.rs

pub mod admin;
pub mod health;
pub mod leads;
pub mod offices;

use crate::{config::Config, db::Database, rate_limit::RateLimiter};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Config,
    pub rate_limiter: Arc<RateLimiter>,
}
