use serde::Deserialize;
use std::env;

use crate::constants::SEARCH_RATE_LIMIT_MAX_REQUESTS;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // Server
    pub host: String,
    pub port: u16,
    pub environment: String,

    // Database
    pub database_url: String,
    pub database_max_connections: u32,

    // Admin back-office
    pub admin_api_key: Option<String>,

    // Rate limiting
    pub rate_limit_search: u32,

    // CORS
    pub cors_allowed_origins: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        Ok(Config {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),

            database_url: env::var("DATABASE_URL")?,
            database_max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "20".to_string())
                .parse()?,

            admin_api_key: env::var("ADMIN_API_KEY").ok(),

            rate_limit_search: env::var("RATE_LIMIT_SEARCH")
                .unwrap_or_else(|_| SEARCH_RATE_LIMIT_MAX_REQUESTS.to_string())
                .parse()?,

            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "*".to_string()),
        })
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.database_url.trim().is_empty() {
            anyhow::bail!("DATABASE_URL is empty");
        }

        if self.rate_limit_search == 0 {
            tracing::warn!("RATE_LIMIT_SEARCH should be > 0");
        }

        match &self.admin_api_key {
            None => tracing::warn!("ADMIN_API_KEY is not set; admin endpoints are disabled"),
            Some(key) if key.trim().len() < 16 => {
                tracing::warn!("ADMIN_API_KEY looks too short for production use")
            }
            Some(_) => {}
        }

        if self.cors_allowed_origins.trim().is_empty() {
            tracing::warn!("CORS_ALLOWED_ORIGINS is empty; requests may be blocked");
        }

        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            host: "0.0.0.0".to_string(),
            port: 3000,
            environment: "development".to_string(),
            database_url: "postgres://localhost/petits_bureaux".to_string(),
            database_max_connections: 1,
            admin_api_key: None,
            rate_limit_search: 100,
            cors_allowed_origins: "*".to_string(),
        }
    }

    #[test]
    fn is_production_matches_environment() {
        let mut config = base_config();
        assert!(!config.is_production());
        config.environment = "production".to_string();
        assert!(config.is_production());
    }

    #[test]
    fn validate_rejects_empty_database_url() {
        let mut config = base_config();
        config.database_url = "  ".to_string();
        assert!(config.validate().is_err());
    }
}
