use crate::{config::Config, error::Result, models::*};
use sqlx::{postgres::PgPoolOptions, PgPool};

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(database_url: &str) -> Config {
        Config {
            host: "0.0.0.0".to_string(),
            port: 3000,
            environment: "development".to_string(),
            database_url: database_url.to_string(),
            database_max_connections: 1,
            admin_api_key: None,
            rate_limit_search: 100,
            cors_allowed_origins: "*".to_string(),
        }
    }

    #[tokio::test]
    async fn database_new_returns_error_on_invalid_url() {
        let config = test_config("not-a-url");
        let result = Database::new(&config).await;
        assert!(result.is_err());
    }
}

impl Database {
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .connect(&config.database_url)
            .await?;

        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

// ==================== OFFICE QUERIES ====================
impl Database {
    /// Public lookup by numeric id; seed/test listings stay hidden.
    pub async fn get_office(&self, id: i64) -> Result<Option<Office>> {
        let office = sqlx::query_as::<_, Office>(
            "SELECT * FROM offices WHERE id = $1 AND is_fake = false",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(office)
    }

    pub async fn get_office_by_slug(&self, slug: &str) -> Result<Option<Office>> {
        let office = sqlx::query_as::<_, Office>(
            "SELECT * FROM offices WHERE slug = $1 AND is_fake = false",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        Ok(office)
    }

    pub async fn slug_in_use(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool> {
        let in_use: bool = sqlx::query_scalar(
            "SELECT EXISTS(
                SELECT 1 FROM offices
                WHERE slug = $1 AND ($2::BIGINT IS NULL OR id <> $2)
            )",
        )
        .bind(slug)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(in_use)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create_office(
        &self,
        title: &str,
        slug: &str,
        description: Option<&str>,
        address: Option<&str>,
        arrondissement: i32,
        price_cents: i64,
        nb_posts: i32,
        is_fake: bool,
    ) -> Result<i64> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO offices
                (title, slug, description, address, arrondissement, price_cents, nb_posts, is_fake)
            VALUES ($1,$2,$3,$4,$5,$6,$7,$8)
            RETURNING id
            "#,
        )
        .bind(title)
        .bind(slug)
        .bind(description)
        .bind(address)
        .bind(arrondissement)
        .bind(price_cents)
        .bind(nb_posts)
        .bind(is_fake)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    /// Partial update: absent fields keep their stored value.
    #[allow(clippy::too_many_arguments)]
    pub async fn update_office(
        &self,
        id: i64,
        title: Option<&str>,
        slug: Option<&str>,
        description: Option<&str>,
        address: Option<&str>,
        arrondissement: Option<i32>,
        price_cents: Option<i64>,
        nb_posts: Option<i32>,
        is_fake: Option<bool>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE offices SET
                title = COALESCE($2, title),
                slug = COALESCE($3, slug),
                description = COALESCE($4, description),
                address = COALESCE($5, address),
                arrondissement = COALESCE($6, arrondissement),
                price_cents = COALESCE($7, price_cents),
                nb_posts = COALESCE($8, nb_posts),
                is_fake = COALESCE($9, is_fake),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(title)
        .bind(slug)
        .bind(description)
        .bind(address)
        .bind(arrondissement)
        .bind(price_cents)
        .bind(nb_posts)
        .bind(is_fake)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_office(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM offices WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn export_offices(&self) -> Result<Vec<Office>> {
        let offices = sqlx::query_as::<_, Office>("SELECT * FROM offices ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(offices)
    }
}

// ==================== PHOTO QUERIES ====================
impl Database {
    pub async fn add_office_photo(
        &self,
        office_id: i64,
        url: &str,
        alt: Option<&str>,
        position: i32,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO office_photos (office_id, url, alt, position)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(office_id)
        .bind(url)
        .bind(alt)
        .bind(position)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_photos_for_offices(&self, office_ids: &[i64]) -> Result<Vec<OfficePhoto>> {
        let photos = sqlx::query_as::<_, OfficePhoto>(
            "SELECT * FROM office_photos
             WHERE office_id = ANY($1)
             ORDER BY office_id, position ASC",
        )
        .bind(office_ids.to_vec())
        .fetch_all(&self.pool)
        .await?;
        Ok(photos)
    }
}

// ==================== SERVICE QUERIES ====================
impl Database {
    pub async fn list_services(&self) -> Result<Vec<Service>> {
        let services =
            sqlx::query_as::<_, Service>("SELECT * FROM services ORDER BY name ASC")
                .fetch_all(&self.pool)
                .await?;
        Ok(services)
    }

    pub async fn count_existing_services(&self, service_ids: &[i64]) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM services WHERE id = ANY($1)")
                .bind(service_ids.to_vec())
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    pub async fn replace_office_services(
        &self,
        office_id: i64,
        service_ids: &[i64],
    ) -> Result<()> {
        sqlx::query("DELETE FROM office_services WHERE office_id = $1")
            .bind(office_id)
            .execute(&self.pool)
            .await?;

        for service_id in service_ids {
            sqlx::query(
                "INSERT INTO office_services (office_id, service_id)
                 VALUES ($1, $2)
                 ON CONFLICT DO NOTHING",
            )
            .bind(office_id)
            .bind(service_id)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }
}

// ==================== LEAD QUERIES ====================
impl Database {
    pub async fn create_lead(
        &self,
        office_id: Option<i64>,
        name: &str,
        email: &str,
        phone: Option<&str>,
        message: Option<&str>,
        status: &str,
    ) -> Result<Lead> {
        let lead = sqlx::query_as::<_, Lead>(
            r#"
            INSERT INTO leads (office_id, name, email, phone, message, status)
            VALUES ($1,$2,$3,$4,$5,$6)
            RETURNING *
            "#,
        )
        .bind(office_id)
        .bind(name)
        .bind(email)
        .bind(phone)
        .bind(message)
        .bind(status)
        .fetch_one(&self.pool)
        .await?;
        Ok(lead)
    }

    pub async fn list_leads(
        &self,
        status: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Lead>> {
        let leads = sqlx::query_as::<_, Lead>(
            "SELECT * FROM leads
             WHERE ($1::TEXT IS NULL OR status = $1)
             ORDER BY created_at DESC
             LIMIT $2 OFFSET $3",
        )
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(leads)
    }

    pub async fn count_leads(&self, status: Option<&str>) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM leads WHERE ($1::TEXT IS NULL OR status = $1)",
        )
        .bind(status)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    pub async fn update_lead_status(&self, id: i64, status: &str) -> Result<Option<Lead>> {
        let lead = sqlx::query_as::<_, Lead>(
            "UPDATE leads SET status = $2, updated_at = NOW()
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?;
        Ok(lead)
    }
}
