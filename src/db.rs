use sqlx::{postgres::PgPoolOptions, PgPool};

const SCHEMA: &str = include_str!("../migrations/0001_init.sql");

pub struct Database {
    pub pool: PgPool,
}

impl Database {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;

        // Schema statements are idempotent (IF NOT EXISTS)
        sqlx::raw_sql(SCHEMA).execute(&pool).await?;
        tracing::debug!("Database schema ensured");

        Ok(Self { pool })
    }
}
