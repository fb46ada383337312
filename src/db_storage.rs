use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, PgPool, Row};

use crate::errors::{AppError, ResultExt};
use crate::models::{Lead, LeadStatus, NewLead, NewReview, Review, Service, ServiceCategory};
use crate::store::{LeadStore, ReviewStore, ServiceCatalog};

/// PostgreSQL-backed storage for leads, reviews and the catalog.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn service_from_row(row: &PgRow) -> Result<Service, sqlx::Error> {
    let category: String = row.try_get("category")?;
    Ok(Service {
        id: row.try_get("id")?,
        category: ServiceCategory::from_db(&category),
        title: row.try_get("title")?,
        slug: row.try_get("slug")?,
        short_desc: row.try_get("short_desc")?,
        price_from: row.try_get("price_from")?,
        order: row.try_get("sort_order")?,
        is_published: row.try_get("is_published")?,
    })
}

#[async_trait]
impl LeadStore for PgStore {
    async fn insert_lead(&self, lead: NewLead) -> Result<Lead, AppError> {
        let row = sqlx::query(
            r#"
            INSERT INTO leads (
                name, phone, phone_e164, message, service_id, lang, status,
                utm_source, utm_medium, utm_campaign
            )
            VALUES ($1, $2, $3, $4, $5, $6, 'new', $7, $8, $9)
            RETURNING id, status, created_at
            "#,
        )
        .bind(&lead.name)
        .bind(&lead.phone)
        .bind(&lead.phone_e164)
        .bind(&lead.message)
        .bind(lead.service_id)
        .bind(lead.lang.as_str())
        .bind(&lead.utm_source)
        .bind(&lead.utm_medium)
        .bind(&lead.utm_campaign)
        .fetch_one(&self.pool)
        .await
        .context("Failed to insert lead")?;

        let id: i64 = row.try_get("id")?;
        let created_at: DateTime<Utc> = row.try_get("created_at")?;
        let status: String = row.try_get("status")?;
        let status = LeadStatus::from_db(&status)
            .ok_or_else(|| AppError::InternalError(format!("Unknown lead status: {}", status)))?;

        tracing::debug!("Stored lead id={}", id);
        let mut stored = Lead::from_new(id, lead, created_at);
        stored.status = status;
        Ok(stored)
    }
}

#[async_trait]
impl ServiceCatalog for PgStore {
    async fn find_published_service(&self, id: i64) -> Result<Option<Service>, AppError> {
        let row = sqlx::query(
            r#"
            SELECT id, category, title, slug, short_desc, price_from, sort_order, is_published
            FROM services
            WHERE id = $1 AND is_published
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(service_from_row).transpose()?)
    }

    async fn list_published_services(&self) -> Result<Vec<Service>, AppError> {
        let rows = sqlx::query(
            r#"
            SELECT id, category, title, slug, short_desc, price_from, sort_order, is_published
            FROM services
            WHERE is_published
            ORDER BY sort_order, title
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(service_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }
}

#[async_trait]
impl ReviewStore for PgStore {
    async fn insert_review(&self, review: NewReview) -> Result<Review, AppError> {
        let row = sqlx::query(
            r#"
            INSERT INTO reviews (author, rating, text, source, source_url, is_published)
            VALUES ($1, $2, $3, $4, $5, FALSE)
            RETURNING id, created_at
            "#,
        )
        .bind(&review.author)
        .bind(review.rating as i16)
        .bind(&review.text)
        .bind(review.source.as_str())
        .bind(&review.source_url)
        .fetch_one(&self.pool)
        .await
        .context("Failed to insert review")?;

        let id: i64 = row.try_get("id")?;
        let created_at: DateTime<Utc> = row.try_get("created_at")?;

        tracing::debug!("Stored review id={} (pending moderation)", id);
        Ok(Review::from_new(id, review, created_at))
    }
}
