//! Persistence seams for leads, reviews and the service catalog.
//!
//! Handlers only see these traits. `PgStore` (in `db_storage`) backs them
//! in production; `MemoryStore` backs tests and `STORAGE=memory` runs.

use async_trait::async_trait;
use chrono::Utc;
use moka::future::Cache;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::errors::AppError;
use crate::models::{Lead, NewLead, NewReview, Review, Service};

#[async_trait]
pub trait LeadStore: Send + Sync {
    /// Persists a validated lead with status `New`.
    async fn insert_lead(&self, lead: NewLead) -> Result<Lead, AppError>;
}

#[async_trait]
pub trait ServiceCatalog: Send + Sync {
    /// Returns the service only if it exists and is published.
    async fn find_published_service(&self, id: i64) -> Result<Option<Service>, AppError>;

    /// Published services ordered by (order, title).
    async fn list_published_services(&self) -> Result<Vec<Service>, AppError>;
}

#[async_trait]
pub trait ReviewStore: Send + Sync {
    async fn insert_review(&self, review: NewReview) -> Result<Review, AppError>;
}

// ============ In-memory backend ============

#[derive(Default)]
pub struct MemoryStore {
    next_id: AtomicI64,
    services: Mutex<Vec<Service>>,
    leads: Mutex<Vec<Lead>>,
    reviews: Mutex<Vec<Review>>,
}

fn poisoned<T>(_: T) -> AppError {
    AppError::InternalError("memory store lock poisoned".to_string())
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_services(services: Vec<Service>) -> Self {
        let store = Self::new();
        if let Ok(mut guard) = store.services.lock() {
            *guard = services;
        }
        store
    }

    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Snapshot of persisted leads, oldest first.
    pub fn leads(&self) -> Vec<Lead> {
        self.leads.lock().map(|l| l.clone()).unwrap_or_default()
    }

    pub fn reviews(&self) -> Vec<Review> {
        self.reviews.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LeadStore for MemoryStore {
    async fn insert_lead(&self, lead: NewLead) -> Result<Lead, AppError> {
        let lead = Lead::from_new(self.next_id(), lead, Utc::now());
        self.leads.lock().map_err(poisoned)?.push(lead.clone());
        Ok(lead)
    }
}

#[async_trait]
impl ServiceCatalog for MemoryStore {
    async fn find_published_service(&self, id: i64) -> Result<Option<Service>, AppError> {
        let services = self.services.lock().map_err(poisoned)?;
        Ok(services
            .iter()
            .find(|s| s.id == id && s.is_published)
            .cloned())
    }

    async fn list_published_services(&self) -> Result<Vec<Service>, AppError> {
        let mut published: Vec<Service> = self
            .services
            .lock()
            .map_err(poisoned)?
            .iter()
            .filter(|s| s.is_published)
            .cloned()
            .collect();
        published.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.title.cmp(&b.title)));
        Ok(published)
    }
}

#[async_trait]
impl ReviewStore for MemoryStore {
    async fn insert_review(&self, review: NewReview) -> Result<Review, AppError> {
        let review = Review::from_new(self.next_id(), review, Utc::now());
        self.reviews.lock().map_err(poisoned)?.push(review.clone());
        Ok(review)
    }
}

// ============ Catalog cache ============

/// TTL cache in front of a catalog. Lead submissions resolve the same few
/// services over and over.
pub struct CachedCatalog {
    inner: Arc<dyn ServiceCatalog>,
    by_id: Cache<i64, Option<Service>>,
    published: Cache<(), Vec<Service>>,
}

impl CachedCatalog {
    pub fn new(inner: Arc<dyn ServiceCatalog>, ttl: Duration) -> Self {
        Self {
            inner,
            by_id: Cache::builder().time_to_live(ttl).max_capacity(1_000).build(),
            published: Cache::builder().time_to_live(ttl).max_capacity(1).build(),
        }
    }
}

#[async_trait]
impl ServiceCatalog for CachedCatalog {
    async fn find_published_service(&self, id: i64) -> Result<Option<Service>, AppError> {
        if let Some(cached) = self.by_id.get(&id).await {
            tracing::debug!("Service cache hit: id={}", id);
            return Ok(cached);
        }

        let service = self.inner.find_published_service(id).await?;
        self.by_id.insert(id, service.clone()).await;
        Ok(service)
    }

    async fn list_published_services(&self) -> Result<Vec<Service>, AppError> {
        if let Some(cached) = self.published.get(&()).await {
            return Ok(cached);
        }

        let services = self.inner.list_published_services().await?;
        self.published.insert((), services.clone()).await;
        Ok(services)
    }
}
