//! Template persistence.
//!
//! Handlers only see the `TemplateStore` trait. `PgTemplateStore` is used when
//! `DATABASE_URL` is set; `MemoryTemplateStore` otherwise and in tests.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::template::{CategoryCount, TemplateQuery, TemplateRecord};

pub use memory::MemoryTemplateStore;
pub use postgres::PgTemplateStore;

#[async_trait]
pub trait TemplateStore: Send + Sync {
    /// One page of active templates in gallery order, plus the total number
    /// of matches across all pages.
    async fn list(&self, query: &TemplateQuery) -> Result<(Vec<TemplateRecord>, u64), AppError>;

    /// Active template counts per category, largest first.
    async fn categories(&self) -> Result<Vec<CategoryCount>, AppError>;

    /// Any template with this id, active or not.
    async fn get(&self, id: Uuid) -> Result<Option<TemplateRecord>, AppError>;

    async fn insert(&self, record: TemplateRecord) -> Result<TemplateRecord, AppError>;

    /// Returns false when nothing was deleted.
    async fn delete(&self, id: Uuid) -> Result<bool, AppError>;

    /// Bumps `usage_count` by one. Returns false when the id is unknown.
    async fn record_usage(&self, id: Uuid) -> Result<bool, AppError>;

    /// Adds one rating. Returns the updated record, or None when the id is unknown.
    async fn add_rating(&self, id: Uuid, rating: f64) -> Result<Option<TemplateRecord>, AppError>;
}
