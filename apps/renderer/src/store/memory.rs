use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::template::{CategoryCount, TemplateQuery, TemplateRecord};
use crate::store::TemplateStore;

/// Process-local store. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryTemplateStore {
    templates: RwLock<HashMap<Uuid, TemplateRecord>>,
}

impl MemoryTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn with_templates(records: impl IntoIterator<Item = TemplateRecord>) -> Self {
        Self {
            templates: RwLock::new(records.into_iter().map(|r| (r.id, r)).collect()),
        }
    }
}

#[async_trait]
impl TemplateStore for MemoryTemplateStore {
    async fn list(&self, query: &TemplateQuery) -> Result<(Vec<TemplateRecord>, u64), AppError> {
        let templates = self.templates.read().await;
        let mut matched: Vec<&TemplateRecord> =
            templates.values().filter(|r| query.matches(r)).collect();
        matched.sort_by(|a, b| TemplateRecord::gallery_order(a, b));

        let total = matched.len() as u64;
        let page = matched
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.limit() as usize)
            .cloned()
            .collect();
        Ok((page, total))
    }

    async fn categories(&self) -> Result<Vec<CategoryCount>, AppError> {
        let templates = self.templates.read().await;
        let mut counts: BTreeMap<&'static str, i64> = BTreeMap::new();
        for record in templates.values().filter(|r| r.flags.is_active) {
            *counts.entry(record.category.as_str()).or_default() += 1;
        }
        let mut counts: Vec<CategoryCount> = counts
            .into_iter()
            .map(|(category, count)| CategoryCount {
                category: category.to_string(),
                count,
            })
            .collect();
        counts.sort_by(|a, b| b.count.cmp(&a.count));
        Ok(counts)
    }

    async fn get(&self, id: Uuid) -> Result<Option<TemplateRecord>, AppError> {
        Ok(self.templates.read().await.get(&id).cloned())
    }

    async fn insert(&self, record: TemplateRecord) -> Result<TemplateRecord, AppError> {
        self.templates
            .write()
            .await
            .insert(record.id, record.clone());
        info!("Stored template {} ({})", record.id, record.name);
        Ok(record)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        Ok(self.templates.write().await.remove(&id).is_some())
    }

    async fn record_usage(&self, id: Uuid) -> Result<bool, AppError> {
        let mut templates = self.templates.write().await;
        Ok(match templates.get_mut(&id) {
            Some(record) => {
                record.usage_count += 1;
                true
            }
            None => false,
        })
    }

    async fn add_rating(&self, id: Uuid, rating: f64) -> Result<Option<TemplateRecord>, AppError> {
        let mut templates = self.templates.write().await;
        Ok(templates.get_mut(&id).map(|record| {
            record.rating_sum += rating;
            record.rating_count += 1;
            record.updated_at = Utc::now();
            record.clone()
        }))
    }
}
