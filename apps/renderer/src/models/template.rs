use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

use crate::errors::AppError;
use crate::render::builder::BuilderDocument;
use crate::render::canvas::CanvasDocument;
use crate::render::dispatch::RenderMode;

// ────────────────────────────────────────────────────────────────────────────
// Render source
// ────────────────────────────────────────────────────────────────────────────

/// The renderable part of a template, as persisted and as sent inline.
///
/// `render_engine` stays a free string here; it is only checked when the
/// template is turned into a `RenderTemplate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSource {
    #[serde(default = "default_engine")]
    pub render_engine: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub css: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub builder_data: Option<BuilderDocument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canvas_data: Option<CanvasDocument>,
    /// Resume data rendered when a caller supplies none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_data: Option<Value>,
}

fn default_engine() -> String {
    RenderMode::Builder.as_str().to_string()
}

impl Default for TemplateSource {
    fn default() -> Self {
        Self {
            render_engine: default_engine(),
            html: None,
            css: None,
            builder_data: None,
            canvas_data: None,
            sample_data: None,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Catalogue metadata
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[default]
    Professional,
    Creative,
    Minimalist,
    Modern,
    Classic,
    Executive,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Professional => "Professional",
            Category::Creative => "Creative",
            Category::Minimalist => "Minimalist",
            Category::Modern => "Modern",
            Category::Classic => "Classic",
            Category::Executive => "Executive",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Professional" => Ok(Category::Professional),
            "Creative" => Ok(Category::Creative),
            "Minimalist" => Ok(Category::Minimalist),
            "Modern" => Ok(Category::Modern),
            "Classic" => Ok(Category::Classic),
            "Executive" => Ok(Category::Executive),
            other => Err(AppError::Validation(format!("unknown category '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorScheme {
    #[default]
    Light,
    Dark,
    Colorful,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutHint {
    #[default]
    SingleColumn,
    TwoColumn,
    Hybrid,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Simple,
    #[default]
    Moderate,
    Complex,
}

/// Descriptive hints shown in the template gallery. Never affect rendering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TemplateMetadata {
    pub color_scheme: ColorScheme,
    pub layout: LayoutHint,
    pub complexity: Complexity,
}

/// Gallery flags. Stored and echoed, never acted upon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TemplateFlags {
    pub is_active: bool,
    pub is_premium: bool,
    pub is_popular: bool,
    pub is_new: bool,
}

impl Default for TemplateFlags {
    fn default() -> Self {
        Self {
            is_active: true,
            is_premium: false,
            is_popular: false,
            is_new: false,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Records
// ────────────────────────────────────────────────────────────────────────────

/// A stored template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateRecord {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub category: Category,
    #[serde(flatten)]
    pub source: TemplateSource,
    pub tags: Vec<String>,
    pub metadata: TemplateMetadata,
    #[serde(flatten)]
    pub flags: TemplateFlags,
    pub usage_count: i64,
    pub rating_sum: f64,
    pub rating_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TemplateRecord {
    pub fn full_name(&self) -> String {
        format!("{} - {}", self.name, self.category)
    }

    /// Mean rating rounded to one decimal place.
    pub fn average_rating(&self) -> Option<f64> {
        (self.rating_count > 0)
            .then(|| (self.rating_sum / self.rating_count as f64 * 10.0).round() / 10.0)
    }

    /// Gallery order: popular first, then new, then most used, then newest.
    pub fn gallery_order(a: &TemplateRecord, b: &TemplateRecord) -> std::cmp::Ordering {
        b.flags
            .is_popular
            .cmp(&a.flags.is_popular)
            .then(b.flags.is_new.cmp(&a.flags.is_new))
            .then(b.usage_count.cmp(&a.usage_count))
            .then(b.created_at.cmp(&a.created_at))
    }

    pub fn summary(&self) -> TemplateSummary {
        TemplateSummary {
            id: self.id,
            name: self.name.clone(),
            full_name: self.full_name(),
            description: self.description.clone(),
            category: self.category,
            render_engine: self.source.render_engine.clone(),
            tags: self.tags.clone(),
            metadata: self.metadata,
            flags: self.flags,
            usage_count: self.usage_count,
            average_rating: self.average_rating(),
        }
    }
}

/// Gallery listing entry: everything but the payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSummary {
    pub id: Uuid,
    pub name: String,
    pub full_name: String,
    pub description: String,
    pub category: Category,
    pub render_engine: String,
    pub tags: Vec<String>,
    pub metadata: TemplateMetadata,
    #[serde(flatten)]
    pub flags: TemplateFlags,
    pub usage_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_rating: Option<f64>,
}

/// Body of `POST /api/v1/templates`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTemplate {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: Category,
    #[serde(flatten)]
    pub source: TemplateSource,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub metadata: TemplateMetadata,
    #[serde(flatten)]
    pub flags: TemplateFlags,
}

impl NewTemplate {
    /// Rejects blank names and render engines no renderer can handle.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::Validation("name must not be empty".to_string()));
        }
        self.source.render_engine.parse::<RenderMode>()?;
        Ok(())
    }

    pub fn into_record(self, now: DateTime<Utc>) -> TemplateRecord {
        TemplateRecord {
            id: Uuid::new_v4(),
            name: self.name.trim().to_string(),
            description: self.description.trim().to_string(),
            category: self.category,
            source: self.source,
            tags: self
                .tags
                .into_iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
            metadata: self.metadata,
            flags: self.flags,
            usage_count: 0,
            rating_sum: 0.0,
            rating_count: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Listing
// ────────────────────────────────────────────────────────────────────────────

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Query string of `GET /api/v1/templates`. Only active templates are listed.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateQuery {
    pub category: Option<Category>,
    /// Case-insensitive substring of the name, description or any tag.
    pub search: Option<String>,
    pub is_premium: Option<bool>,
    pub is_popular: Option<bool>,
    pub is_new: Option<bool>,
    pub limit: Option<u32>,
    pub page: Option<u32>,
}

impl TemplateQuery {
    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page() - 1) * u64::from(self.limit())
    }

    /// The search term, trimmed, if one was given.
    pub fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn matches(&self, record: &TemplateRecord) -> bool {
        if !record.flags.is_active {
            return false;
        }
        if self.category.is_some_and(|c| c != record.category) {
            return false;
        }
        let flag_filters = [
            (self.is_premium, record.flags.is_premium),
            (self.is_popular, record.flags.is_popular),
            (self.is_new, record.flags.is_new),
        ];
        if flag_filters
            .iter()
            .any(|(wanted, actual)| wanted.is_some_and(|w| w != *actual))
        {
            return false;
        }
        match self.search_term() {
            None => true,
            Some(term) => {
                let term = term.to_lowercase();
                record.name.to_lowercase().contains(&term)
                    || record.description.to_lowercase().contains(&term)
                    || record.tags.iter().any(|t| t.to_lowercase().contains(&term))
            }
        }
    }
}

/// One page of the gallery.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplatePage {
    pub templates: Vec<TemplateSummary>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current: u32,
    /// Number of pages.
    pub total: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn new(query: &TemplateQuery, returned: usize, matched: u64) -> Self {
        let limit = u64::from(query.limit());
        Self {
            current: query.page(),
            total: matched.div_ceil(limit),
            has_next: query.offset() + (returned as u64) < matched,
            has_prev: query.page() > 1,
        }
    }
}

/// Active template count for one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct CategoryCount {
    pub category: String,
    pub count: i64,
}

/// Body of `POST /api/v1/templates/:id/rate`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RatingRequest {
    pub rating: f64,
}

impl RatingRequest {
    pub fn validate(&self) -> Result<f64, AppError> {
        if !(1.0..=5.0).contains(&self.rating) {
            return Err(AppError::Validation(
                "Rating must be between 1 and 5".to_string(),
            ));
        }
        Ok(self.rating)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Database row
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, FromRow)]
pub struct TemplateRow {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub category: String,
    pub render_engine: String,
    pub html: Option<String>,
    pub css: Option<String>,
    pub builder_data: Option<Value>,
    pub canvas_data: Option<Value>,
    pub sample_data: Option<Value>,
    pub tags: Vec<String>,
    pub metadata: Value,
    pub is_active: bool,
    pub is_premium: bool,
    pub is_popular: bool,
    pub is_new: bool,
    pub usage_count: i64,
    pub rating_sum: f64,
    pub rating_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<TemplateRow> for TemplateRecord {
    type Error = AppError;

    fn try_from(row: TemplateRow) -> Result<Self, Self::Error> {
        let decode = |column: &str, e: serde_json::Error| {
            AppError::Internal(anyhow::anyhow!(
                "template {} has malformed {column}: {e}",
                row.id
            ))
        };
        let builder_data = row
            .builder_data
            .clone()
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| decode("builder_data", e))?;
        let canvas_data = row
            .canvas_data
            .clone()
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| decode("canvas_data", e))?;
        let metadata =
            serde_json::from_value(row.metadata.clone()).map_err(|e| decode("metadata", e))?;

        Ok(TemplateRecord {
            id: row.id,
            category: row.category.parse()?,
            source: TemplateSource {
                render_engine: row.render_engine,
                html: row.html,
                css: row.css,
                builder_data,
                canvas_data,
                sample_data: row.sample_data,
            },
            name: row.name,
            description: row.description,
            tags: row.tags,
            metadata,
            flags: TemplateFlags {
                is_active: row.is_active,
                is_premium: row.is_premium,
                is_popular: row.is_popular,
                is_new: row.is_new,
            },
            usage_count: row.usage_count,
            rating_sum: row.rating_sum,
            rating_count: row.rating_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn new_template(body: Value) -> NewTemplate {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_new_template_defaults() {
        let t = new_template(json!({ "name": "Classic", "renderEngine": "html", "html": "<p/>" }));
        assert_eq!(t.category, Category::Professional);
        assert!(t.flags.is_active);
        assert!(!t.flags.is_premium);
        assert_eq!(t.metadata.layout, LayoutHint::SingleColumn);
        assert!(t.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_blank_name() {
        let t = new_template(json!({ "name": "  ", "renderEngine": "html" }));
        assert!(matches!(t.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_validate_rejects_unknown_engine() {
        let t = new_template(json!({ "name": "Old", "renderEngine": "jsx" }));
        assert!(matches!(t.validate(), Err(AppError::Render(_))));
    }

    #[test]
    fn test_engine_defaults_to_builder() {
        let t = new_template(json!({ "name": "Tree" }));
        assert_eq!(t.source.render_engine, "builder");
    }

    #[test]
    fn test_record_serializes_flat() {
        let t = new_template(json!({
            "name": " Modern Blue ",
            "category": "Modern",
            "renderEngine": "canvas",
            "canvasData": { "objects": [] },
            "tags": ["blue", " "],
            "metadata": { "layout": "two-column" },
            "isPremium": true
        }));
        let record = t.into_record(Utc::now());
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["name"], "Modern Blue");
        assert_eq!(json["renderEngine"], "canvas");
        assert_eq!(json["isPremium"], true);
        assert_eq!(json["metadata"]["layout"], "two-column");
        assert_eq!(json["metadata"]["colorScheme"], "light");
        assert_eq!(json["tags"], json!(["blue"]));
        assert_eq!(record.full_name(), "Modern Blue - Modern");
    }

    #[test]
    fn test_average_rating() {
        let mut record = new_template(json!({ "name": "A" })).into_record(Utc::now());
        assert_eq!(record.average_rating(), None);
        record.rating_sum = 9.0;
        record.rating_count = 2;
        assert_eq!(record.summary().average_rating, Some(4.5));
        record.rating_sum = 13.0;
        record.rating_count = 3;
        assert_eq!(record.average_rating(), Some(4.3));
    }

    #[test]
    fn test_row_conversion() {
        let now = Utc::now();
        let row = TemplateRow {
            id: Uuid::new_v4(),
            name: "Row".into(),
            description: String::new(),
            category: "Executive".into(),
            render_engine: "builder".into(),
            html: None,
            css: None,
            builder_data: Some(json!({ "components": [{ "type": "name" }], "style": "" })),
            canvas_data: None,
            sample_data: None,
            tags: vec![],
            metadata: json!({}),
            is_active: true,
            is_premium: false,
            is_popular: true,
            is_new: false,
            usage_count: 3,
            rating_sum: 0.0,
            rating_count: 0,
            created_at: now,
            updated_at: now,
        };
        let record = TemplateRecord::try_from(row).unwrap();
        assert_eq!(record.category, Category::Executive);
        assert_eq!(record.source.builder_data.unwrap().components[0].tag_name, "div");
        assert!(record.flags.is_popular);
    }

    fn record(body: Value) -> TemplateRecord {
        new_template(body).into_record(Utc::now())
    }

    #[test]
    fn test_query_filters() {
        let mut resume = record(json!({
            "name": "Chemist",
            "description": "Lab focused",
            "category": "Classic",
            "tags": ["Science"]
        }));
        let query = TemplateQuery {
            search: Some(" science ".into()),
            ..Default::default()
        };
        assert!(query.matches(&resume));

        let query = TemplateQuery {
            category: Some(Category::Modern),
            ..Default::default()
        };
        assert!(!query.matches(&resume));

        let query = TemplateQuery {
            is_premium: Some(false),
            ..Default::default()
        };
        assert!(query.matches(&resume));

        resume.flags.is_active = false;
        assert!(!TemplateQuery::default().matches(&resume));
    }

    #[test]
    fn test_query_paging_bounds() {
        let query = TemplateQuery {
            limit: Some(500),
            page: Some(0),
            ..Default::default()
        };
        assert_eq!(query.limit(), MAX_PAGE_SIZE);
        assert_eq!(query.page(), 1);
        assert_eq!(query.offset(), 0);

        let query = TemplateQuery {
            limit: Some(2),
            page: Some(2),
            ..Default::default()
        };
        let pagination = Pagination::new(&query, 2, 5);
        assert_eq!(pagination.total, 3);
        assert!(pagination.has_next);
        assert!(pagination.has_prev);
    }

    #[test]
    fn test_gallery_order() {
        let mut popular = record(json!({ "name": "Popular" }));
        popular.flags.is_popular = true;
        let mut used = record(json!({ "name": "Used" }));
        used.usage_count = 40;
        let plain = record(json!({ "name": "Plain" }));

        let mut all = vec![plain, used, popular];
        all.sort_by(TemplateRecord::gallery_order);
        let names: Vec<_> = all.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["Popular", "Used", "Plain"]);
    }

    #[test]
    fn test_rating_bounds() {
        assert!(RatingRequest { rating: 0.5 }.validate().is_err());
        assert!(RatingRequest { rating: 5.5 }.validate().is_err());
        assert_eq!(RatingRequest { rating: 4.0 }.validate().unwrap(), 4.0);
    }
}
