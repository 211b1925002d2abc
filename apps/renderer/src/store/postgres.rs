use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::template::{CategoryCount, TemplateQuery, TemplateRecord, TemplateRow};
use crate::store::TemplateStore;

/// Templates persisted in the `templates` table (see `db::ensure_schema`).
#[derive(Debug, Clone)]
pub struct PgTemplateStore {
    pool: PgPool,
}

impl PgTemplateStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Appends the WHERE clause shared by the page query and the count query.
fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &TemplateQuery) {
    builder.push(" WHERE is_active = TRUE");
    if let Some(category) = query.category {
        builder.push(" AND category = ").push_bind(category.as_str());
    }
    if let Some(v) = query.is_premium {
        builder.push(" AND is_premium = ").push_bind(v);
    }
    if let Some(v) = query.is_popular {
        builder.push(" AND is_popular = ").push_bind(v);
    }
    if let Some(v) = query.is_new {
        builder.push(" AND is_new = ").push_bind(v);
    }
    if let Some(term) = query.search_term() {
        let pattern = format!("%{}%", escape_like(term));
        builder
            .push(" AND (name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR EXISTS (SELECT 1 FROM unnest(tags) AS tag WHERE tag ILIKE ")
            .push_bind(pattern)
            .push("))");
    }
}

/// Escapes LIKE wildcards so the search term matches literally.
fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[async_trait]
impl TemplateStore for PgTemplateStore {
    async fn list(&self, query: &TemplateQuery) -> Result<(Vec<TemplateRecord>, u64), AppError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM templates");
        push_filters(&mut count, query);
        let total: i64 = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let mut page = QueryBuilder::<Postgres>::new("SELECT * FROM templates");
        push_filters(&mut page, query);
        page.push(" ORDER BY is_popular DESC, is_new DESC, usage_count DESC, created_at DESC")
            .push(" LIMIT ")
            .push_bind(i64::from(query.limit()))
            .push(" OFFSET ")
            .push_bind(query.offset() as i64);
        let rows = page
            .build_query_as::<TemplateRow>()
            .fetch_all(&self.pool)
            .await?;

        let records = rows
            .into_iter()
            .map(TemplateRecord::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((records, total.max(0) as u64))
    }

    async fn categories(&self) -> Result<Vec<CategoryCount>, AppError> {
        Ok(sqlx::query_as::<_, CategoryCount>(
            r#"
            SELECT category, COUNT(*) AS count
            FROM templates
            WHERE is_active = TRUE
            GROUP BY category
            ORDER BY count DESC, category ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn get(&self, id: Uuid) -> Result<Option<TemplateRecord>, AppError> {
        sqlx::query_as::<_, TemplateRow>("SELECT * FROM templates WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(TemplateRecord::try_from)
            .transpose()
    }

    async fn insert(&self, record: TemplateRecord) -> Result<TemplateRecord, AppError> {
        let builder_data = record
            .source
            .builder_data
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(anyhow::Error::from)?;
        let canvas_data = record
            .source
            .canvas_data
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(anyhow::Error::from)?;
        let metadata = serde_json::to_value(record.metadata).map_err(anyhow::Error::from)?;

        sqlx::query(
            r#"
            INSERT INTO templates
                (id, name, description, category, render_engine, html, css,
                 builder_data, canvas_data, sample_data, tags, metadata,
                 is_active, is_premium, is_popular, is_new,
                 usage_count, rating_sum, rating_count, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12,
                    $13, $14, $15, $16, $17, $18, $19, $20, $21)
            "#,
        )
        .bind(record.id)
        .bind(&record.name)
        .bind(&record.description)
        .bind(record.category.as_str())
        .bind(&record.source.render_engine)
        .bind(&record.source.html)
        .bind(&record.source.css)
        .bind(builder_data)
        .bind(canvas_data)
        .bind(&record.source.sample_data)
        .bind(&record.tags)
        .bind(metadata)
        .bind(record.flags.is_active)
        .bind(record.flags.is_premium)
        .bind(record.flags.is_popular)
        .bind(record.flags.is_new)
        .bind(record.usage_count)
        .bind(record.rating_sum)
        .bind(record.rating_count)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;

        info!("Inserted template {} ({})", record.id, record.name);
        Ok(record)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM templates WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn record_usage(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE templates SET usage_count = usage_count + 1 WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn add_rating(&self, id: Uuid, rating: f64) -> Result<Option<TemplateRecord>, AppError> {
        sqlx::query_as::<_, TemplateRow>(
            r#"
            UPDATE templates
            SET rating_sum = rating_sum + $2,
                rating_count = rating_count + 1,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(rating)
        .fetch_optional(&self.pool)
        .await?
        .map(TemplateRecord::try_from)
        .transpose()
    }
}
