use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};
use tracing::info;

/// Creates and returns a PostgreSQL connection pool.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    info!("PostgreSQL connection pool established");
    Ok(pool)
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS templates (
    id            UUID PRIMARY KEY,
    name          TEXT NOT NULL,
    description   TEXT NOT NULL DEFAULT '',
    category      TEXT NOT NULL DEFAULT 'Professional',
    render_engine TEXT NOT NULL DEFAULT 'builder',
    html          TEXT,
    css           TEXT,
    builder_data  JSONB,
    canvas_data   JSONB,
    sample_data   JSONB,
    tags          TEXT[] NOT NULL DEFAULT '{}',
    metadata      JSONB NOT NULL DEFAULT '{}'::jsonb,
    is_active     BOOLEAN NOT NULL DEFAULT TRUE,
    is_premium    BOOLEAN NOT NULL DEFAULT FALSE,
    is_popular    BOOLEAN NOT NULL DEFAULT FALSE,
    is_new        BOOLEAN NOT NULL DEFAULT FALSE,
    usage_count   BIGINT NOT NULL DEFAULT 0,
    rating_sum    DOUBLE PRECISION NOT NULL DEFAULT 0,
    rating_count  BIGINT NOT NULL DEFAULT 0,
    created_at    TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at    TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
CREATE INDEX IF NOT EXISTS templates_category_active_idx ON templates (category, is_active);
CREATE INDEX IF NOT EXISTS templates_popular_active_idx ON templates (is_popular, is_active);
"#;

/// Creates the `templates` table and its indexes if they do not exist yet.
pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
    pool.execute(SCHEMA).await?;
    info!("Template schema ready");
    Ok(())
}
