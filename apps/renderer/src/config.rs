use anyhow::{Context, Result};

use crate::render::canvas::LayoutOptions;

/// Application configuration loaded from environment variables.
/// Fails at startup if a variable is present but malformed.
#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string. Without it templates live in memory.
    pub database_url: Option<String>,
    pub port: u16,
    pub rust_log: String,
    pub canvas_width: f64,
    pub canvas_height: f64,
    pub canvas_margin: f64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: std::env::var("DATABASE_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            canvas_width: dimension_env("CANVAS_WIDTH", 800.0)?,
            canvas_height: dimension_env("CANVAS_HEIGHT", 1000.0)?,
            canvas_margin: dimension_env("CANVAS_MARGIN", 20.0)?,
        })
    }

    pub fn layout_options(&self) -> LayoutOptions {
        LayoutOptions {
            canvas_width: self.canvas_width,
            canvas_height: self.canvas_height,
            margin: self.canvas_margin,
            ..LayoutOptions::default()
        }
    }
}

fn dimension_env(key: &str, default: f64) -> Result<f64> {
    match std::env::var(key) {
        Ok(raw) => parse_dimension(key, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_dimension(key: &str, raw: &str) -> Result<f64> {
    let value = raw
        .trim()
        .parse::<f64>()
        .with_context(|| format!("{key} must be a number, got '{raw}'"))?;
    anyhow::ensure!(
        value.is_finite() && value >= 0.0,
        "{key} must be a non-negative number"
    );
    Ok(value)
}
