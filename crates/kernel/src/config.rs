//! Configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::content::references::MissingReferencePolicy;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL. When None, commands run against an
    /// in-memory store.
    pub database_url: Option<String>,

    /// Maximum database connections in pool (default: 10).
    pub database_max_connections: u32,

    /// Base URL of the site pages are exported from.
    pub source_site_url: Option<String>,

    /// Staging directory for interchange files (default: ./page_templates).
    pub page_templates_dir: PathBuf,

    /// Path to uploads directory (default: ./uploads).
    pub uploads_dir: PathBuf,

    /// Base URL for serving uploaded files (default: /media).
    pub files_url: String,

    /// Locale given to pages created without one (default: fr).
    pub default_locale: String,

    /// What to do with source references that have no local counterpart.
    pub missing_references: MissingReferencePolicy,

    /// Timeout for requests to the source site (default: 30s).
    pub http_timeout: Duration,

    /// Word limit when pre-filling search descriptions (default: 20).
    pub search_description_words: usize,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let database_url = var("DATABASE_URL").filter(|v| !v.trim().is_empty());

        let database_max_connections = var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|| "10".to_string())
            .parse()
            .context("DATABASE_MAX_CONNECTIONS must be a valid u32")?;

        let source_site_url = var("SOURCE_SITE_URL")
            .map(|v| v.trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty());

        let page_templates_dir = var("PAGE_TEMPLATES_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./page_templates"));

        let uploads_dir = var("UPLOADS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./uploads"));

        let files_url = var("FILES_URL").unwrap_or_else(|| "/media".to_string());

        let default_locale = var("DEFAULT_LOCALE").unwrap_or_else(|| "fr".to_string());

        let missing_references = match var("IMPORT_MISSING_REFERENCES") {
            Some(v) => v
                .parse()
                .context("IMPORT_MISSING_REFERENCES must be 'strict' or 'lenient'")?,
            None => MissingReferencePolicy::default(),
        };

        let http_timeout = var("HTTP_TIMEOUT_SECS")
            .unwrap_or_else(|| "30".to_string())
            .parse()
            .map(Duration::from_secs)
            .context("HTTP_TIMEOUT_SECS must be a valid u64")?;

        let search_description_words = var("SEARCH_DESCRIPTION_WORDS")
            .unwrap_or_else(|| "20".to_string())
            .parse()
            .context("SEARCH_DESCRIPTION_WORDS must be a valid usize")?;

        Ok(Self {
            database_url,
            database_max_connections,
            source_site_url,
            page_templates_dir,
            uploads_dir,
            files_url,
            default_locale,
            missing_references,
            http_timeout,
            search_description_words,
        })
    }

    /// Source site URL, or an error naming the missing variable.
    pub fn require_source_site(&self) -> Result<&str> {
        self.source_site_url
            .as_deref()
            .context("SOURCE_SITE_URL environment variable is required")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            database_max_connections: 10,
            source_site_url: None,
            page_templates_dir: PathBuf::from("./page_templates"),
            uploads_dir: PathBuf::from("./uploads"),
            files_url: "/media".to_string(),
            default_locale: "fr".to_string(),
            missing_references: MissingReferencePolicy::default(),
            http_timeout: Duration::from_secs(30),
            search_description_words: 20,
        }
    }
}
