//! PostgreSQL store.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::{debug, info};
use uuid::Uuid;

use super::{MediaStore, PageStore};
use crate::config::Config;
use crate::models::{ImageRecord, NewImage, PageRecord, PageRevision};

const PAGE_COLUMNS: &str = "id, parent_id, slug, title, locale, status, body, header_image, header_with_title, header_color_class, header_large, header_darken, header_cta_text, search_description, source_url, restriction_type, live_revision_id, schema_fingerprint, created, changed";

const REVISION_COLUMNS: &str = "id, page_id, title, body, created, log";

const IMAGE_COLUMNS: &str = "id, title, filename, uri, file_hash, collection, created";

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS page (
        id UUID PRIMARY KEY,
        parent_id UUID REFERENCES page(id) ON DELETE CASCADE,
        slug VARCHAR(255) NOT NULL,
        title VARCHAR(255) NOT NULL,
        locale VARCHAR(12) NOT NULL DEFAULT 'fr',
        status SMALLINT NOT NULL DEFAULT 1,
        body JSONB NOT NULL DEFAULT '[]',
        header_image BIGINT,
        header_with_title BOOLEAN NOT NULL DEFAULT FALSE,
        header_color_class VARCHAR(64),
        header_large BOOLEAN NOT NULL DEFAULT FALSE,
        header_darken BOOLEAN NOT NULL DEFAULT FALSE,
        header_cta_text VARCHAR(255),
        search_description TEXT NOT NULL DEFAULT '',
        source_url TEXT,
        restriction_type VARCHAR(32),
        live_revision_id UUID,
        schema_fingerprint VARCHAR(64) NOT NULL DEFAULT '',
        created BIGINT NOT NULL,
        changed BIGINT NOT NULL,
        UNIQUE (slug, locale)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS page_parent_idx ON page (parent_id)",
    "CREATE INDEX IF NOT EXISTS page_source_url_idx ON page (source_url)",
    r#"
    CREATE TABLE IF NOT EXISTS page_revision (
        id UUID PRIMARY KEY,
        page_id UUID NOT NULL REFERENCES page(id) ON DELETE CASCADE,
        title VARCHAR(255) NOT NULL,
        body JSONB NOT NULL,
        created BIGINT NOT NULL,
        log TEXT
    )
    "#,
    "CREATE INDEX IF NOT EXISTS page_revision_page_idx ON page_revision (page_id)",
    r#"
    CREATE TABLE IF NOT EXISTS image (
        id BIGSERIAL PRIMARY KEY,
        title VARCHAR(255) NOT NULL,
        filename VARCHAR(255) NOT NULL,
        uri TEXT NOT NULL,
        file_hash VARCHAR(64) NOT NULL,
        collection VARCHAR(64) NOT NULL DEFAULT 'root',
        created BIGINT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS image_file_hash_idx ON image (file_hash)",
];

/// Store backed by a PostgreSQL pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect using the configured database URL.
    pub async fn connect(config: &Config) -> Result<Self> {
        let database_url = config
            .database_url
            .as_deref()
            .context("DATABASE_URL environment variable is required")?;
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .connect(database_url)
            .await
            .context("failed to connect to PostgreSQL")?;

        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create tables and indexes that do not exist yet.
    pub async fn ensure_schema(&self) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("failed to start transaction")?;
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&mut *tx)
                .await
                .context("failed to create schema")?;
        }
        tx.commit().await.context("failed to commit schema")?;

        info!("database schema ready");
        Ok(())
    }
}

#[async_trait]
impl PageStore for PgStore {
    async fn find_page(&self, id: Uuid) -> Result<Option<PageRecord>> {
        let page = sqlx::query_as::<_, PageRecord>(&format!(
            "SELECT {PAGE_COLUMNS} FROM page WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("failed to fetch page by id")?;

        Ok(page)
    }

    async fn find_by_slug(&self, slug: &str, locale: &str) -> Result<Option<PageRecord>> {
        let page = sqlx::query_as::<_, PageRecord>(&format!(
            "SELECT {PAGE_COLUMNS} FROM page WHERE slug = $1 AND locale = $2"
        ))
        .bind(slug)
        .bind(locale)
        .fetch_optional(&self.pool)
        .await
        .context("failed to fetch page by slug")?;

        Ok(page)
    }

    async fn find_by_source_url(&self, source_url: &str) -> Result<Option<PageRecord>> {
        let page = sqlx::query_as::<_, PageRecord>(&format!(
            "SELECT {PAGE_COLUMNS} FROM page WHERE source_url = $1 ORDER BY created, id LIMIT 1"
        ))
        .bind(source_url)
        .fetch_optional(&self.pool)
        .await
        .context("failed to fetch page by source url")?;

        Ok(page)
    }

    async fn root_page(&self, locale: &str) -> Result<Option<PageRecord>> {
        let page = sqlx::query_as::<_, PageRecord>(&format!(
            "SELECT {PAGE_COLUMNS} FROM page WHERE parent_id IS NULL AND locale = $1 ORDER BY created, id LIMIT 1"
        ))
        .bind(locale)
        .fetch_optional(&self.pool)
        .await
        .context("failed to fetch root page")?;

        Ok(page)
    }

    async fn children(&self, parent_id: Uuid) -> Result<Vec<PageRecord>> {
        let pages = sqlx::query_as::<_, PageRecord>(&format!(
            "SELECT {PAGE_COLUMNS} FROM page WHERE parent_id = $1 ORDER BY created, id"
        ))
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await
        .context("failed to list child pages")?;

        Ok(pages)
    }

    async fn insert_page(&self, page: &PageRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO page (id, parent_id, slug, title, locale, status, body, header_image, header_with_title, header_color_class, header_large, header_darken, header_cta_text, search_description, source_url, restriction_type, live_revision_id, schema_fingerprint, created, changed)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
            "#,
        )
        .bind(page.id)
        .bind(page.parent_id)
        .bind(&page.slug)
        .bind(&page.title)
        .bind(&page.locale)
        .bind(page.status)
        .bind(&page.body)
        .bind(page.header.header_image)
        .bind(page.header.header_with_title)
        .bind(&page.header.header_color_class)
        .bind(page.header.header_large)
        .bind(page.header.header_darken)
        .bind(&page.header.header_cta_text)
        .bind(&page.search_description)
        .bind(&page.source_url)
        .bind(&page.restriction_type)
        .bind(page.live_revision_id)
        .bind(&page.schema_fingerprint)
        .bind(page.created)
        .bind(page.changed)
        .execute(&self.pool)
        .await
        .context("failed to insert page")?;

        debug!(page_id = %page.id, slug = %page.slug, "page inserted");
        Ok(())
    }

    async fn update_page(&self, page: &PageRecord) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE page SET parent_id = $2, slug = $3, title = $4, locale = $5, status = $6, body = $7,
                header_image = $8, header_with_title = $9, header_color_class = $10, header_large = $11,
                header_darken = $12, header_cta_text = $13, search_description = $14, source_url = $15,
                restriction_type = $16, live_revision_id = $17, schema_fingerprint = $18, changed = $19
            WHERE id = $1
            "#,
        )
        .bind(page.id)
        .bind(page.parent_id)
        .bind(&page.slug)
        .bind(&page.title)
        .bind(&page.locale)
        .bind(page.status)
        .bind(&page.body)
        .bind(page.header.header_image)
        .bind(page.header.header_with_title)
        .bind(&page.header.header_color_class)
        .bind(page.header.header_large)
        .bind(page.header.header_darken)
        .bind(&page.header.header_cta_text)
        .bind(&page.search_description)
        .bind(&page.source_url)
        .bind(&page.restriction_type)
        .bind(page.live_revision_id)
        .bind(&page.schema_fingerprint)
        .bind(page.changed)
        .execute(&self.pool)
        .await
        .context("failed to update page")?;

        if result.rows_affected() == 0 {
            anyhow::bail!("page {} not found", page.id);
        }
        Ok(())
    }

    async fn delete_page(&self, id: Uuid) -> Result<bool> {
        // Descendants and revisions go through ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM page WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("failed to delete page")?;

        Ok(result.rows_affected() > 0)
    }

    async fn save_revision(&self, revision: &PageRevision) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO page_revision (id, page_id, title, body, created, log)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(revision.id)
        .bind(revision.page_id)
        .bind(&revision.title)
        .bind(&revision.body)
        .bind(revision.created)
        .bind(&revision.log)
        .execute(&self.pool)
        .await
        .context("failed to insert page revision")?;

        Ok(())
    }

    async fn find_revision(&self, id: Uuid) -> Result<Option<PageRevision>> {
        let revision = sqlx::query_as::<_, PageRevision>(&format!(
            "SELECT {REVISION_COLUMNS} FROM page_revision WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("failed to fetch page revision")?;

        Ok(revision)
    }

    async fn revisions(&self, page_id: Uuid) -> Result<Vec<PageRevision>> {
        let revisions = sqlx::query_as::<_, PageRevision>(&format!(
            "SELECT {REVISION_COLUMNS} FROM page_revision WHERE page_id = $1 ORDER BY created DESC, id DESC"
        ))
        .bind(page_id)
        .fetch_all(&self.pool)
        .await
        .context("failed to list page revisions")?;

        Ok(revisions)
    }
}

#[async_trait]
impl MediaStore for PgStore {
    async fn find_image(&self, id: i64) -> Result<Option<ImageRecord>> {
        let image = sqlx::query_as::<_, ImageRecord>(&format!(
            "SELECT {IMAGE_COLUMNS} FROM image WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("failed to fetch image by id")?;

        Ok(image)
    }

    async fn find_image_by_hash(&self, file_hash: &str) -> Result<Option<ImageRecord>> {
        let image = sqlx::query_as::<_, ImageRecord>(&format!(
            "SELECT {IMAGE_COLUMNS} FROM image WHERE file_hash = $1 ORDER BY id LIMIT 1"
        ))
        .bind(file_hash)
        .fetch_optional(&self.pool)
        .await
        .context("failed to fetch image by hash")?;

        Ok(image)
    }

    async fn find_image_by_title(&self, title: &str) -> Result<Option<ImageRecord>> {
        let image = sqlx::query_as::<_, ImageRecord>(&format!(
            "SELECT {IMAGE_COLUMNS} FROM image WHERE title = $1 ORDER BY id LIMIT 1"
        ))
        .bind(title)
        .fetch_optional(&self.pool)
        .await
        .context("failed to fetch image by title")?;

        Ok(image)
    }

    async fn insert_image(&self, image: NewImage) -> Result<ImageRecord> {
        let record = image.into_record(0);
        let inserted = sqlx::query_as::<_, ImageRecord>(&format!(
            "INSERT INTO image (title, filename, uri, file_hash, collection, created) VALUES ($1, $2, $3, $4, $5, $6) RETURNING {IMAGE_COLUMNS}"
        ))
        .bind(&record.title)
        .bind(&record.filename)
        .bind(&record.uri)
        .bind(&record.file_hash)
        .bind(&record.collection)
        .bind(record.created)
        .fetch_one(&self.pool)
        .await
        .context("failed to insert image")?;

        debug!(image_id = inserted.id, title = %inserted.title, "image inserted");
        Ok(inserted)
    }

    async fn list_images(&self) -> Result<Vec<ImageRecord>> {
        let images = sqlx::query_as::<_, ImageRecord>(&format!(
            "SELECT {IMAGE_COLUMNS} FROM image ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await
        .context("failed to list images")?;

        Ok(images)
    }
}
