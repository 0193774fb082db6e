//! Page service.
//!
//! Creates, updates and publishes pages. Every body goes through the block
//! schema before it is stored: parse errors always reject, constraint
//! violations reject only with strict validation enabled.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use super::block_render::{RenderContext, render_stream};
use super::block_types::{BlockTypeRegistry, StreamField};
use super::catalog::COMMON_CATALOG;
use super::text::extract_text;
use super::validate::validate_value;
use super::value::{BlockValue, to_value};
use crate::config::Config;
use crate::models::page::STATUS_LIVE;
use crate::models::{CreatePage, PageRecord, PageRevision, UpdatePage};
use crate::store::PageStore;

/// Tunables for [`PageService`].
#[derive(Debug, Clone)]
pub struct PageServiceOptions {
    pub default_locale: String,
    pub search_description_words: usize,
    /// Reject bodies that parse but violate block constraints.
    pub strict_validation: bool,
}

impl Default for PageServiceOptions {
    fn default() -> Self {
        Self {
            default_locale: "fr".to_string(),
            search_description_words: 20,
            strict_validation: false,
        }
    }
}

impl PageServiceOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            default_locale: config.default_locale.clone(),
            search_description_words: config.search_description_words,
            strict_validation: false,
        }
    }
}

/// A body that parsed against the page schema.
#[derive(Debug, Clone)]
pub struct PreparedBody {
    pub value: BlockValue,
    /// Canonical JSON form, as stored.
    pub json: Value,
    /// Constraint violations (empty if valid).
    pub errors: Vec<String>,
}

/// Service for page CRUD operations.
#[derive(Clone)]
pub struct PageService {
    inner: Arc<PageServiceInner>,
}

struct PageServiceInner {
    store: Arc<dyn PageStore>,
    registry: Arc<BlockTypeRegistry>,
    body: StreamField,
    options: PageServiceOptions,
}

impl PageService {
    pub fn new(
        store: Arc<dyn PageStore>,
        registry: Arc<BlockTypeRegistry>,
        options: PageServiceOptions,
    ) -> Self {
        Self {
            inner: Arc::new(PageServiceInner {
                store,
                registry,
                body: StreamField::new("body", COMMON_CATALOG).blank(true),
                options,
            }),
        }
    }

    pub fn store(&self) -> &Arc<dyn PageStore> {
        &self.inner.store
    }

    pub fn registry(&self) -> &BlockTypeRegistry {
        &self.inner.registry
    }

    pub fn options(&self) -> &PageServiceOptions {
        &self.inner.options
    }

    /// Parse and validate a raw body against the page body schema.
    pub fn prepare_body(&self, raw: &Value) -> Result<PreparedBody> {
        let schema = self.inner.body.block(&self.inner.registry)?;
        let value = to_value(schema, raw)?;
        let errors = validate_value(schema, &value);

        if !errors.is_empty() {
            if self.inner.options.strict_validation {
                bail!("invalid page body: {}", errors.join("; "));
            }
            warn!(errors = ?errors, "page body has validation errors");
        }

        Ok(PreparedBody {
            json: value.to_json(),
            value,
            errors,
        })
    }

    /// Return the page with `input.slug` in the target locale, or create it.
    ///
    /// The boolean is true when the page was created. An existing page is
    /// returned untouched.
    pub async fn get_or_create_page(&self, mut input: CreatePage) -> Result<(PageRecord, bool)> {
        let locale = input
            .locale
            .get_or_insert_with(|| self.inner.options.default_locale.clone())
            .clone();

        if let Some(existing) = self.inner.store.find_by_slug(&input.slug, &locale).await? {
            info!(slug = %existing.slug, page_id = %existing.id, "page already exists");
            return Ok((existing, false));
        }

        let body = self.prepare_body(&input.body)?;
        input.body = body.json;

        if input
            .search_description
            .as_deref()
            .is_none_or(|d| d.trim().is_empty())
        {
            input.search_description = Some(extract_text(
                body.value.children(),
                Some(self.inner.options.search_description_words),
            ));
        }

        if input.parent_id.is_none() {
            input.parent_id = self.inner.store.root_page(&locale).await?.map(|p| p.id);
        }

        let log = input.log.take();
        let fingerprint = self.inner.registry.fingerprint(COMMON_CATALOG)?;
        let mut page =
            PageRecord::from_input(input, &self.inner.options.default_locale, fingerprint);

        let revision = page.snapshot(log);
        if page.status == STATUS_LIVE {
            page.live_revision_id = Some(revision.id);
        }

        self.inner.store.insert_page(&page).await?;
        self.inner.store.save_revision(&revision).await?;

        info!(slug = %page.slug, page_id = %page.id, "page created");
        Ok((page, true))
    }

    /// Apply `input` to an existing page and record a revision.
    pub async fn update_page(&self, id: Uuid, input: UpdatePage) -> Result<PageRecord> {
        let mut page = self
            .inner
            .store
            .find_page(id)
            .await?
            .with_context(|| format!("page {id} not found"))?;

        if let Some(slug) = input.slug {
            page.slug = slug;
        }
        if let Some(title) = input.title {
            page.title = title;
        }
        if let Some(header) = input.header {
            page.header = header;
        }
        if let Some(restriction) = input.restriction_type {
            page.restriction_type = Some(restriction).filter(|r| !r.is_empty());
        }
        if let Some(description) = input.search_description {
            page.search_description = description;
        }
        if let Some(raw) = input.body {
            let body = self.prepare_body(&raw)?;
            if page.search_description.trim().is_empty() {
                page.search_description = extract_text(
                    body.value.children(),
                    Some(self.inner.options.search_description_words),
                );
            }
            page.body = body.json;
            page.schema_fingerprint = self.inner.registry.fingerprint(COMMON_CATALOG)?;
        }
        page.changed = chrono::Utc::now().timestamp();

        let revision = page.snapshot(input.log);
        if page.status == STATUS_LIVE {
            page.live_revision_id = Some(revision.id);
        }
        self.inner.store.update_page(&page).await?;
        self.inner.store.save_revision(&revision).await?;

        info!(slug = %page.slug, page_id = %page.id, "page updated");
        Ok(page)
    }

    /// Make `revision_id` the live content of its page.
    pub async fn publish_revision(&self, page_id: Uuid, revision_id: Uuid) -> Result<PageRecord> {
        let revision: PageRevision = self
            .inner
            .store
            .find_revision(revision_id)
            .await?
            .with_context(|| format!("revision {revision_id} not found"))?;
        if revision.page_id != page_id {
            bail!("revision {revision_id} does not belong to page {page_id}");
        }

        let mut page = self
            .inner
            .store
            .find_page(page_id)
            .await?
            .with_context(|| format!("page {page_id} not found"))?;

        page.title = revision.title;
        page.body = revision.body;
        page.status = STATUS_LIVE;
        page.live_revision_id = Some(revision.id);
        page.changed = chrono::Utc::now().timestamp();
        self.inner.store.update_page(&page).await?;

        info!(page_id = %page.id, revision_id = %revision_id, "revision published");
        Ok(page)
    }

    /// Delete a page, its descendants and their revisions.
    pub async fn delete_page(&self, id: Uuid) -> Result<bool> {
        let deleted = self.inner.store.delete_page(id).await?;
        if deleted {
            info!(page_id = %id, "page deleted");
        }
        Ok(deleted)
    }

    /// Render the stored body of `page` to HTML.
    pub fn render_page(&self, page: &PageRecord, ctx: &RenderContext) -> Result<String> {
        let schema = self.inner.body.block(&self.inner.registry)?;
        let value = to_value(schema, &page.body)
            .with_context(|| format!("stored body of page {} no longer parses", page.id))?;
        Ok(render_stream(value.children(), ctx))
    }

    /// True when `page` was validated against the current schema.
    pub fn is_current(&self, page: &PageRecord) -> Result<bool> {
        Ok(page.schema_fingerprint == self.inner.registry.fingerprint(COMMON_CATALOG)?)
    }
}

impl std::fmt::Debug for PageService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageService")
            .field("options", &self.inner.options)
            .finish()
    }
}
