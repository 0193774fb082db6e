//! CLI command implementations.
//!
//! Each command builds only what it needs from [`CliContext`] and prints
//! human-readable progress lines to stdout.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use serde_json::Value;
use tracing::warn;

use crate::config::Config;
use crate::content::block_types::BlockTypeRegistry;
use crate::content::catalog::COMMON_CATALOG;
use crate::content::page_service::{PageService, PageServiceOptions};
use crate::content::references::MissingReferencePolicy;
use crate::content::text::extract_text;
use crate::content::value::{ReferenceId, to_value};
use crate::file::LocalFileStorage;
use crate::store::{MemoryStore, PgStore, StoreHandle};
use crate::transfer::export::export_pages;
use crate::transfer::import::PageImporter;
use crate::transfer::interchange::StagingDir;
use crate::transfer::media::{download_images, import_images};
use crate::transfer::source::HttpSource;
use crate::transfer::starter::{create_demo_page, create_starter_pages};

/// Shared state of one CLI invocation.
pub struct CliContext {
    pub config: Config,
    pub registry: Arc<BlockTypeRegistry>,
    stores: Option<StoreHandle>,
}

impl CliContext {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            registry: Arc::new(BlockTypeRegistry::with_standard_types()),
            stores: None,
        }
    }

    /// Use the given stores instead of connecting on demand.
    pub fn with_stores(mut self, stores: StoreHandle) -> Self {
        self.stores = Some(stores);
        self
    }

    /// Stores for commands that write pages or images.
    ///
    /// Connects to PostgreSQL when `DATABASE_URL` is set, otherwise falls
    /// back to an in-memory store whose content is lost on exit.
    pub async fn stores(&mut self) -> Result<StoreHandle> {
        if let Some(stores) = &self.stores {
            return Ok(stores.clone());
        }
        let stores = if self.config.database_url.is_some() {
            let store = PgStore::connect(&self.config).await?;
            store.ensure_schema().await?;
            StoreHandle::shared(Arc::new(store))
        } else {
            warn!("DATABASE_URL is not set, using an in-memory store; nothing will be persisted");
            StoreHandle::shared(Arc::new(MemoryStore::new()))
        };
        self.stores = Some(stores.clone());
        Ok(stores)
    }

    fn staging(&self) -> StagingDir {
        StagingDir::new(&self.config.page_templates_dir)
    }

    fn source(&self) -> Result<HttpSource> {
        HttpSource::new(self.config.require_source_site()?, self.config.http_timeout)
    }

    async fn page_service(&mut self) -> Result<PageService> {
        let stores = self.stores().await?;
        Ok(PageService::new(
            stores.pages,
            self.registry.clone(),
            PageServiceOptions::from_config(&self.config),
        ))
    }

    fn file_storage(&self) -> LocalFileStorage {
        LocalFileStorage::new(&self.config.uploads_dir, &self.config.files_url)
    }
}

/// Export source pages into `pages_data.json`.
pub async fn cmd_export_pages(ctx: &CliContext, ids: &[String]) -> Result<()> {
    if ids.is_empty() {
        bail!("no page ids given");
    }
    let source = ctx.source()?;
    let ids: Vec<ReferenceId> = ids.iter().map(|id| ReferenceId::from(id.as_str())).collect();

    let data = export_pages(&source, &ids, &ctx.registry).await?;
    let staging = ctx.staging();
    staging.save_pages(&data).await?;

    for id in data.pages.keys() {
        println!("Exported page {id}");
    }
    println!(
        "{} page(s), {} image(s) referenced, written to {}",
        data.pages.len(),
        data.image_ids.len(),
        staging.pages_file().display()
    );
    if !data.document_ids.is_empty() {
        println!(
            "{} linked document(s) are not transferred: {}",
            data.document_ids.len(),
            join_ids(&data.document_ids)
        );
    }
    if !data.linked_page_ids.is_empty() {
        println!(
            "{} linked page(s) are not part of this export: {}",
            data.linked_page_ids.len(),
            join_ids(&data.linked_page_ids)
        );
    }
    Ok(())
}

fn join_ids(ids: &[ReferenceId]) -> String {
    ids.iter().map(ReferenceId::as_str).collect::<Vec<_>>().join(", ")
}

/// Stage the images listed in `pages_data.json`.
pub async fn cmd_download_images(ctx: &CliContext) -> Result<()> {
    let source = ctx.source()?;
    let staging = ctx.staging();
    let data = staging.load_pages().await?;

    let downloaded = download_images(&source, &data.image_ids, &staging).await?;
    println!(
        "{downloaded} image file(s) downloaded, {} pictogram(s) recorded",
        data.image_ids.len() - downloaded
    );
    Ok(())
}

/// Import staged images into the local media store.
pub async fn cmd_import_images(ctx: &mut CliContext) -> Result<()> {
    let staging = ctx.staging();
    let data = staging.load_pages().await?;
    let stores = ctx.stores().await?;
    let storage = ctx.file_storage();

    let map = import_images(stores.media.as_ref(), &storage, &data.image_ids, &staging).await?;
    println!("{} of {} image(s) mapped to local images", map.len(), data.image_ids.len());
    Ok(())
}

/// Import staged pages (and their images) under the templates index.
pub async fn cmd_import_pages(ctx: &mut CliContext, lenient: bool) -> Result<()> {
    let policy = if lenient {
        MissingReferencePolicy::Lenient
    } else {
        ctx.config.missing_references
    };
    let staging = ctx.staging();
    let data = staging.load_pages().await?;
    let stores = ctx.stores().await?;
    let storage = ctx.file_storage();

    let references =
        import_images(stores.media.as_ref(), &storage, &data.image_ids, &staging).await?;
    let importer = PageImporter::new(ctx.page_service().await?, policy);
    let report = importer.import_all(&data, &references).await?;

    println!(
        "{} created, {} updated, {} skipped, {} failed ({policy} references)",
        report.created,
        report.updated,
        report.skipped,
        report.failed.len()
    );
    if report.dropped_references > 0 {
        println!("{} unmapped reference(s) dropped", report.dropped_references);
    }
    for (source_id, message) in &report.failed {
        println!("  page {source_id}: {message}");
    }
    if !report.failed.is_empty() {
        bail!("{} page(s) failed to import", report.failed.len());
    }
    Ok(())
}

/// Create the starter pages.
pub async fn cmd_create_starter_pages(ctx: &mut CliContext, slugs: &[String]) -> Result<()> {
    let stores = ctx.stores().await?;
    let service = ctx.page_service().await?;

    for (page, created) in create_starter_pages(&service, stores.media.as_ref(), slugs).await? {
        if created {
            println!("Page {} created with id {}", page.slug, page.id);
        } else {
            println!("The {} page seems to already exist with id {}", page.slug, page.id);
        }
    }
    Ok(())
}

/// Create the block demonstration page.
pub async fn cmd_create_demo_pages(ctx: &mut CliContext) -> Result<()> {
    let service = ctx.page_service().await?;
    let (page, created) = create_demo_page(&service).await?;
    if created {
        println!("Page {} created with id {}", page.slug, page.id);
    } else {
        println!("The {} page seems to already exist with id {}", page.slug, page.id);
    }
    Ok(())
}

/// Print the plain text of a body or page JSON file.
pub async fn cmd_extract_text(
    ctx: &CliContext,
    path: &Path,
    max_words: Option<usize>,
) -> Result<()> {
    let raw = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let json: Value = serde_json::from_slice(&raw)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;
    let body = match json.get("body") {
        Some(body) => body.clone(),
        None => json,
    };

    let schema = ctx.registry.stream_schema(COMMON_CATALOG)?;
    let value = to_value(&schema, &body)?;
    println!("{}", extract_text(value.children(), max_words));
    Ok(())
}

/// Print a catalog schema as JSON, with its fingerprint.
pub fn cmd_describe_schema(ctx: &CliContext, catalog: &str) -> Result<()> {
    let blocks = ctx.registry.get_schema(catalog)?;
    let fingerprint = ctx.registry.fingerprint(catalog)?;
    let json = serde_json::to_string_pretty(&blocks).context("failed to serialize schema")?;
    println!("{json}");
    println!("# catalog {catalog}: {} block type(s), fingerprint {fingerprint}", blocks.len());
    Ok(())
}
