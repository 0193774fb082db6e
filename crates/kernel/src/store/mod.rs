//! Page and media persistence.
//!
//! Two backends implement the same traits: `MemoryStore` for tests and
//! one-shot tooling, `PgStore` for PostgreSQL.

mod memory;
mod postgres;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{ImageRecord, NewImage, PageRecord, PageRevision};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Page tree storage.
#[async_trait]
pub trait PageStore: Send + Sync {
    /// Find a page by ID.
    async fn find_page(&self, id: Uuid) -> Result<Option<PageRecord>>;

    /// Find a page by slug within a locale.
    async fn find_by_slug(&self, slug: &str, locale: &str) -> Result<Option<PageRecord>>;

    /// Find the page imported from `source_url`.
    async fn find_by_source_url(&self, source_url: &str) -> Result<Option<PageRecord>>;

    /// Oldest root page of a locale (the home page).
    async fn root_page(&self, locale: &str) -> Result<Option<PageRecord>>;

    /// Direct children of a page, oldest first.
    async fn children(&self, parent_id: Uuid) -> Result<Vec<PageRecord>>;

    async fn insert_page(&self, page: &PageRecord) -> Result<()>;

    async fn update_page(&self, page: &PageRecord) -> Result<()>;

    /// Delete a page with its descendants and their revisions.
    ///
    /// Returns false if the page did not exist.
    async fn delete_page(&self, id: Uuid) -> Result<bool>;

    async fn save_revision(&self, revision: &PageRevision) -> Result<()>;

    async fn find_revision(&self, id: Uuid) -> Result<Option<PageRevision>>;

    /// Revisions of a page, newest first.
    async fn revisions(&self, page_id: Uuid) -> Result<Vec<PageRevision>>;
}

/// Image storage.
#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn find_image(&self, id: i64) -> Result<Option<ImageRecord>>;

    /// Find an image by SHA-256 file hash.
    async fn find_image_by_hash(&self, file_hash: &str) -> Result<Option<ImageRecord>>;

    async fn find_image_by_title(&self, title: &str) -> Result<Option<ImageRecord>>;

    /// Store an image record and return it with its assigned id.
    async fn insert_image(&self, image: NewImage) -> Result<ImageRecord>;

    /// All images, in id order.
    async fn list_images(&self) -> Result<Vec<ImageRecord>>;
}

/// Page and media stores of one backend.
#[derive(Clone)]
pub struct StoreHandle {
    pub pages: Arc<dyn PageStore>,
    pub media: Arc<dyn MediaStore>,
}

impl StoreHandle {
    /// Share one backend implementing both stores.
    pub fn shared<S>(store: Arc<S>) -> Self
    where
        S: PageStore + MediaStore + 'static,
    {
        Self {
            pages: store.clone(),
            media: store,
        }
    }
}

impl std::fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreHandle").finish_non_exhaustive()
    }
}
