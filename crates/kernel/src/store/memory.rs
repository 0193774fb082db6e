//! In-memory store.

use std::sync::atomic::{AtomicI64, Ordering};

use anyhow::{Result, bail};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{MediaStore, PageStore};
use crate::models::{ImageRecord, NewImage, PageRecord, PageRevision};

/// Pages, revisions and images held in process memory.
///
/// Enforces the same uniqueness rules as the PostgreSQL schema: one page
/// per slug and locale, revisions only for existing pages.
#[derive(Debug)]
pub struct MemoryStore {
    pages: DashMap<Uuid, PageRecord>,
    revisions: DashMap<Uuid, PageRevision>,
    images: RwLock<Vec<ImageRecord>>,
    next_image_id: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            pages: DashMap::new(),
            revisions: DashMap::new(),
            images: RwLock::new(Vec::new()),
            next_image_id: AtomicI64::new(1),
        }
    }

    /// Number of stored pages.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn descendants(&self, id: Uuid) -> Vec<Uuid> {
        let mut found = vec![id];
        let mut i = 0;
        while i < found.len() {
            let parent = found[i];
            let mut children: Vec<Uuid> = self
                .pages
                .iter()
                .filter(|p| p.parent_id == Some(parent))
                .map(|p| p.id)
                .collect();
            found.append(&mut children);
            i += 1;
        }
        found
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageStore for MemoryStore {
    async fn find_page(&self, id: Uuid) -> Result<Option<PageRecord>> {
        Ok(self.pages.get(&id).map(|p| p.clone()))
    }

    async fn find_by_slug(&self, slug: &str, locale: &str) -> Result<Option<PageRecord>> {
        Ok(self
            .pages
            .iter()
            .find(|p| p.slug == slug && p.locale == locale)
            .map(|p| p.clone()))
    }

    async fn find_by_source_url(&self, source_url: &str) -> Result<Option<PageRecord>> {
        Ok(self
            .pages
            .iter()
            .find(|p| p.source_url.as_deref() == Some(source_url))
            .map(|p| p.clone()))
    }

    async fn root_page(&self, locale: &str) -> Result<Option<PageRecord>> {
        Ok(self
            .pages
            .iter()
            .filter(|p| p.parent_id.is_none() && p.locale == locale)
            .min_by_key(|p| (p.created, p.id))
            .map(|p| p.clone()))
    }

    async fn children(&self, parent_id: Uuid) -> Result<Vec<PageRecord>> {
        let mut children: Vec<PageRecord> = self
            .pages
            .iter()
            .filter(|p| p.parent_id == Some(parent_id))
            .map(|p| p.clone())
            .collect();
        children.sort_by_key(|p| (p.created, p.id));
        Ok(children)
    }

    async fn insert_page(&self, page: &PageRecord) -> Result<()> {
        if self.pages.contains_key(&page.id) {
            bail!("page {} already exists", page.id);
        }
        if self
            .pages
            .iter()
            .any(|p| p.slug == page.slug && p.locale == page.locale)
        {
            bail!(
                "a page with slug '{}' already exists for locale '{}'",
                page.slug,
                page.locale
            );
        }
        if let Some(parent) = page.parent_id
            && !self.pages.contains_key(&parent)
        {
            bail!("parent page {parent} does not exist");
        }
        self.pages.insert(page.id, page.clone());
        debug!(page_id = %page.id, slug = %page.slug, "page inserted");
        Ok(())
    }

    async fn update_page(&self, page: &PageRecord) -> Result<()> {
        // Checked before `get_mut`: iterating while holding a shard lock deadlocks.
        if self
            .pages
            .iter()
            .any(|p| p.id != page.id && p.slug == page.slug && p.locale == page.locale)
        {
            bail!(
                "a page with slug '{}' already exists for locale '{}'",
                page.slug,
                page.locale
            );
        }
        match self.pages.get_mut(&page.id) {
            Some(mut existing) => {
                *existing = page.clone();
                Ok(())
            }
            None => bail!("page {} not found", page.id),
        }
    }

    async fn delete_page(&self, id: Uuid) -> Result<bool> {
        if !self.pages.contains_key(&id) {
            return Ok(false);
        }
        let doomed = self.descendants(id);
        self.revisions.retain(|_, r| !doomed.contains(&r.page_id));
        for page_id in &doomed {
            self.pages.remove(page_id);
        }
        debug!(page_id = %id, removed = doomed.len(), "page deleted");
        Ok(true)
    }

    async fn save_revision(&self, revision: &PageRevision) -> Result<()> {
        if !self.pages.contains_key(&revision.page_id) {
            bail!("page {} not found", revision.page_id);
        }
        self.revisions.insert(revision.id, revision.clone());
        Ok(())
    }

    async fn find_revision(&self, id: Uuid) -> Result<Option<PageRevision>> {
        Ok(self.revisions.get(&id).map(|r| r.clone()))
    }

    async fn revisions(&self, page_id: Uuid) -> Result<Vec<PageRevision>> {
        let mut revisions: Vec<PageRevision> = self
            .revisions
            .iter()
            .filter(|r| r.page_id == page_id)
            .map(|r| r.clone())
            .collect();
        revisions.sort_by(|a, b| (b.created, b.id).cmp(&(a.created, a.id)));
        Ok(revisions)
    }
}

#[async_trait]
impl MediaStore for MemoryStore {
    async fn find_image(&self, id: i64) -> Result<Option<ImageRecord>> {
        Ok(self.images.read().iter().find(|i| i.id == id).cloned())
    }

    async fn find_image_by_hash(&self, file_hash: &str) -> Result<Option<ImageRecord>> {
        Ok(self
            .images
            .read()
            .iter()
            .find(|i| i.file_hash == file_hash)
            .cloned())
    }

    async fn find_image_by_title(&self, title: &str) -> Result<Option<ImageRecord>> {
        Ok(self.images.read().iter().find(|i| i.title == title).cloned())
    }

    async fn insert_image(&self, image: NewImage) -> Result<ImageRecord> {
        let id = self.next_image_id.fetch_add(1, Ordering::SeqCst);
        let record = image.into_record(id);
        self.images.write().push(record.clone());
        debug!(image_id = id, title = %record.title, "image inserted");
        Ok(record)
    }

    async fn list_images(&self) -> Result<Vec<ImageRecord>> {
        Ok(self.images.read().clone())
    }
}
