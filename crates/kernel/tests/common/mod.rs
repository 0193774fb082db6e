#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Common test utilities for integration tests.
//!
//! Everything here wires the real kernel types together: in-memory stores,
//! local file storage in a scratch directory, and a [`FixtureSource`]
//! standing in for the source site's read API.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;

use faciles_kernel::content::{BlockTypeRegistry, MissingReferencePolicy, PageService, PageServiceOptions, ReferenceId};
use faciles_kernel::file::LocalFileStorage;
use faciles_kernel::store::MemoryStore;
use faciles_kernel::transfer::{PageImporter, PageSource, StagingDir};
use faciles_test_utils::{SOURCE_SITE, ScratchDir, SourcePage, scratch_dir, source_image};

/// Source site served from memory.
#[derive(Default)]
pub struct FixtureSource {
    pages: HashMap<String, Value>,
    images: HashMap<String, Value>,
    files: HashMap<String, Vec<u8>>,
}

impl FixtureSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, page: &SourcePage) -> Self {
        self.pages.insert(page.id.to_string(), page.to_json());
        self
    }

    /// Register an image and the bytes served at its download URL.
    pub fn with_image(mut self, id: i64, title: &str, file_name: &str, data: &[u8]) -> Self {
        let image = source_image(id, title, file_name);
        let url = format!(
            "{SOURCE_SITE}{}",
            image["meta"]["download_url"].as_str().unwrap()
        );
        self.files.insert(url, data.to_vec());
        self.images.insert(id.to_string(), image);
        self
    }

    /// Number of file downloads this source can serve.
    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

#[async_trait]
impl PageSource for FixtureSource {
    async fn fetch_page(&self, id: &ReferenceId) -> Result<Value> {
        self.pages
            .get(id.as_str())
            .cloned()
            .with_context(|| format!("page {id} not found"))
    }

    async fn fetch_image(&self, id: &ReferenceId) -> Result<Value> {
        self.images
            .get(id.as_str())
            .cloned()
            .with_context(|| format!("image {id} not found"))
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let url = if url.starts_with('/') {
            format!("{SOURCE_SITE}{url}")
        } else {
            url.to_string()
        };
        self.files
            .get(&url)
            .cloned()
            .with_context(|| format!("nothing served at {url}"))
    }
}

/// One local instance: stores, file storage and staging area.
///
/// Files live in a scratch directory removed with the instance.
pub struct TestInstance {
    pub store: Arc<MemoryStore>,
    pub storage: Arc<LocalFileStorage>,
    pub registry: Arc<BlockTypeRegistry>,
    pub staging: StagingDir,
    pub root: ScratchDir,
}

impl TestInstance {
    pub fn new(label: &str) -> Self {
        let root = scratch_dir(label);
        Self {
            store: Arc::new(MemoryStore::new()),
            storage: Arc::new(LocalFileStorage::new(root.join("uploads"), "/media")),
            registry: Arc::new(BlockTypeRegistry::with_standard_types()),
            staging: StagingDir::new(root.join("page_templates")),
            root,
        }
    }

    pub fn page_service(&self) -> PageService {
        PageService::new(
            self.store.clone(),
            self.registry.clone(),
            PageServiceOptions::default(),
        )
    }

    pub fn importer(&self, policy: MissingReferencePolicy) -> PageImporter {
        PageImporter::new(self.page_service(), policy)
    }
}
