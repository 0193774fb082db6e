//! Interchange files in the staging directory.
//!
//! ```text
//! {staging}/pages_data.json   exported pages and the ids they reference
//! {staging}/image_data.json   per-image manifest
//! {staging}/img/              downloaded image files
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::fs;
use tracing::debug;

use crate::content::value::ReferenceId;

pub const PAGES_DATA_FILE: &str = "pages_data.json";
pub const IMAGES_DATA_FILE: &str = "image_data.json";
pub const IMAGES_DIR: &str = "img";

/// Contents of `pages_data.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PagesData {
    /// Every image id referenced by the exported pages.
    pub image_ids: Vec<ReferenceId>,

    /// Document ids linked from the exported pages. Documents are not
    /// transferred; the import applies its missing-reference policy to them.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub document_ids: Vec<ReferenceId>,

    /// Linked page ids that are not part of this export.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub linked_page_ids: Vec<ReferenceId>,

    /// Cleaned page JSON keyed by source page id, in export order.
    pub pages: Map<String, Value>,
}

/// One entry of `image_data.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageEntry {
    /// `meta` object of the source image.
    pub meta: Value,

    pub title: String,

    /// File name in `img/`, or the derived title for pictograms.
    pub filename: String,

    /// Pictograms are matched by title instead of being transferred.
    pub is_pictogram: bool,

    /// Id of the matching image in the target store, once imported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_id: Option<ReferenceId>,
}

/// Contents of `image_data.json`, keyed by source image id.
pub type ImageManifest = BTreeMap<String, ImageEntry>;

/// Staging directory holding the interchange files.
#[derive(Debug, Clone)]
pub struct StagingDir {
    root: PathBuf,
}

impl StagingDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn pages_file(&self) -> PathBuf {
        self.root.join(PAGES_DATA_FILE)
    }

    pub fn images_file(&self) -> PathBuf {
        self.root.join(IMAGES_DATA_FILE)
    }

    pub fn images_dir(&self) -> PathBuf {
        self.root.join(IMAGES_DIR)
    }

    /// Path of a staged image file.
    pub fn image_path(&self, filename: &str) -> PathBuf {
        self.images_dir().join(filename)
    }

    /// Create the staging and image directories.
    pub async fn prepare(&self) -> Result<()> {
        fs::create_dir_all(self.images_dir())
            .await
            .with_context(|| format!("failed to create {}", self.images_dir().display()))
    }

    pub async fn load_pages(&self) -> Result<PagesData> {
        read_json(&self.pages_file()).await
    }

    pub async fn save_pages(&self, data: &PagesData) -> Result<()> {
        write_json(&self.pages_file(), data).await
    }

    /// Image manifest; empty when the file does not exist yet.
    pub async fn load_images(&self) -> Result<ImageManifest> {
        let path = self.images_file();
        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(ImageManifest::new());
        }
        read_json(&path).await
    }

    pub async fn save_images(&self, manifest: &ImageManifest) -> Result<()> {
        write_json(&self.images_file(), manifest).await
    }
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("failed to parse {}", path.display()))
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let bytes = serde_json::to_vec_pretty(value).context("failed to serialize interchange file")?;
    fs::write(path, bytes)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;
    debug!(path = %path.display(), "interchange file written");
    Ok(())
}
