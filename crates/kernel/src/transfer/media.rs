//! Image transfer between instances.
//!
//! `download_images` stages source images under `img/` and records them in
//! the manifest. `import_images` maps every staged image to a local one,
//! reusing images with the same content hash.

use anyhow::{Context, Result};
use serde_json::Value;
use tokio::fs;
use tracing::{info, warn};

use super::interchange::{ImageEntry, StagingDir};
use super::source::PageSource;
use crate::content::references::ReferenceMap;
use crate::content::schema::ReferenceKind;
use crate::content::value::ReferenceId;
use crate::file::{FileStorage, file_hash, guess_extension};
use crate::models::NewImage;
use crate::models::media::TEMPLATES_COLLECTION;
use crate::store::MediaStore;

/// File name marker of DSFR pictograms, which every instance ships.
pub const PICTOGRAM_MARKER: &str = "Pictogrammes_DSFR";

/// Storage directory for imported originals.
const ORIGINALS_DIR: &str = "original_images";

/// Last path segment of a URL, query string removed.
pub fn file_name_from_url(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/').next().unwrap_or(path)
}

pub fn is_pictogram(file_name: &str) -> bool {
    file_name.contains(PICTOGRAM_MARKER)
}

/// Title a pictogram carries locally, derived from its file name.
///
/// `Pictogrammes_DSFR__Internet.svg` -> `Pictogrammes DSFR — Internet.svg`
pub fn pictogram_title(file_name: &str) -> String {
    file_name.replace("__", " — ").replace('_', " ")
}

/// Fetch image metadata for `ids` and stage their files.
///
/// Pictograms are recorded but not downloaded. The manifest is merged with
/// any existing one and written back.
pub async fn download_images(
    source: &dyn PageSource,
    ids: &[ReferenceId],
    staging: &StagingDir,
) -> Result<usize> {
    staging.prepare().await?;
    let mut manifest = staging.load_images().await?;
    let mut downloaded = 0;

    for id in ids {
        let image = source
            .fetch_image(id)
            .await
            .with_context(|| format!("failed to fetch source image {id}"))?;
        let meta = image.get("meta").cloned().unwrap_or(Value::Null);
        let title = image
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let download_url = meta
            .get("download_url")
            .and_then(Value::as_str)
            .with_context(|| format!("source image {id} has no download_url"))?
            .to_string();
        let name = file_name_from_url(&download_url).to_string();

        let entry = if is_pictogram(&name) {
            ImageEntry {
                meta,
                title,
                filename: pictogram_title(&name),
                is_pictogram: true,
                local_id: None,
            }
        } else {
            let data = source.download(&download_url).await?;
            let path = staging.image_path(&name);
            fs::write(&path, &data)
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            downloaded += 1;
            ImageEntry {
                meta,
                title,
                filename: name,
                is_pictogram: false,
                local_id: None,
            }
        };

        info!(image_id = %id, filename = %entry.filename, pictogram = entry.is_pictogram, "image staged");
        manifest.insert(id.to_string(), entry);
    }

    staging.save_images(&manifest).await?;
    Ok(downloaded)
}

/// Map staged images to local ones, storing new files as needed.
///
/// Pictograms resolve by title and are skipped with a warning when absent.
/// Returns the source-to-local image map; `local_id` is recorded in the
/// manifest.
pub async fn import_images(
    store: &dyn MediaStore,
    storage: &dyn FileStorage,
    ids: &[ReferenceId],
    staging: &StagingDir,
) -> Result<ReferenceMap> {
    let mut manifest = staging.load_images().await?;
    let mut map = ReferenceMap::new();

    for id in ids {
        let entry = manifest
            .get_mut(id.as_str())
            .with_context(|| format!("image {id} is missing from the manifest"))?;

        let local_id = if entry.is_pictogram {
            match store.find_image_by_title(&entry.filename).await? {
                Some(image) => image.id,
                None => {
                    warn!(image_id = %id, title = %entry.filename, "pictogram not found locally");
                    continue;
                }
            }
        } else {
            import_file(store, storage, entry, staging).await?
        };

        let local = ReferenceId::from(local_id);
        map.insert(ReferenceKind::Image, id.clone(), local.clone());
        entry.local_id = Some(local);
    }

    staging.save_images(&manifest).await?;
    info!(mapped = map.len(), requested = ids.len(), "images imported");
    Ok(map)
}

async fn import_file(
    store: &dyn MediaStore,
    storage: &dyn FileStorage,
    entry: &ImageEntry,
    staging: &StagingDir,
) -> Result<i64> {
    let path = staging.image_path(&entry.filename);
    let data = fs::read(&path)
        .await
        .with_context(|| format!("failed to read staged image {}", path.display()))?;
    let hash = file_hash(&data);

    if let Some(existing) = store.find_image_by_hash(&hash).await? {
        return Ok(existing.id);
    }

    let mut filename = format!("template_image_{}", entry.filename.to_lowercase());
    let extension = guess_extension(&filename, &data);
    if !filename.ends_with(&extension) {
        filename.push_str(&extension);
    }

    let uri = storage.unique_uri(ORIGINALS_DIR, &filename).await?;
    storage.write(&uri, &data).await?;

    let image = store
        .insert_image(NewImage {
            title: entry.title.clone(),
            filename,
            uri,
            file_hash: hash,
            collection: Some(TEMPLATES_COLLECTION.to_string()),
        })
        .await?;
    Ok(image.id)
}
