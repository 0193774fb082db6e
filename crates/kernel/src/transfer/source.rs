//! Read access to a source site.
//!
//! [`HttpSource`] talks to a remote read API (`/api/v2/pages/{id}/`,
//! `/api/v2/images/{id}/`). [`StoreSource`] serves the same JSON shapes from
//! local stores, for same-instance copies and tests.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::debug;
use uuid::Uuid;

use crate::content::value::ReferenceId;
use crate::file::FileStorage;
use crate::models::{ImageRecord, PageRecord};
use crate::store::{MediaStore, PageStore};

/// Source of page and image JSON in the read API format.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Page detail JSON.
    async fn fetch_page(&self, id: &ReferenceId) -> Result<Value>;

    /// Image detail JSON; `meta.download_url` locates the file.
    async fn fetch_image(&self, id: &ReferenceId) -> Result<Value>;

    /// Raw bytes behind a download URL.
    async fn download(&self, url: &str) -> Result<Vec<u8>>;
}

/// Remote site reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
    site_url: String,
}

impl HttpSource {
    pub fn new(site_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to create HTTP client")?;
        Ok(Self::with_client(site_url, client))
    }

    pub fn with_client(site_url: &str, client: Client) -> Self {
        Self {
            client,
            site_url: site_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn page_api_url(&self, id: &ReferenceId) -> String {
        format!("{}/api/v2/pages/{id}/", self.site_url)
    }

    pub fn image_api_url(&self, id: &ReferenceId) -> String {
        format!("{}/api/v2/images/{id}/", self.site_url)
    }

    /// Resolve site-relative download URLs against the site.
    fn absolute(&self, url: &str) -> String {
        if url.starts_with('/') {
            format!("{}{url}", self.site_url)
        } else {
            url.to_string()
        }
    }

    async fn get_json(&self, url: &str) -> Result<Value> {
        debug!(url = %url, "fetching");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("request to {url} failed"))?
            .error_for_status()
            .with_context(|| format!("{url} returned an error status"))?;

        response
            .json()
            .await
            .with_context(|| format!("{url} did not return JSON"))
    }
}

#[async_trait]
impl PageSource for HttpSource {
    async fn fetch_page(&self, id: &ReferenceId) -> Result<Value> {
        self.get_json(&self.page_api_url(id)).await
    }

    async fn fetch_image(&self, id: &ReferenceId) -> Result<Value> {
        self.get_json(&self.image_api_url(id)).await
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let url = self.absolute(url);
        let bytes = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("download of {url} failed"))?
            .error_for_status()
            .with_context(|| format!("{url} returned an error status"))?
            .bytes()
            .await
            .with_context(|| format!("failed to read body of {url}"))?;
        Ok(bytes.to_vec())
    }
}

/// Local stores presented through the read API format.
pub struct StoreSource<S> {
    store: Arc<S>,
    storage: Arc<dyn FileStorage>,
    site_url: String,
}

impl<S> StoreSource<S>
where
    S: PageStore + MediaStore,
{
    /// `site_url` is used to build `meta.html_url`.
    pub fn new(store: Arc<S>, storage: Arc<dyn FileStorage>, site_url: &str) -> Self {
        Self {
            store,
            storage,
            site_url: site_url.trim_end_matches('/').to_string(),
        }
    }

    fn page_json(&self, page: &PageRecord) -> Value {
        let header = &page.header;
        json!({
            "id": page.id.to_string(),
            "meta": {
                "type": "content_manager.ContentPage",
                "slug": page.slug,
                "html_url": format!("{}/{}/", self.site_url, page.slug),
                "locale": page.locale,
                "seo_title": "",
                "search_description": page.search_description,
                "parent": page.parent_id.map(|id| json!({ "id": id.to_string() })),
            },
            "title": page.title,
            "body": page.body,
            "header_image": header.header_image.map(|id| json!({ "id": id })),
            "header_with_title": header.header_with_title,
            "header_color_class": header.header_color_class,
            "header_large": header.header_large,
            "header_darken": header.header_darken,
            "header_cta_text": header.header_cta_text,
            "tags": [],
        })
    }

    fn image_json(&self, image: &ImageRecord) -> Value {
        json!({
            "id": image.id,
            "meta": {
                "type": "wagtailimages.Image",
                "download_url": self.storage.public_url(&image.uri),
            },
            "title": image.title,
        })
    }
}

#[async_trait]
impl<S> PageSource for StoreSource<S>
where
    S: PageStore + MediaStore,
{
    async fn fetch_page(&self, id: &ReferenceId) -> Result<Value> {
        let uuid: Uuid = id
            .as_str()
            .parse()
            .with_context(|| format!("'{id}' is not a page id"))?;
        let page = self
            .store
            .find_page(uuid)
            .await?
            .with_context(|| format!("page {id} not found"))?;
        Ok(self.page_json(&page))
    }

    async fn fetch_image(&self, id: &ReferenceId) -> Result<Value> {
        let image_id: i64 = id
            .as_str()
            .parse()
            .with_context(|| format!("'{id}' is not an image id"))?;
        let image = self
            .store
            .find_image(image_id)
            .await?
            .with_context(|| format!("image {id} not found"))?;
        Ok(self.image_json(&image))
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let path = url.split('?').next().unwrap_or(url);
        for image in self.store.list_images().await? {
            if self.storage.public_url(&image.uri) == path {
                return self.storage.read(&image.uri).await;
            }
        }
        bail!("no stored file behind {url}")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn api_urls() {
        let source = HttpSource::new("https://source.example/", Duration::from_secs(5)).unwrap();
        let id = ReferenceId::from(32);
        assert_eq!(source.page_api_url(&id), "https://source.example/api/v2/pages/32/");
        assert_eq!(source.image_api_url(&id), "https://source.example/api/v2/images/32/");
        assert_eq!(
            source.absolute("/media/original_images/a.png"),
            "https://source.example/media/original_images/a.png"
        );
        assert_eq!(source.absolute("https://cdn.example/a.png"), "https://cdn.example/a.png");
    }
}
