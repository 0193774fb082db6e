//! Page export.
//!
//! Turns a page detail JSON from the source site into a portable copy:
//! block ids stripped, tags and instance-specific meta keys dropped, and the
//! ids of every image it uses collected for the media transfer. Document
//! and page links are collected too so the import can tell what it has to
//! resolve.

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{debug, info};

use super::interchange::PagesData;
use super::source::PageSource;
use crate::content::block_types::BlockTypeRegistry;
use crate::content::catalog::COMMON_CATALOG;
use crate::content::references::{collect_references, locate_references, strip_ephemeral_ids};
use crate::content::schema::ReferenceKind;
use crate::content::value::{ExternalReference, ReferenceId, to_value};

/// Meta keys that only make sense on the source instance.
const DROPPED_META_KEYS: &[&str] = &["parent", "seo_title", "search_description"];

/// One exported page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageExport {
    pub source_id: ReferenceId,
    /// Cleaned page JSON.
    pub content: Value,
    /// Image ids used by the page, first-seen order, no duplicates.
    pub image_ids: Vec<ReferenceId>,
    /// Linked document ids, same ordering.
    pub document_ids: Vec<ReferenceId>,
    /// Linked page ids, same ordering.
    pub page_ids: Vec<ReferenceId>,
}

/// Fetch one page from `source` and clean it.
pub async fn export_page(
    source: &dyn PageSource,
    page_id: &ReferenceId,
    registry: &BlockTypeRegistry,
) -> Result<PageExport> {
    let raw = source
        .fetch_page(page_id)
        .await
        .with_context(|| format!("failed to fetch source page {page_id}"))?;
    let export = clean_page(page_id.clone(), &raw, registry)?;
    info!(
        page_id = %page_id,
        images = export.image_ids.len(),
        documents = export.document_ids.len(),
        links = export.page_ids.len(),
        "page exported"
    );
    Ok(export)
}

/// Export several pages into a single interchange document.
pub async fn export_pages(
    source: &dyn PageSource,
    page_ids: &[ReferenceId],
    registry: &BlockTypeRegistry,
) -> Result<PagesData> {
    let mut data = PagesData::default();
    for page_id in page_ids {
        let export = export_page(source, page_id, registry).await?;
        push_unique(&mut data.image_ids, export.image_ids);
        push_unique(&mut data.document_ids, export.document_ids);
        push_unique(&mut data.linked_page_ids, export.page_ids);
        data.pages.insert(export.source_id.to_string(), export.content);
    }
    // Links between exported pages are resolved by the import itself.
    data.linked_page_ids.retain(|id| !data.pages.contains_key(id.as_str()));
    Ok(data)
}

/// Clean a page detail JSON. The input is left untouched.
pub fn clean_page(
    source_id: ReferenceId,
    raw: &Value,
    registry: &BlockTypeRegistry,
) -> Result<PageExport> {
    let source = raw
        .as_object()
        .with_context(|| format!("source page {source_id} is not a JSON object"))?;
    let body = source.get("body").cloned().unwrap_or(Value::Array(Vec::new()));

    let mut content = source.clone();
    content.insert("body".into(), strip_ephemeral_ids(&body));
    content.remove("tags");
    if let Some(Value::Object(meta)) = content.get_mut("meta") {
        for key in DROPPED_META_KEYS {
            meta.remove(*key);
        }
    }

    let mut image_ids = Vec::new();
    if let Some(id) = source
        .get("header_image")
        .and_then(|h| h.get("id"))
        .and_then(ReferenceId::from_json)
    {
        image_ids.push(id);
    }
    image_ids.extend(locate_references(&body));

    let typed = typed_references(&body, registry);
    let of_kind = |kind: ReferenceKind| {
        typed
            .iter()
            .filter(move |r| r.kind == kind)
            .map(|r| r.id.clone())
    };
    image_ids.extend(of_kind(ReferenceKind::Image));

    let mut export = PageExport {
        source_id,
        content: Value::Object(content),
        image_ids: Vec::new(),
        document_ids: Vec::new(),
        page_ids: Vec::new(),
    };
    push_unique(&mut export.image_ids, image_ids);
    push_unique(&mut export.document_ids, of_kind(ReferenceKind::Document));
    push_unique(&mut export.page_ids, of_kind(ReferenceKind::Page));
    Ok(export)
}

fn push_unique(target: &mut Vec<ReferenceId>, ids: impl IntoIterator<Item = ReferenceId>) {
    for id in ids {
        if !target.contains(&id) {
            target.push(id);
        }
    }
}

/// References found by walking the body with the local schema.
///
/// Empty when the body does not parse; structural image location still
/// applies.
fn typed_references(body: &Value, registry: &BlockTypeRegistry) -> Vec<ExternalReference> {
    let Ok(schema) = registry.stream_schema(COMMON_CATALOG) else {
        return Vec::new();
    };
    match to_value(&schema, body) {
        Ok(value) => collect_references(&value),
        Err(e) => {
            debug!(error = %e, "body does not match the local schema");
            Vec::new()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn registry() -> BlockTypeRegistry {
        BlockTypeRegistry::with_standard_types()
    }

    fn source_page() -> Value {
        json!({
            "id": 32,
            "meta": {
                "type": "content_manager.ContentPage",
                "slug": "modele",
                "html_url": "https://source.example/modele/",
                "parent": { "id": 3 },
                "seo_title": "SEO",
                "search_description": "desc"
            },
            "title": "Modèle",
            "tags": ["a"],
            "header_image": { "id": 9, "title": "Header" },
            "body": [
                { "type": "image", "id": "u1", "value": { "image": 4, "alt": "A" } },
                { "type": "multicolumns", "id": "u2", "value": {
                    "bg_image": 9,
                    "columns": [
                        { "type": "image", "id": "u3", "value": { "image": 7 } },
                        { "type": "quote", "id": "u4", "value": { "quote": "Q", "image": 4 } }
                    ]
                }}
            ]
        })
    }

    #[test]
    fn cleans_ids_tags_and_meta() {
        let raw = source_page();
        let export = clean_page(ReferenceId::from(32), &raw, &registry()).unwrap();

        let content = &export.content;
        assert!(content.get("tags").is_none());
        let meta = content["meta"].as_object().unwrap();
        assert_eq!(
            meta.keys().collect::<Vec<_>>(),
            ["type", "slug", "html_url"]
        );
        assert!(!content["body"].to_string().contains("\"id\""));
        // only block ids are stripped
        assert!(content.get("id").is_some());
        assert_eq!(raw["body"][0]["id"], "u1", "input must not be mutated");
    }

    #[test]
    fn collects_header_and_body_images_once() {
        let export = clean_page(ReferenceId::from(32), &source_page(), &registry()).unwrap();
        let ids: Vec<&str> = export.image_ids.iter().map(ReferenceId::as_str).collect();
        assert_eq!(ids, ["9", "4", "7"]);
    }

    #[test]
    fn unparseable_body_still_exports() {
        let raw = json!({
            "meta": {},
            "title": "Old",
            "body": [{ "type": "retired_block", "value": { "bg_image": "12" } }]
        });
        let export = clean_page(ReferenceId::from(1), &raw, &registry()).unwrap();
        assert_eq!(export.image_ids, vec![ReferenceId::from(12)]);
    }

    #[test]
    fn non_object_page_is_rejected() {
        assert!(clean_page(ReferenceId::from(1), &json!([]), &registry()).is_err());
    }

    #[test]
    fn collects_document_and_page_links() {
        let raw = json!({
            "meta": {},
            "title": "Liens",
            "body": [
                { "type": "link", "value": { "link_type": "page", "page": 5 } },
                { "type": "link", "value": { "link_type": "document", "document": 8 } },
                { "type": "link", "value": { "link_type": "page", "page": 5 } }
            ]
        });
        let export = clean_page(ReferenceId::from(1), &raw, &registry()).unwrap();
        assert_eq!(export.page_ids, vec![ReferenceId::from(5)]);
        assert_eq!(export.document_ids, vec![ReferenceId::from(8)]);
        assert!(export.image_ids.is_empty());
    }
}
