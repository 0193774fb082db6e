//! Faciles test utilities.
//!
//! Fixtures shaped like the source site's read API, scratch directories,
//! and JSON assertion helpers for integration tests.

use std::path::{Path, PathBuf};

use serde_json::{Value as JsonValue, json};
use uuid::Uuid;

/// Default source site used by fixtures.
pub const SOURCE_SITE: &str = "https://source.example";

/// Smallest valid PNG (1x1, transparent).
pub const PNG_PIXEL: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
    0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00,
    0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];

/// Minimal SVG document.
pub const SVG_ICON: &[u8] =
    br#"<svg xmlns="http://www.w3.org/2000/svg" width="8" height="8"><rect width="8" height="8"/></svg>"#;

/// A fresh, not yet created directory under the system temp dir.
///
/// The directory and everything below it is removed when the guard drops.
pub fn scratch_dir(label: &str) -> ScratchDir {
    ScratchDir {
        path: std::env::temp_dir().join(format!("faciles-{label}-{}", Uuid::now_v7())),
    }
}

/// Guard for a directory created by [`scratch_dir`].
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn join(&self, child: impl AsRef<Path>) -> PathBuf {
        self.path.join(child)
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}

/// Create a source page fixture, as returned by `/api/v2/pages/{id}/`.
pub fn source_page(id: i64, slug: &str, title: &str) -> SourcePage {
    SourcePage {
        id,
        slug: slug.to_string(),
        title: title.to_string(),
        locale: "fr".to_string(),
        body: Vec::new(),
        header_image: None,
        header_fields: serde_json::Map::new(),
        tags: Vec::new(),
    }
}

/// Builder for source page JSON.
#[derive(Debug, Clone)]
pub struct SourcePage {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub locale: String,
    pub body: Vec<JsonValue>,
    pub header_image: Option<i64>,
    pub header_fields: serde_json::Map<String, JsonValue>,
    pub tags: Vec<String>,
}

impl SourcePage {
    /// Append a `{type, value, id}` block with a generated block id.
    pub fn with_block(mut self, block_type: &str, value: JsonValue) -> Self {
        self.body.push(blocks::block(block_type, value));
        self
    }

    pub fn with_header_image(mut self, image_id: i64) -> Self {
        self.header_image = Some(image_id);
        self
    }

    /// Set a header field such as `header_large` or `header_cta_text`.
    pub fn with_header_field(mut self, name: &str, value: JsonValue) -> Self {
        self.header_fields.insert(name.to_string(), value);
        self
    }

    pub fn with_tag(mut self, tag: &str) -> Self {
        self.tags.push(tag.to_string());
        self
    }

    pub fn html_url(&self) -> String {
        format!("{SOURCE_SITE}/{}/", self.slug)
    }

    /// Render the page detail JSON.
    pub fn to_json(&self) -> JsonValue {
        let mut page = json!({
            "id": self.id,
            "meta": {
                "type": "content_manager.ContentPage",
                "slug": self.slug,
                "html_url": self.html_url(),
                "locale": self.locale,
                "seo_title": "",
                "search_description": "",
                "parent": { "id": 3 },
            },
            "title": self.title,
            "body": self.body,
            "header_image": self.header_image.map(|id| json!({ "id": id, "title": format!("Image {id}") })),
            "tags": self.tags,
        });
        if let Some(obj) = page.as_object_mut() {
            for (name, value) in &self.header_fields {
                obj.insert(name.clone(), value.clone());
            }
        }
        page
    }
}

/// Source image detail JSON, as returned by `/api/v2/images/{id}/`.
pub fn source_image(id: i64, title: &str, file_name: &str) -> JsonValue {
    json!({
        "id": id,
        "meta": {
            "type": "wagtailimages.Image",
            "download_url": format!("/media/original_images/{file_name}"),
        },
        "title": title,
    })
}

/// Block JSON builders.
pub mod blocks {
    use serde_json::{Value, json};
    use uuid::Uuid;

    /// A stream entry with a generated block id.
    pub fn block(block_type: &str, value: Value) -> Value {
        json!({ "type": block_type, "value": value, "id": Uuid::now_v7().to_string() })
    }

    pub fn paragraph(html: &str) -> Value {
        block("paragraph", json!(html))
    }

    /// Centered image block.
    pub fn image(image_id: i64, alt: &str) -> Value {
        block("image", json!({ "image": image_id, "alt": alt }))
    }

    pub fn quote(text: &str, image_id: Option<i64>) -> Value {
        block("quote", json!({ "quote": text, "image": image_id }))
    }
}

/// Assertion helpers for JSON content.
pub mod assert {
    use serde_json::Value;

    /// Assert that a JSON value has a specific key.
    pub fn has_key(value: &Value, key: &str) {
        assert!(
            value.get(key).is_some(),
            "Expected JSON to have key '{}', got: {}",
            key,
            value
        );
    }

    /// Assert that no object anywhere in `value` carries `key`.
    pub fn no_key_anywhere(value: &Value, key: &str) {
        fn walk(value: &Value, key: &str, path: &str) {
            match value {
                Value::Object(obj) => {
                    assert!(!obj.contains_key(key), "Unexpected '{key}' at {path}");
                    for (k, v) in obj {
                        walk(v, key, &format!("{path}.{k}"));
                    }
                }
                Value::Array(items) => {
                    for (i, v) in items.iter().enumerate() {
                        walk(v, key, &format!("{path}[{i}]"));
                    }
                }
                _ => {}
            }
        }
        walk(value, key, "$");
    }

    /// Assert that a string contains a substring.
    pub fn contains(haystack: &str, needle: &str) {
        assert!(
            haystack.contains(needle),
            "Expected string to contain '{}'\nActual: {}",
            needle,
            haystack
        );
    }

    /// Assert that a string does not contain a substring.
    pub fn not_contains(haystack: &str, needle: &str) {
        assert!(
            !haystack.contains(needle),
            "Expected string to NOT contain '{}'\nActual: {}",
            needle,
            haystack
        );
    }
}
