//! Page model.
//!
//! Pages form a tree (each page has an optional parent) and carry a block
//! stream body stored as canonical JSON. Revisions are immutable snapshots;
//! publishing one copies it onto the page.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Draft status value.
pub const STATUS_DRAFT: i16 = 0;

/// Live (published) status value.
pub const STATUS_LIVE: i16 = 1;

/// Header presentation fields shared by every content page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PageHeader {
    /// Local image id of the header image.
    pub header_image: Option<i64>,

    /// Show the page title over the header.
    pub header_with_title: bool,

    /// DSFR color class of the header band.
    pub header_color_class: Option<String>,

    /// Use the tall header layout.
    pub header_large: bool,

    /// Darken the header image behind the title.
    pub header_darken: bool,

    /// Call-to-action label shown in the header.
    pub header_cta_text: Option<String>,
}

/// Page record.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PageRecord {
    /// Unique identifier (UUIDv7).
    pub id: Uuid,

    /// Parent page (None for tree roots).
    pub parent_id: Option<Uuid>,

    /// URL slug, unique per locale.
    pub slug: String,

    /// Page title.
    pub title: String,

    /// Language code (default: 'fr').
    pub locale: String,

    /// Publication status (0 = draft, 1 = live).
    pub status: i16,

    /// Block stream body (canonical JSON).
    pub body: serde_json::Value,

    #[sqlx(flatten)]
    #[serde(flatten)]
    pub header: PageHeader,

    /// Summary used by search engines.
    pub search_description: String,

    /// Source page URL for imported templates.
    pub source_url: Option<String>,

    /// Access restriction ('login' or None for public pages).
    pub restriction_type: Option<String>,

    /// Revision currently published.
    pub live_revision_id: Option<Uuid>,

    /// SHA-256 of the block schema the body was validated against.
    pub schema_fingerprint: String,

    /// Unix timestamp when created.
    pub created: i64,

    /// Unix timestamp when last changed.
    pub changed: i64,
}

/// Page revision record.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PageRevision {
    /// Unique identifier (UUIDv7).
    pub id: Uuid,

    /// Page this revision belongs to.
    pub page_id: Uuid,

    /// Title at this revision.
    pub title: String,

    /// Body at this revision.
    pub body: serde_json::Value,

    /// Unix timestamp when this revision was created.
    pub created: i64,

    /// Revision log message.
    pub log: Option<String>,
}

/// Input for creating a page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreatePage {
    pub slug: String,
    pub title: String,
    pub parent_id: Option<Uuid>,
    pub locale: Option<String>,
    pub body: serde_json::Value,
    #[serde(default)]
    pub header: PageHeader,
    pub search_description: Option<String>,
    pub source_url: Option<String>,
    pub restriction_type: Option<String>,
    pub status: Option<i16>,
    pub log: Option<String>,
}

/// Input for updating a page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePage {
    pub slug: Option<String>,
    pub title: Option<String>,
    pub body: Option<serde_json::Value>,
    pub header: Option<PageHeader>,
    pub search_description: Option<String>,
    pub restriction_type: Option<String>,
    pub log: Option<String>,
}

impl PageRecord {
    /// Check if this page is published.
    pub fn is_live(&self) -> bool {
        self.status == STATUS_LIVE
    }

    /// Check if this page is a tree root.
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Build an unsaved record from creation input.
    pub fn from_input(input: CreatePage, default_locale: &str, fingerprint: String) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            id: Uuid::now_v7(),
            parent_id: input.parent_id,
            slug: input.slug,
            title: input.title,
            locale: input.locale.unwrap_or_else(|| default_locale.to_string()),
            status: input.status.unwrap_or(STATUS_LIVE),
            body: input.body,
            header: input.header,
            search_description: input.search_description.unwrap_or_default(),
            source_url: input.source_url,
            restriction_type: input.restriction_type,
            live_revision_id: None,
            schema_fingerprint: fingerprint,
            created: now,
            changed: now,
        }
    }

    /// Snapshot the current title and body as a new revision.
    pub fn snapshot(&self, log: Option<String>) -> PageRevision {
        PageRevision {
            id: Uuid::now_v7(),
            page_id: self.id,
            title: self.title.clone(),
            body: self.body.clone(),
            created: chrono::Utc::now().timestamp(),
            log,
        }
    }
}
