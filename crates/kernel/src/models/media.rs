//! Image model.

use serde::{Deserialize, Serialize};

/// Collection holding images imported alongside page templates.
pub const TEMPLATES_COLLECTION: &str = "templates";

/// Default collection for everything else.
pub const ROOT_COLLECTION: &str = "root";

/// Image record. Ids are local to the store that issued them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ImageRecord {
    pub id: i64,

    /// Human-readable title, also used to match pictograms.
    pub title: String,

    /// Stored file name.
    pub filename: String,

    /// Storage URI (e.g. `local://images/2026/01/foo.png`).
    pub uri: String,

    /// SHA-256 of the file contents (hex).
    pub file_hash: String,

    pub collection: String,

    /// Unix timestamp when created.
    pub created: i64,
}

/// Input for storing a new image.
#[derive(Debug, Clone, Deserialize)]
pub struct NewImage {
    pub title: String,
    pub filename: String,
    pub uri: String,
    pub file_hash: String,
    pub collection: Option<String>,
}

impl NewImage {
    /// Assign an id and creation time.
    pub fn into_record(self, id: i64) -> ImageRecord {
        ImageRecord {
            id,
            title: self.title,
            filename: self.filename,
            uri: self.uri,
            file_hash: self.file_hash,
            collection: self
                .collection
                .unwrap_or_else(|| ROOT_COLLECTION.to_string()),
            created: chrono::Utc::now().timestamp(),
        }
    }
}
