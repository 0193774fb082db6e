//! Domain error types.

use thiserror::Error;

use crate::content::schema::ReferenceKind;
use crate::content::value::ReferenceId;

/// Raw content did not match the block schema it was parsed against.
///
/// Every variant carries the JSON path of the offending node
/// (e.g. `body[2].multicolumns.columns[0]`).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaMismatch {
    #[error("{path}: unknown block type '{variant}'")]
    UnknownVariant { path: String, variant: String },

    #[error("{path}: missing required field '{field}'")]
    MissingField { path: String, field: String },

    #[error("{path}: expected {expected}")]
    InvalidValue {
        path: String,
        expected: &'static str,
    },
}

impl SchemaMismatch {
    /// JSON path of the node that failed to parse.
    pub fn path(&self) -> &str {
        match self {
            SchemaMismatch::UnknownVariant { path, .. }
            | SchemaMismatch::MissingField { path, .. }
            | SchemaMismatch::InvalidValue { path, .. } => path,
        }
    }
}

/// Catalog lookup failure in the block type registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("unknown block catalog '{0}'")]
    UnknownCatalog(String),

    #[error("catalog '{catalog}' lists unregistered block type '{name}'")]
    UnknownType { catalog: String, name: String },

    #[error("failed to serialize schema: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Failure while importing one page into a target store.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("schema mismatch: {0}")]
    Schema(#[from] SchemaMismatch),

    #[error("no local {kind} mapped for source reference {id}")]
    MissingReference { kind: ReferenceKind, id: ReferenceId },

    #[error("malformed page export: {0}")]
    Malformed(String),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Result type alias using ImportError.
pub type ImportResult<T> = Result<T, ImportError>;
