//! Structured content.
//!
//! This module provides:
//! - BlockType schema nodes and the standard block catalog
//! - BlockTypeRegistry: static catalogs plus runtime registrations
//! - BlockValue: typed values parsed from raw JSON, with validation
//! - Reference location, id stripping and reference remapping
//! - Server-side rendering and plain-text extraction
//! - PageService: page CRUD over a PageStore

pub mod block_render;
pub mod block_types;
pub mod catalog;
pub mod page_service;
pub mod references;
pub mod schema;
pub mod text;
pub mod validate;
pub mod value;

pub use block_render::{RenderContext, render_block, render_stream};
pub use block_types::{BlockDefinition, BlockTypeRegistry, StreamField};
pub use page_service::{PageService, PageServiceOptions};
pub use references::{MissingReferencePolicy, ReferenceMap};
pub use schema::{BlockKind, BlockType, ReferenceKind, ScalarKind};
pub use text::extract_text;
pub use value::{BlockValue, ExternalReference, ReferenceId, StreamChild, sample, to_value};
