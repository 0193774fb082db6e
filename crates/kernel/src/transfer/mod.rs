//! Moving pages and images between instances.
//!
//! The pipeline runs in four steps, each resumable from the staging
//! directory: export pages, download their images, import the images,
//! import the pages with image references remapped.

pub mod export;
pub mod import;
pub mod interchange;
pub mod media;
pub mod source;
pub mod starter;

pub use export::{PageExport, export_page, export_pages};
pub use import::{ImportOutcome, ImportReport, PageImporter};
pub use interchange::{ImageEntry, ImageManifest, PagesData, StagingDir};
pub use media::{download_images, import_images};
pub use source::{HttpSource, PageSource, StoreSource};
pub use starter::{create_demo_page, create_starter_pages};
