//! Database models.

pub mod media;
pub mod page;

pub use media::{ImageRecord, NewImage};
pub use page::{CreatePage, PageHeader, PageRecord, PageRevision, UpdatePage};
