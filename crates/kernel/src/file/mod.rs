//! File and media storage.

pub mod service;
pub mod storage;

pub use service::{file_hash, guess_extension, sanitize_filename};
pub use storage::{FileStorage, LocalFileStorage};
