//! Faciles kernel library.
//!
//! Block schemas and values, page and media stores, and the page
//! export/import pipeline. The `faciles` binary drives it from the command
//! line.

pub mod cli;
pub mod config;
pub mod content;
pub mod error;
pub mod file;
pub mod models;
pub mod store;
pub mod transfer;
