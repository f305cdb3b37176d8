//! mcat-import - Bulk book import for the media catalog
//!
//! Reads ISBN values from a CSV file, augments each row with data from
//! the OpenLibrary books API (cached on disk between runs), reconciles
//! the two records against entities already in the catalog, and writes
//! everything inside a single transaction that only commits when the
//! operator asks for it.

pub mod csv_source;
pub mod error;
pub mod services;
pub mod types;

pub use error::{ImportError, ImportResult};
