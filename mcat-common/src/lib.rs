//! Shared foundation for the MCAT (Media Catalog) tools.
//!
//! Holds the error types and database initialization used by the
//! import binary and any future catalog tooling.

pub mod db;
pub mod error;

pub use error::{Error, Result};
