//! Database access layer for the media catalog

pub mod init;

pub use init::{create_schema, init_database};
