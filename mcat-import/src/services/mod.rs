//! Import services
//!
//! The reconciliation core: lookup cache, OpenLibrary client, existing
//! entity index, merge policy, batch writer, and the per-row driver.

pub mod batch_writer;
pub mod entity_index;
pub mod import_driver;
pub mod lookup_cache;
pub mod openlibrary_client;
pub mod reconciler;

pub use batch_writer::BatchWriter;
pub use entity_index::EntityIndex;
pub use import_driver::{ImportDriver, ImportOutcome};
pub use lookup_cache::{DisabledLookupCache, FsLookupCache, LookupCache};
pub use openlibrary_client::{LookupError, LookupService, OpenLibraryClient};
