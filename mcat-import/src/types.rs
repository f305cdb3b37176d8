//! Core data types for the import pipeline
//!
//! Two asymmetric inputs (a CSV row and an OpenLibrary response) meet
//! here, along with the reconciled output record that the batch writer
//! persists.

use crate::{ImportError, ImportResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// One row from the input CSV, keyed by ISBN.
///
/// Beyond the required ISBN there is no fixed schema: fields map the
/// normalized (trimmed, lower-cased) column header to the raw cell
/// value. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct SourceRecord {
    isbn: String,
    fields: HashMap<String, String>,
}

impl SourceRecord {
    /// Build a record from normalized header -> cell mappings.
    ///
    /// The one required key is `isbn`; a missing or blank value is a
    /// row-level error so the caller can skip the row and continue.
    pub fn new(fields: HashMap<String, String>) -> ImportResult<Self> {
        let isbn = match fields.get("isbn") {
            Some(value) if !value.trim().is_empty() => value.trim().to_string(),
            _ => return Err(ImportError::MissingIsbn),
        };

        Ok(Self { isbn, fields })
    }

    pub fn isbn(&self) -> &str {
        &self.isbn
    }

    /// Trimmed cell value for a normalized column name, None when the
    /// column is absent or blank.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

/// Normalized OpenLibrary response for one ISBN.
///
/// Every field except the top-level shape is optional: a missing
/// publisher list or cover set deserializes as empty, never as an
/// error. Serialized as-is into the lookup cache.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalRecord {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    #[serde(default)]
    pub authors: Vec<EntityRef>,
    #[serde(default)]
    pub publishers: Vec<EntityRef>,
    pub number_of_pages: Option<i64>,
    /// Free text, multiple granularities ("1995", "May 1995", ...)
    pub publish_date: Option<String>,
    #[serde(default)]
    pub subjects: Vec<SubjectRef>,
    /// Identifier scheme -> values; varies by source, not guaranteed complete
    #[serde(default)]
    pub identifiers: HashMap<String, Vec<String>>,
    pub cover: Option<CoverSet>,
}

/// Named reference entity (author or publisher) as OpenLibrary returns it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityRef {
    pub name: String,
    /// Canonical OpenLibrary URL, the natural key for dedup. Publishers
    /// sometimes come back without one; those entries cannot be keyed.
    #[serde(default)]
    pub url: String,
}

/// Subject tag attached to a book
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubjectRef {
    pub name: String,
    #[serde(default)]
    pub url: String,
}

/// Cover image URLs by size
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoverSet {
    pub small: Option<String>,
    pub medium: Option<String>,
    pub large: Option<String>,
}

impl CoverSet {
    /// Largest available cover URL
    pub fn best(&self) -> Option<&str> {
        self.large
            .as_deref()
            .or(self.medium.as_deref())
            .or(self.small.as_deref())
    }
}

/// Entity kind discriminator for the dedup index and the batch writer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Author,
    Publisher,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Author => write!(f, "author"),
            EntityKind::Publisher => write!(f, "publisher"),
        }
    }
}

/// A reference entity known to exist, either loaded from the store at
/// run start or staged earlier in the same run.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedEntity {
    pub id: Uuid,
    pub name: String,
    pub url: String,
}

/// A reference entity the reconciler decided must be created.
///
/// Carries the identifier generated at reconcile time; the batch
/// writer inserts the row under this id and echoes it back.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingEntityCreation {
    pub kind: EntityKind,
    pub id: Uuid,
    pub name: String,
    pub url: String,
}

/// The reconciled output: one record per ISBN combining the CSV row
/// and the OpenLibrary record under the merge policy, with resolved
/// author/publisher identifiers. Never mutated after creation; durable
/// only if the run commits.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalBook {
    pub isbn: String,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub author_ids: Vec<Uuid>,
    pub publisher_ids: Vec<Uuid>,
    pub pages: Option<i64>,
    pub publish_date: Option<String>,
    pub series: Option<String>,
    pub comments: Option<String>,
    pub summary: Option<String>,
    pub subjects: Vec<String>,
    pub cover_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_source_record_requires_isbn() {
        let record = SourceRecord::new(fields(&[("isbn", "9780441569595"), ("title", "Neuromancer")]))
            .expect("Record with ISBN should parse");
        assert_eq!(record.isbn(), "9780441569595");
        assert_eq!(record.field("title"), Some("Neuromancer"));

        assert!(matches!(
            SourceRecord::new(fields(&[("title", "No ISBN here")])),
            Err(ImportError::MissingIsbn)
        ));
        assert!(matches!(
            SourceRecord::new(fields(&[("isbn", "   ")])),
            Err(ImportError::MissingIsbn)
        ));
    }

    #[test]
    fn test_source_record_blank_fields_read_as_absent() {
        let record =
            SourceRecord::new(fields(&[("isbn", "123"), ("series", ""), ("comments", "  good  ")]))
                .unwrap();
        assert_eq!(record.field("series"), None);
        assert_eq!(record.field("comments"), Some("good"));
        assert_eq!(record.field("no such column"), None);
    }

    #[test]
    fn test_external_record_tolerates_missing_optionals() {
        // Only a title; everything else absent
        let record: ExternalRecord = serde_json::from_str(r#"{"title": "The Passage"}"#)
            .expect("Sparse record should deserialize");
        assert_eq!(record.title.as_deref(), Some("The Passage"));
        assert!(record.authors.is_empty());
        assert!(record.publishers.is_empty());
        assert!(record.cover.is_none());
    }

    #[test]
    fn test_cover_set_prefers_largest() {
        let cover = CoverSet {
            small: Some("s".to_string()),
            medium: Some("m".to_string()),
            large: None,
        };
        assert_eq!(cover.best(), Some("m"));
    }
}
