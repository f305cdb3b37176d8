//! Merge policy
//!
//! Combines a CSV row and an OpenLibrary record into one canonical
//! book. OpenLibrary wins for title, authors, publishers, page count
//! and publish date; the CSV only augments with fields OpenLibrary has
//! no equivalent for (comments, series, summary), or fills in when the
//! OpenLibrary field is absent. CSV author/publisher text is never
//! promoted into created entities.
//!
//! The reconciler never talks to the store; it reads and extends the
//! in-memory entity index and hands the batch writer a pending
//! creation list.

use crate::services::entity_index::EntityIndex;
use crate::types::{
    CanonicalBook, EntityKind, EntityRef, ExternalRecord, IndexedEntity, PendingEntityCreation,
    SourceRecord,
};
use tracing::{debug, info};
use uuid::Uuid;

/// Merge one source row with its external record.
///
/// Returns the canonical book plus the reference entities the batch
/// writer must create. New entities are added to the index here, under
/// an identifier generated now, so a second occurrence of the same
/// entity later in the run resolves instead of creating again.
pub fn merge(
    source: &SourceRecord,
    external: &ExternalRecord,
    index: &mut EntityIndex,
) -> (CanonicalBook, Vec<PendingEntityCreation>) {
    let mut pending = Vec::new();

    let author_ids = resolve_entities(EntityKind::Author, &external.authors, index, &mut pending);
    let publisher_ids = resolve_entities(
        EntityKind::Publisher,
        &external.publishers,
        index,
        &mut pending,
    );

    let book = CanonicalBook {
        isbn: source.isbn().to_string(),
        title: external
            .title
            .clone()
            .or_else(|| source.field("title").map(str::to_string)),
        subtitle: external.subtitle.clone(),
        author_ids,
        publisher_ids,
        pages: external
            .number_of_pages
            .or_else(|| source.field("pages").and_then(|p| p.parse().ok())),
        publish_date: external
            .publish_date
            .clone()
            .or_else(|| source.field("published date").map(str::to_string)),
        series: source.field("series").map(str::to_string),
        comments: source.field("comments").map(str::to_string),
        summary: source.field("summary").map(str::to_string),
        subjects: external.subjects.iter().map(|s| s.name.clone()).collect(),
        cover_url: external
            .cover
            .as_ref()
            .and_then(|c| c.best())
            .map(str::to_string),
    };

    (book, pending)
}

/// Dedup one entity list against the index by natural key (URL).
///
/// Returns resolved identifiers in list order, without duplicates.
fn resolve_entities(
    kind: EntityKind,
    entries: &[EntityRef],
    index: &mut EntityIndex,
    pending: &mut Vec<PendingEntityCreation>,
) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = Vec::with_capacity(entries.len());

    for entry in entries {
        let url = entry.url.trim();
        if url.is_empty() {
            // No natural key means no identity to dedup on
            debug!("Skipping {} '{}' with no URL", kind, entry.name);
            continue;
        }

        let id = match index.get(kind, url) {
            Some(existing) => {
                info!("Skipping {} {} ({})", kind, existing.name, url);
                existing.id
            }
            None => {
                let id = Uuid::new_v4();
                index.insert(
                    kind,
                    IndexedEntity {
                        id,
                        name: entry.name.clone(),
                        url: url.to_string(),
                    },
                );
                pending.push(PendingEntityCreation {
                    kind,
                    id,
                    name: entry.name.clone(),
                    url: url.to_string(),
                });
                id
            }
        };

        if !ids.contains(&id) {
            ids.push(id);
        }
    }

    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn source(pairs: &[(&str, &str)]) -> SourceRecord {
        let mut fields: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        fields.entry("isbn".to_string()).or_insert_with(|| "9780000000001".to_string());
        SourceRecord::new(fields).unwrap()
    }

    fn entity(name: &str, url: &str) -> EntityRef {
        EntityRef {
            name: name.to_string(),
            url: url.to_string(),
        }
    }

    #[test]
    fn test_external_title_wins_over_source() {
        let src = source(&[("title", "CSV Title")]);
        let ext = ExternalRecord {
            title: Some("OpenLibrary Title".to_string()),
            ..Default::default()
        };
        let mut index = EntityIndex::default();

        let (book, _) = merge(&src, &ext, &mut index);
        assert_eq!(book.title.as_deref(), Some("OpenLibrary Title"));
    }

    #[test]
    fn test_source_fills_absent_external_fields() {
        let src = source(&[
            ("title", "CSV Title"),
            ("pages", "320"),
            ("published date", "1995"),
        ]);
        let ext = ExternalRecord::default();
        let mut index = EntityIndex::default();

        let (book, _) = merge(&src, &ext, &mut index);
        assert_eq!(book.title.as_deref(), Some("CSV Title"));
        assert_eq!(book.pages, Some(320));
        assert_eq!(book.publish_date.as_deref(), Some("1995"));
    }

    #[test]
    fn test_both_absent_leaves_field_unset() {
        let src = source(&[]);
        let (book, _) = merge(&src, &ExternalRecord::default(), &mut EntityIndex::default());
        assert!(book.title.is_none());
        assert!(book.pages.is_none());
        assert!(book.publish_date.is_none());
    }

    #[test]
    fn test_augment_only_fields_come_from_source() {
        let src = source(&[
            ("series", "The Passage Trilogy"),
            ("comments", "signed copy"),
            ("summary", "A virus ends the world."),
        ]);
        let ext = ExternalRecord {
            title: Some("The Passage".to_string()),
            ..Default::default()
        };

        let (book, _) = merge(&src, &ext, &mut EntityIndex::default());
        assert_eq!(book.series.as_deref(), Some("The Passage Trilogy"));
        assert_eq!(book.comments.as_deref(), Some("signed copy"));
        assert_eq!(book.summary.as_deref(), Some("A virus ends the world."));
    }

    #[test]
    fn test_source_publisher_text_is_not_promoted() {
        // External has no publishers; CSV has a publisher string.
        // The canonical list stays empty.
        let src = source(&[("publisher", "Ace Books")]);
        let ext = ExternalRecord {
            title: Some("T".to_string()),
            ..Default::default()
        };

        let (book, pending) = merge(&src, &ext, &mut EntityIndex::default());
        assert!(book.publisher_ids.is_empty());
        assert!(pending.is_empty());
    }

    #[test]
    fn test_new_entity_becomes_pending_and_indexed() {
        let src = source(&[]);
        let ext = ExternalRecord {
            authors: vec![entity("A", "u1")],
            ..Default::default()
        };
        let mut index = EntityIndex::default();

        let (book, pending) = merge(&src, &ext, &mut index);

        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].kind, EntityKind::Author);
        assert_eq!(pending[0].url, "u1");
        assert_eq!(book.author_ids, vec![pending[0].id]);
        assert_eq!(
            index.get(EntityKind::Author, "u1").unwrap().id,
            pending[0].id
        );
    }

    #[test]
    fn test_indexed_entity_resolves_without_creation() {
        let existing_id = Uuid::new_v4();
        let mut index = EntityIndex::default();
        index.insert(
            EntityKind::Author,
            IndexedEntity {
                id: existing_id,
                name: "A".to_string(),
                url: "u1".to_string(),
            },
        );

        let ext = ExternalRecord {
            authors: vec![entity("A", "u1")],
            ..Default::default()
        };
        let (book, pending) = merge(&source(&[]), &ext, &mut index);

        assert!(pending.is_empty());
        assert_eq!(book.author_ids, vec![existing_id]);
    }

    #[test]
    fn test_same_new_entity_across_two_rows_created_once() {
        let mut index = EntityIndex::default();
        let ext = ExternalRecord {
            authors: vec![entity("A", "u1")],
            ..Default::default()
        };

        let (first_book, first_pending) = merge(&source(&[]), &ext, &mut index);
        let (second_book, second_pending) = merge(&source(&[]), &ext, &mut index);

        assert_eq!(first_pending.len(), 1);
        assert!(second_pending.is_empty());
        // Second row resolves to the identifier allocated by the first
        assert_eq!(first_book.author_ids, second_book.author_ids);
    }

    #[test]
    fn test_duplicate_entry_within_one_list() {
        let mut index = EntityIndex::default();
        let ext = ExternalRecord {
            authors: vec![entity("A", "u1"), entity("A", "u1")],
            ..Default::default()
        };

        let (book, pending) = merge(&source(&[]), &ext, &mut index);
        assert_eq!(pending.len(), 1);
        assert_eq!(book.author_ids.len(), 1);
    }

    #[test]
    fn test_entity_without_url_is_skipped() {
        let mut index = EntityIndex::default();
        let ext = ExternalRecord {
            publishers: vec![entity("Ballantine Books", "")],
            ..Default::default()
        };

        let (book, pending) = merge(&source(&[]), &ext, &mut index);
        assert!(book.publisher_ids.is_empty());
        assert!(pending.is_empty());
    }

    #[test]
    fn test_publishers_dedup_independently_of_authors() {
        let mut index = EntityIndex::default();
        let ext = ExternalRecord {
            authors: vec![entity("Same Name", "https://example.org/shared")],
            publishers: vec![entity("Same Name", "https://example.org/shared")],
            ..Default::default()
        };

        let (_, pending) = merge(&source(&[]), &ext, &mut index);
        // Same URL in both lists still creates one of each kind
        assert_eq!(pending.len(), 2);
    }
}
