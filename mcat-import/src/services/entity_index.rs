//! Existing entity index
//!
//! Snapshot of the authors and publishers already in the store, keyed
//! by their canonical URL. Built once at run start so every dedup
//! check is an O(1) map lookup instead of a query. The index is the
//! single source of truth for "does this entity already exist": once a
//! key is present (pre-existing or staged this run) it is never
//! created again.

use crate::types::{EntityKind, IndexedEntity};
use mcat_common::{Error, Result};
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

/// In-run dedup index over reference entities
#[derive(Debug, Default)]
pub struct EntityIndex {
    authors: HashMap<String, IndexedEntity>,
    publishers: HashMap<String, IndexedEntity>,
}

impl EntityIndex {
    /// Load all stored authors and publishers into the index
    pub async fn load(pool: &SqlitePool) -> Result<Self> {
        let mut index = Self::default();

        for kind in [EntityKind::Author, EntityKind::Publisher] {
            let table = match kind {
                EntityKind::Author => "authors",
                EntityKind::Publisher => "publishers",
            };

            let rows = sqlx::query(&format!("SELECT guid, name, url FROM {}", table))
                .fetch_all(pool)
                .await?;

            for row in rows {
                let guid_str: String = row.get("guid");
                let id = Uuid::parse_str(&guid_str).map_err(|e| {
                    Error::Internal(format!("invalid guid '{}' in {}: {}", guid_str, table, e))
                })?;

                index.insert(
                    kind,
                    IndexedEntity {
                        id,
                        name: row.get("name"),
                        url: row.get("url"),
                    },
                );
            }
        }

        info!(
            "Indexed existing entities: {} authors, {} publishers",
            index.count(EntityKind::Author),
            index.count(EntityKind::Publisher)
        );

        Ok(index)
    }

    /// Look up an entity by its natural key
    pub fn get(&self, kind: EntityKind, url: &str) -> Option<&IndexedEntity> {
        self.map(kind).get(url)
    }

    /// Register an entity under its natural key.
    ///
    /// Used at load time and for provisional entries staged during the
    /// run, so later rows resolve them without a second creation.
    pub fn insert(&mut self, kind: EntityKind, entity: IndexedEntity) {
        self.map_mut(kind).insert(entity.url.clone(), entity);
    }

    pub fn count(&self, kind: EntityKind) -> usize {
        self.map(kind).len()
    }

    fn map(&self, kind: EntityKind) -> &HashMap<String, IndexedEntity> {
        match kind {
            EntityKind::Author => &self.authors,
            EntityKind::Publisher => &self.publishers,
        }
    }

    fn map_mut(&mut self, kind: EntityKind) -> &mut HashMap<String, IndexedEntity> {
        match kind {
            EntityKind::Author => &mut self.authors,
            EntityKind::Publisher => &mut self.publishers,
        }
    }
}
