//! Import driver
//!
//! Thin per-row loop over the core: obtain an external record (cache
//! first, then a live fetch), reconcile, stage. Rows that cannot be
//! completed are skipped with a reason and counted; storage failures
//! abort the run into the rollback path. One finish call decides the
//! whole run.

use crate::services::batch_writer::BatchWriter;
use crate::services::entity_index::EntityIndex;
use crate::services::lookup_cache::LookupCache;
use crate::services::openlibrary_client::LookupService;
use crate::services::reconciler;
use crate::types::{ExternalRecord, SourceRecord};
use crate::{ImportError, ImportResult};
use sqlx::SqlitePool;
use std::collections::HashMap;
use tracing::{debug, error, info, warn};

/// Counters reported at the end of a run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportOutcome {
    pub total_rows: u64,
    pub imported: u64,
    pub skipped_missing_isbn: u64,
    pub skipped_lookup: u64,
    pub cache_hits: u64,
    pub live_fetches: u64,
    pub entities_created: u64,
    pub committed: bool,
}

/// One import run over a row source
pub struct ImportDriver<'a> {
    pool: &'a SqlitePool,
    lookup: &'a dyn LookupService,
    cache: &'a dyn LookupCache,
    commit: bool,
}

impl<'a> ImportDriver<'a> {
    pub fn new(
        pool: &'a SqlitePool,
        lookup: &'a dyn LookupService,
        cache: &'a dyn LookupCache,
        commit: bool,
    ) -> Self {
        Self {
            pool,
            lookup,
            cache,
            commit,
        }
    }

    /// Process every row, then commit or roll back the whole run.
    ///
    /// A fatal error (storage, unreadable input) aborts the loop and
    /// forces a rollback before the error is returned.
    pub async fn run<I>(&self, rows: I) -> ImportResult<ImportOutcome>
    where
        I: IntoIterator<Item = ImportResult<HashMap<String, String>>>,
    {
        let mut index = EntityIndex::load(self.pool).await?;
        let mut writer = BatchWriter::begin(self.pool).await?;
        let mut outcome = ImportOutcome::default();

        let result = self
            .process_rows(rows, &mut index, &mut writer, &mut outcome)
            .await;

        match result {
            Ok(()) => {
                if self.commit {
                    info!("Commit requested, committing transaction");
                } else {
                    info!("Commit not requested, rolling back transaction (dry run)");
                }
                writer.finish(self.commit).await?;
                outcome.committed = self.commit;

                info!(
                    "Import complete: {} / {} rows imported, {} entities created, \
                     {} skipped (no ISBN), {} skipped (lookup), {} cache hits, {} live fetches",
                    outcome.imported,
                    outcome.total_rows,
                    outcome.entities_created,
                    outcome.skipped_missing_isbn,
                    outcome.skipped_lookup,
                    outcome.cache_hits,
                    outcome.live_fetches
                );

                Ok(outcome)
            }
            Err(err) => {
                error!("Aborting run, rolling back all staged work: {}", err);
                if let Err(rollback_err) = writer.finish(false).await {
                    error!("Rollback itself failed: {}", rollback_err);
                }
                Err(err)
            }
        }
    }

    async fn process_rows<I>(
        &self,
        rows: I,
        index: &mut EntityIndex,
        writer: &mut BatchWriter,
        outcome: &mut ImportOutcome,
    ) -> ImportResult<()>
    where
        I: IntoIterator<Item = ImportResult<HashMap<String, String>>>,
    {
        for (row_no, row) in rows.into_iter().enumerate() {
            let fields = row?;
            outcome.total_rows += 1;

            let record = match SourceRecord::new(fields) {
                Ok(record) => record,
                Err(ImportError::MissingIsbn) => {
                    // Don't waste a potential API hit on a blank ISBN
                    warn!("Skipping row {}: ISBN value is missing", row_no + 1);
                    outcome.skipped_missing_isbn += 1;
                    continue;
                }
                Err(err) => return Err(err),
            };

            debug!("Fetching data for row {} with ISBN {}", row_no + 1, record.isbn());

            let external = match self.obtain_external(record.isbn(), outcome).await {
                Some(external) => external,
                None => {
                    outcome.skipped_lookup += 1;
                    continue;
                }
            };

            let (book, pending) = reconciler::merge(&record, &external, index);

            for entity in &pending {
                writer.stage_entity(entity).await?;
                outcome.entities_created += 1;
            }
            writer.stage_book(&book).await?;

            outcome.imported += 1;
        }

        Ok(())
    }

    /// Cache first, live fetch on miss, cache the fetch result.
    ///
    /// Lookup failures are row-level: logged and reported as None so
    /// the caller skips the row. Cache I/O problems only cost the
    /// optimization, never the row.
    async fn obtain_external(
        &self,
        isbn: &str,
        outcome: &mut ImportOutcome,
    ) -> Option<ExternalRecord> {
        match self.cache.get(isbn) {
            Ok(Some(record)) => {
                debug!("Cache hit for ISBN {}", isbn);
                outcome.cache_hits += 1;
                return Some(record);
            }
            Ok(None) => {}
            Err(err) => warn!("Cache read failed for ISBN {}: {}", isbn, err),
        }

        match self.lookup.fetch(isbn).await {
            Ok(record) => {
                outcome.live_fetches += 1;
                if let Err(err) = self.cache.put(isbn, &record) {
                    warn!("Cache write failed for ISBN {}: {}", isbn, err);
                }
                Some(record)
            }
            Err(err) => {
                warn!("Skipping ISBN {}: {}", isbn, err);
                None
            }
        }
    }
}
