//! Batch writer
//!
//! All writes for a run happen inside one open transaction. Staging is
//! eager so generated identifiers are visible to later rows, but
//! nothing is durable until `finish(commit=true)`. There is no
//! partial-commit mode; `finish(commit=false)` discards the entire
//! run.

use crate::types::{CanonicalBook, EntityKind, PendingEntityCreation};
use mcat_common::Result;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::info;
use uuid::Uuid;

/// Staged writes for one import run
pub struct BatchWriter {
    tx: Transaction<'static, Sqlite>,
    entities_staged: u64,
    books_staged: u64,
}

impl BatchWriter {
    /// Open the run's transaction
    pub async fn begin(pool: &SqlitePool) -> Result<Self> {
        Ok(Self {
            tx: pool.begin().await?,
            entities_staged: 0,
            books_staged: 0,
        })
    }

    /// Insert a pending reference entity inside the open transaction.
    ///
    /// Returns the entity's identifier so dependent rows later in the
    /// run can reference it before the transaction finalizes.
    pub async fn stage_entity(&mut self, pending: &PendingEntityCreation) -> Result<Uuid> {
        let sql = match pending.kind {
            EntityKind::Author => {
                "INSERT INTO authors (guid, name, url, created_at) \
                 VALUES (?, ?, ?, CURRENT_TIMESTAMP)"
            }
            EntityKind::Publisher => {
                "INSERT INTO publishers (guid, name, url, created_at) \
                 VALUES (?, ?, ?, CURRENT_TIMESTAMP)"
            }
        };

        sqlx::query(sql)
            .bind(pending.id.to_string())
            .bind(&pending.name)
            .bind(&pending.url)
            .execute(&mut *self.tx)
            .await?;

        self.entities_staged += 1;
        info!("Creating {} {} ({})", pending.kind, pending.name, pending.url);

        Ok(pending.id)
    }

    /// Insert a reconciled book and its author/publisher links
    pub async fn stage_book(&mut self, book: &CanonicalBook) -> Result<Uuid> {
        let book_id = Uuid::new_v4();
        let subjects_json = serde_json::to_string(&book.subjects)?;

        sqlx::query(
            r#"
            INSERT INTO books (
                guid, isbn, title, subtitle, pages, publish_date,
                series, comments, summary, subjects, cover_url, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP)
            "#,
        )
        .bind(book_id.to_string())
        .bind(&book.isbn)
        .bind(&book.title)
        .bind(&book.subtitle)
        .bind(book.pages)
        .bind(&book.publish_date)
        .bind(&book.series)
        .bind(&book.comments)
        .bind(&book.summary)
        .bind(subjects_json)
        .bind(&book.cover_url)
        .execute(&mut *self.tx)
        .await?;

        for author_id in &book.author_ids {
            sqlx::query("INSERT INTO book_authors (book_id, author_id) VALUES (?, ?)")
                .bind(book_id.to_string())
                .bind(author_id.to_string())
                .execute(&mut *self.tx)
                .await?;
        }

        for publisher_id in &book.publisher_ids {
            sqlx::query("INSERT INTO book_publishers (book_id, publisher_id) VALUES (?, ?)")
                .bind(book_id.to_string())
                .bind(publisher_id.to_string())
                .execute(&mut *self.tx)
                .await?;
        }

        self.books_staged += 1;

        Ok(book_id)
    }

    pub fn entities_staged(&self) -> u64 {
        self.entities_staged
    }

    pub fn books_staged(&self) -> u64 {
        self.books_staged
    }

    /// Finalize the run: commit everything or discard everything
    pub async fn finish(self, commit: bool) -> Result<()> {
        if commit {
            self.tx.commit().await?;
            info!(
                "Committed transaction: {} entities, {} books",
                self.entities_staged, self.books_staged
            );
        } else {
            self.tx.rollback().await?;
            info!(
                "Rolled back transaction: {} staged entities and {} staged books discarded",
                self.entities_staged, self.books_staged
            );
        }

        Ok(())
    }
}
