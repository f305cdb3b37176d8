//! Database initialization
//!
//! Opens (or creates) the media catalog SQLite database and brings the
//! schema up to date. Table creation is idempotent, so calling this on
//! every startup is safe.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // Set busy timeout so a concurrent reader does not surface as an error
    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create all catalog tables (idempotent - safe to call multiple times)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_authors_table(pool).await?;
    create_publishers_table(pool).await?;
    create_books_table(pool).await?;

    // Linking tables
    create_book_authors_table(pool).await?;
    create_book_publishers_table(pool).await?;

    Ok(())
}

/// Authors table - reference entities keyed by their OpenLibrary URL
async fn create_authors_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS authors (
            guid TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            url TEXT NOT NULL UNIQUE,
            created_at TEXT DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Publishers table - reference entities keyed by their OpenLibrary URL
async fn create_publishers_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS publishers (
            guid TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            url TEXT NOT NULL UNIQUE,
            created_at TEXT DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Books table - one reconciled record per imported ISBN
async fn create_books_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS books (
            guid TEXT PRIMARY KEY,
            isbn TEXT NOT NULL,
            title TEXT,
            subtitle TEXT,
            pages INTEGER,
            publish_date TEXT,
            series TEXT,
            comments TEXT,
            summary TEXT,
            subjects TEXT,
            cover_url TEXT,
            created_at TEXT DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_book_authors_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS book_authors (
            book_id TEXT NOT NULL,
            author_id TEXT NOT NULL,
            PRIMARY KEY (book_id, author_id),
            FOREIGN KEY (book_id) REFERENCES books(guid),
            FOREIGN KEY (author_id) REFERENCES authors(guid)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_book_publishers_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS book_publishers (
            book_id TEXT NOT NULL,
            publisher_id TEXT NOT NULL,
            PRIMARY KEY (book_id, publisher_id),
            FOREIGN KEY (book_id) REFERENCES books(guid),
            FOREIGN KEY (publisher_id) REFERENCES publishers(guid)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::Row;

    #[tokio::test]
    async fn test_create_schema_idempotent() {
        // File-backed so every pool connection sees the same schema
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let pool = init_database(&dir.path().join("idempotent.db"))
            .await
            .expect("init_database failed");

        create_schema(&pool).await.expect("First schema creation failed");
        create_schema(&pool).await.expect("Second schema creation failed");

        let row = sqlx::query(
            "SELECT count(*) AS n FROM sqlite_master WHERE type = 'table' AND name IN \
             ('authors', 'publishers', 'books', 'book_authors', 'book_publishers')",
        )
        .fetch_one(&pool)
        .await
        .expect("Failed to query sqlite_master");

        let n: i64 = row.get("n");
        assert_eq!(n, 5);
    }

    #[tokio::test]
    async fn test_init_database_creates_file() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let db_path = dir.path().join("catalog.db");

        let pool = init_database(&db_path).await.expect("init_database failed");
        drop(pool);

        assert!(db_path.exists());
    }
}
