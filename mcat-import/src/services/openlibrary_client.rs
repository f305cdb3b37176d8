//! OpenLibrary books API client
//!
//! One GET per ISBN against the `api/books` endpoint with
//! `jscmd=data&format=json`. The response is a JSON object keyed
//! `"ISBN:<isbn>"`; the client extracts the matching value. A batched
//! variant joins several bibkeys into one request.

use crate::types::ExternalRecord;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

const OPENLIBRARY_BASE_URL: &str = "https://openlibrary.org/api/books";
const USER_AGENT: &str = concat!("mcat-import/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Lookup client errors
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("network error: {0}")]
    Network(String),

    #[error("lookup service returned {0}: {1}")]
    Http(u16, String),

    #[error("no record found for ISBN {0}")]
    NotFound(String),

    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Seam over the remote lookup so the driver can run against a
/// scripted double in tests.
#[async_trait]
pub trait LookupService: Send + Sync {
    /// Fetch the record for one ISBN
    async fn fetch(&self, isbn: &str) -> Result<ExternalRecord, LookupError>;

    /// Prefetch several ISBNs at once. ISBNs with no record are simply
    /// absent from the result; only transport-level failures error.
    async fn fetch_many(
        &self,
        isbns: &[String],
    ) -> Result<HashMap<String, ExternalRecord>, LookupError> {
        let mut records = HashMap::with_capacity(isbns.len());
        for isbn in isbns {
            match self.fetch(isbn).await {
                Ok(record) => {
                    records.insert(isbn.clone(), record);
                }
                Err(LookupError::NotFound(_)) => {}
                Err(err) => return Err(err),
            }
        }
        Ok(records)
    }
}

/// OpenLibrary API client
pub struct OpenLibraryClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl OpenLibraryClient {
    pub fn new() -> Result<Self, LookupError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| LookupError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: OPENLIBRARY_BASE_URL.to_string(),
        })
    }

    /// Point the client at a different endpoint (local test server)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Issue one request for the given comma-joined bibkeys and parse
    /// the keyed response map.
    async fn query(&self, bibkeys: &str) -> Result<HashMap<String, ExternalRecord>, LookupError> {
        let url = format!(
            "{}?jscmd=data&format=json&bibkeys={}",
            self.base_url, bibkeys
        );

        tracing::debug!(bibkeys = %bibkeys, "Querying OpenLibrary API");

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| LookupError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(LookupError::Http(status.as_u16(), error_text));
        }

        // Anything other than an object of per-bibkey records is a
        // malformed response; missing fields inside a record are fine
        response
            .json::<HashMap<String, ExternalRecord>>()
            .await
            .map_err(|e| LookupError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl LookupService for OpenLibraryClient {
    async fn fetch(&self, isbn: &str) -> Result<ExternalRecord, LookupError> {
        let bibkey = format!("ISBN:{}", isbn);
        let mut records = self.query(&bibkey).await?;

        let record = records
            .remove(&bibkey)
            .ok_or_else(|| LookupError::NotFound(isbn.to_string()))?;

        tracing::info!(
            isbn = %isbn,
            title = %record.title.as_deref().unwrap_or("Unknown"),
            "Retrieved book data from OpenLibrary"
        );

        Ok(record)
    }

    async fn fetch_many(
        &self,
        isbns: &[String],
    ) -> Result<HashMap<String, ExternalRecord>, LookupError> {
        if isbns.is_empty() {
            return Ok(HashMap::new());
        }

        let bibkeys = isbns
            .iter()
            .map(|isbn| format!("ISBN:{}", isbn))
            .collect::<Vec<_>>()
            .join(",");

        let records = self.query(&bibkeys).await?;

        Ok(records
            .into_iter()
            .map(|(key, record)| {
                let isbn = key.strip_prefix("ISBN:").unwrap_or(&key).to_string();
                (isbn, record)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = OpenLibraryClient::new();
        assert!(client.is_ok());
    }

    #[test]
    fn test_keyed_response_shape_parses() {
        let body = r#"
        {
            "ISBN:9780345504968": {
                "title": "The Passage",
                "authors": [{"name": "Justin Cronin", "url": "https://openlibrary.org/authors/OL1234A"}],
                "publishers": [{"name": "Ballantine Books"}],
                "number_of_pages": 766,
                "publish_date": "2010"
            }
        }
        "#;

        let records: HashMap<String, ExternalRecord> =
            serde_json::from_str(body).expect("Keyed response should parse");
        let record = &records["ISBN:9780345504968"];

        assert_eq!(record.title.as_deref(), Some("The Passage"));
        assert_eq!(record.authors.len(), 1);
        // Publisher without a URL still parses; the URL is just empty
        assert_eq!(record.publishers[0].url, "");
    }

    #[test]
    fn test_top_level_array_is_malformed() {
        let body = r#"[{"title": "The Passage"}]"#;
        let result: Result<HashMap<String, ExternalRecord>, _> = serde_json::from_str(body);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_default_fetch_many_skips_not_found() {
        struct OneHit;

        #[async_trait]
        impl LookupService for OneHit {
            async fn fetch(&self, isbn: &str) -> Result<ExternalRecord, LookupError> {
                if isbn == "111" {
                    Ok(ExternalRecord {
                        title: Some("Hit".to_string()),
                        ..Default::default()
                    })
                } else {
                    Err(LookupError::NotFound(isbn.to_string()))
                }
            }
        }

        let records = OneHit
            .fetch_many(&["111".to_string(), "222".to_string()])
            .await
            .expect("NotFound entries must not fail the batch");

        assert_eq!(records.len(), 1);
        assert!(records.contains_key("111"));
    }
}
