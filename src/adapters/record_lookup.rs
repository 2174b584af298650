use crate::adapters::http::HttpClient;
use crate::domain::model::MediaRecord;
use crate::domain::ports::RecordLookup;
use crate::utils::error::{Result, TeiError};
use async_trait::async_trait;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct MediaContentsResponse {
    media_contents: Option<Vec<MediaRecord>>,
}

/// Resolves item ids through the public `media_contents` endpoint of a record API.
#[derive(Debug, Clone)]
pub struct CoreDataLookup {
    http: HttpClient,
    base_url: String,
    project_id: u64,
}

impl CoreDataLookup {
    pub fn new(http: HttpClient, base_url: impl Into<String>, project_id: u64) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            project_id,
        }
    }

    pub fn media_url(&self, record_id: &str) -> String {
        format!(
            "{}/core_data/public/v1/items/{}/media_contents?project_ids={}",
            self.base_url.trim_end_matches('/'),
            record_id,
            self.project_id
        )
    }
}

#[async_trait]
impl RecordLookup for CoreDataLookup {
    async fn lookup(&self, record_id: &str) -> Result<MediaRecord> {
        let lookup_failed = |reason: String| TeiError::RecordLookup {
            record_id: record_id.to_string(),
            reason,
        };

        let json = self
            .http
            .get_json(&self.media_url(record_id))
            .await
            .map_err(|e| lookup_failed(e.to_string()))?;

        let response: MediaContentsResponse =
            serde_json::from_value(json).map_err(|e| lookup_failed(e.to_string()))?;

        let media = response
            .media_contents
            .ok_or_else(|| lookup_failed("response has no media_contents".to_string()))?;

        let record = media
            .into_iter()
            .next()
            .ok_or_else(|| TeiError::RecordNotFound {
                record_id: record_id.to_string(),
            })?;
        tracing::debug!("Record {} -> {}", record_id, record.manifest_url);
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    async fn lookup_against(body: serde_json::Value) -> Result<MediaRecord> {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/core_data/public/v1/items/item-1/media_contents")
                    .query_param("project_ids", "92");
                then.status(200).json_body(body);
            })
            .await;

        CoreDataLookup::new(HttpClient::new(), server.base_url(), 92)
            .lookup("item-1")
            .await
    }

    #[tokio::test]
    async fn test_first_media_record_wins() {
        let record = lookup_against(serde_json::json!({
            "media_contents": [
                {"manifest_url": "https://example.org/a/manifest", "name": "First"},
                {"manifest_url": "https://example.org/b/manifest", "name": "Second"}
            ]
        }))
        .await
        .unwrap();

        assert_eq!(record.manifest_url, "https://example.org/a/manifest");
        assert_eq!(record.name.as_deref(), Some("First"));
    }

    #[tokio::test]
    async fn test_empty_media_is_not_found() {
        let err = lookup_against(serde_json::json!({"media_contents": []}))
            .await
            .unwrap_err();
        assert!(matches!(err, TeiError::RecordNotFound { ref record_id } if record_id == "item-1"));
    }

    #[tokio::test]
    async fn test_missing_media_contents_is_lookup_error() {
        let err = lookup_against(serde_json::json!({"error": "not found"}))
            .await
            .unwrap_err();
        assert!(matches!(err, TeiError::RecordLookup { .. }));
        assert!(err.to_string().contains("item-1"));
    }

    #[test]
    fn test_media_url() {
        let lookup = CoreDataLookup::new(HttpClient::new(), "https://app.coredata.cloud/", 92);
        assert_eq!(
            lookup.media_url("abc"),
            "https://app.coredata.cloud/core_data/public/v1/items/abc/media_contents?project_ids=92"
        );
    }
}
