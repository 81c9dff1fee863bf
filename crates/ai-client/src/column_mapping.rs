use journal_core::{CanonicalField, ColumnMapping};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::error::AiResult;
use crate::{build_http_client, post_json, CsvPreview};

/// Raw service answer. Unknown keys and null headers are tolerated.
#[derive(Debug, Clone, Deserialize)]
pub struct MappingResponse {
    #[serde(default)]
    pub mapping: HashMap<String, Option<String>>,
}

impl MappingResponse {
    /// Keep only recognised canonical keys with a non-blank header.
    pub fn into_mapping(self) -> ColumnMapping {
        let mut mapping = ColumnMapping::new();
        for (key, header) in self.mapping {
            let Some(field) = CanonicalField::from_key(&key) else {
                tracing::debug!("Ignoring unknown mapping key '{}'", key);
                continue;
            };
            if let Some(header) = header.map(|h| h.trim().to_string()).filter(|h| !h.is_empty()) {
                mapping.insert(field, header);
            }
        }
        mapping
    }
}

#[derive(Clone)]
pub struct ColumnMappingClient {
    client: reqwest::Client,
    base_url: String,
}

impl ColumnMappingClient {
    pub fn new(base_url: String, timeout: Duration) -> AiResult<Self> {
        Ok(Self {
            client: build_http_client(timeout)?,
            base_url,
        })
    }

    pub async fn map_columns(&self, preview: &CsvPreview) -> AiResult<ColumnMapping> {
        let response: MappingResponse = post_json(
            &self.client,
            &format!("{}/map-columns", self.base_url),
            preview,
        )
        .await?;
        Ok(response.into_mapping())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_into_mapping_drops_unknown_and_null_entries() {
        let response: MappingResponse = serde_json::from_value(serde_json::json!({
            "mapping": {
                "datetime": "Trade Time",
                "symbol": "Ticker",
                "commission": "Fees",
                "notes": null,
                "tags": "  "
            }
        }))
        .unwrap();

        let mapping = response.into_mapping();
        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping.get(CanonicalField::Datetime), Some("Trade Time"));
        assert_eq!(mapping.get(CanonicalField::Symbol), Some("Ticker"));
        assert!(!mapping.contains(CanonicalField::Notes));
    }

    #[tokio::test]
    async fn test_map_columns_parses_service_mapping() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/map-columns"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "mapping": { "pnl": "Net P&L", "buyPrice": "Entry" }
            })))
            .mount(&server)
            .await;

        let client = ColumnMappingClient::new(server.uri(), Duration::from_secs(5)).unwrap();
        let preview = CsvPreview {
            csv_headers: vec!["Net P&L".to_string(), "Entry".to_string()],
            csv_data_sample: Vec::new(),
        };
        let mapping = client.map_columns(&preview).await.unwrap();
        assert_eq!(mapping.get(CanonicalField::Pnl), Some("Net P&L"));
        assert_eq!(mapping.get(CanonicalField::BuyPrice), Some("Entry"));
    }

    #[tokio::test]
    async fn test_map_columns_rejects_garbage_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/map-columns"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = ColumnMappingClient::new(server.uri(), Duration::from_secs(5)).unwrap();
        let preview = CsvPreview {
            csv_headers: Vec::new(),
            csv_data_sample: Vec::new(),
        };
        let err = client.map_columns(&preview).await.unwrap_err();
        assert!(matches!(err, crate::AiError::InvalidResponse(_)));
    }
}
