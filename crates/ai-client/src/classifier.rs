use serde::Deserialize;
use std::time::Duration;

use crate::error::AiResult;
use crate::{build_http_client, post_json, CsvPreview};

#[derive(Debug, Clone, Deserialize)]
pub struct ClassificationResponse {
    pub is_trading_related: bool,
}

/// Asks the validation function whether an upload looks like trade data.
#[derive(Clone)]
pub struct ClassifierClient {
    client: reqwest::Client,
    base_url: String,
}

impl ClassifierClient {
    pub fn new(base_url: String, timeout: Duration) -> AiResult<Self> {
        Ok(Self {
            client: build_http_client(timeout)?,
            base_url,
        })
    }

    pub async fn classify(&self, preview: &CsvPreview) -> AiResult<ClassificationResponse> {
        post_json(
            &self.client,
            &format!("{}/validate-csv", self.base_url),
            preview,
        )
        .await
    }
}
