pub mod classifier;
pub mod column_mapping;
pub mod error;
pub mod insights;
pub mod provider;

pub use classifier::ClassifierClient;
pub use column_mapping::ColumnMappingClient;
pub use error::{AiError, AiResult};
pub use insights::InsightsClient;
pub use provider::{AiProvider, DisabledAiProvider, HttpAiProvider};

use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;

/// Configuration for the hosted AI functions
#[derive(Debug, Clone)]
pub struct AiConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub disabled: bool,
}

impl AiConfig {
    /// `AI_SERVICE_URL`, `AI_TIMEOUT_SECS`, `AI_DISABLED`
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("AI_SERVICE_URL")
                .unwrap_or_else(|_| "http://localhost:8010".to_string()),
            timeout: Duration::from_secs(
                std::env::var("AI_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(20),
            ),
            disabled: std::env::var("AI_DISABLED")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Request body shared by the classification and mapping functions.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvPreview {
    pub csv_headers: Vec<String>,
    pub csv_data_sample: Vec<HashMap<String, String>>,
}

/// All AI service clients behind one handle
#[derive(Clone)]
pub struct AiClient {
    pub classifier: ClassifierClient,
    pub column_mapping: ColumnMappingClient,
    pub insights: InsightsClient,
}

impl AiClient {
    pub fn new(config: &AiConfig) -> AiResult<Self> {
        Ok(Self {
            classifier: ClassifierClient::new(config.base_url.clone(), config.timeout)?,
            column_mapping: ColumnMappingClient::new(config.base_url.clone(), config.timeout)?,
            insights: InsightsClient::new(config.base_url.clone(), config.timeout)?,
        })
    }
}

pub(crate) fn build_http_client(timeout: Duration) -> AiResult<reqwest::Client> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;
    Ok(client)
}

pub(crate) async fn post_json<Req, Resp>(
    client: &reqwest::Client,
    url: &str,
    body: &Req,
) -> AiResult<Resp>
where
    Req: Serialize + ?Sized,
    Resp: serde::de::DeserializeOwned,
{
    let response = client.post(url).json(body).send().await?;

    if !response.status().is_success() {
        return Err(AiError::ServiceUnavailable(format!(
            "Status: {}",
            response.status()
        )));
    }

    let text = response.text().await?;
    serde_json::from_str::<Resp>(&text).map_err(|e| AiError::InvalidResponse(e.to_string()))
}
