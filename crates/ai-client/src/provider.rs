use async_trait::async_trait;
use journal_core::{AiInsights, CanonicalTrade, ColumnMapping};

use crate::error::{AiError, AiResult};
use crate::{AiClient, CsvPreview};

/// Backend-agnostic interface for the hosted AI functions.
///
/// Every method may fail; callers own the fallback policy.
#[async_trait]
pub trait AiProvider: Send + Sync {
    /// Whether the upload looks like trading data at all.
    async fn classify_upload(&self, preview: &CsvPreview) -> AiResult<bool>;

    async fn map_columns(&self, preview: &CsvPreview) -> AiResult<ColumnMapping>;

    async fn generate_insights(&self, trades: &[CanonicalTrade]) -> AiResult<AiInsights>;

    fn backend_name(&self) -> &'static str;
}

/// HTTP-backed implementation that delegates to `AiClient`.
pub struct HttpAiProvider {
    client: AiClient,
}

impl HttpAiProvider {
    pub fn new(client: AiClient) -> Self {
        Self { client }
    }
}

impl From<AiClient> for HttpAiProvider {
    fn from(client: AiClient) -> Self {
        Self::new(client)
    }
}

#[async_trait]
impl AiProvider for HttpAiProvider {
    async fn classify_upload(&self, preview: &CsvPreview) -> AiResult<bool> {
        let response = self.client.classifier.classify(preview).await?;
        Ok(response.is_trading_related)
    }

    async fn map_columns(&self, preview: &CsvPreview) -> AiResult<ColumnMapping> {
        self.client.column_mapping.map_columns(preview).await
    }

    async fn generate_insights(&self, trades: &[CanonicalTrade]) -> AiResult<AiInsights> {
        self.client.insights.generate(trades).await
    }

    fn backend_name(&self) -> &'static str {
        "http"
    }
}

/// Offline provider: every call fails so the pipeline takes its fallbacks.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledAiProvider;

#[async_trait]
impl AiProvider for DisabledAiProvider {
    async fn classify_upload(&self, _preview: &CsvPreview) -> AiResult<bool> {
        Err(AiError::Disabled)
    }

    async fn map_columns(&self, _preview: &CsvPreview) -> AiResult<ColumnMapping> {
        Err(AiError::Disabled)
    }

    async fn generate_insights(&self, _trades: &[CanonicalTrade]) -> AiResult<AiInsights> {
        Err(AiError::Disabled)
    }

    fn backend_name(&self) -> &'static str {
        "disabled"
    }
}
