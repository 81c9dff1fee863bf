use journal_core::{AiInsights, CanonicalTrade};
use serde::Serialize;
use std::time::Duration;

use crate::error::{AiError, AiResult};
use crate::{build_http_client, post_json};

#[derive(Debug, Serialize)]
struct InsightsRequest<'a> {
    trades: &'a [CanonicalTrade],
}

/// Client for the psychological-insight generation function
#[derive(Clone)]
pub struct InsightsClient {
    client: reqwest::Client,
    base_url: String,
}

impl InsightsClient {
    pub fn new(base_url: String, timeout: Duration) -> AiResult<Self> {
        Ok(Self {
            client: build_http_client(timeout)?,
            base_url,
        })
    }

    /// Callers are expected to cap `trades` before sending.
    pub async fn generate(&self, trades: &[CanonicalTrade]) -> AiResult<AiInsights> {
        let insights: AiInsights = post_json(
            &self.client,
            &format!("{}/generate-insights", self.base_url),
            &InsightsRequest { trades },
        )
        .await?;

        if insights.ai_key_insight.trim().is_empty()
            && insights.ai_strengths.is_empty()
            && insights.ai_mistakes.is_empty()
            && insights.ai_fixes.is_empty()
        {
            return Err(AiError::InvalidResponse("empty insights payload".into()));
        }

        Ok(insights)
    }
}
