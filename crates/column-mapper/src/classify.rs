use ai_client::{AiProvider, CsvPreview};
use tracing::{info, warn};

const TRADING_HEADER_HINTS: &[&str] = &["symbol", "pnl", "price"];

/// Local stand-in for the classification function: any header mentioning
/// a symbol, P&L or price column is enough.
pub fn looks_like_trading_data(headers: &[String]) -> bool {
    headers.iter().any(|h| {
        let lower = h.to_lowercase();
        TRADING_HEADER_HINTS.iter().any(|hint| lower.contains(hint))
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub is_trading_related: bool,
    /// Set when the service could not answer and the header check was used.
    pub fallback_reason: Option<String>,
}

/// Ask the classification service whether the upload is trading data.
/// Falls back to the header check on any service error.
pub async fn classify_upload(provider: &dyn AiProvider, preview: &CsvPreview) -> Classification {
    match provider.classify_upload(preview).await {
        Ok(is_trading_related) => {
            info!(
                "Classification service ({}) answered is_trading_related={}",
                provider.backend_name(),
                is_trading_related
            );
            Classification {
                is_trading_related,
                fallback_reason: None,
            }
        }
        Err(e) => {
            warn!("Classification service failed, using header check: {}", e);
            Classification {
                is_trading_related: looks_like_trading_data(&preview.csv_headers),
                fallback_reason: Some(e.to_string()),
            }
        }
    }
}
