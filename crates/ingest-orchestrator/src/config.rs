use trade_normalizer::SidePolicy;

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Pipeline tuning knobs.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Rows sent to the classification and mapping services (max 5).
    pub sample_rows: usize,
    /// Trades sent to the insights service.
    pub insight_trade_cap: usize,
    /// Row diagnostics kept in the summary.
    pub error_preview: usize,
    pub side_policy: SidePolicy,
    /// Trades per insert transaction.
    pub insert_chunk: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            sample_rows: 5,
            insight_trade_cap: 100,
            error_preview: 10,
            side_policy: SidePolicy::Strict,
            insert_chunk: 200,
        }
    }
}

impl IngestConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            sample_rows: env_or("INGEST_SAMPLE_ROWS", defaults.sample_rows)
                .min(column_mapper::MAX_SAMPLE_ROWS),
            insight_trade_cap: env_or("INGEST_INSIGHT_TRADE_CAP", defaults.insight_trade_cap),
            error_preview: env_or("INGEST_ERROR_PREVIEW", defaults.error_preview),
            side_policy: env_or("INGEST_SIDE_POLICY", defaults.side_policy),
            insert_chunk: env_or("INGEST_INSERT_CHUNK", defaults.insert_chunk).max(1),
        }
    }
}
