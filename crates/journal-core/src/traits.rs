use async_trait::async_trait;

use crate::{AiInsights, CanonicalTrade, DuplicateMatch, JournalResult, Metrics, RawUploadedFile};

/// Persistence operations the ingestion pipeline needs.
///
/// The journal's trade set is append-only from the pipeline's point of view;
/// the only update is to a session's own metrics and insight fields.
#[async_trait]
pub trait TradeRepository: Send + Sync {
    async fn save_raw_upload(&self, upload: &RawUploadedFile) -> JournalResult<i64>;

    async fn create_session(
        &self,
        journal_id: i64,
        raw_upload_id: i64,
        metrics: &Metrics,
    ) -> JournalResult<i64>;

    /// Insert one batch atomically. Returns the number of rows written.
    async fn insert_trades(&self, session_id: i64, trades: &[CanonicalTrade]) -> JournalResult<usize>;

    /// Trades actually persisted for a session, ordered by datetime.
    async fn session_trades(&self, session_id: i64) -> JournalResult<Vec<CanonicalTrade>>;

    /// Every persisted trade of a journal, ordered by datetime.
    async fn journal_trades(&self, journal_id: i64) -> JournalResult<Vec<CanonicalTrade>>;

    async fn update_session_metrics(&self, session_id: i64, metrics: &Metrics) -> JournalResult<()>;

    async fn update_session_insights(&self, session_id: i64, insights: &AiInsights)
        -> JournalResult<()>;

    /// Batched duplicate lookup against the journal's stored trades.
    /// Returns one entry per input trade, indexed by position.
    async fn find_duplicates(
        &self,
        journal_id: i64,
        trades: &[CanonicalTrade],
    ) -> JournalResult<Vec<DuplicateMatch>>;
}

/// Scoped key-value store for user-level custom option lists.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, scope: &str, key: &str) -> JournalResult<Option<String>>;

    async fn set(&self, scope: &str, key: &str, value: &str) -> JournalResult<()>;

    /// All entries in a scope, ordered by key.
    async fn list(&self, scope: &str) -> JournalResult<Vec<(String, String)>>;
}
