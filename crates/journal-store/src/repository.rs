use anyhow::{Context, Result};
use async_trait::async_trait;
use journal_core::{
    AiInsights, CanonicalTrade, DuplicateMatch, JournalError, JournalResult, Metrics,
    RawUploadedFile, TradeRepository,
};
use trade_dedup::StoredKeyIndex;
use tracing::debug;

use crate::db::JournalDb;
use crate::models::{format_datetime, TradeRow, TRADE_COLUMNS};

impl JournalDb {
    pub async fn insert_raw_upload(&self, upload: &RawUploadedFile) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO raw_uploads (journal_id, file_name, content_sha256, headers, original_rows, mapping)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(upload.journal_id)
        .bind(&upload.file_name)
        .bind(&upload.content_sha256)
        .bind(serde_json::to_string(&upload.headers)?)
        .bind(serde_json::to_string(&upload.original_rows)?)
        .bind(serde_json::to_string(&upload.mapping)?)
        .execute(self.pool())
        .await
        .with_context(|| format!("failed to store raw upload '{}'", upload.file_name))?;

        Ok(result.last_insert_rowid())
    }

    pub async fn insert_session(
        &self,
        journal_id: i64,
        raw_upload_id: i64,
        metrics: &Metrics,
    ) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO trade_sessions (journal_id, raw_upload_id, total_trades, total_pnl, win_rate, metrics)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(journal_id)
        .bind(raw_upload_id)
        .bind(metrics.total_trades as i64)
        .bind(metrics.total_pnl)
        .bind(metrics.win_rate)
        .bind(serde_json::to_string(metrics)?)
        .execute(self.pool())
        .await
        .context("failed to create trade session")?;

        Ok(result.last_insert_rowid())
    }

    /// Insert a batch inside one transaction: all rows or none.
    pub async fn insert_trade_batch(&self, session_id: i64, trades: &[CanonicalTrade]) -> Result<usize> {
        let mut tx = self.pool().begin().await?;

        for trade in trades {
            sqlx::query(
                r#"
                INSERT INTO trades (session_id, journal_id, datetime, symbol, side, qty, price, pnl,
                                    notes, strategy, tags, image_url, buy_fill_id, sell_fill_id)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(session_id)
            .bind(trade.journal_id)
            .bind(format_datetime(&trade.datetime))
            .bind(&trade.symbol)
            .bind(trade.side.as_str())
            .bind(trade.qty)
            .bind(trade.price)
            .bind(trade.pnl)
            .bind(&trade.notes)
            .bind(&trade.strategy)
            .bind(serde_json::to_string(&trade.tags)?)
            .bind(&trade.image_url)
            .bind(&trade.buy_fill_id)
            .bind(&trade.sell_fill_id)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("failed to insert {} trade at {}", trade.symbol, trade.datetime))?;
        }

        tx.commit().await?;
        debug!("Inserted {} trades into session {}", trades.len(), session_id);
        Ok(trades.len())
    }

    pub async fn trades_for_session(&self, session_id: i64) -> Result<Vec<CanonicalTrade>> {
        let rows = sqlx::query_as::<_, TradeRow>(&format!(
            "SELECT {} FROM trades WHERE session_id = ? ORDER BY datetime, id",
            TRADE_COLUMNS
        ))
        .bind(session_id)
        .fetch_all(self.pool())
        .await?;

        rows.into_iter().map(CanonicalTrade::try_from).collect()
    }

    /// Every persisted trade of a journal, oldest first.
    pub async fn trades_for_journal(&self, journal_id: i64) -> Result<Vec<CanonicalTrade>> {
        let rows = sqlx::query_as::<_, TradeRow>(&format!(
            "SELECT {} FROM trades WHERE journal_id = ? ORDER BY datetime, id",
            TRADE_COLUMNS
        ))
        .bind(journal_id)
        .fetch_all(self.pool())
        .await?;

        rows.into_iter().map(CanonicalTrade::try_from).collect()
    }

    pub async fn set_session_metrics(&self, session_id: i64, metrics: &Metrics) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE trade_sessions
            SET total_trades = ?, total_pnl = ?, win_rate = ?, metrics = ?
            WHERE id = ?
            "#,
        )
        .bind(metrics.total_trades as i64)
        .bind(metrics.total_pnl)
        .bind(metrics.win_rate)
        .bind(serde_json::to_string(metrics)?)
        .bind(session_id)
        .execute(self.pool())
        .await?;

        Ok(())
    }

    pub async fn set_session_insights(&self, session_id: i64, insights: &AiInsights) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE trade_sessions
            SET ai_strengths = ?, ai_mistakes = ?, ai_fixes = ?, ai_key_insight = ?
            WHERE id = ?
            "#,
        )
        .bind(serde_json::to_string(&insights.ai_strengths)?)
        .bind(serde_json::to_string(&insights.ai_mistakes)?)
        .bind(serde_json::to_string(&insights.ai_fixes)?)
        .bind(&insights.ai_key_insight)
        .bind(session_id)
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// One query for the journal's stored trades, then an in-memory key match.
    pub async fn match_stored_trades(
        &self,
        journal_id: i64,
        candidates: &[CanonicalTrade],
    ) -> Result<Vec<DuplicateMatch>> {
        let stored = self.trades_for_journal(journal_id).await?;
        let index = StoredKeyIndex::build(&stored);
        debug!(
            "Duplicate lookup: {} candidates against {} stored trades ({} keys)",
            candidates.len(),
            stored.len(),
            index.len()
        );
        Ok(index.matches(candidates))
    }
}

#[async_trait]
impl TradeRepository for JournalDb {
    async fn save_raw_upload(&self, upload: &RawUploadedFile) -> JournalResult<i64> {
        self.insert_raw_upload(upload).await.map_err(JournalError::database)
    }

    async fn create_session(
        &self,
        journal_id: i64,
        raw_upload_id: i64,
        metrics: &Metrics,
    ) -> JournalResult<i64> {
        self.insert_session(journal_id, raw_upload_id, metrics)
            .await
            .map_err(JournalError::database)
    }

    async fn insert_trades(&self, session_id: i64, trades: &[CanonicalTrade]) -> JournalResult<usize> {
        self.insert_trade_batch(session_id, trades)
            .await
            .map_err(JournalError::database)
    }

    async fn session_trades(&self, session_id: i64) -> JournalResult<Vec<CanonicalTrade>> {
        self.trades_for_session(session_id)
            .await
            .map_err(JournalError::database)
    }

    async fn journal_trades(&self, journal_id: i64) -> JournalResult<Vec<CanonicalTrade>> {
        self.trades_for_journal(journal_id)
            .await
            .map_err(JournalError::database)
    }

    async fn update_session_metrics(&self, session_id: i64, metrics: &Metrics) -> JournalResult<()> {
        self.set_session_metrics(session_id, metrics)
            .await
            .map_err(JournalError::database)
    }

    async fn update_session_insights(
        &self,
        session_id: i64,
        insights: &AiInsights,
    ) -> JournalResult<()> {
        self.set_session_insights(session_id, insights)
            .await
            .map_err(JournalError::database)
    }

    async fn find_duplicates(
        &self,
        journal_id: i64,
        trades: &[CanonicalTrade],
    ) -> JournalResult<Vec<DuplicateMatch>> {
        self.match_stored_trades(journal_id, trades)
            .await
            .map_err(|e| JournalError::Unavailable(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use journal_core::{ColumnMapping, JournalInput, MatchType, Side};
    use std::collections::HashMap;

    async fn setup() -> (JournalDb, i64, i64) {
        let db = JournalDb::new("sqlite::memory:").await.unwrap();
        let journal = db
            .create_journal(&JournalInput {
                name: "Futures".into(),
                ..Default::default()
            })
            .await
            .unwrap();

        let upload = RawUploadedFile {
            id: None,
            journal_id: journal.id,
            file_name: "trades.csv".into(),
            content_sha256: "abc".into(),
            headers: vec!["symbol".into()],
            original_rows: vec![HashMap::from([("symbol".to_string(), "ES".to_string())])],
            mapping: ColumnMapping::new(),
        };
        let raw_id = db.save_raw_upload(&upload).await.unwrap();
        let session_id = db
            .create_session(journal.id, raw_id, &Metrics::default())
            .await
            .unwrap();
        (db, journal.id, session_id)
    }

    fn trade(journal_id: i64, minute: u32, pnl: f64) -> CanonicalTrade {
        CanonicalTrade {
            id: None,
            session_id: None,
            journal_id,
            datetime: Utc.with_ymd_and_hms(2024, 1, 15, 9, minute, 0).unwrap(),
            symbol: "ES".into(),
            side: Side::Sell,
            qty: 2.0,
            price: 4800.25,
            pnl,
            notes: Some("fade".into()),
            strategy: None,
            tags: vec!["a".into(), "b".into()],
            image_url: None,
            buy_fill_id: Some("B1".into()),
            sell_fill_id: Some(format!("S{minute}")),
        }
    }

    #[tokio::test]
    async fn test_insert_and_read_back() {
        let (db, journal_id, session_id) = setup().await;

        let inserted = db
            .insert_trades(session_id, &[trade(journal_id, 45, -20.0), trade(journal_id, 30, 50.0)])
            .await
            .unwrap();
        assert_eq!(inserted, 2);

        let stored = db.session_trades(session_id).await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].pnl, 50.0);
        assert_eq!(stored[0].session_id, Some(session_id));
        assert_eq!(stored[0].tags, vec!["a", "b"]);
        assert_eq!(stored[0].side, Side::Sell);
        assert_eq!(stored[1].datetime, Utc.with_ymd_and_hms(2024, 1, 15, 9, 45, 0).unwrap());
    }

    #[tokio::test]
    async fn test_batch_is_atomic() {
        let (db, journal_id, session_id) = setup().await;

        // Second trade points at a journal that doesn't exist.
        let result = db
            .insert_trades(session_id, &[trade(journal_id, 30, 1.0), trade(9999, 31, 1.0)])
            .await;
        assert!(result.is_err());
        assert!(db.session_trades(session_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_find_duplicates() {
        let (db, journal_id, session_id) = setup().await;
        db.insert_trades(session_id, &[trade(journal_id, 30, 50.0)])
            .await
            .unwrap();

        let mut reformatted = trade(journal_id, 30, 50.0);
        reformatted.price = 4800.2500;
        let matches = db
            .find_duplicates(journal_id, &[reformatted, trade(journal_id, 31, 5.0)])
            .await
            .unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].match_type, Some(MatchType::FillPair));
        assert!(!matches[1].is_duplicate);
    }

    #[tokio::test]
    async fn test_session_metrics_and_insights() {
        let (db, _journal_id, session_id) = setup().await;

        let metrics = Metrics {
            total_trades: 3,
            total_pnl: 12.5,
            ..Default::default()
        };
        db.update_session_metrics(session_id, &metrics).await.unwrap();

        let insights = AiInsights {
            ai_strengths: vec!["patience".into()],
            ai_key_insight: "size down on Fridays".into(),
            ..Default::default()
        };
        db.update_session_insights(session_id, &insights).await.unwrap();

        let session = db.get_session(session_id).await.unwrap().unwrap();
        assert_eq!(session.metrics.total_trades, 3);
        assert_eq!(session.insights, Some(insights));
    }
}
