use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use journal_core::{AiInsights, CanonicalTrade, Journal, Metrics, Side, TradeSession};

/// Stored datetime form. Fixed width so text order is time order.
pub(crate) fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct TradeRow {
    pub id: i64,
    pub session_id: i64,
    pub journal_id: i64,
    pub datetime: String,
    pub symbol: String,
    pub side: String,
    pub qty: f64,
    pub price: f64,
    pub pnl: f64,
    pub notes: Option<String>,
    pub strategy: Option<String>,
    pub tags: String,
    pub image_url: Option<String>,
    pub buy_fill_id: Option<String>,
    pub sell_fill_id: Option<String>,
}

impl TryFrom<TradeRow> for CanonicalTrade {
    type Error = anyhow::Error;

    fn try_from(row: TradeRow) -> Result<Self> {
        let datetime = DateTime::parse_from_rfc3339(&row.datetime)
            .with_context(|| format!("trade {} has bad datetime '{}'", row.id, row.datetime))?
            .with_timezone(&Utc);
        let side = Side::from_canonical(&row.side)
            .ok_or_else(|| anyhow!("trade {} has bad side '{}'", row.id, row.side))?;
        let tags: Vec<String> = serde_json::from_str(&row.tags).unwrap_or_default();

        Ok(CanonicalTrade {
            id: Some(row.id),
            session_id: Some(row.session_id),
            journal_id: row.journal_id,
            datetime,
            symbol: row.symbol,
            side,
            qty: row.qty,
            price: row.price,
            pnl: row.pnl,
            notes: row.notes,
            strategy: row.strategy,
            tags,
            image_url: row.image_url,
            buy_fill_id: row.buy_fill_id,
            sell_fill_id: row.sell_fill_id,
        })
    }
}

pub(crate) const TRADE_COLUMNS: &str = "id, session_id, journal_id, datetime, symbol, side, qty, \
     price, pnl, notes, strategy, tags, image_url, buy_fill_id, sell_fill_id";

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct JournalRow {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub broker: Option<String>,
    pub prop_firm: Option<String>,
    pub account_size: Option<f64>,
    pub created_at: String,
}

impl From<JournalRow> for Journal {
    fn from(row: JournalRow) -> Self {
        Journal {
            id: row.id,
            name: row.name,
            description: row.description,
            broker: row.broker,
            prop_firm: row.prop_firm,
            account_size: row.account_size,
            created_at: Some(row.created_at),
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct SessionRow {
    pub id: i64,
    pub journal_id: i64,
    pub raw_upload_id: Option<i64>,
    pub metrics: String,
    pub ai_strengths: Option<String>,
    pub ai_mistakes: Option<String>,
    pub ai_fixes: Option<String>,
    pub ai_key_insight: Option<String>,
    pub created_at: String,
}

fn string_list(raw: &Option<String>) -> Vec<String> {
    raw.as_deref()
        .and_then(|s| serde_json::from_str(s).ok())
        .unwrap_or_default()
}

impl TryFrom<SessionRow> for TradeSession {
    type Error = anyhow::Error;

    fn try_from(row: SessionRow) -> Result<Self> {
        let metrics: Metrics = serde_json::from_str(&row.metrics)
            .with_context(|| format!("session {} has unreadable metrics", row.id))?;

        let insights = row.ai_key_insight.as_ref().map(|key_insight| AiInsights {
            ai_strengths: string_list(&row.ai_strengths),
            ai_mistakes: string_list(&row.ai_mistakes),
            ai_fixes: string_list(&row.ai_fixes),
            ai_key_insight: key_insight.clone(),
        });

        Ok(TradeSession {
            id: row.id,
            journal_id: row.journal_id,
            raw_upload_id: row.raw_upload_id,
            metrics,
            insights,
            created_at: Some(row.created_at),
        })
    }
}
