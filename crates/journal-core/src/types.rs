use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Direction of a trade. Quantity is always unsigned; the side carries direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }

    /// Parse the canonical stored form (`BUY` / `SELL`).
    pub fn from_canonical(s: &str) -> Option<Self> {
        match s {
            "BUY" => Some(Side::Buy),
            "SELL" => Some(Side::Sell),
            _ => None,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical trade fields a source column can be mapped onto.
///
/// Serialized with the camelCase keys the mapping service speaks
/// (`datetime`, `buyPrice`, `imageUrl`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CanonicalField {
    Datetime,
    Symbol,
    Side,
    Qty,
    Price,
    BuyPrice,
    SellPrice,
    Pnl,
    Notes,
    Strategy,
    Tags,
    ImageUrl,
    BuyFillId,
    SellFillId,
    BoughtTimestamp,
    SoldTimestamp,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 16] = [
        CanonicalField::Datetime,
        CanonicalField::Symbol,
        CanonicalField::Side,
        CanonicalField::Qty,
        CanonicalField::Price,
        CanonicalField::BuyPrice,
        CanonicalField::SellPrice,
        CanonicalField::Pnl,
        CanonicalField::Notes,
        CanonicalField::Strategy,
        CanonicalField::Tags,
        CanonicalField::ImageUrl,
        CanonicalField::BuyFillId,
        CanonicalField::SellFillId,
        CanonicalField::BoughtTimestamp,
        CanonicalField::SoldTimestamp,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            CanonicalField::Datetime => "datetime",
            CanonicalField::Symbol => "symbol",
            CanonicalField::Side => "side",
            CanonicalField::Qty => "qty",
            CanonicalField::Price => "price",
            CanonicalField::BuyPrice => "buyPrice",
            CanonicalField::SellPrice => "sellPrice",
            CanonicalField::Pnl => "pnl",
            CanonicalField::Notes => "notes",
            CanonicalField::Strategy => "strategy",
            CanonicalField::Tags => "tags",
            CanonicalField::ImageUrl => "imageUrl",
            CanonicalField::BuyFillId => "buyFillId",
            CanonicalField::SellFillId => "sellFillId",
            CanonicalField::BoughtTimestamp => "boughtTimestamp",
            CanonicalField::SoldTimestamp => "soldTimestamp",
        }
    }

    /// Case-insensitive lookup by key. Accepts snake_case spellings as well
    /// (`buy_price`, `image_url`).
    pub fn from_key(key: &str) -> Option<Self> {
        let normalized: String = key
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.key().to_ascii_lowercase() == normalized)
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Mapping from canonical field to the literal header found in the upload.
///
/// May be partial. Completeness is checked by the caller, never here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnMapping(BTreeMap<CanonicalField, String>);

impl ColumnMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: CanonicalField, header: impl Into<String>) {
        self.0.insert(field, header.into());
    }

    pub fn get(&self, field: CanonicalField) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn contains(&self, field: CanonicalField) -> bool {
        self.0.contains_key(&field)
    }

    pub fn remove(&mut self, field: CanonicalField) -> Option<String> {
        self.0.remove(&field)
    }

    /// True if some field already claims `header`.
    pub fn claims_header(&self, header: &str) -> bool {
        self.0.values().any(|h| h == header)
    }

    pub fn iter(&self) -> impl Iterator<Item = (CanonicalField, &str)> {
        self.0.iter().map(|(f, h)| (*f, h.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One data record of an uploaded CSV, keyed by header.
///
/// Canonical trade fields are never read from here directly; they go
/// through a `ColumnMapping` first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    /// 1-based line number in the source file (the header is line 1).
    pub line: usize,
    pub cells: HashMap<String, String>,
}

impl RawRow {
    pub fn new(line: usize, cells: HashMap<String, String>) -> Self {
        Self { line, cells }
    }

    /// Trimmed cell value, `None` when the column is absent or blank.
    pub fn get(&self, header: &str) -> Option<&str> {
        self.cells
            .get(header)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Cell value for a mapped canonical field.
    pub fn field(&self, mapping: &ColumnMapping, field: CanonicalField) -> Option<&str> {
        mapping.get(field).and_then(|header| self.get(header))
    }

    pub fn is_blank(&self) -> bool {
        self.cells.values().all(|v| v.trim().is_empty())
    }
}

/// The atomic unit of the journal: one normalized, validated trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalTrade {
    pub id: Option<i64>,
    pub session_id: Option<i64>,
    pub journal_id: i64,
    pub datetime: DateTime<Utc>,
    pub symbol: String,
    pub side: Side,
    pub qty: f64,
    pub price: f64,
    pub pnl: f64,
    pub notes: Option<String>,
    pub strategy: Option<String>,
    pub tags: Vec<String>,
    pub image_url: Option<String>,
    pub buy_fill_id: Option<String>,
    pub sell_fill_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EquityPoint {
    pub index: usize,
    pub cumulative_pnl: f64,
}

/// Per-bucket aggregate used by the time and symbol breakdowns.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BucketStats {
    pub key: String,
    pub trades: usize,
    pub wins: usize,
    pub pnl: f64,
    pub win_rate: f64,
}

/// Aggregate performance statistics. Always derived from a trade list.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Metrics {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub total_pnl: f64,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub max_drawdown: f64,
    pub max_win_streak: usize,
    pub max_loss_streak: usize,
    pub expectancy: f64,
    pub reward_risk_ratio: f64,
    pub equity_curve: Vec<EquityPoint>,
    pub trades_by_day: Vec<BucketStats>,
    pub trades_by_symbol: Vec<BucketStats>,
    pub hourly_performance: Vec<BucketStats>,
    pub monthly_performance: Vec<BucketStats>,
}

/// AI-generated narrative attached to a session.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AiInsights {
    #[serde(default)]
    pub ai_strengths: Vec<String>,
    #[serde(default)]
    pub ai_mistakes: Vec<String>,
    #[serde(default)]
    pub ai_fixes: Vec<String>,
    #[serde(default)]
    pub ai_key_insight: String,
}

/// Batch of trades created by one ingestion run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeSession {
    pub id: i64,
    pub journal_id: i64,
    pub raw_upload_id: Option<i64>,
    pub metrics: Metrics,
    pub insights: Option<AiInsights>,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Journal {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub broker: Option<String>,
    pub prop_firm: Option<String>,
    pub account_size: Option<f64>,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JournalInput {
    pub name: String,
    pub description: Option<String>,
    pub broker: Option<String>,
    pub prop_firm: Option<String>,
    pub account_size: Option<f64>,
}

/// The unmodified upload, kept for audit and replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawUploadedFile {
    pub id: Option<i64>,
    pub journal_id: i64,
    pub file_name: String,
    pub content_sha256: String,
    pub headers: Vec<String>,
    pub original_rows: Vec<HashMap<String, String>>,
    pub mapping: ColumnMapping,
}

/// Which identity signal matched a stored trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    FillPair,
    BuyFill,
    SellFill,
    Composite,
}

/// Result of the storage duplicate lookup for one candidate trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateMatch {
    pub trade_index: usize,
    pub is_duplicate: bool,
    pub match_type: Option<MatchType>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_keys_round_trip_through_lookup() {
        for field in CanonicalField::ALL {
            assert_eq!(CanonicalField::from_key(field.key()), Some(field));
        }
        assert_eq!(CanonicalField::from_key("buy_price"), Some(CanonicalField::BuyPrice));
        assert_eq!(CanonicalField::from_key("IMAGEURL"), Some(CanonicalField::ImageUrl));
        assert_eq!(CanonicalField::from_key("commission"), None);
    }

    #[test]
    fn test_mapping_serializes_with_service_keys() {
        let mut mapping = ColumnMapping::new();
        mapping.insert(CanonicalField::BuyPrice, "Entry Px");
        mapping.insert(CanonicalField::Pnl, "Net P&L");
        let json = serde_json::to_value(&mapping).unwrap();
        assert_eq!(json["buyPrice"], "Entry Px");
        assert_eq!(json["pnl"], "Net P&L");
        assert!(mapping.claims_header("Net P&L"));
        assert!(!mapping.claims_header("Symbol"));
    }

    #[test]
    fn test_raw_row_blank_cells_read_as_missing() {
        let mut cells = HashMap::new();
        cells.insert("Symbol".to_string(), "  ".to_string());
        cells.insert("Qty".to_string(), " 10 ".to_string());
        let row = RawRow::new(2, cells);
        assert_eq!(row.get("Symbol"), None);
        assert_eq!(row.get("Qty"), Some("10"));
        assert_eq!(row.get("Missing"), None);
        assert!(!row.is_blank());
    }

    #[test]
    fn test_side_serialization() {
        assert_eq!(serde_json::to_value(Side::Buy).unwrap(), "BUY");
        assert_eq!(Side::from_canonical("SELL"), Some(Side::Sell));
        assert_eq!(Side::from_canonical("sell"), None);
    }
}
