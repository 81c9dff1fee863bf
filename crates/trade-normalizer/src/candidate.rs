use chrono::{DateTime, Utc};
use journal_core::{CanonicalField, CanonicalTrade, ColumnMapping, RawRow, Side};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::validate::{validate_trade, ValidationIssue};
use crate::value::{
    infer_side, normalize_symbol, parse_signed_number, parse_tags, validate_date_time, SideEvidence,
};

/// What to do when a row's side cannot be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SidePolicy {
    /// Reject the row with a side diagnostic.
    #[default]
    Strict,
    /// Assume `BUY`.
    AssumeBuy,
}

impl std::str::FromStr for SidePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(SidePolicy::Strict),
            "assume-buy" | "assume_buy" | "buy" => Ok(SidePolicy::AssumeBuy),
            other => Err(format!("unknown side policy '{other}'")),
        }
    }
}

/// A row after normalization, before validation.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeCandidate {
    pub line: usize,
    pub raw_datetime: Option<String>,
    pub datetime: Option<DateTime<Utc>>,
    pub symbol: Option<String>,
    pub side: Option<Side>,
    pub qty: f64,
    pub price: f64,
    pub pnl: Option<f64>,
    pub notes: Option<String>,
    pub strategy: Option<String>,
    pub tags: Vec<String>,
    pub image_url: Option<String>,
    pub buy_fill_id: Option<String>,
    pub sell_fill_id: Option<String>,
}

impl TradeCandidate {
    /// Validate and convert. Every violated rule is returned on failure.
    pub fn into_trade(self, journal_id: i64) -> Result<CanonicalTrade, Vec<ValidationIssue>> {
        let report = validate_trade(&self);
        if !report.valid {
            return Err(report.reasons);
        }

        match (self.datetime, self.symbol, self.side, self.pnl) {
            (Some(datetime), Some(symbol), Some(side), Some(pnl)) => Ok(CanonicalTrade {
                id: None,
                session_id: None,
                journal_id,
                datetime,
                symbol,
                side,
                qty: self.qty,
                price: self.price,
                pnl,
                notes: self.notes,
                strategy: self.strategy,
                tags: self.tags,
                image_url: self.image_url,
                buy_fill_id: self.buy_fill_id,
                sell_fill_id: self.sell_fill_id,
            }),
            _ => Err(report.reasons),
        }
    }
}

fn text(row: &RawRow, mapping: &ColumnMapping, field: CanonicalField) -> Option<String> {
    row.field(mapping, field).map(str::to_string)
}

fn positive(value: Option<f64>) -> Option<f64> {
    value.map(f64::abs).filter(|v| *v > 0.0)
}

/// Entry time of a round-trip row: the earlier of the bought and sold legs.
fn entry_time(row: &RawRow, mapping: &ColumnMapping) -> (Option<String>, Option<DateTime<Utc>>) {
    let bought = text(row, mapping, CanonicalField::BoughtTimestamp);
    let sold = text(row, mapping, CanonicalField::SoldTimestamp);
    let bought_at = bought.as_deref().and_then(validate_date_time);
    let sold_at = sold.as_deref().and_then(validate_date_time);

    match (bought_at, sold_at) {
        (Some(b), Some(s)) if s < b => (sold, Some(s)),
        (Some(b), _) => (bought, Some(b)),
        (None, Some(s)) => (sold, Some(s)),
        (None, None) => (bought.or(sold), None),
    }
}

/// Read a raw row through the mapping into a `TradeCandidate`.
///
/// Price priority is `price`, then `buyPrice`, then `sellPrice`; the first
/// with a non-zero value wins. Quantity and price are stored unsigned.
/// Without a `datetime` column the trade time is the round trip's entry.
pub fn normalize_row(row: &RawRow, mapping: &ColumnMapping, policy: SidePolicy) -> TradeCandidate {
    let (raw_datetime, datetime) = match text(row, mapping, CanonicalField::Datetime) {
        Some(raw) => {
            let datetime = validate_date_time(&raw);
            (Some(raw), datetime)
        }
        None => entry_time(row, mapping),
    };

    let symbol = row
        .field(mapping, CanonicalField::Symbol)
        .and_then(normalize_symbol);

    let signed_qty = row
        .field(mapping, CanonicalField::Qty)
        .map(parse_signed_number)
        .unwrap_or(0.0);

    let buy_price = positive(row.field(mapping, CanonicalField::BuyPrice).map(parse_signed_number));
    let sell_price = positive(row.field(mapping, CanonicalField::SellPrice).map(parse_signed_number));
    let price = positive(row.field(mapping, CanonicalField::Price).map(parse_signed_number))
        .or(buy_price)
        .or(sell_price)
        .unwrap_or(0.0);

    let side = infer_side(&SideEvidence {
        raw_side: row.field(mapping, CanonicalField::Side),
        qty: signed_qty,
        buy_price,
        sell_price,
        bought_at: row
            .field(mapping, CanonicalField::BoughtTimestamp)
            .and_then(validate_date_time),
        sold_at: row
            .field(mapping, CanonicalField::SoldTimestamp)
            .and_then(validate_date_time),
    })
    .or_else(|| match policy {
        SidePolicy::Strict => None,
        SidePolicy::AssumeBuy => {
            debug!("Line {}: side unresolved, assuming BUY", row.line);
            Some(Side::Buy)
        }
    });

    let pnl = row
        .field(mapping, CanonicalField::Pnl)
        .map(parse_signed_number);

    let tags = row
        .field(mapping, CanonicalField::Tags)
        .map(parse_tags)
        .unwrap_or_default();

    TradeCandidate {
        line: row.line,
        raw_datetime,
        datetime,
        symbol,
        side,
        qty: signed_qty.abs(),
        price,
        pnl,
        notes: text(row, mapping, CanonicalField::Notes),
        strategy: text(row, mapping, CanonicalField::Strategy),
        tags,
        image_url: text(row, mapping, CanonicalField::ImageUrl),
        buy_fill_id: text(row, mapping, CanonicalField::BuyFillId),
        sell_fill_id: text(row, mapping, CanonicalField::SellFillId),
    }
}
