use journal_core::{CanonicalTrade, MatchType, Side};
use rust_decimal::prelude::*;

/// One identity signal for a trade.
///
/// Keys from every strategy are pooled into a single seen-set, so a trade
/// matches if any of its keys was seen before.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IdentityKey {
    FillPair {
        buy_fill_id: String,
        sell_fill_id: String,
    },
    BuyFill {
        fill_id: String,
        timestamp_ms: i64,
        symbol: String,
    },
    SellFill {
        fill_id: String,
        timestamp_ms: i64,
        symbol: String,
    },
    Composite {
        journal_id: i64,
        timestamp_ms: i64,
        symbol: String,
        side: Side,
        qty: Decimal,
        price: Decimal,
        pnl: Decimal,
    },
}

impl IdentityKey {
    pub fn match_type(&self) -> MatchType {
        match self {
            IdentityKey::FillPair { .. } => MatchType::FillPair,
            IdentityKey::BuyFill { .. } => MatchType::BuyFill,
            IdentityKey::SellFill { .. } => MatchType::SellFill,
            IdentityKey::Composite { .. } => MatchType::Composite,
        }
    }
}

/// Decimal rounded to 4 places with trailing zeros stripped, so `150.00`
/// and `150.0000` compare equal.
fn rounded(value: f64) -> Decimal {
    Decimal::from_f64(value)
        .unwrap_or(Decimal::ZERO)
        .round_dp(4)
        .normalize()
}

fn fill_id(raw: &Option<String>) -> Option<String> {
    raw.as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Identity keys for a trade, strongest first. The composite key is always
/// last and always present.
pub fn identity_keys(trade: &CanonicalTrade) -> Vec<IdentityKey> {
    let timestamp_ms = trade.datetime.timestamp_millis();
    let mut keys = Vec::with_capacity(2);

    match (fill_id(&trade.buy_fill_id), fill_id(&trade.sell_fill_id)) {
        (Some(buy_fill_id), Some(sell_fill_id)) => keys.push(IdentityKey::FillPair {
            buy_fill_id,
            sell_fill_id,
        }),
        (Some(fill_id), None) => keys.push(IdentityKey::BuyFill {
            fill_id,
            timestamp_ms,
            symbol: trade.symbol.clone(),
        }),
        (None, Some(fill_id)) => keys.push(IdentityKey::SellFill {
            fill_id,
            timestamp_ms,
            symbol: trade.symbol.clone(),
        }),
        (None, None) => {}
    }

    keys.push(IdentityKey::Composite {
        journal_id: trade.journal_id,
        timestamp_ms,
        symbol: trade.symbol.clone(),
        side: trade.side,
        qty: rounded(trade.qty),
        price: rounded(trade.price),
        pnl: rounded(trade.pnl),
    });

    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn trade() -> CanonicalTrade {
        CanonicalTrade {
            id: None,
            session_id: None,
            journal_id: 1,
            datetime: Utc.with_ymd_and_hms(2024, 1, 15, 9, 30, 0).unwrap(),
            symbol: "AAPL".to_string(),
            side: Side::Buy,
            qty: 100.0,
            price: 150.25,
            pnl: 45.0,
            notes: None,
            strategy: None,
            tags: vec![],
            image_url: None,
            buy_fill_id: None,
            sell_fill_id: None,
        }
    }

    #[test]
    fn test_composite_only_without_fills() {
        let keys = identity_keys(&trade());
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].match_type(), MatchType::Composite);
    }

    #[test]
    fn test_fill_pair_takes_precedence() {
        let mut t = trade();
        t.buy_fill_id = Some("B1".into());
        t.sell_fill_id = Some("S1".into());
        let keys = identity_keys(&t);
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0].match_type(), MatchType::FillPair);

        t.sell_fill_id = Some("  ".into());
        assert_eq!(identity_keys(&t)[0].match_type(), MatchType::BuyFill);

        t.buy_fill_id = None;
        t.sell_fill_id = Some("S1".into());
        assert_eq!(identity_keys(&t)[0].match_type(), MatchType::SellFill);
    }

    #[test]
    fn test_rounding_to_four_places() {
        let mut a = trade();
        let mut b = trade();
        a.pnl = 12.34561;
        b.pnl = 12.34564;
        assert_eq!(identity_keys(&a), identity_keys(&b));

        b.pnl = 12.3458;
        assert_ne!(identity_keys(&a), identity_keys(&b));
    }
}
