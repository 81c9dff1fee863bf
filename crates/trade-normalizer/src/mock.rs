use journal_core::CanonicalTrade;

/// Placeholder tickers used by seeded demo data.
const DEMO_SYMBOLS: &[&str] = &["MOCK", "FAKE", "DUMMY", "EXAMPLE", "XXX", "FOO", "TICKER", "SYMBOL"];

const DEMO_SYMBOL_FRAGMENTS: &[&str] = &["TEST", "DEMO", "SAMPLE"];

/// Phrases the demo seeder writes into the notes column.
const DEMO_NOTE_MARKERS: &[&str] = &["mock data", "demo data", "sample data", "seeded data"];

/// True for seeded or demo rows that must not count as real performance.
pub fn is_mock_data(trade: &CanonicalTrade) -> bool {
    let symbol = trade.symbol.trim().to_uppercase();

    if DEMO_SYMBOLS.contains(&symbol.as_str()) {
        return true;
    }
    if DEMO_SYMBOL_FRAGMENTS.iter().any(|f| symbol.contains(f)) {
        return true;
    }

    trade
        .notes
        .as_deref()
        .map(|n| n.to_lowercase())
        .is_some_and(|n| DEMO_NOTE_MARKERS.iter().any(|m| n.contains(m)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use journal_core::Side;

    fn trade(symbol: &str, notes: Option<&str>) -> CanonicalTrade {
        CanonicalTrade {
            id: None,
            session_id: None,
            journal_id: 1,
            datetime: Utc::now(),
            symbol: symbol.to_string(),
            side: Side::Buy,
            qty: 1.0,
            price: 1.0,
            pnl: 1.0,
            notes: notes.map(str::to_string),
            strategy: None,
            tags: Vec::new(),
            image_url: None,
            buy_fill_id: None,
            sell_fill_id: None,
        }
    }

    #[test]
    fn test_demo_symbols_flagged() {
        assert!(is_mock_data(&trade("DEMO", None)));
        assert!(is_mock_data(&trade("mock", None)));
        assert!(is_mock_data(&trade("TESTCO", None)));
        assert!(is_mock_data(&trade("SAMPLE1", None)));
    }

    #[test]
    fn test_seeded_notes_flagged() {
        assert!(is_mock_data(&trade("AAPL", Some("Generated Mock Data row"))));
        assert!(!is_mock_data(&trade("AAPL", Some("Breakout"))));
    }

    #[test]
    fn test_real_symbols_pass() {
        for s in ["AAPL", "ES", "NQH4", "BRK.B"] {
            assert!(!is_mock_data(&trade(s, None)), "{s}");
        }
    }
}
