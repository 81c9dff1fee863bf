use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone, Utc};
use journal_core::Side;

/// Parse a loosely formatted signed number. Never fails.
///
/// Currency symbols and thousands separators are stripped. Accounting
/// parentheses and a minus sign anywhere (leading or trailing) mean negative.
/// Input without any digit yields `0.0`. The result is always finite.
pub fn parse_signed_number(raw: &str) -> f64 {
    let raw = raw.trim();
    let negative = (raw.contains('(') && raw.contains(')'))
        || raw.contains('-')
        || raw.contains('\u{2212}');

    let mut cleaned = String::with_capacity(raw.len());
    let mut seen_dot = false;
    for c in raw.chars() {
        if c.is_ascii_digit() {
            cleaned.push(c);
        } else if c == '.' && !seen_dot {
            seen_dot = true;
            cleaned.push(c);
        }
    }

    if !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return 0.0;
    }

    let value: f64 = match cleaned.parse() {
        Ok(v) => v,
        Err(_) => return 0.0,
    };

    if !value.is_finite() || value == 0.0 {
        return 0.0;
    }

    if negative {
        -value
    } else {
        value
    }
}

/// Uppercased, trimmed symbol. `None` when nothing is left.
pub fn normalize_symbol(raw: &str) -> Option<String> {
    let symbol = raw.trim().trim_matches('"').trim().to_uppercase();
    if symbol.is_empty() {
        None
    } else {
        Some(symbol)
    }
}

const BUY_TOKENS: &[&str] = &[
    "buy", "b", "bot", "bought", "long", "l", "buy to open", "buy to cover", "buy to close",
    "cover",
];

const SELL_TOKENS: &[&str] = &[
    "sell", "s", "sld", "sold", "short", "sell short", "sell to open", "sell to close",
];

fn side_from_token(raw: &str) -> Option<Side> {
    let token = raw
        .trim()
        .to_lowercase()
        .replace(['_', '-'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    if BUY_TOKENS.contains(&token.as_str()) {
        Some(Side::Buy)
    } else if SELL_TOKENS.contains(&token.as_str()) {
        Some(Side::Sell)
    } else {
        None
    }
}

/// Evidence available for resolving a row's side.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SideEvidence<'a> {
    pub raw_side: Option<&'a str>,
    /// Signed quantity as it appeared in the file.
    pub qty: f64,
    pub buy_price: Option<f64>,
    pub sell_price: Option<f64>,
    pub bought_at: Option<DateTime<Utc>>,
    pub sold_at: Option<DateTime<Utc>>,
}

/// Resolve the trade side.
///
/// Order of evidence: an explicit side token, then a lone buy or sell price
/// column, then which leg of a round trip filled first (bought before sold is
/// `BUY`, sold before bought is `SELL`), then a negative signed quantity
/// (`SELL`). Returns `None` when the evidence is missing or contradictory;
/// the caller applies its side policy.
pub fn infer_side(evidence: &SideEvidence<'_>) -> Option<Side> {
    if let Some(side) = evidence.raw_side.and_then(side_from_token) {
        return Some(side);
    }

    let has_buy = evidence.buy_price.is_some_and(|p| p != 0.0);
    let has_sell = evidence.sell_price.is_some_and(|p| p != 0.0);
    match (has_buy, has_sell) {
        (true, false) => return Some(Side::Buy),
        (false, true) => return Some(Side::Sell),
        _ => {}
    }

    // Round-trip rows: pnl always carries the sign of sell - buy whatever the
    // direction, so only the fill order tells a long from a short.
    if let (Some(bought), Some(sold)) = (evidence.bought_at, evidence.sold_at) {
        if bought < sold {
            return Some(Side::Buy);
        }
        if sold < bought {
            return Some(Side::Sell);
        }
    }

    if evidence.qty < 0.0 {
        return Some(Side::Sell);
    }

    None
}

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f %z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%m/%d/%Y %H:%M:%S %z",
];

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S%.f",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
    "%m/%d/%y %H:%M:%S",
    "%m/%d/%y %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%Y%m%d;%H%M%S",
    "%Y%m%d %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%m/%d/%y", "%d.%m.%Y", "%Y%m%d"];

fn plausible(dt: DateTime<Utc>) -> Option<DateTime<Utc>> {
    (1970..=2200).contains(&dt.year()).then_some(dt)
}

/// Parse a timestamp cell into UTC. `None` on failure, never panics.
///
/// Offsets are honoured; naive values are taken as UTC. Numeric cells of
/// 10 or 13 digits are read as epoch seconds or milliseconds.
pub fn validate_date_time(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim().trim_matches('"').trim();
    if raw.is_empty() {
        return None;
    }
    let raw = raw
        .strip_suffix(" UTC")
        .or_else(|| raw.strip_suffix(" GMT"))
        .unwrap_or(raw);

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return plausible(dt.with_timezone(&Utc));
    }

    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(raw, fmt) {
            return plausible(dt.with_timezone(&Utc));
        }
    }

    if raw.chars().all(|c| c.is_ascii_digit()) && (raw.len() == 10 || raw.len() == 13) {
        let value: i64 = raw.parse().ok()?;
        let dt = if raw.len() == 13 {
            Utc.timestamp_millis_opt(value).single()
        } else {
            Utc.timestamp_opt(value, 0).single()
        };
        return dt.and_then(plausible);
    }

    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            if let Some(dt) = plausible(Utc.from_utc_datetime(&naive)) {
                return Some(dt);
            }
        }
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            if let Some(naive) = date.and_hms_opt(0, 0, 0) {
                if let Some(dt) = plausible(Utc.from_utc_datetime(&naive)) {
                    return Some(dt);
                }
            }
        }
    }

    None
}

/// Split a comma-delimited tag list. Order kept, empties dropped,
/// duplicates kept.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_parse_signed_number_formats() {
        assert_eq!(parse_signed_number("(150.25)"), -150.25);
        assert_eq!(parse_signed_number("150-"), -150.0);
        assert_eq!(parse_signed_number("-42"), -42.0);
        assert_eq!(parse_signed_number("$1,204.50"), 1204.5);
        assert_eq!(parse_signed_number("($1,000.00)"), -1000.0);
        assert_eq!(parse_signed_number(" 7 "), 7.0);
        assert_eq!(parse_signed_number("\u{2212}3.5"), -3.5);
    }

    #[test]
    fn test_parse_signed_number_degrades_to_zero() {
        for raw in ["", "-", "()", "$", "abc", "N/A", "--", "."] {
            let v = parse_signed_number(raw);
            assert_eq!(v, 0.0, "input {raw:?}");
            assert!(v.is_sign_positive(), "input {raw:?} produced negative zero");
        }
    }

    #[test]
    fn test_parse_signed_number_always_finite() {
        let huge = "9".repeat(400);
        for raw in [huge.as_str(), "1.2.3", "12-", "(42.00)", "$1,234.56", "1e308"] {
            assert!(parse_signed_number(raw).is_finite(), "input {raw:?}");
        }
        assert_eq!(parse_signed_number("1.2.3"), 1.23);
    }

    #[test]
    fn test_normalize_symbol() {
        assert_eq!(normalize_symbol("  aapl "), Some("AAPL".to_string()));
        assert_eq!(normalize_symbol("   "), None);
        assert_eq!(normalize_symbol(""), None);
    }

    fn side_of(raw_side: Option<&str>, qty: f64, buy: Option<f64>, sell: Option<f64>) -> Option<Side> {
        infer_side(&SideEvidence {
            raw_side,
            qty,
            buy_price: buy,
            sell_price: sell,
            ..Default::default()
        })
    }

    #[test]
    fn test_infer_side_tokens() {
        assert_eq!(side_of(Some("Buy"), 1.0, None, None), Some(Side::Buy));
        assert_eq!(side_of(Some("LONG"), 1.0, None, None), Some(Side::Buy));
        assert_eq!(side_of(Some("short"), 1.0, None, None), Some(Side::Sell));
        assert_eq!(side_of(Some("Sell_Short"), 1.0, None, None), Some(Side::Sell));
        assert_eq!(side_of(Some("S"), 1.0, None, None), Some(Side::Sell));
    }

    #[test]
    fn test_infer_side_from_price_columns() {
        assert_eq!(side_of(None, 1.0, Some(10.0), None), Some(Side::Buy));
        assert_eq!(side_of(Some("???"), 1.0, None, Some(10.0)), Some(Side::Sell));
        assert_eq!(side_of(None, 1.0, Some(10.0), Some(11.0)), None);
        assert_eq!(side_of(None, 1.0, None, None), None);
        assert_eq!(side_of(None, -5.0, None, None), Some(Side::Sell));
    }

    #[test]
    fn test_infer_side_from_fill_order() {
        let open = validate_date_time("2024-01-15 09:30:00");
        let close = validate_date_time("2024-01-15 09:45:00");
        let round_trip = SideEvidence {
            qty: 1.0,
            buy_price: Some(4800.25),
            sell_price: Some(4810.5),
            ..Default::default()
        };

        let long = SideEvidence { bought_at: open, sold_at: close, ..round_trip };
        assert_eq!(infer_side(&long), Some(Side::Buy));

        let short = SideEvidence { bought_at: close, sold_at: open, ..round_trip };
        assert_eq!(infer_side(&short), Some(Side::Sell));

        let same_instant = SideEvidence { bought_at: open, sold_at: open, ..round_trip };
        assert_eq!(infer_side(&same_instant), None);

        let one_leg = SideEvidence { bought_at: open, ..round_trip };
        assert_eq!(infer_side(&one_leg), None);

        let token_wins = SideEvidence { raw_side: Some("sell"), ..long };
        assert_eq!(infer_side(&token_wins), Some(Side::Sell));
    }

    #[test]
    fn test_validate_date_time_formats() {
        let dt = validate_date_time("2024-01-15 09:30:00").unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-01-15T09:30:00+00:00");

        let dt = validate_date_time("2024-01-15T09:30:00-05:00").unwrap();
        assert_eq!(dt.hour(), 14);

        let dt = validate_date_time("01/15/2024 02:05:00 PM").unwrap();
        assert_eq!((dt.hour(), dt.minute()), (14, 5));

        let dt = validate_date_time("20240115;093000").unwrap();
        assert_eq!(dt.hour(), 9);

        let dt = validate_date_time("2024-01-15").unwrap();
        assert_eq!(dt.hour(), 0);

        assert!(validate_date_time("1705311000").is_some());
        assert!(validate_date_time("2024-01-15 09:30:00 UTC").is_some());
    }

    #[test]
    fn test_validate_date_time_rejects_garbage() {
        assert!(validate_date_time("").is_none());
        assert!(validate_date_time("yesterday").is_none());
        assert!(validate_date_time("2024-13-45").is_none());
        assert!(validate_date_time("12345").is_none());
    }

    #[test]
    fn test_parse_tags() {
        assert_eq!(
            parse_tags(" breakout, ,A+ setup,breakout "),
            vec!["breakout", "A+ setup", "breakout"]
        );
        assert!(parse_tags("").is_empty());
    }
}
