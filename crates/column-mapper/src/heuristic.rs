use journal_core::{CanonicalField, ColumnMapping};
use regex::Regex;
use std::sync::LazyLock;

/// Field order matters: a header is claimed by the first field that matches
/// it, so the narrow fields (fill ids, buy/sell prices, bought/sold times)
/// go before the broad ones (price, datetime).
static FIELD_PATTERNS: LazyLock<Vec<(CanonicalField, Regex)>> = LazyLock::new(|| {
    [
        (CanonicalField::BuyFillId, r"^buy (fill|order|exec|execution) ?id$"),
        (CanonicalField::SellFillId, r"^sell (fill|order|exec|execution) ?id$"),
        (
            CanonicalField::BuyPrice,
            r"^((avg|average) )?(buy|entry|bought|open)( fill)? (price|px)$|^entry$",
        ),
        (
            CanonicalField::SellPrice,
            r"^((avg|average) )?(sell|exit|sold|close)( fill)? (price|px)$|^exit$",
        ),
        (
            CanonicalField::Price,
            r"^((avg|average|fill|exec|execution|trade|t|limit) )?(fill )?(price|px)$",
        ),
        (CanonicalField::Pnl, r"p&l|p/l|\bpnl\b|profit|\bloss\b|realized|net p&l"),
        (
            CanonicalField::Qty,
            r"^((filled|fill|order|trade|position|exec|executed) )?(qty|quantity|shares|size|contracts|lots|amount|volume)$",
        ),
        (
            CanonicalField::BoughtTimestamp,
            r"^(bought|buy|entry|open|opened) (timestamp|time|date ?time)$",
        ),
        (
            CanonicalField::SoldTimestamp,
            r"^(sold|sell|exit|close|closed) (timestamp|time|date ?time)$",
        ),
        (
            CanonicalField::Datetime,
            r"\b(date|time|datetime|timestamp|execution)\b",
        ),
        (
            CanonicalField::Symbol,
            r"\b(symbol|ticker|instrument|underlying|contract|market|asset|security)\b",
        ),
        (
            CanonicalField::Side,
            r"\b(side|action|direction)\b|b/s|buy/sell|long/short|^type$",
        ),
        (CanonicalField::Notes, r"\b(note|notes|comment|comments|memo|description|remarks?)\b"),
        (CanonicalField::Strategy, r"\b(strategy|setup|playbook)\b"),
        (CanonicalField::Tags, r"\b(tag|tags|label|labels)\b"),
        (CanonicalField::ImageUrl, r"\b(image|screenshot|chart|url|link)\b"),
    ]
    .into_iter()
    .filter_map(|(field, pattern)| match Regex::new(pattern) {
        Ok(re) => Some((field, re)),
        Err(e) => {
            tracing::error!("Invalid column pattern for {}: {}", field, e);
            None
        }
    })
    .collect()
});

/// Lowercase a header and split camelCase and punctuation into single
/// spaces, keeping `&` and `/` (`Net P&L`, `B/S`).
pub fn normalize_header(header: &str) -> String {
    let mut out = String::with_capacity(header.len() + 4);
    let mut prev: Option<char> = None;
    for c in header.trim().chars() {
        if c.is_alphanumeric() || c == '&' || c == '/' {
            if c.is_uppercase() && prev.is_some_and(|p| p.is_lowercase() || p.is_ascii_digit()) {
                out.push(' ');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(' ');
        }
        prev = Some(c);
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Deterministic local mapping used when the mapping service is unavailable.
///
/// For each field in pattern order, the first unclaimed header (in file
/// order) that matches is assigned. A header is claimed at most once.
pub fn heuristic_mapping(headers: &[String]) -> ColumnMapping {
    let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();
    let mut mapping = ColumnMapping::new();

    for (field, pattern) in FIELD_PATTERNS.iter() {
        let found = headers
            .iter()
            .zip(&normalized)
            .find(|(header, norm)| !mapping.claims_header(header) && pattern.is_match(norm));
        if let Some((header, _)) = found {
            mapping.insert(*field, header.clone());
        }
    }

    mapping
}
