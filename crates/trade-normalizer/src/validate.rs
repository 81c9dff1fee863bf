use serde::{Deserialize, Serialize};
use std::fmt;

use crate::candidate::TradeCandidate;

/// One violated rule for a candidate row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationIssue {
    InvalidDatetime { raw: Option<String> },
    MissingSymbol,
    UnresolvedSide,
    InvalidQty { value: f64 },
    InvalidPrice { value: f64 },
    MissingPnl,
    InvalidPnl,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::InvalidDatetime { raw: Some(raw) } => {
                write!(f, "unparseable datetime '{raw}'")
            }
            ValidationIssue::InvalidDatetime { raw: None } => write!(f, "missing datetime"),
            ValidationIssue::MissingSymbol => write!(f, "missing symbol"),
            ValidationIssue::UnresolvedSide => write!(f, "side is not BUY or SELL"),
            ValidationIssue::InvalidQty { value } => write!(f, "quantity must be positive (got {value})"),
            ValidationIssue::InvalidPrice { value } => write!(f, "price must be positive (got {value})"),
            ValidationIssue::MissingPnl => write!(f, "missing pnl"),
            ValidationIssue::InvalidPnl => write!(f, "pnl is not a finite number"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub reasons: Vec<ValidationIssue>,
}

/// Check that a candidate has the minimum fields of a trade.
///
/// All violations are collected, not just the first.
pub fn validate_trade(candidate: &TradeCandidate) -> ValidationReport {
    let mut reasons = Vec::new();

    if candidate.datetime.is_none() {
        reasons.push(ValidationIssue::InvalidDatetime {
            raw: candidate.raw_datetime.clone(),
        });
    }
    if candidate.symbol.as_deref().map_or(true, |s| s.trim().is_empty()) {
        reasons.push(ValidationIssue::MissingSymbol);
    }
    if candidate.side.is_none() {
        reasons.push(ValidationIssue::UnresolvedSide);
    }
    if !(candidate.qty.is_finite() && candidate.qty > 0.0) {
        reasons.push(ValidationIssue::InvalidQty { value: candidate.qty });
    }
    if !(candidate.price.is_finite() && candidate.price > 0.0) {
        reasons.push(ValidationIssue::InvalidPrice { value: candidate.price });
    }
    match candidate.pnl {
        None => reasons.push(ValidationIssue::MissingPnl),
        Some(pnl) if !pnl.is_finite() => reasons.push(ValidationIssue::InvalidPnl),
        Some(_) => {}
    }

    ValidationReport {
        valid: reasons.is_empty(),
        reasons,
    }
}
