//! Coercion of loosely formatted spreadsheet cells into canonical trades.
//!
//! `value` holds the pure cell parsers, `candidate` assembles a row into a
//! `TradeCandidate` through a column mapping, `validate` decides whether the
//! candidate is a trade at all, and `mock` flags seeded demo rows.

pub mod candidate;
pub mod mock;
pub mod validate;
pub mod value;

pub use candidate::{normalize_row, SidePolicy, TradeCandidate};
pub use mock::is_mock_data;
pub use validate::{validate_trade, ValidationIssue, ValidationReport};
pub use value::{
    infer_side, normalize_symbol, parse_signed_number, parse_tags, validate_date_time, SideEvidence,
};
