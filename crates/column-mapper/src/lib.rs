//! Column mapping and upload classification.
//!
//! The hosted mapping function is asked first; any failure falls back to the
//! regex heuristic in [`heuristic`]. The mapper never checks completeness,
//! callers use [`missing_required`] for that.

pub mod classify;
pub mod heuristic;

pub use classify::{classify_upload, looks_like_trading_data, Classification};
pub use heuristic::{heuristic_mapping, normalize_header};

use ai_client::{AiProvider, CsvPreview};
use journal_core::{CanonicalField, ColumnMapping, RawRow};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Upper bound on rows sent to the hosted functions.
pub const MAX_SAMPLE_ROWS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingSource {
    Service,
    Heuristic,
}

#[derive(Debug, Clone)]
pub struct MappingOutcome {
    pub mapping: ColumnMapping,
    pub source: MappingSource,
    /// Why the service answer was not used, if it wasn't.
    pub fallback_reason: Option<String>,
}

/// Build the preview sent to the hosted functions: headers plus the first
/// non-blank rows, capped at [`MAX_SAMPLE_ROWS`].
pub fn build_preview(headers: &[String], rows: &[RawRow], sample_rows: usize) -> CsvPreview {
    let limit = sample_rows.min(MAX_SAMPLE_ROWS);
    let csv_data_sample = rows
        .iter()
        .filter(|r| !r.is_blank())
        .take(limit)
        .map(|r| {
            headers
                .iter()
                .map(|h| (h.clone(), r.cells.get(h).cloned().unwrap_or_default()))
                .collect::<HashMap<_, _>>()
        })
        .collect();

    CsvPreview {
        csv_headers: headers.to_vec(),
        csv_data_sample,
    }
}

/// Drop entries that point at headers the file doesn't have, and keep each
/// header claimed by at most one field (first field in key order wins).
pub fn sanitize(mapping: ColumnMapping, headers: &[String]) -> ColumnMapping {
    let mut clean = ColumnMapping::new();
    for (field, header) in mapping.iter() {
        let Some(actual) = headers.iter().find(|h| h.trim() == header.trim()) else {
            debug!("Dropping mapping {} -> '{}': header not in file", field, header);
            continue;
        };
        if clean.claims_header(actual) {
            debug!("Dropping mapping {} -> '{}': header already claimed", field, header);
            continue;
        }
        clean.insert(field, actual.clone());
    }
    clean
}

/// Map file headers to canonical fields.
///
/// Service answers are sanitized against the real headers. An error, or an
/// answer that maps nothing the file contains, falls back to the heuristic.
pub async fn map_columns(provider: &dyn AiProvider, preview: &CsvPreview) -> MappingOutcome {
    let headers = &preview.csv_headers;

    let reason = match provider.map_columns(preview).await {
        Ok(raw) => {
            let mapping = sanitize(raw, headers);
            if !mapping.is_empty() {
                info!(
                    "Mapping service ({}) mapped {} columns",
                    provider.backend_name(),
                    mapping.len()
                );
                return MappingOutcome {
                    mapping,
                    source: MappingSource::Service,
                    fallback_reason: None,
                };
            }
            "mapping service returned no usable columns".to_string()
        }
        Err(e) => e.to_string(),
    };

    warn!("Column mapping falling back to heuristic: {}", reason);
    let mapping = heuristic_mapping(headers);
    info!("Heuristic mapped {} of {} columns", mapping.len(), headers.len());
    MappingOutcome {
        mapping,
        source: MappingSource::Heuristic,
        fallback_reason: Some(reason),
    }
}

/// Required canonical keys absent from the mapping.
///
/// `symbol`, `qty` and `pnl` are each required. The time group is satisfied
/// by `datetime`, `boughtTimestamp` or `soldTimestamp` and reported as
/// `datetime`; the price group by `price`, `buyPrice` or `sellPrice` and
/// reported as `price`.
pub fn missing_required(mapping: &ColumnMapping) -> Vec<CanonicalField> {
    let any_of = |fields: &[CanonicalField]| fields.iter().any(|f| mapping.contains(*f));
    let mut missing = Vec::new();

    if !any_of(&[
        CanonicalField::Datetime,
        CanonicalField::BoughtTimestamp,
        CanonicalField::SoldTimestamp,
    ]) {
        missing.push(CanonicalField::Datetime);
    }

    missing.extend(
        [CanonicalField::Symbol, CanonicalField::Qty, CanonicalField::Pnl]
            .into_iter()
            .filter(|f| !mapping.contains(*f)),
    );

    if !any_of(&[
        CanonicalField::Price,
        CanonicalField::BuyPrice,
        CanonicalField::SellPrice,
    ]) {
        missing.push(CanonicalField::Price);
    }

    missing
}
