//! CSV trade ingestion.
//!
//! [`IngestionPipeline::ingest`] takes one uploaded file through parsing,
//! classification, column mapping, normalization, in-file and journal
//! dedup, persistence, metrics reconciliation and (best effort) insights.

pub mod config;
pub mod error;
pub mod locks;
pub mod parse;
pub mod pipeline;
pub mod stage;
pub mod summary;

pub use config::IngestConfig;
pub use error::{IngestError, IngestResult};
pub use locks::JournalLocks;
pub use parse::{parse_csv, ParsedCsv};
pub use pipeline::{recompute_journal_metrics, CsvUpload, IngestionPipeline};
pub use stage::{Fallback, FallbackTaken, IngestStage};
pub use summary::{EmptyReason, IngestStatus, IngestionSummary, RowAccounting, RowDiagnostic};
