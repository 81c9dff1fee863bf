use column_mapper::MappingSource;
use journal_core::{AiInsights, ColumnMapping, Metrics};
use serde::Serialize;
use trade_normalizer::ValidationIssue;

use crate::stage::{Fallback, FallbackTaken, IngestStage};

/// Where every source row ended up.
///
/// The six buckets always add up to `total_rows`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RowAccounting {
    pub total_rows: usize,
    pub empty_rows: usize,
    pub parse_errors: usize,
    pub mock_filtered: usize,
    pub duplicates_in_file: usize,
    pub database_duplicates: usize,
    pub inserted: usize,
}

impl RowAccounting {
    pub fn accounted(&self) -> usize {
        self.empty_rows
            + self.parse_errors
            + self.mock_filtered
            + self.duplicates_in_file
            + self.database_duplicates
            + self.inserted
    }

    pub fn is_balanced(&self) -> bool {
        self.accounted() == self.total_rows
    }
}

/// A rejected row and every rule it broke.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowDiagnostic {
    /// 1-based source line, header is line 1.
    pub line: usize,
    pub reasons: Vec<ValidationIssue>,
}

impl RowDiagnostic {
    pub fn message(&self) -> String {
        let reasons: Vec<String> = self.reasons.iter().map(|r| r.to_string()).collect();
        format!("line {}: {}", self.line, reasons.join("; "))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyReason {
    AllInvalid,
    AllMock,
    AllDuplicates,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum IngestStatus {
    Imported,
    NothingToImport(EmptyReason),
}

/// Outcome of one ingestion that did not hit a hard failure.
#[derive(Debug, Clone, Serialize)]
pub struct IngestionSummary {
    pub journal_id: i64,
    pub file_name: String,
    pub status: IngestStatus,
    pub accounting: RowAccounting,
    /// First rejected rows, capped by configuration.
    pub diagnostics: Vec<RowDiagnostic>,
    pub mapping: ColumnMapping,
    pub mapping_source: MappingSource,
    pub raw_upload_id: Option<i64>,
    pub session_id: Option<i64>,
    /// Metrics of the persisted session, after reconciliation.
    pub metrics: Option<Metrics>,
    pub insights: Option<AiInsights>,
    pub stages: Vec<IngestStage>,
    pub fallbacks: Vec<FallbackTaken>,
}

impl IngestionSummary {
    pub fn inserted(&self) -> usize {
        self.accounting.inserted
    }

    pub fn used_fallback(&self, fallback: Fallback) -> bool {
        self.fallbacks.iter().any(|f| f.fallback == fallback)
    }

    /// One human-readable line describing what happened.
    pub fn message(&self) -> String {
        let a = &self.accounting;
        let mut message = match self.status {
            IngestStatus::Imported => {
                format!("Imported {} new trades from {}.", a.inserted, self.file_name)
            }
            IngestStatus::NothingToImport(EmptyReason::AllDuplicates) => format!(
                "No new trades: every trade in {} is already in this journal.",
                self.file_name
            ),
            IngestStatus::NothingToImport(EmptyReason::AllMock) => format!(
                "No trades imported: every row in {} looks like demo or mock data.",
                self.file_name
            ),
            IngestStatus::NothingToImport(EmptyReason::AllInvalid) => format!(
                "No trades imported: no row in {} passed validation.",
                self.file_name
            ),
        };

        let skipped: Vec<String> = [
            (a.parse_errors, "invalid"),
            (a.mock_filtered, "mock data"),
            (a.duplicates_in_file, "duplicated in file"),
            (a.database_duplicates, "already in journal"),
            (a.empty_rows, "empty"),
        ]
        .iter()
        .filter(|(n, _)| *n > 0)
        .map(|(n, label)| format!("{} {}", n, label))
        .collect();

        if !skipped.is_empty() {
            message.push_str(&format!(" Skipped: {}.", skipped.join(", ")));
        }
        if self.used_fallback(Fallback::InsightsSkipped) && self.session_id.is_some() {
            message.push_str(" AI insights were not available.");
        }
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(status: IngestStatus, accounting: RowAccounting) -> IngestionSummary {
        IngestionSummary {
            journal_id: 1,
            file_name: "trades.csv".into(),
            status,
            accounting,
            diagnostics: vec![],
            mapping: ColumnMapping::new(),
            mapping_source: MappingSource::Service,
            raw_upload_id: None,
            session_id: None,
            metrics: None,
            insights: None,
            stages: vec![],
            fallbacks: vec![],
        }
    }

    #[test]
    fn test_accounting_balance() {
        let a = RowAccounting {
            total_rows: 10,
            empty_rows: 1,
            parse_errors: 2,
            mock_filtered: 1,
            duplicates_in_file: 1,
            database_duplicates: 2,
            inserted: 3,
        };
        assert!(a.is_balanced());
        assert!(!RowAccounting { inserted: 4, ..a }.is_balanced());
    }

    #[test]
    fn test_messages_distinguish_empty_outcomes() {
        let a = RowAccounting {
            total_rows: 2,
            database_duplicates: 2,
            ..Default::default()
        };
        let msg = summary(IngestStatus::NothingToImport(EmptyReason::AllDuplicates), a).message();
        assert_eq!(
            msg,
            "No new trades: every trade in trades.csv is already in this journal. Skipped: 2 already in journal."
        );

        let a = RowAccounting {
            total_rows: 4,
            inserted: 3,
            parse_errors: 1,
            ..Default::default()
        };
        let msg = summary(IngestStatus::Imported, a).message();
        assert_eq!(msg, "Imported 3 new trades from trades.csv. Skipped: 1 invalid.");
    }

    #[test]
    fn test_diagnostic_message() {
        let d = RowDiagnostic {
            line: 4,
            reasons: vec![ValidationIssue::MissingSymbol, ValidationIssue::MissingPnl],
        };
        assert_eq!(d.message(), "line 4: missing symbol; missing pnl");
    }
}
