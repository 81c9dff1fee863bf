use ai_client::AiProvider;
use column_mapper::{build_preview, classify_upload, map_columns, missing_required};
use journal_core::{
    AiInsights, CanonicalTrade, ColumnMapping, JournalResult, Metrics, RawUploadedFile,
    TradeRepository,
};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use trade_dedup::{dedupe_against_storage, dedupe_within_batch};
use trade_metrics::calculate_metrics;
use trade_normalizer::{is_mock_data, normalize_row};

use crate::config::IngestConfig;
use crate::error::{IngestError, IngestResult};
use crate::locks::JournalLocks;
use crate::parse::{parse_csv, ParsedCsv};
use crate::stage::{Fallback, FallbackTaken, IngestStage};
use crate::summary::{EmptyReason, IngestStatus, IngestionSummary, RowAccounting, RowDiagnostic};

/// One uploaded file bound for a journal.
#[derive(Debug, Clone)]
pub struct CsvUpload {
    pub journal_id: i64,
    pub file_name: String,
    pub content: Vec<u8>,
}

impl CsvUpload {
    pub fn new(journal_id: i64, file_name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            journal_id,
            file_name: file_name.into(),
            content: content.into(),
        }
    }
}

/// Visited stages and fallbacks of one run.
struct Trail {
    journal_id: i64,
    stages: Vec<IngestStage>,
    fallbacks: Vec<FallbackTaken>,
}

impl Trail {
    fn new(journal_id: i64) -> Self {
        Self {
            journal_id,
            stages: Vec::new(),
            fallbacks: Vec::new(),
        }
    }

    fn enter(&mut self, stage: IngestStage) {
        info!("Journal {}: {}", self.journal_id, stage);
        self.stages.push(stage);
    }

    fn fallback(&mut self, fallback: Fallback, reason: impl Into<String>) {
        let reason = reason.into();
        warn!("Journal {}: fallback {:?} ({})", self.journal_id, fallback, reason);
        self.fallbacks.push(FallbackTaken { fallback, reason });
    }
}

fn sha256_hex(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

/// Sequences parse, classify, map, normalize, dedup, persist, reconcile and
/// insights for one upload at a time per journal.
pub struct IngestionPipeline {
    repo: Arc<dyn TradeRepository>,
    ai: Arc<dyn AiProvider>,
    config: IngestConfig,
    locks: JournalLocks,
}

impl IngestionPipeline {
    pub fn new(repo: Arc<dyn TradeRepository>, ai: Arc<dyn AiProvider>, config: IngestConfig) -> Self {
        Self {
            repo,
            ai,
            config,
            locks: JournalLocks::new(),
        }
    }

    /// Share a lock table with other pipelines writing to the same store.
    pub fn with_locks(mut self, locks: JournalLocks) -> Self {
        self.locks = locks;
        self
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Ingest one CSV upload.
    ///
    /// Empty outcomes (everything invalid, mock or duplicate) are `Ok` with
    /// a `NothingToImport` status. Malformed files, non-trade files, missing
    /// required columns and persistence failures are errors.
    pub async fn ingest(&self, upload: CsvUpload) -> IngestResult<IngestionSummary> {
        let _guard = self.locks.acquire(upload.journal_id).await;

        let result = self.run(&upload).await;
        match &result {
            Ok(summary) => info!("Journal {}: {}", upload.journal_id, summary.message()),
            Err(e) if matches!(e, IngestError::Persistence { .. }) => {
                error!("Journal {}: ingestion of {} failed: {}", upload.journal_id, upload.file_name, e)
            }
            Err(e) => warn!("Journal {}: rejected {}: {}", upload.journal_id, upload.file_name, e),
        }
        result
    }

    async fn run(&self, upload: &CsvUpload) -> IngestResult<IngestionSummary> {
        let journal_id = upload.journal_id;
        let mut trail = Trail::new(journal_id);

        trail.enter(IngestStage::Parsing);
        let parsed = parse_csv(&upload.content)?;
        info!(
            "Parsed {}: {} columns, {} rows",
            upload.file_name,
            parsed.headers.len(),
            parsed.rows.len()
        );

        trail.enter(IngestStage::Validating);
        let preview = build_preview(&parsed.headers, &parsed.rows, self.config.sample_rows);
        let classification = classify_upload(self.ai.as_ref(), &preview).await;
        if let Some(reason) = classification.fallback_reason {
            trail.fallback(Fallback::ClassificationHeuristic, reason);
        }
        if !classification.is_trading_related {
            return Err(IngestError::NotTradingData);
        }

        trail.enter(IngestStage::Mapping);
        let outcome = map_columns(self.ai.as_ref(), &preview).await;
        if let Some(reason) = outcome.fallback_reason {
            trail.fallback(Fallback::MappingHeuristic, reason);
        }
        let missing = missing_required(&outcome.mapping);
        if !missing.is_empty() {
            return Err(IngestError::MissingColumns { missing });
        }
        let mapping = outcome.mapping;

        let mut summary = IngestionSummary {
            journal_id,
            file_name: upload.file_name.clone(),
            status: IngestStatus::Imported,
            accounting: RowAccounting {
                total_rows: parsed.rows.len(),
                ..Default::default()
            },
            diagnostics: Vec::new(),
            mapping: mapping.clone(),
            mapping_source: outcome.source,
            raw_upload_id: None,
            session_id: None,
            metrics: None,
            insights: None,
            stages: Vec::new(),
            fallbacks: Vec::new(),
        };

        trail.enter(IngestStage::Normalizing);
        let valid = self.normalize(&parsed, &mapping, journal_id, &mut summary);
        if valid.is_empty() {
            let a = &summary.accounting;
            let reason = if a.parse_errors == 0 && a.mock_filtered > 0 {
                EmptyReason::AllMock
            } else {
                EmptyReason::AllInvalid
            };
            return Ok(finish_empty(summary, trail, reason));
        }

        trail.enter(IngestStage::DeduplicatingLocal);
        let batch = dedupe_within_batch(valid);
        summary.accounting.duplicates_in_file = batch.duplicates.len();

        trail.enter(IngestStage::DeduplicatingStorage);
        let storage = dedupe_against_storage(self.repo.as_ref(), journal_id, batch.unique).await;
        if let Some(reason) = storage.lookup_error {
            trail.fallback(Fallback::DuplicateLookupSkipped, reason);
        }
        summary.accounting.database_duplicates = storage.duplicate_count;
        let mut unique = storage.unique;
        if unique.is_empty() {
            return Ok(finish_empty(summary, trail, EmptyReason::AllDuplicates));
        }
        unique.sort_by_key(|t| t.datetime);

        trail.enter(IngestStage::PersistingRaw);
        let raw = RawUploadedFile {
            id: None,
            journal_id,
            file_name: upload.file_name.clone(),
            content_sha256: sha256_hex(&upload.content),
            headers: parsed.headers.clone(),
            original_rows: parsed.rows.iter().map(|r| r.cells.clone()).collect(),
            mapping,
        };
        let raw_upload_id = self
            .repo
            .save_raw_upload(&raw)
            .await
            .map_err(|source| IngestError::Persistence {
                stage: IngestStage::PersistingRaw,
                accounting: summary.accounting,
                source,
            })?;
        summary.raw_upload_id = Some(raw_upload_id);

        trail.enter(IngestStage::PersistingSession);
        let estimate = calculate_metrics(&unique);
        let session_id = self
            .repo
            .create_session(journal_id, raw_upload_id, &estimate)
            .await
            .map_err(|source| IngestError::Persistence {
                stage: IngestStage::PersistingSession,
                accounting: summary.accounting,
                source,
            })?;
        summary.session_id = Some(session_id);

        trail.enter(IngestStage::PersistingTrades);
        let mut written = 0;
        let mut insert_error = None;
        for chunk in unique.chunks(self.config.insert_chunk.max(1)) {
            match self.repo.insert_trades(session_id, chunk).await {
                Ok(n) => written += n,
                Err(e) => {
                    error!(
                        "Session {}: trade insert failed after {} trades: {}",
                        session_id, written, e
                    );
                    insert_error = Some(e);
                    break;
                }
            }
        }

        // Always runs, so a failed insert never leaves the estimate behind.
        trail.enter(IngestStage::ReconcilingMetrics);
        let persisted = self
            .repo
            .session_trades(session_id)
            .await
            .map_err(|source| IngestError::Persistence {
                stage: IngestStage::ReconcilingMetrics,
                accounting: RowAccounting {
                    inserted: written,
                    ..summary.accounting
                },
                source,
            })?;
        summary.accounting.inserted = persisted.len();
        let metrics = calculate_metrics(&persisted);
        let update = self.repo.update_session_metrics(session_id, &metrics).await;

        if let Some(source) = insert_error {
            if let Err(e) = update {
                error!("Session {}: metrics reconciliation also failed: {}", session_id, e);
            }
            return Err(IngestError::Persistence {
                stage: IngestStage::PersistingTrades,
                accounting: summary.accounting,
                source,
            });
        }
        update.map_err(|source| IngestError::Persistence {
            stage: IngestStage::ReconcilingMetrics,
            accounting: summary.accounting,
            source,
        })?;

        summary.metrics = Some(metrics);

        trail.enter(IngestStage::RequestingInsights);
        summary.insights = self.request_insights(session_id, &persisted, &mut trail).await;

        trail.enter(IngestStage::Done);
        if !summary.accounting.is_balanced() {
            warn!(
                "Journal {}: row accounting off ({} of {} rows)",
                journal_id,
                summary.accounting.accounted(),
                summary.accounting.total_rows
            );
        }
        summary.stages = trail.stages;
        summary.fallbacks = trail.fallbacks;
        Ok(summary)
    }

    /// Normalize, validate and mock-filter every row, filling the row
    /// accounting and the diagnostic preview.
    fn normalize(
        &self,
        parsed: &ParsedCsv,
        mapping: &ColumnMapping,
        journal_id: i64,
        summary: &mut IngestionSummary,
    ) -> Vec<CanonicalTrade> {
        let mut valid = Vec::new();

        for row in &parsed.rows {
            if row.is_blank() {
                summary.accounting.empty_rows += 1;
                continue;
            }

            match normalize_row(row, mapping, self.config.side_policy).into_trade(journal_id) {
                Ok(trade) if is_mock_data(&trade) => {
                    debug!("Line {}: mock data ({})", row.line, trade.symbol);
                    summary.accounting.mock_filtered += 1;
                }
                Ok(trade) => valid.push(trade),
                Err(reasons) => {
                    let diagnostic = RowDiagnostic {
                        line: row.line,
                        reasons,
                    };
                    debug!("Rejected {}", diagnostic.message());
                    summary.accounting.parse_errors += 1;
                    if summary.diagnostics.len() < self.config.error_preview {
                        summary.diagnostics.push(diagnostic);
                    }
                }
            }
        }

        info!(
            "Normalized {} rows: {} valid, {} invalid, {} mock, {} empty",
            parsed.rows.len(),
            valid.len(),
            summary.accounting.parse_errors,
            summary.accounting.mock_filtered,
            summary.accounting.empty_rows
        );
        valid
    }

    /// Best effort. Any failure is recorded as a fallback and the session
    /// stays without insights.
    async fn request_insights(
        &self,
        session_id: i64,
        persisted: &[CanonicalTrade],
        trail: &mut Trail,
    ) -> Option<AiInsights> {
        let cap = persisted.len().min(self.config.insight_trade_cap);
        if cap == 0 {
            trail.fallback(Fallback::InsightsSkipped, "no trades to send");
            return None;
        }

        let insights = match self.ai.generate_insights(&persisted[..cap]).await {
            Ok(insights) => insights,
            Err(e) => {
                trail.fallback(Fallback::InsightsSkipped, e.to_string());
                return None;
            }
        };

        if let Err(e) = self.repo.update_session_insights(session_id, &insights).await {
            trail.fallback(Fallback::InsightsSkipped, format!("could not save insights: {}", e));
            return None;
        }

        Some(insights)
    }

    /// Metrics over every persisted trade of a journal, oldest first.
    pub async fn recompute_journal_metrics(&self, journal_id: i64) -> JournalResult<Metrics> {
        recompute_journal_metrics(self.repo.as_ref(), journal_id).await
    }
}

fn finish_empty(
    mut summary: IngestionSummary,
    mut trail: Trail,
    reason: EmptyReason,
) -> IngestionSummary {
    trail.enter(IngestStage::Done);
    summary.status = IngestStatus::NothingToImport(reason);
    summary.stages = trail.stages;
    summary.fallbacks = trail.fallbacks;
    summary
}

/// Journal-wide metrics from storage, sorted by datetime before computing.
pub async fn recompute_journal_metrics(
    repo: &dyn TradeRepository,
    journal_id: i64,
) -> JournalResult<Metrics> {
    let mut trades = repo.journal_trades(journal_id).await?;
    trades.sort_by_key(|t| t.datetime);
    debug!("Recomputing metrics for journal {} over {} trades", journal_id, trades.len());
    Ok(calculate_metrics(&trades))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
