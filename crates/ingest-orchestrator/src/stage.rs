use serde::Serialize;
use std::fmt;

/// Pipeline states, in the order they are visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestStage {
    Idle,
    Parsing,
    Validating,
    Mapping,
    Normalizing,
    DeduplicatingLocal,
    DeduplicatingStorage,
    PersistingRaw,
    PersistingSession,
    PersistingTrades,
    ReconcilingMetrics,
    RequestingInsights,
    Done,
}

impl fmt::Display for IngestStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IngestStage::Idle => "idle",
            IngestStage::Parsing => "parsing",
            IngestStage::Validating => "validating",
            IngestStage::Mapping => "mapping",
            IngestStage::Normalizing => "normalizing",
            IngestStage::DeduplicatingLocal => "deduplicating (file)",
            IngestStage::DeduplicatingStorage => "deduplicating (journal)",
            IngestStage::PersistingRaw => "saving raw upload",
            IngestStage::PersistingSession => "saving session",
            IngestStage::PersistingTrades => "saving trades",
            IngestStage::ReconcilingMetrics => "reconciling metrics",
            IngestStage::RequestingInsights => "requesting insights",
            IngestStage::Done => "done",
        };
        f.write_str(s)
    }
}

/// Degraded paths the pipeline can take without failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Fallback {
    /// Classification service down, header check used.
    ClassificationHeuristic,
    /// Mapping service down or unhelpful, regex mapping used.
    MappingHeuristic,
    /// Duplicate lookup failed, trades assumed new.
    DuplicateLookupSkipped,
    /// Insights unavailable, session kept without them.
    InsightsSkipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FallbackTaken {
    pub fallback: Fallback,
    pub reason: String,
}
