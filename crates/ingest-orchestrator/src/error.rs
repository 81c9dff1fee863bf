use journal_core::{CanonicalField, JournalError};
use thiserror::Error;

use crate::stage::IngestStage;
use crate::summary::RowAccounting;

fn field_list(fields: &[CanonicalField]) -> String {
    fields
        .iter()
        .map(|f| f.key())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Hard failures. Everything else ends up in the summary.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Could not read the file as CSV: {0}")]
    MalformedFile(String),

    #[error("The file has no header row")]
    NoHeaders,

    #[error("The file has no data rows")]
    NoDataRows,

    #[error("The file does not look like a trade export")]
    NotTradingData,

    #[error("Required columns could not be identified: {}", field_list(.missing))]
    MissingColumns { missing: Vec<CanonicalField> },

    /// `accounting` holds the row buckets filled before the failure;
    /// `accounting.inserted` is what actually reached storage.
    #[error(
        "Failed while {} ({} trades saved): {}",
        .stage,
        .accounting.inserted,
        .source
    )]
    Persistence {
        stage: IngestStage,
        accounting: RowAccounting,
        #[source]
        source: JournalError,
    },
}

impl IngestError {
    /// Stage the pipeline was in when it failed.
    pub fn stage(&self) -> IngestStage {
        match self {
            IngestError::MalformedFile(_) | IngestError::NoHeaders | IngestError::NoDataRows => {
                IngestStage::Parsing
            }
            IngestError::NotTradingData => IngestStage::Validating,
            IngestError::MissingColumns { .. } => IngestStage::Mapping,
            IngestError::Persistence { stage, .. } => *stage,
        }
    }

    /// Row accounting at the point of failure, for persistence errors.
    pub fn accounting(&self) -> Option<&RowAccounting> {
        match self {
            IngestError::Persistence { accounting, .. } => Some(accounting),
            _ => None,
        }
    }
}

pub type IngestResult<T> = Result<T, IngestError>;
