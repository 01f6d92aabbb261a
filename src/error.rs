//! Engine error types for caseflow.
//!
//! [`EngineError`] covers everything that stops an operation outright.
//! Conflicts are not errors: a stale or raced update comes back as
//! [`crate::coordinator::UpdateOutcome::Conflict`] with structured details.
//!
//! Messages are self-contained: each says what went wrong and how to fix it.

use std::fmt;

use caseflow_core::model::{CaseId, RecordError};
use caseflow_core::stage::StageError;

use crate::store::StoreError;

// ---------------------------------------------------------------------------
// EngineError
// ---------------------------------------------------------------------------

/// Unified error type for coordinator operations.
#[derive(Debug)]
pub enum EngineError {
    /// The case id does not resolve to a stored case.
    NotFound {
        /// The missing case.
        case_id: CaseId,
    },

    /// A hearing was submitted for a stage whose prerequisites are unmet.
    StageOutOfOrder(StageError),

    /// A payload value could not be decoded into its field.
    InvalidPayload(RecordError),

    /// The storage layer failed.
    Store(StoreError),
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { case_id } => {
                write!(
                    f,
                    "case {case_id} not found.\n  To fix: check the case id, or create the case first:\n    caseflow case create --file <case.json>"
                )
            }
            Self::StageOutOfOrder(err) => {
                write!(
                    f,
                    "{err}\n  To fix: list the stages that can be recorded now:\n    caseflow hearing stages <case-id>"
                )
            }
            Self::InvalidPayload(err) => {
                write!(
                    f,
                    "{err}\n  To fix: correct the value in the request payload and resubmit."
                )
            }
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

// ---------------------------------------------------------------------------
// std::error::Error
// ---------------------------------------------------------------------------

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::NotFound { .. } => None,
            Self::StageOutOfOrder(err) => Some(err),
            Self::InvalidPayload(err) => Some(err),
            Self::Store(err) => Some(err),
        }
    }
}

// ---------------------------------------------------------------------------
// From impls
// ---------------------------------------------------------------------------

impl From<StageError> for EngineError {
    fn from(err: StageError) -> Self {
        Self::StageOutOfOrder(err)
    }
}

impl From<RecordError> for EngineError {
    fn from(err: RecordError) -> Self {
        Self::InvalidPayload(err)
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { case_id } => Self::NotFound { case_id },
            other => Self::Store(other),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
