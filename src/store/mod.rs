//! Case persistence contract and backends.
//!
//! The engine needs exactly two storage primitives: a consistent read of a
//! case snapshot, and a version-gated compare-and-swap write that persists
//! the new record together with its audit entry. Everything else about
//! storage is the backend's business.
//!
//! - [`MemoryStore`]: in-process map behind a mutex.
//! - [`FileStore`]: one JSON document per case with lock-file CAS.

use std::fmt;
use std::path::PathBuf;

use caseflow_core::changelog::CaseChangeLog;
use caseflow_core::model::{CaseId, CaseRecord};
use serde::{Deserialize, Serialize};

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// ---------------------------------------------------------------------------
// CaseStore
// ---------------------------------------------------------------------------

/// Storage contract consumed by the update coordinator.
///
/// Implementations must make [`CaseStore::compare_and_swap`] atomic with
/// respect to every other write of the same case: at most one writer can
/// observe a given stored version.
pub trait CaseStore: Send + Sync {
    /// Read the current snapshot of a case.
    ///
    /// # Errors
    /// Backend failures only; a missing case is `Ok(None)`.
    fn load(&self, case_id: CaseId) -> Result<Option<CaseRecord>, StoreError>;

    /// Store a new case together with its creation entry.
    ///
    /// # Errors
    /// [`StoreError::AlreadyExists`] if the id is taken.
    fn insert(&self, record: &CaseRecord, log: &CaseChangeLog) -> Result<(), StoreError>;

    /// Replace the stored record if its version still equals
    /// `expected_version`, appending `log` in the same step.
    ///
    /// # Errors
    /// - [`StoreError::NotFound`]: the case does not exist.
    /// - [`StoreError::VersionMismatch`]: another writer got there first.
    /// - [`StoreError::Busy`]: the backend could not take its write lock.
    fn compare_and_swap(
        &self,
        expected_version: u64,
        record: &CaseRecord,
        log: Option<&CaseChangeLog>,
    ) -> Result<(), StoreError>;

    /// All audit entries of a case, oldest first.
    ///
    /// # Errors
    /// [`StoreError::NotFound`] if the case does not exist.
    fn change_logs(&self, case_id: CaseId) -> Result<Vec<CaseChangeLog>, StoreError>;
}

impl<S: CaseStore + ?Sized> CaseStore for Box<S> {
    fn load(&self, case_id: CaseId) -> Result<Option<CaseRecord>, StoreError> {
        (**self).load(case_id)
    }

    fn insert(&self, record: &CaseRecord, log: &CaseChangeLog) -> Result<(), StoreError> {
        (**self).insert(record, log)
    }

    fn compare_and_swap(
        &self,
        expected_version: u64,
        record: &CaseRecord,
        log: Option<&CaseChangeLog>,
    ) -> Result<(), StoreError> {
        (**self).compare_and_swap(expected_version, record, log)
    }

    fn change_logs(&self, case_id: CaseId) -> Result<Vec<CaseChangeLog>, StoreError> {
        (**self).change_logs(case_id)
    }
}

/// A stored case: the current record plus its append-only audit trail.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseDocument {
    pub record: CaseRecord,
    #[serde(default)]
    pub logs: Vec<CaseChangeLog>,
}

impl CaseDocument {
    /// Apply a compare-and-swap to an in-memory document.
    ///
    /// # Errors
    /// [`StoreError::VersionMismatch`] if the stored version moved.
    pub fn swap(
        &mut self,
        expected_version: u64,
        record: &CaseRecord,
        log: Option<&CaseChangeLog>,
    ) -> Result<(), StoreError> {
        if self.record.version != expected_version {
            return Err(StoreError::VersionMismatch {
                case_id: record.id,
                expected: expected_version,
                actual: self.record.version,
            });
        }
        self.record = record.clone();
        if let Some(log) = log {
            self.logs.push(log.clone());
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// StoreError
// ---------------------------------------------------------------------------

/// Errors returned by storage backends.
#[derive(Debug)]
pub enum StoreError {
    /// No case with this id.
    NotFound { case_id: CaseId },

    /// Insert of an id that is already stored.
    AlreadyExists { case_id: CaseId },

    /// CAS failed because the stored version differs from the expected one.
    ///
    /// The caller should re-read the case and retry, or bail out.
    VersionMismatch {
        case_id: CaseId,
        expected: u64,
        actual: u64,
    },

    /// The backend's write lock is held by another writer.
    Busy {
        case_id: CaseId,
        /// The lock file, for backends that use one.
        lock: Option<PathBuf>,
    },

    /// Filesystem failure.
    Io {
        /// What was being done, e.g. `"write cases/4.json"`.
        context: String,
        source: std::io::Error,
    },

    /// A stored document could not be encoded or decoded.
    Serialize {
        context: String,
        source: serde_json::Error,
    },
}

impl StoreError {
    /// Returns `true` for the errors that mean "someone else wrote first".
    #[must_use]
    pub const fn is_race(&self) -> bool {
        matches!(self, Self::VersionMismatch { .. } | Self::Busy { .. })
    }

    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn serialize(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Serialize {
            context: context.into(),
            source,
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { case_id } => write!(f, "case {case_id} not found"),
            Self::AlreadyExists { case_id } => {
                write!(
                    f,
                    "case {case_id} already exists.\n  To fix: use a different id, or update the existing case."
                )
            }
            Self::VersionMismatch {
                case_id,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "write to case {case_id} rejected: expected version {expected}, found {actual}; \
                     reload the case and retry"
                )
            }
            Self::Busy { case_id, lock: None } => {
                write!(
                    f,
                    "case {case_id} is locked by another writer; retry shortly"
                )
            }
            Self::Busy {
                case_id,
                lock: Some(lock),
            } => {
                write!(
                    f,
                    "case {case_id} is locked by another writer; retry shortly.\n  \
                     To fix: if no caseflow process is writing, remove the lock file:\n    rm {}",
                    lock.display()
                )
            }
            Self::Io { context, source } => {
                write!(
                    f,
                    "I/O error: {context}: {source}\n  To fix: check file permissions and disk space."
                )
            }
            Self::Serialize { context, source } => {
                write!(
                    f,
                    "could not encode or decode {context}: {source}\n  To fix: inspect the file; it may have been edited by hand."
                )
            }
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Serialize { source, .. } => Some(source),
            _ => None,
        }
    }
}
