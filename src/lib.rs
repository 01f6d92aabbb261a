//! caseflow library crate: storage, the update coordinator, and the ambient
//! configuration/telemetry pieces shared by the `caseflow` binary and the
//! integration tests.
//!
//! The pure engine (diffing, classification, merging, trial stages, audit
//! entries) lives in the `caseflow_core` crate.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod format;
pub mod store;
pub mod telemetry;

pub use coordinator::{
    CaseUpdateCoordinator, ChangeLogPage, CoordinatorOptions, LogQuery, UpdateOutcome,
    UpdateRequest,
};
pub use error::EngineError;
pub use store::{CaseStore, FileStore, MemoryStore, StoreError};
