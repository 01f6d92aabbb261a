//! Core engine for caseflow.
//!
//! Pure functions over immutable case snapshots; no I/O:
//!
//! - [`diff`]: ordered per-field differences over the field-label table.
//! - [`stage`]: trial-stage availability and hearing ordering.
//! - [`conflict`]: stale-base classification (no conflict, mergeable, hard).
//! - [`merge`]: dirty-field merge over the latest server snapshot.
//! - [`changelog`]: content-addressed audit entries.
//!
//! Storage, the update state machine, and the CLI live in the `caseflow`
//! crate.

pub mod changelog;
pub mod conflict;
pub mod diff;
pub mod merge;
pub mod model;
pub mod stage;
