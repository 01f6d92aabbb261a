//! Shared helpers for caseflow integration tests.
//!
//! Every test builds its own store: in memory, or in a fresh temp directory.

#![allow(dead_code)]

use caseflow::{CaseStore, CaseUpdateCoordinator, UpdateOutcome, UpdateRequest};
use caseflow_core::conflict::{CaseUpdateMeta, ResolveMode};
use caseflow_core::model::fields::FieldMap;
use caseflow_core::model::{Actor, CaseId, CaseRecord, Role};
use serde_json::Value;

pub const CASE: CaseId = CaseId::new(1);

pub fn alice() -> Actor {
    Actor::new("u-alice", "Alice", Role::Lawyer)
}

pub fn bob() -> Actor {
    Actor::new("u-bob", "Bob", Role::Assistant)
}

/// Turn a `json!({...})` object into a payload.
pub fn payload(value: Value) -> FieldMap {
    value
        .as_object()
        .cloned()
        .expect("payload must be a JSON object")
}

/// A request that declares the client's base version, snapshot, and dirty
/// fields.
pub fn edit(base: &CaseRecord, dirty: &[&str], value: Value) -> UpdateRequest {
    UpdateRequest {
        payload: payload(value),
        meta: Some(CaseUpdateMeta {
            base_version: Some(base.version),
            base_snapshot: Some(base.to_field_map()),
            dirty_fields: dirty.iter().map(|&f| f.to_owned()).collect(),
            resolve_mode: None,
        }),
    }
}

/// Like [`edit`], but asking for a merge on mergeable conflicts.
pub fn edit_merging(base: &CaseRecord, dirty: &[&str], value: Value) -> UpdateRequest {
    let mut request = edit(base, dirty, value);
    if let Some(meta) = request.meta.as_mut() {
        meta.resolve_mode = Some(ResolveMode::Merge);
    }
    request
}

/// A request with no concurrency context at all.
pub fn blind(value: Value) -> UpdateRequest {
    UpdateRequest {
        payload: payload(value),
        meta: None,
    }
}

/// Create case 1 and push it to `version` with remark edits.
pub fn case_at_version<S: CaseStore>(
    coordinator: &CaseUpdateCoordinator<S>,
    version: u64,
) -> CaseRecord {
    let mut record = CaseRecord::new(CASE);
    record.case_number = Some("(2026) Civ. 0117".to_owned());
    record.remark = Some("v1".to_owned());
    let (mut record, _) = coordinator
        .create(&alice(), record)
        .expect("create case");

    while record.version < version {
        let next = format!("v{}", record.version + 1);
        let request = edit(&record, &["remark"], serde_json::json!({ "remark": next }));
        record = match coordinator.update(CASE, &alice(), &request).expect("seed update") {
            UpdateOutcome::Updated { record, .. } => record,
            other => panic!("seed update did not write: {other:?}"),
        };
    }
    record
}

/// Unwrap a successful write.
pub fn updated(outcome: UpdateOutcome) -> CaseRecord {
    match outcome {
        UpdateOutcome::Updated { record, .. } => record,
        other => panic!("expected a write, got {other:?}"),
    }
}
