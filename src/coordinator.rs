//! The case update state machine.
//!
//! One call to [`CaseUpdateCoordinator::update`] runs:
//!
//! ```text
//! Start → LoadSnapshot → Classify ─┬─ NoConflict ──→ DirectWrite ─────┐
//!                                  ├─ Mergeable ───→ MergeThenWrite ──┤
//!                                  └─ Hard ────────→ RejectHard       │
//!                                                                     ▼
//!          ┌──────────── race (first) ────────────── CompareAndSwapWrite
//!          ▼                                                  │
//!     LoadSnapshot                      race (second) → Hard  │ ok
//!                                                             ▼
//!                                                 RecordAuditLog → Done
//! ```
//!
//! The audit entry is built from the pre-write and post-write snapshots and
//! handed to the store with the record, so a successful write always
//! persists exactly one record and one entry. A hard conflict persists
//! nothing. No lock is held between load and write: the store's
//! compare-and-swap on `version` is the only coordination.

use caseflow_core::changelog::{self, CaseChangeLog, ChangeAction, ChangeLogView};
use caseflow_core::conflict::{
    CaseUpdateConflictDetails, CaseUpdateMeta, Outcome, ResolveMode, classify,
};
use caseflow_core::diff::diff_records;
use caseflow_core::merge::merge;
use caseflow_core::model::fields::{CaseField, FieldMap, resolve_fields};
use caseflow_core::model::{Actor, CaseHearing, CaseId, CaseRecord};
use caseflow_core::stage::{self, StageAvailability};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::config::CaseflowConfig;
use crate::error::EngineError;
use crate::store::{CaseStore, StoreError};

/// Compare-and-swap attempts per update: the first try plus one retry.
const MAX_WRITE_ATTEMPTS: u32 = 2;

// ---------------------------------------------------------------------------
// Requests and outcomes
// ---------------------------------------------------------------------------

/// A client's update request.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    /// Sparse field values to change. Keys outside the field table are
    /// ignored.
    pub payload: FieldMap,
    /// Optimistic-concurrency context. Absent means "no version check".
    #[serde(default)]
    pub meta: Option<CaseUpdateMeta>,
}

/// Result of an update that did not fail outright.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum UpdateOutcome {
    /// The write went through.
    #[serde(rename_all = "camelCase")]
    Updated {
        record: CaseRecord,
        log: CaseChangeLog,
        /// Set when a concurrent edit was merged in.
        #[serde(skip_serializing_if = "Option::is_none")]
        merged: Option<CaseUpdateConflictDetails>,
    },
    /// Nothing changed, so nothing was written.
    Unchanged { record: CaseRecord },
    /// The update was refused; nothing was written.
    Conflict(CaseUpdateConflictDetails),
}

impl UpdateOutcome {
    /// The conflict details, if the update was refused.
    #[must_use]
    pub const fn conflict(&self) -> Option<&CaseUpdateConflictDetails> {
        match self {
            Self::Conflict(details) => Some(details),
            _ => None,
        }
    }

    /// The record after the call (`None` on conflict).
    #[must_use]
    pub const fn record(&self) -> Option<&CaseRecord> {
        match self {
            Self::Updated { record, .. } | Self::Unchanged { record } => Some(record),
            Self::Conflict(_) => None,
        }
    }
}

/// Paging for the audit query.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LogQuery {
    /// Maximum entries to return (`None` = all).
    pub limit: Option<usize>,
    /// Entries to skip from the newest.
    pub offset: usize,
}

/// One page of audit entries, newest first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeLogPage {
    pub case_id: CaseId,
    /// Total entries stored for the case.
    pub total: usize,
    pub entries: Vec<ChangeLogView>,
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Coordinator policy switches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CoordinatorOptions {
    /// Merge mergeable updates even without `resolveMode = "merge"`.
    pub auto_merge: bool,
    /// Write and log updates whose diff is empty.
    pub record_empty_updates: bool,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        Self {
            auto_merge: true,
            record_empty_updates: false,
        }
    }
}

impl From<&CaseflowConfig> for CoordinatorOptions {
    fn from(config: &CaseflowConfig) -> Self {
        Self {
            auto_merge: config.update.auto_merge,
            record_empty_updates: config.audit.record_empty_updates,
        }
    }
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

enum Step {
    LoadSnapshot,
    Classify(CaseRecord),
    DirectWrite(CaseRecord),
    MergeThenWrite(CaseRecord, CaseUpdateConflictDetails),
    RejectHard(CaseUpdateConflictDetails),
    CompareAndSwapWrite {
        observed: CaseRecord,
        candidate: CaseRecord,
        merged: Option<CaseUpdateConflictDetails>,
    },
}

impl Step {
    const fn name(&self) -> &'static str {
        match self {
            Self::LoadSnapshot => "load-snapshot",
            Self::Classify(_) => "classify",
            Self::DirectWrite(_) => "direct-write",
            Self::MergeThenWrite(..) => "merge-then-write",
            Self::RejectHard(_) => "reject-hard",
            Self::CompareAndSwapWrite { .. } => "compare-and-swap-write",
        }
    }
}

/// Everything one run of the state machine needs.
struct UpdateJob<'a> {
    case_id: CaseId,
    actor: &'a Actor,
    payload: &'a FieldMap,
    meta: Option<&'a CaseUpdateMeta>,
    client_changes: Vec<CaseField>,
    /// Forced audit action (hearing upserts); otherwise derived from the diff.
    action: Option<ChangeAction>,
}

// ---------------------------------------------------------------------------
// CaseUpdateCoordinator
// ---------------------------------------------------------------------------

/// Orchestrates case writes over a [`CaseStore`].
///
/// Holds no per-request state; one coordinator can serve any number of
/// concurrent callers.
#[derive(Debug)]
pub struct CaseUpdateCoordinator<S> {
    store: S,
    options: CoordinatorOptions,
}

impl<S: CaseStore> CaseUpdateCoordinator<S> {
    /// A coordinator with default options.
    pub fn new(store: S) -> Self {
        Self::with_options(store, CoordinatorOptions::default())
    }

    pub const fn with_options(store: S, options: CoordinatorOptions) -> Self {
        Self { store, options }
    }

    /// The underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    pub const fn options(&self) -> CoordinatorOptions {
        self.options
    }

    // -- Reads --

    /// Load a case.
    ///
    /// # Errors
    /// [`EngineError::NotFound`] if the case does not exist.
    pub fn get(&self, case_id: CaseId) -> Result<CaseRecord, EngineError> {
        self.store
            .load(case_id)?
            .ok_or(EngineError::NotFound { case_id })
    }

    /// Which trial stages a new hearing may be recorded for.
    ///
    /// # Errors
    /// [`EngineError::NotFound`] if the case does not exist.
    pub fn stage_availability(&self, case_id: CaseId) -> Result<StageAvailability, EngineError> {
        let record = self.get(case_id)?;
        Ok(stage::stage_availability(&record.hearings))
    }

    /// The audit trail of a case, newest first.
    ///
    /// # Errors
    /// [`EngineError::NotFound`] if the case does not exist.
    pub fn change_log(&self, case_id: CaseId, query: LogQuery) -> Result<ChangeLogPage, EngineError> {
        let logs = self.store.change_logs(case_id)?;
        let total = logs.len();
        let entries = logs
            .iter()
            .rev()
            .skip(query.offset)
            .take(query.limit.unwrap_or(usize::MAX))
            .map(ChangeLogView::from)
            .collect();
        Ok(ChangeLogPage {
            case_id,
            total,
            entries,
        })
    }

    // -- Writes --

    /// Create a case at version 1 with a `create` audit entry listing every
    /// non-empty field.
    ///
    /// # Errors
    /// - [`EngineError::StageOutOfOrder`] if the initial hearings skip a stage.
    /// - [`EngineError::Store`] with `AlreadyExists` if the id is taken.
    #[instrument(skip_all, fields(case_id = %record.id, actor = %actor.id))]
    pub fn create(
        &self,
        actor: &Actor,
        mut record: CaseRecord,
    ) -> Result<(CaseRecord, CaseChangeLog), EngineError> {
        let now = Utc::now();
        record.hearings = stage::normalize_hearings(std::mem::take(&mut record.hearings))?;
        record.normalize_participants();
        record.version = 1;
        record.stamp(actor, now);

        let diff = diff_records(&CaseRecord::new(record.id), &record);
        let log = changelog::record(actor, ChangeAction::Create, record.id, now, &diff);
        self.store.insert(&record, &log)?;
        info!(fields = diff.len(), "case created");
        Ok((record, log))
    }

    /// Apply a client update.
    ///
    /// Conflicts are returned as [`UpdateOutcome::Conflict`], never as
    /// errors.
    ///
    /// # Errors
    /// - [`EngineError::NotFound`] if the case does not exist.
    /// - [`EngineError::InvalidPayload`] if a value does not fit its field.
    /// - [`EngineError::StageOutOfOrder`] if submitted hearings skip a stage.
    /// - [`EngineError::Store`] on storage failure.
    #[instrument(skip_all, fields(case_id = %case_id, actor = %actor.id))]
    pub fn update(
        &self,
        case_id: CaseId,
        actor: &Actor,
        request: &UpdateRequest,
    ) -> Result<UpdateOutcome, EngineError> {
        let client_changes = client_changes(request.meta.as_ref(), &request.payload);
        log_ignored_keys(&request.payload);
        self.run(UpdateJob {
            case_id,
            actor,
            payload: &request.payload,
            meta: request.meta.as_ref(),
            client_changes,
            action: None,
        })
    }

    /// Record a hearing, replacing any earlier hearing at the same stage.
    ///
    /// Written through the same compare-and-swap path as [`Self::update`]
    /// with `hearings` as the only dirty field, so a concurrent edit to the
    /// hearing list is a hard conflict.
    ///
    /// # Errors
    /// - [`EngineError::NotFound`] if the case does not exist.
    /// - [`EngineError::StageOutOfOrder`] if the stage's prerequisites are
    ///   not recorded.
    /// - [`EngineError::Store`] on storage failure.
    #[instrument(skip_all, fields(case_id = %case_id, actor = %actor.id, stage = ?hearing.trial_stage))]
    pub fn upsert_hearing(
        &self,
        case_id: CaseId,
        actor: &Actor,
        hearing: CaseHearing,
    ) -> Result<UpdateOutcome, EngineError> {
        let current = self.get(case_id)?;
        let hearings = stage::upsert_hearing(&current.hearings, hearing)?;

        let mut proposed = current.clone();
        proposed.hearings = hearings;
        let mut payload = FieldMap::new();
        payload.insert(
            CaseField::Hearings.name().to_owned(),
            proposed.get(CaseField::Hearings),
        );
        let meta = CaseUpdateMeta {
            base_version: Some(current.version),
            base_snapshot: Some(current.to_field_map()),
            dirty_fields: vec![CaseField::Hearings.name().to_owned()],
            resolve_mode: Some(ResolveMode::Merge),
        };
        self.run(UpdateJob {
            case_id,
            actor,
            payload: &payload,
            meta: Some(&meta),
            client_changes: vec![CaseField::Hearings],
            action: Some(ChangeAction::HearingChange),
        })
    }

    fn run(&self, job: UpdateJob<'_>) -> Result<UpdateOutcome, EngineError> {
        let mut attempt: u32 = 0;
        let mut step = Step::LoadSnapshot;
        loop {
            debug!(step = step.name(), attempt, "update step");
            step = match step {
                Step::LoadSnapshot => {
                    attempt += 1;
                    Step::Classify(self.get(job.case_id)?)
                }

                Step::Classify(server) => {
                    match classify(job.meta, &job.client_changes, &server) {
                        Outcome::NoConflict => Step::DirectWrite(server),
                        Outcome::Mergeable(details) => {
                            let wants_merge = job.meta.is_some_and(CaseUpdateMeta::wants_merge);
                            if self.options.auto_merge || wants_merge {
                                Step::MergeThenWrite(server, details)
                            } else {
                                info!(
                                    latest_version = details.latest_version,
                                    "mergeable update returned for confirmation"
                                );
                                return Ok(UpdateOutcome::Conflict(details));
                            }
                        }
                        Outcome::Hard(details) => Step::RejectHard(details),
                    }
                }

                Step::DirectWrite(server) => {
                    let mut candidate = server.clone();
                    candidate.apply_patch(job.payload)?;
                    Step::CompareAndSwapWrite {
                        observed: server,
                        candidate: normalize_candidate(candidate, job.payload)?,
                        merged: None,
                    }
                }

                Step::MergeThenWrite(server, details) => {
                    let candidate = merge(job.payload, &server, &job.client_changes)?;
                    Step::CompareAndSwapWrite {
                        observed: server,
                        candidate: normalize_candidate(candidate, job.payload)?,
                        merged: Some(details),
                    }
                }

                Step::RejectHard(details) => {
                    warn!(
                        latest_version = details.latest_version,
                        conflicting = ?details.conflicting_fields,
                        "hard conflict, nothing written"
                    );
                    return Ok(UpdateOutcome::Conflict(details));
                }

                Step::CompareAndSwapWrite {
                    observed,
                    candidate,
                    merged,
                } => {
                    let diff = diff_records(&observed, &candidate);
                    if diff.is_empty() && !self.options.record_empty_updates {
                        debug!(version = observed.version, "empty diff, nothing written");
                        return Ok(UpdateOutcome::Unchanged { record: observed });
                    }

                    let now = Utc::now();
                    let mut next = candidate;
                    next.version = observed.version + 1;
                    next.stamp(job.actor, now);
                    let action = job
                        .action
                        .unwrap_or_else(|| ChangeAction::for_update(&diff));
                    let log = changelog::record(job.actor, action, job.case_id, now, &diff);

                    match self.store.compare_and_swap(observed.version, &next, Some(&log)) {
                        Ok(()) => {
                            info!(
                                version = next.version,
                                changes = diff.len(),
                                merged = merged.is_some(),
                                %action,
                                "case updated"
                            );
                            return Ok(UpdateOutcome::Updated {
                                record: next,
                                log,
                                merged,
                            });
                        }
                        Err(err) if err.is_race() && attempt < MAX_WRITE_ATTEMPTS => {
                            warn!(expected = observed.version, error = %err, "write race, retrying");
                            Step::LoadSnapshot
                        }
                        Err(err) if err.is_race() => {
                            warn!(expected = observed.version, error = %err, "second write race, giving up");
                            let latest = self
                                .store
                                .load(job.case_id)?
                                .unwrap_or_else(|| observed.clone());
                            return Ok(UpdateOutcome::Conflict(
                                CaseUpdateConflictDetails::write_race(
                                    job.meta.and_then(|m| m.base_version),
                                    &observed,
                                    &latest,
                                    job.client_changes.clone(),
                                ),
                            ));
                        }
                        Err(StoreError::NotFound { case_id }) => {
                            return Err(EngineError::NotFound { case_id });
                        }
                        Err(err) => return Err(err.into()),
                    }
                }
            };
        }
    }
}

/// The fields a client intends to change: its declared dirty fields, or the
/// table keys of its payload.
fn client_changes(meta: Option<&CaseUpdateMeta>, payload: &FieldMap) -> Vec<CaseField> {
    match meta {
        Some(meta) => meta.dirty(payload),
        None => {
            let names: Vec<&str> = payload.keys().map(String::as_str).collect();
            resolve_fields(&names)
        }
    }
}

fn log_ignored_keys(payload: &FieldMap) {
    for key in payload.keys() {
        if CaseField::from_name(key).is_none() {
            debug!(key = key.as_str(), "ignoring payload key outside the field table");
        }
    }
}

/// Canonicalize the sub-collections the payload touched.
fn normalize_candidate(
    mut candidate: CaseRecord,
    payload: &FieldMap,
) -> Result<CaseRecord, EngineError> {
    if payload.contains_key(CaseField::Hearings.name()) {
        candidate.hearings = stage::normalize_hearings(std::mem::take(&mut candidate.hearings))?;
    }
    if payload.contains_key(CaseField::Participants.name()) {
        candidate.normalize_participants();
    }
    Ok(candidate)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use caseflow_core::model::{Role, TrialStage};
    use serde_json::{Value, json};

    use super::*;
    use crate::store::MemoryStore;

    fn lawyer() -> Actor {
        Actor::new("u-1", "Li Wei", Role::Lawyer)
    }

    fn payload(value: Value) -> FieldMap {
        value.as_object().cloned().unwrap()
    }

    fn seeded(options: CoordinatorOptions) -> CaseUpdateCoordinator<MemoryStore> {
        let coordinator = CaseUpdateCoordinator::with_options(MemoryStore::new(), options);
        let mut record = CaseRecord::new(CaseId::new(1));
        record.remark = Some("initial".to_owned());
        coordinator.create(&lawyer(), record).unwrap();
        coordinator
    }

    #[test]
    fn create_starts_at_version_one_with_create_entry() {
        let coordinator = seeded(CoordinatorOptions::default());
        let record = coordinator.get(CaseId::new(1)).unwrap();
        assert_eq!(record.version, 1);
        assert_eq!(record.updater_id.as_deref(), Some("u-1"));

        let page = coordinator.change_log(CaseId::new(1), LogQuery::default()).unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.entries[0].action, ChangeAction::Create);
        assert_eq!(page.entries[0].change_list, vec!["Remark: (empty) → initial"]);
    }

    #[test]
    fn create_rejects_duplicate_id() {
        let coordinator = seeded(CoordinatorOptions::default());
        let err = coordinator
            .create(&lawyer(), CaseRecord::new(CaseId::new(1)))
            .unwrap_err();
        assert!(matches!(err, EngineError::Store(StoreError::AlreadyExists { .. })));
    }

    #[test]
    fn update_without_meta_writes_directly() {
        let coordinator = seeded(CoordinatorOptions::default());
        let request = UpdateRequest {
            payload: payload(json!({"caseStatus": "closed"})),
            meta: None,
        };
        let outcome = coordinator.update(CaseId::new(1), &lawyer(), &request).unwrap();
        let UpdateOutcome::Updated { record, log, merged } = outcome else {
            panic!("expected update");
        };
        assert_eq!(record.version, 2);
        assert_eq!(log.action, ChangeAction::StatusChange);
        assert!(merged.is_none());
    }

    #[test]
    fn empty_diff_is_unchanged_by_default() {
        let coordinator = seeded(CoordinatorOptions::default());
        let request = UpdateRequest {
            payload: payload(json!({"remark": " initial "})),
            meta: None,
        };
        let outcome = coordinator.update(CaseId::new(1), &lawyer(), &request).unwrap();
        assert!(matches!(outcome, UpdateOutcome::Unchanged { ref record } if record.version == 1));
        let page = coordinator.change_log(CaseId::new(1), LogQuery::default()).unwrap();
        assert_eq!(page.total, 1);
    }

    #[test]
    fn empty_diff_is_logged_when_configured() {
        let coordinator = seeded(CoordinatorOptions {
            record_empty_updates: true,
            ..CoordinatorOptions::default()
        });
        let request = UpdateRequest {
            payload: payload(json!({"remark": "initial"})),
            meta: None,
        };
        let outcome = coordinator.update(CaseId::new(1), &lawyer(), &request).unwrap();
        let UpdateOutcome::Updated { record, log, .. } = outcome else {
            panic!("expected update");
        };
        assert_eq!(record.version, 2);
        assert!(log.is_empty());
    }

    #[test]
    fn mergeable_without_auto_merge_needs_resolve_mode() {
        let coordinator = seeded(CoordinatorOptions {
            auto_merge: false,
            ..CoordinatorOptions::default()
        });
        let base = coordinator.get(CaseId::new(1)).unwrap();
        coordinator
            .update(
                CaseId::new(1),
                &lawyer(),
                &UpdateRequest {
                    payload: payload(json!({"courtName": "Haidian"})),
                    meta: None,
                },
            )
            .unwrap();

        let mut meta = CaseUpdateMeta {
            base_version: Some(base.version),
            base_snapshot: Some(base.to_field_map()),
            dirty_fields: vec!["remark".to_owned()],
            resolve_mode: None,
        };
        let mut request = UpdateRequest {
            payload: payload(json!({"remark": "mine"})),
            meta: Some(meta.clone()),
        };
        let outcome = coordinator.update(CaseId::new(1), &lawyer(), &request).unwrap();
        let details = outcome.conflict().unwrap();
        assert!(!details.is_hard());
        assert_eq!(coordinator.get(CaseId::new(1)).unwrap().version, 2);

        meta.resolve_mode = Some(ResolveMode::Merge);
        request.meta = Some(meta);
        let outcome = coordinator.update(CaseId::new(1), &lawyer(), &request).unwrap();
        assert_eq!(outcome.record().unwrap().version, 3);
    }

    #[test]
    fn invalid_payload_is_an_error() {
        let coordinator = seeded(CoordinatorOptions::default());
        let request = UpdateRequest {
            payload: payload(json!({"entrustedAt": "yesterday"})),
            meta: None,
        };
        let err = coordinator.update(CaseId::new(1), &lawyer(), &request).unwrap_err();
        assert!(matches!(err, EngineError::InvalidPayload(_)));
    }

    #[test]
    fn missing_case_is_not_found() {
        let coordinator = seeded(CoordinatorOptions::default());
        let err = coordinator
            .update(CaseId::new(99), &lawyer(), &UpdateRequest::default())
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));
        assert!(coordinator.stage_availability(CaseId::new(99)).is_err());
    }

    #[test]
    fn payload_hearings_are_deduplicated_and_validated() {
        let coordinator = seeded(CoordinatorOptions::default());
        let request = UpdateRequest {
            payload: payload(json!({"hearings": [
                {"trialStage": "first_instance", "judge": "A"},
                {"trialStage": "first_instance", "judge": "B"}
            ]})),
            meta: None,
        };
        let outcome = coordinator.update(CaseId::new(1), &lawyer(), &request).unwrap();
        let record = outcome.record().unwrap();
        assert_eq!(record.hearings.len(), 1);
        assert_eq!(record.hearings[0].judge.as_deref(), Some("B"));

        let request = UpdateRequest {
            payload: payload(json!({"hearings": [{"trialStage": "retrial"}]})),
            meta: None,
        };
        let err = coordinator.update(CaseId::new(1), &lawyer(), &request).unwrap_err();
        assert!(matches!(err, EngineError::StageOutOfOrder(_)));
    }

    #[test]
    fn upsert_hearing_logs_hearing_change_and_replaces_stage() {
        let coordinator = seeded(CoordinatorOptions::default());
        let id = CaseId::new(1);
        coordinator
            .upsert_hearing(id, &lawyer(), CaseHearing::at_stage(TrialStage::FirstInstance))
            .unwrap();
        let outcome = coordinator
            .upsert_hearing(
                id,
                &lawyer(),
                CaseHearing::at_stage(TrialStage::FirstInstance).with_lawyer("u-9"),
            )
            .unwrap();
        let UpdateOutcome::Updated { record, log, .. } = outcome else {
            panic!("expected update");
        };
        assert_eq!(record.hearings.len(), 1);
        assert_eq!(log.action, ChangeAction::HearingChange);
        assert_eq!(
            coordinator.stage_availability(id).unwrap().available,
            vec![TrialStage::SecondInstance]
        );
    }

    #[test]
    fn change_log_pages_newest_first() {
        let coordinator = seeded(CoordinatorOptions::default());
        let id = CaseId::new(1);
        for remark in ["a", "b", "c"] {
            coordinator
                .update(
                    id,
                    &lawyer(),
                    &UpdateRequest {
                        payload: payload(json!({ "remark": remark })),
                        meta: None,
                    },
                )
                .unwrap();
        }
        let page = coordinator
            .change_log(
                id,
                LogQuery {
                    limit: Some(2),
                    offset: 1,
                },
            )
            .unwrap();
        assert_eq!(page.total, 4);
        assert_eq!(page.entries.len(), 2);
        assert_eq!(page.entries[0].change_list, vec!["Remark: a → b"]);
        assert_eq!(page.entries[1].change_list, vec!["Remark: initial → a"]);
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let coordinator = seeded(CoordinatorOptions::default());
        let record = coordinator.get(CaseId::new(1)).unwrap();
        let json = serde_json::to_value(UpdateOutcome::Unchanged { record }).unwrap();
        assert_eq!(json["status"], json!("unchanged"));
        assert_eq!(json["record"]["version"], json!(1));
    }
}
