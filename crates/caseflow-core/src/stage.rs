//! Trial-stage scheduling for hearing records.
//!
//! Hearings are recorded against a fixed stage sequence
//! (`first_instance < second_instance < retrial`). A stage can only be
//! recorded once every earlier stage has a hearing, and each stage has at
//! most one hearing per case: recording a stage again replaces the earlier
//! hearing.
//!
//! # Canonical order
//!
//! Hearing lists returned from this module are always sorted by
//! `hearingTime` ascending, hearings without a time last, ties broken by
//! stage sequence (stage-less hearings after staged ones). The sort is
//! stable. "Latest hearing" queries rely on this order.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::{CaseHearing, CaseRecord, TrialStage};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// A hearing's trial stage cannot be recorded yet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StageError {
    /// The stage's prerequisites are not all recorded.
    OutOfOrder {
        /// The stage that was rejected.
        stage: TrialStage,
        /// Prerequisite stages with no recorded hearing, in sequence order.
        missing: Vec<TrialStage>,
    },
}

impl fmt::Display for StageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfOrder { stage, missing } => {
                let missing: Vec<&str> = missing.iter().map(|s| s.as_str()).collect();
                write!(
                    f,
                    "trial stage '{stage}' is out of order: record {} first",
                    missing.join(", ")
                )
            }
        }
    }
}

impl std::error::Error for StageError {}

// ---------------------------------------------------------------------------
// Availability
// ---------------------------------------------------------------------------

/// Which stages a new hearing may be recorded for.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageAvailability {
    /// Stages not yet recorded whose prerequisites are all recorded.
    pub available: Vec<TrialStage>,
    /// Every other stage, in sequence order.
    pub disabled: Vec<TrialStage>,
}

fn recorded_stages(hearings: &[CaseHearing]) -> BTreeSet<TrialStage> {
    hearings.iter().filter_map(|h| h.trial_stage).collect()
}

fn missing_prerequisites(stage: TrialStage, recorded: &BTreeSet<TrialStage>) -> Vec<TrialStage> {
    stage
        .prerequisites()
        .iter()
        .copied()
        .filter(|s| !recorded.contains(s))
        .collect()
}

/// Stages not yet recorded whose prerequisites are all recorded, in
/// sequence order. For an empty list this is exactly `[first_instance]`.
#[must_use]
pub fn available_stages(hearings: &[CaseHearing]) -> Vec<TrialStage> {
    let recorded = recorded_stages(hearings);
    TrialStage::SEQUENCE
        .into_iter()
        .filter(|stage| !recorded.contains(stage))
        .filter(|stage| missing_prerequisites(*stage, &recorded).is_empty())
        .collect()
}

/// The complement of [`available_stages`], in sequence order.
#[must_use]
pub fn disabled_stages(hearings: &[CaseHearing]) -> Vec<TrialStage> {
    let available = available_stages(hearings);
    TrialStage::SEQUENCE
        .into_iter()
        .filter(|stage| !available.contains(stage))
        .collect()
}

/// Both halves of the stage query at once.
#[must_use]
pub fn stage_availability(hearings: &[CaseHearing]) -> StageAvailability {
    let available = available_stages(hearings);
    let disabled = TrialStage::SEQUENCE
        .into_iter()
        .filter(|stage| !available.contains(stage))
        .collect();
    StageAvailability {
        available,
        disabled,
    }
}

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

fn canonical_cmp(a: &CaseHearing, b: &CaseHearing) -> Ordering {
    let by_time = match (a.hearing_time, b.hearing_time) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_time.then_with(|| match (a.trial_stage, b.trial_stage) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    })
}

/// Sort hearings into canonical order (stable).
pub fn sort_hearings(hearings: &mut [CaseHearing]) {
    hearings.sort_by(canonical_cmp);
}

// ---------------------------------------------------------------------------
// Upsert / normalize
// ---------------------------------------------------------------------------

/// Record `hearing` against `existing`.
///
/// A hearing whose stage is already recorded replaces the earlier hearing
/// for that stage. A hearing for a new stage is accepted only if every
/// earlier stage is recorded. Stage-less hearings are appended. The result
/// is in canonical order.
///
/// # Errors
/// [`StageError::OutOfOrder`] if the stage's prerequisites are unmet.
pub fn upsert_hearing(
    existing: &[CaseHearing],
    hearing: CaseHearing,
) -> Result<Vec<CaseHearing>, StageError> {
    let mut hearings = existing.to_vec();
    if let Some(stage) = hearing.trial_stage {
        let recorded = recorded_stages(existing);
        if !recorded.contains(&stage) {
            let missing = missing_prerequisites(stage, &recorded);
            if !missing.is_empty() {
                return Err(StageError::OutOfOrder { stage, missing });
            }
        }
        hearings.retain(|h| h.trial_stage != Some(stage));
    }
    hearings.push(hearing);
    sort_hearings(&mut hearings);
    Ok(hearings)
}

/// Validate and canonicalize a whole submitted hearing list.
///
/// Duplicate stages collapse to the last occurrence in input order. Every
/// recorded stage must have all of its prerequisites recorded in the same
/// list; the first offending stage in sequence order is reported.
///
/// # Errors
/// [`StageError::OutOfOrder`] if any stage is recorded without its
/// prerequisites.
pub fn normalize_hearings(hearings: Vec<CaseHearing>) -> Result<Vec<CaseHearing>, StageError> {
    let mut deduped: Vec<CaseHearing> = Vec::with_capacity(hearings.len());
    for hearing in hearings {
        if let Some(stage) = hearing.trial_stage {
            deduped.retain(|h| h.trial_stage != Some(stage));
        }
        deduped.push(hearing);
    }

    let recorded = recorded_stages(&deduped);
    for stage in &recorded {
        let missing = missing_prerequisites(*stage, &recorded);
        if !missing.is_empty() {
            return Err(StageError::OutOfOrder {
                stage: *stage,
                missing,
            });
        }
    }

    sort_hearings(&mut deduped);
    Ok(deduped)
}

// ---------------------------------------------------------------------------
// Latest hearing
// ---------------------------------------------------------------------------

/// The most recent hearing: the last one with a time in canonical order,
/// or the last hearing overall when none has a time.
#[must_use]
pub fn latest_hearing(hearings: &[CaseHearing]) -> Option<&CaseHearing> {
    let mut sorted: Vec<&CaseHearing> = hearings.iter().collect();
    sorted.sort_by(|a, b| canonical_cmp(a, b));
    sorted
        .iter()
        .rev()
        .find(|h| h.hearing_time.is_some())
        .or_else(|| sorted.last())
        .copied()
}

/// Default trial lawyer for a case: the lawyer on the latest hearing,
/// falling back to the case-level trial lawyer.
#[must_use]
pub fn default_trial_lawyer(record: &CaseRecord) -> Option<&str> {
    latest_hearing(&record.hearings)
        .and_then(|h| h.trial_lawyer_id.as_deref())
        .or(record.trial_lawyer_id.as_deref())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::model::CaseId;

    fn at(day: u32, hour: u32) -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn staged(stage: TrialStage) -> CaseHearing {
        CaseHearing::at_stage(stage)
    }

    fn untagged() -> CaseHearing {
        CaseHearing {
            trial_stage: None,
            ..CaseHearing::at_stage(TrialStage::FirstInstance)
        }
    }

    // -- Availability --

    #[test]
    fn empty_history_allows_only_first_instance() {
        assert_eq!(available_stages(&[]), vec![TrialStage::FirstInstance]);
        assert_eq!(
            disabled_stages(&[]),
            vec![TrialStage::SecondInstance, TrialStage::Retrial]
        );
    }

    #[test]
    fn first_instance_unlocks_second() {
        let hearings = vec![staged(TrialStage::FirstInstance)];
        assert_eq!(available_stages(&hearings), vec![TrialStage::SecondInstance]);
        assert_eq!(
            disabled_stages(&hearings),
            vec![TrialStage::FirstInstance, TrialStage::Retrial]
        );
    }

    #[test]
    fn all_recorded_leaves_nothing_available() {
        let hearings: Vec<_> = TrialStage::SEQUENCE.into_iter().map(staged).collect();
        assert!(available_stages(&hearings).is_empty());
        assert_eq!(disabled_stages(&hearings), TrialStage::SEQUENCE.to_vec());
    }

    #[test]
    fn stage_less_hearings_do_not_count() {
        let hearings = vec![untagged()];
        assert_eq!(available_stages(&hearings), vec![TrialStage::FirstInstance]);
    }

    #[test]
    fn availability_halves_partition_the_sequence() {
        let hearings = vec![staged(TrialStage::FirstInstance)];
        let availability = stage_availability(&hearings);
        assert_eq!(availability.available, available_stages(&hearings));
        assert_eq!(availability.disabled, disabled_stages(&hearings));
    }

    // -- Upsert --

    #[test]
    fn upsert_rejects_retrial_without_second_instance() {
        let hearings = vec![staged(TrialStage::FirstInstance)];
        let err = upsert_hearing(&hearings, staged(TrialStage::Retrial)).unwrap_err();
        assert_eq!(
            err,
            StageError::OutOfOrder {
                stage: TrialStage::Retrial,
                missing: vec![TrialStage::SecondInstance],
            }
        );
        assert!(err.to_string().contains("second_instance"));
    }

    #[test]
    fn upsert_same_stage_twice_keeps_one() {
        let first = upsert_hearing(&[], staged(TrialStage::FirstInstance).with_lawyer("a")).unwrap();
        let second =
            upsert_hearing(&first, staged(TrialStage::FirstInstance).with_lawyer("b")).unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].trial_lawyer_id.as_deref(), Some("b"));
    }

    #[test]
    fn upsert_appends_stage_less_hearings() {
        let once = upsert_hearing(&[], untagged()).unwrap();
        let twice = upsert_hearing(&once, untagged()).unwrap();
        assert_eq!(twice.len(), 2);
    }

    #[test]
    fn upsert_sorts_by_time_then_stage() {
        let hearings = vec![
            staged(TrialStage::FirstInstance).with_time(at(10, 9)),
        ];
        let hearings = upsert_hearing(
            &hearings,
            staged(TrialStage::SecondInstance).with_time(at(3, 9)),
        )
        .unwrap();
        let hearings = upsert_hearing(&hearings, untagged().with_time(at(3, 9))).unwrap();
        let hearings = upsert_hearing(&hearings, untagged()).unwrap();

        let order: Vec<_> = hearings
            .iter()
            .map(|h| (h.hearing_time, h.trial_stage))
            .collect();
        assert_eq!(
            order,
            vec![
                (Some(at(3, 9)), Some(TrialStage::SecondInstance)),
                (Some(at(3, 9)), None),
                (Some(at(10, 9)), Some(TrialStage::FirstInstance)),
                (None, None),
            ]
        );
    }

    // -- Normalize --

    #[test]
    fn normalize_collapses_duplicates_last_wins() {
        let hearings = vec![
            staged(TrialStage::FirstInstance).with_lawyer("old"),
            staged(TrialStage::FirstInstance).with_lawyer("new"),
        ];
        let normalized = normalize_hearings(hearings).unwrap();
        assert_eq!(normalized.len(), 1);
        assert_eq!(normalized[0].trial_lawyer_id.as_deref(), Some("new"));
    }

    #[test]
    fn normalize_accepts_any_input_order() {
        let hearings = vec![
            staged(TrialStage::SecondInstance),
            staged(TrialStage::FirstInstance),
        ];
        let normalized = normalize_hearings(hearings).unwrap();
        assert_eq!(normalized[0].trial_stage, Some(TrialStage::FirstInstance));
    }

    #[test]
    fn normalize_rejects_gaps() {
        let hearings = vec![staged(TrialStage::FirstInstance), staged(TrialStage::Retrial)];
        let err = normalize_hearings(hearings).unwrap_err();
        assert!(matches!(
            err,
            StageError::OutOfOrder { stage: TrialStage::Retrial, .. }
        ));
    }

    // -- Latest hearing --

    #[test]
    fn latest_prefers_timed_hearings() {
        let hearings = vec![
            staged(TrialStage::FirstInstance).with_time(at(1, 9)).with_lawyer("early"),
            staged(TrialStage::SecondInstance).with_time(at(20, 9)).with_lawyer("late"),
            untagged().with_lawyer("unscheduled"),
        ];
        let latest = latest_hearing(&hearings).unwrap();
        assert_eq!(latest.trial_lawyer_id.as_deref(), Some("late"));
    }

    #[test]
    fn latest_falls_back_to_last_untimed() {
        let hearings = vec![
            staged(TrialStage::FirstInstance).with_lawyer("a"),
            staged(TrialStage::SecondInstance).with_lawyer("b"),
        ];
        let latest = latest_hearing(&hearings).unwrap();
        assert_eq!(latest.trial_lawyer_id.as_deref(), Some("b"));
        assert!(latest_hearing(&[]).is_none());
    }

    #[test]
    fn default_trial_lawyer_falls_back_to_case_level() {
        let mut record = CaseRecord::new(CaseId::new(1));
        record.trial_lawyer_id = Some("case-level".to_owned());
        assert_eq!(default_trial_lawyer(&record), Some("case-level"));

        record
            .hearings
            .push(staged(TrialStage::FirstInstance).with_lawyer("hearing-level"));
        assert_eq!(default_trial_lawyer(&record), Some("hearing-level"));
    }
}
