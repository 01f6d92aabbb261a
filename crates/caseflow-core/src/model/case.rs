//! The versioned case aggregate and its owned sub-collections.
//!
//! [`CaseRecord`] is the unit of optimistic concurrency: `version` is the
//! sole concurrency token and is bumped by exactly one on every successful
//! write. Field-level access goes through [`CaseField`] so that diffing,
//! merging, and patching never touch identity, version, or audit stamps.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::fields::{CaseField, FieldMap};
use super::types::{Actor, CaseId, Role};

// ---------------------------------------------------------------------------
// TrialStage
// ---------------------------------------------------------------------------

/// One step of a litigation's procedural sequence.
///
/// Declaration order is the fixed sequence order:
/// `first_instance < second_instance < retrial`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialStage {
    /// Trial of first instance.
    FirstInstance,
    /// Appeal (trial of second instance).
    SecondInstance,
    /// Retrial.
    Retrial,
}

impl TrialStage {
    /// All stages in sequence order.
    pub const SEQUENCE: [Self; 3] = [Self::FirstInstance, Self::SecondInstance, Self::Retrial];

    /// Zero-based position in the sequence.
    #[must_use]
    pub const fn ordinal(self) -> usize {
        self as usize
    }

    /// Stages that must already be recorded before this one.
    #[must_use]
    pub fn prerequisites(self) -> &'static [Self] {
        &Self::SEQUENCE[..self.ordinal()]
    }

    /// Stable snake_case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FirstInstance => "first_instance",
            Self::SecondInstance => "second_instance",
            Self::Retrial => "retrial",
        }
    }
}

impl fmt::Display for TrialStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Sub-collection items
// ---------------------------------------------------------------------------

/// Which side of the dispute a participant is on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantKind {
    /// Claimant / plaintiff / applicant.
    Claimant,
    /// Respondent / defendant.
    Respondent,
}

/// A party to the case.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    /// Person or organization name.
    pub name: String,
    /// Side of the dispute.
    pub kind: ParticipantKind,
    /// National id / registration number.
    #[serde(default)]
    pub id_number: Option<String>,
    /// Contact phone.
    #[serde(default)]
    pub phone: Option<String>,
    /// Contact address.
    #[serde(default)]
    pub address: Option<String>,
    /// Listed as a dishonest judgment debtor.
    #[serde(default)]
    pub is_dishonest: bool,
    /// Explicit display order.
    #[serde(default)]
    pub sort_order: u32,
}

/// A payment receipt recorded against the case.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    /// Amount received.
    pub amount: f64,
    /// Date received.
    pub received_at: NaiveDate,
    #[serde(default)]
    pub remark: Option<String>,
}

/// A dated follow-up note.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEntry {
    /// Date of the follow-up.
    pub date: NaiveDate,
    /// Free-form note.
    pub note: String,
    /// Staff member who followed up.
    #[serde(default)]
    pub follower_id: Option<String>,
}

/// A single hearing occurrence.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseHearing {
    /// Trial stage this hearing belongs to, if known.
    #[serde(default)]
    pub trial_stage: Option<TrialStage>,
    /// Scheduled court time (local court time).
    #[serde(default)]
    pub hearing_time: Option<NaiveDateTime>,
    #[serde(default)]
    pub court_room: Option<String>,
    #[serde(default)]
    pub judge: Option<String>,
    /// Lawyer appearing at this hearing.
    #[serde(default)]
    pub trial_lawyer_id: Option<String>,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub remark: Option<String>,
}

impl CaseHearing {
    /// A hearing for `stage` with no other details.
    #[must_use]
    pub const fn at_stage(stage: TrialStage) -> Self {
        Self {
            trial_stage: Some(stage),
            hearing_time: None,
            court_room: None,
            judge: None,
            trial_lawyer_id: None,
            result: None,
            remark: None,
        }
    }

    /// Builder-style setter for the hearing time.
    #[must_use]
    pub fn with_time(mut self, time: NaiveDateTime) -> Self {
        self.hearing_time = Some(time);
        self
    }

    /// Builder-style setter for the appearing lawyer.
    #[must_use]
    pub fn with_lawyer(mut self, lawyer_id: impl Into<String>) -> Self {
        self.trial_lawyer_id = Some(lawyer_id.into());
        self
    }
}

// ---------------------------------------------------------------------------
// CaseRecord
// ---------------------------------------------------------------------------

/// The versioned case aggregate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseRecord {
    /// Immutable identity.
    pub id: CaseId,
    /// Concurrency token; incremented on every successful write.
    #[serde(default)]
    pub version: u64,

    #[serde(default)]
    pub case_type: Option<String>,
    #[serde(default)]
    pub case_level: Option<String>,
    #[serde(default)]
    pub case_category: Option<String>,
    #[serde(default)]
    pub case_number: Option<String>,
    #[serde(default)]
    pub case_status: Option<String>,
    #[serde(default)]
    pub case_reason: Option<String>,
    #[serde(default)]
    pub province_city: Option<String>,
    #[serde(default)]
    pub court_name: Option<String>,
    #[serde(default)]
    pub entrusted_at: Option<NaiveDate>,
    #[serde(default)]
    pub closed_at: Option<NaiveDate>,
    #[serde(default)]
    pub contract_amount: Option<f64>,
    #[serde(default)]
    pub lawyer_fee: Option<f64>,
    #[serde(default)]
    pub risk_agency: bool,
    #[serde(default)]
    pub is_archived: bool,
    /// Case-level default trial lawyer.
    #[serde(default)]
    pub trial_lawyer_id: Option<String>,
    #[serde(default)]
    pub remark: Option<String>,

    #[serde(default)]
    pub participants: Vec<Participant>,
    #[serde(default)]
    pub collections: Vec<Collection>,
    #[serde(default)]
    pub timeline: Vec<TimelineEntry>,
    #[serde(default)]
    pub hearings: Vec<CaseHearing>,

    #[serde(default)]
    pub updater_id: Option<String>,
    #[serde(default)]
    pub updater_name: Option<String>,
    #[serde(default)]
    pub updater_role: Option<Role>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A value could not be decoded into a case field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordError {
    /// The field being written.
    pub field: CaseField,
    /// Decoder message.
    pub reason: String,
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid value for '{}' ({}): {}",
            self.field.name(),
            self.field.label(),
            self.reason
        )
    }
}

impl std::error::Error for RecordError {}

impl CaseRecord {
    /// An empty record with the given identity at version 0.
    #[must_use]
    pub fn new(id: CaseId) -> Self {
        Self {
            id,
            version: 0,
            case_type: None,
            case_level: None,
            case_category: None,
            case_number: None,
            case_status: None,
            case_reason: None,
            province_city: None,
            court_name: None,
            entrusted_at: None,
            closed_at: None,
            contract_amount: None,
            lawyer_fee: None,
            risk_agency: false,
            is_archived: false,
            trial_lawyer_id: None,
            remark: None,
            participants: Vec::new(),
            collections: Vec::new(),
            timeline: Vec::new(),
            hearings: Vec::new(),
            updater_id: None,
            updater_name: None,
            updater_role: None,
            updated_at: None,
        }
    }

    /// Read one field as a JSON value.
    #[must_use]
    pub fn get(&self, field: CaseField) -> Value {
        match field {
            CaseField::CaseType => encode(&self.case_type),
            CaseField::CaseLevel => encode(&self.case_level),
            CaseField::CaseCategory => encode(&self.case_category),
            CaseField::CaseNumber => encode(&self.case_number),
            CaseField::CaseStatus => encode(&self.case_status),
            CaseField::CaseReason => encode(&self.case_reason),
            CaseField::ProvinceCity => encode(&self.province_city),
            CaseField::CourtName => encode(&self.court_name),
            CaseField::EntrustedAt => encode(&self.entrusted_at),
            CaseField::ClosedAt => encode(&self.closed_at),
            CaseField::ContractAmount => encode(&self.contract_amount),
            CaseField::LawyerFee => encode(&self.lawyer_fee),
            CaseField::RiskAgency => Value::Bool(self.risk_agency),
            CaseField::IsArchived => Value::Bool(self.is_archived),
            CaseField::TrialLawyerId => encode(&self.trial_lawyer_id),
            CaseField::Remark => encode(&self.remark),
            CaseField::Participants => encode(&self.participants),
            CaseField::Collections => encode(&self.collections),
            CaseField::Timeline => encode(&self.timeline),
            CaseField::Hearings => encode(&self.hearings),
        }
    }

    /// Write one field from a JSON value.
    ///
    /// `null` clears optional fields, resets booleans to `false`, and
    /// empties sub-collections. Blank strings are stored as `None`.
    ///
    /// # Errors
    /// Returns [`RecordError`] if the value does not decode into the
    /// field's type. The record is left unchanged in that case.
    pub fn set(&mut self, field: CaseField, value: Value) -> Result<(), RecordError> {
        match field {
            CaseField::CaseType => self.case_type = decode_text(field, value)?,
            CaseField::CaseLevel => self.case_level = decode_text(field, value)?,
            CaseField::CaseCategory => self.case_category = decode_text(field, value)?,
            CaseField::CaseNumber => self.case_number = decode_text(field, value)?,
            CaseField::CaseStatus => self.case_status = decode_text(field, value)?,
            CaseField::CaseReason => self.case_reason = decode_text(field, value)?,
            CaseField::ProvinceCity => self.province_city = decode_text(field, value)?,
            CaseField::CourtName => self.court_name = decode_text(field, value)?,
            CaseField::EntrustedAt => self.entrusted_at = decode_optional(field, value)?,
            CaseField::ClosedAt => self.closed_at = decode_optional(field, value)?,
            CaseField::ContractAmount => self.contract_amount = decode_optional(field, value)?,
            CaseField::LawyerFee => self.lawyer_fee = decode_optional(field, value)?,
            CaseField::RiskAgency => self.risk_agency = decode_or_default(field, value)?,
            CaseField::IsArchived => self.is_archived = decode_or_default(field, value)?,
            CaseField::TrialLawyerId => self.trial_lawyer_id = decode_text(field, value)?,
            CaseField::Remark => self.remark = decode_text(field, value)?,
            CaseField::Participants => self.participants = decode_or_default(field, value)?,
            CaseField::Collections => self.collections = decode_or_default(field, value)?,
            CaseField::Timeline => self.timeline = decode_or_default(field, value)?,
            CaseField::Hearings => self.hearings = decode_or_default(field, value)?,
        }
        Ok(())
    }

    /// Project the record onto the field-label table.
    #[must_use]
    pub fn to_field_map(&self) -> FieldMap {
        CaseField::all()
            .map(|field| (field.name().to_owned(), self.get(field)))
            .collect()
    }

    /// Apply a sparse patch. Keys outside the field-label table (identity,
    /// version, audit stamps, unknown names) are ignored.
    ///
    /// # Errors
    /// Returns the first [`RecordError`]; fields before it in table order
    /// may already have been applied, so callers patch a clone.
    pub fn apply_patch(&mut self, patch: &FieldMap) -> Result<(), RecordError> {
        for field in CaseField::all() {
            if let Some(value) = patch.get(field.name()) {
                self.set(field, value.clone())?;
            }
        }
        Ok(())
    }

    /// Keep participants in their explicit `sortOrder` (stable for ties).
    pub fn normalize_participants(&mut self) {
        self.participants.sort_by_key(|p| p.sort_order);
    }

    /// Stamp the record as written by `actor` at `at`.
    pub fn stamp(&mut self, actor: &Actor, at: DateTime<Utc>) {
        self.updater_id = Some(actor.id.clone());
        self.updater_name = Some(actor.name.clone());
        self.updater_role = Some(actor.role);
        self.updated_at = Some(at);
    }
}

/// Plain data without maps keyed by non-strings; serialization is infallible.
fn encode<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

fn decode_optional<T: DeserializeOwned>(
    field: CaseField,
    value: Value,
) -> Result<Option<T>, RecordError> {
    if is_blank(&value) {
        return Ok(None);
    }
    serde_json::from_value(value)
        .map(Some)
        .map_err(|e| RecordError {
            field,
            reason: e.to_string(),
        })
}

fn decode_text(field: CaseField, value: Value) -> Result<Option<String>, RecordError> {
    let text: Option<String> = decode_optional(field, value)?;
    Ok(text.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty()))
}

fn decode_or_default<T: DeserializeOwned + Default>(
    field: CaseField,
    value: Value,
) -> Result<T, RecordError> {
    Ok(decode_optional(field, value)?.unwrap_or_default())
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
