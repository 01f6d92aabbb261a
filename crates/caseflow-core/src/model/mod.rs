//! Case data model: identity types, the case aggregate, and the field table.

pub mod case;
pub mod fields;
pub mod types;

pub use case::{
    CaseHearing, CaseRecord, Collection, Participant, ParticipantKind, RecordError, TimelineEntry,
    TrialStage,
};
pub use fields::{CaseField, FIELD_TABLE, FieldMap, FieldSpec};
pub use types::{Actor, CaseId, Role};
