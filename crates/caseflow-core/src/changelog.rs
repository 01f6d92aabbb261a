//! Append-only audit entries built from field diffs.
//!
//! A [`CaseChangeLog`] records who changed a case, when, and an ordered
//! list of before/after display values with their table labels. Entries are
//! immutable once built. Each entry's `id` is the SHA-256 of its canonical
//! JSON (every field except `id` itself), so identical inputs always yield
//! identical ids and tampering is detectable with [`CaseChangeLog::verify`].

use std::fmt;
use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::diff::FieldDiff;
use crate::model::fields::CaseField;
use crate::model::{Actor, CaseId, Role};

// ---------------------------------------------------------------------------
// ChangeAction
// ---------------------------------------------------------------------------

/// What kind of write an audit entry records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeAction {
    /// A new case was created.
    Create,
    /// A general field update.
    Update,
    /// An update whose only change is the case status.
    StatusChange,
    /// A hearing was recorded or replaced.
    HearingChange,
}

impl ChangeAction {
    /// The action for a general update carrying `diff`.
    #[must_use]
    pub fn for_update(diff: &FieldDiff) -> Self {
        if diff.fields() == [CaseField::CaseStatus] {
            Self::StatusChange
        } else {
            Self::Update
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::StatusChange => "status-change",
            Self::HearingChange => "hearing-change",
        }
    }
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// CaseChangeLog
// ---------------------------------------------------------------------------

/// One audited field change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseChangeDetail {
    pub field: CaseField,
    /// Display label from the field table.
    pub label: String,
    /// Display form before the write.
    pub previous_value: String,
    /// Display form after the write.
    pub current_value: String,
}

impl fmt::Display for CaseChangeDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} → {}",
            self.label, self.previous_value, self.current_value
        )
    }
}

/// An immutable audit entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseChangeLog {
    /// Lowercase hex SHA-256 of the entry's canonical JSON.
    pub id: String,
    pub case_id: CaseId,
    pub action: ChangeAction,
    pub actor_id: String,
    pub actor_name: String,
    pub actor_role: Role,
    pub created_at: DateTime<Utc>,
    /// Field changes in table order.
    pub change_list: Vec<CaseChangeDetail>,
}

/// The hashed part of a log entry. Field order is serialization order.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LogBody<'a> {
    case_id: CaseId,
    action: ChangeAction,
    actor_id: &'a str,
    actor_name: &'a str,
    actor_role: Role,
    created_at: &'a DateTime<Utc>,
    change_list: &'a [CaseChangeDetail],
}

impl CaseChangeLog {
    fn body(&self) -> LogBody<'_> {
        LogBody {
            case_id: self.case_id,
            action: self.action,
            actor_id: &self.actor_id,
            actor_name: &self.actor_name,
            actor_role: self.actor_role,
            created_at: &self.created_at,
            change_list: &self.change_list,
        }
    }

    /// Recompute the content hash.
    #[must_use]
    pub fn content_id(&self) -> String {
        // Plain structs with string keys: serialization cannot fail.
        let bytes = serde_json::to_vec(&self.body()).unwrap_or_default();
        let digest = Sha256::digest(&bytes);
        let mut hex = String::with_capacity(64);
        for b in digest {
            let _ = write!(hex, "{b:02x}");
        }
        hex
    }

    /// Returns `true` if `id` matches the entry's content.
    #[must_use]
    pub fn verify(&self) -> bool {
        self.id == self.content_id()
    }

    /// The change list as display lines (`Label: before → after`).
    #[must_use]
    pub fn display_lines(&self) -> Vec<String> {
        self.change_list.iter().map(ToString::to_string).collect()
    }

    /// Returns `true` if the entry records no field changes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.change_list.is_empty()
    }
}

/// Build the audit entry for a write.
#[must_use]
pub fn record(
    actor: &Actor,
    action: ChangeAction,
    case_id: CaseId,
    at: DateTime<Utc>,
    diff: &FieldDiff,
) -> CaseChangeLog {
    let change_list = diff
        .iter()
        .map(|change| CaseChangeDetail {
            field: change.field,
            label: change.label.clone(),
            previous_value: change.previous_display.clone(),
            current_value: change.current_display.clone(),
        })
        .collect();
    let mut log = CaseChangeLog {
        id: String::new(),
        case_id,
        action,
        actor_id: actor.id.clone(),
        actor_name: actor.name.clone(),
        actor_role: actor.role,
        created_at: at,
        change_list,
    };
    log.id = log.content_id();
    log
}

/// A read-only page of audit entries for display, newest first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeLogView {
    pub id: String,
    pub action: ChangeAction,
    pub actor_name: String,
    pub actor_role: Role,
    pub created_at: DateTime<Utc>,
    /// Flattened `Label: before → after` lines.
    pub change_list: Vec<String>,
}

impl From<&CaseChangeLog> for ChangeLogView {
    fn from(log: &CaseChangeLog) -> Self {
        Self {
            id: log.id.clone(),
            action: log.action,
            actor_name: log.actor_name.clone(),
            actor_role: log.actor_role,
            created_at: log.created_at,
            change_list: log.display_lines(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
