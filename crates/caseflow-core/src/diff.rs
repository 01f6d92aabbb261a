//! Field-level diff between two case snapshots.
//!
//! [`diff`] walks the field-label table in order and reports every field
//! whose display form differs between `previous` and `current`. Keys that
//! are not in the table are ignored, so internal fields never leak into
//! audit logs or conflict reports.
//!
//! # Example
//!
//! ```text
//! previous: { remark: "call client", provinceCity: null,  secret: 1 }
//! current:  { remark: "call client", provinceCity: "Shanghai", secret: 2 }
//!
//! diff → [ provinceCity: (empty) → Shanghai ]
//! ```
//!
//! The function is pure and deterministic: output order is table order,
//! never map insertion order.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::fields::{CaseField, FieldMap, display_value};
use crate::model::CaseRecord;

// ---------------------------------------------------------------------------
// FieldChange
// ---------------------------------------------------------------------------

/// One field that differs between two snapshots.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldChange {
    /// The field that changed.
    pub field: CaseField,
    /// Display label from the field table.
    pub label: String,
    /// Raw value before (`null` when absent).
    pub previous_value: Value,
    /// Raw value after (`null` when absent).
    pub current_value: Value,
    /// Normalized display form of `previous_value`.
    pub previous_display: String,
    /// Normalized display form of `current_value`.
    pub current_display: String,
}

// ---------------------------------------------------------------------------
// FieldDiff
// ---------------------------------------------------------------------------

/// Ordered list of field changes (table order).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldDiff {
    changes: Vec<FieldChange>,
}

impl FieldDiff {
    /// Returns `true` if nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Number of changed fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// The changed fields, in table order.
    #[must_use]
    pub fn fields(&self) -> Vec<CaseField> {
        self.changes.iter().map(|c| c.field).collect()
    }

    /// Returns `true` if `field` changed.
    #[must_use]
    pub fn touches(&self, field: CaseField) -> bool {
        self.changes.iter().any(|c| c.field == field)
    }

    /// Iterate over the changes.
    pub fn iter(&self) -> std::slice::Iter<'_, FieldChange> {
        self.changes.iter()
    }

    /// Consume into the underlying change list.
    #[must_use]
    pub fn into_changes(self) -> Vec<FieldChange> {
        self.changes
    }
}

impl<'a> IntoIterator for &'a FieldDiff {
    type Item = &'a FieldChange;
    type IntoIter = std::slice::Iter<'a, FieldChange>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.iter()
    }
}

// ---------------------------------------------------------------------------
// diff
// ---------------------------------------------------------------------------

/// Compute the ordered per-field differences between two snapshots.
///
/// Values are compared after display normalization, so `null`, a missing
/// key, and `""` are all the same "empty" value, and `10` equals `10.0`.
#[must_use]
pub fn diff(previous: &FieldMap, current: &FieldMap) -> FieldDiff {
    let changes = CaseField::all()
        .filter_map(|field| {
            let before = previous.get(field.name());
            let after = current.get(field.name());
            let previous_display = display_value(before);
            let current_display = display_value(after);
            if previous_display == current_display {
                return None;
            }
            Some(FieldChange {
                field,
                label: field.label().to_owned(),
                previous_value: before.cloned().unwrap_or(Value::Null),
                current_value: after.cloned().unwrap_or(Value::Null),
                previous_display,
                current_display,
            })
        })
        .collect();
    FieldDiff { changes }
}

/// [`diff`] over two typed records.
#[must_use]
pub fn diff_records(previous: &CaseRecord, current: &CaseRecord) -> FieldDiff {
    diff(&previous.to_field_map(), &current.to_field_map())
}

/// Re-apply a diff as a patch: every changed field takes its `current_value`.
#[must_use]
pub fn apply_diff(previous: &FieldMap, diff: &FieldDiff) -> FieldMap {
    let mut patched = previous.clone();
    for change in diff {
        patched.insert(change.field.name().to_owned(), change.current_value.clone());
    }
    patched
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
