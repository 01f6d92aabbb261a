//! The field-label table and display normalization.
//!
//! Every audited, editable field of a case is listed exactly once in
//! [`FIELD_TABLE`], in display order. Anything not in the table (identity,
//! version, audit stamps, unknown keys) is invisible to diffing, conflict
//! detection, merging, and audit logs.
//!
//! # Normalization
//!
//! Values are compared by their display form, so type-incidental
//! differences do not register as changes:
//!
//! | JSON value | Display |
//! |------------|---------|
//! | `null`, missing, `""`, whitespace | `(empty)` |
//! | `1500`, `1500.0` | `1500` |
//! | `12.5` | `12.5` |
//! | `true` / `false` | `yes` / `no` |
//! | `"  text "` | `text` |
//! | arrays / objects | compact JSON with sorted keys |

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A case snapshot in field-name → JSON value form (camelCase keys).
pub type FieldMap = serde_json::Map<String, Value>;

/// Display marker for an absent value.
pub const EMPTY_MARKER: &str = "(empty)";

// ---------------------------------------------------------------------------
// CaseField
// ---------------------------------------------------------------------------

/// An editable, audited field of a case record.
///
/// Declaration order is table order. Sub-collections are single fields: any
/// divergent edit to the list is an edit to the whole field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CaseField {
    CaseType,
    CaseLevel,
    CaseCategory,
    CaseNumber,
    CaseStatus,
    CaseReason,
    ProvinceCity,
    CourtName,
    EntrustedAt,
    ClosedAt,
    ContractAmount,
    LawyerFee,
    RiskAgency,
    IsArchived,
    TrialLawyerId,
    Remark,
    Participants,
    Collections,
    Timeline,
    Hearings,
}

/// One row of the field-label table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldSpec {
    /// The field.
    pub field: CaseField,
    /// Wire name (camelCase JSON key).
    pub name: &'static str,
    /// Human-readable label for audit display.
    pub label: &'static str,
}

const fn spec(field: CaseField, name: &'static str, label: &'static str) -> FieldSpec {
    FieldSpec { field, name, label }
}

/// The fixed, ordered field-label table.
pub const FIELD_TABLE: &[FieldSpec] = &[
    spec(CaseField::CaseType, "caseType", "Case type"),
    spec(CaseField::CaseLevel, "caseLevel", "Case level"),
    spec(CaseField::CaseCategory, "caseCategory", "Case category"),
    spec(CaseField::CaseNumber, "caseNumber", "Case number"),
    spec(CaseField::CaseStatus, "caseStatus", "Case status"),
    spec(CaseField::CaseReason, "caseReason", "Cause of action"),
    spec(CaseField::ProvinceCity, "provinceCity", "Province / city"),
    spec(CaseField::CourtName, "courtName", "Court"),
    spec(CaseField::EntrustedAt, "entrustedAt", "Entrusted on"),
    spec(CaseField::ClosedAt, "closedAt", "Closed on"),
    spec(CaseField::ContractAmount, "contractAmount", "Contract amount"),
    spec(CaseField::LawyerFee, "lawyerFee", "Lawyer fee"),
    spec(CaseField::RiskAgency, "riskAgency", "Risk agency"),
    spec(CaseField::IsArchived, "isArchived", "Archived"),
    spec(CaseField::TrialLawyerId, "trialLawyerId", "Trial lawyer"),
    spec(CaseField::Remark, "remark", "Remark"),
    spec(CaseField::Participants, "participants", "Parties"),
    spec(CaseField::Collections, "collections", "Collections"),
    spec(CaseField::Timeline, "timeline", "Timeline"),
    spec(CaseField::Hearings, "hearings", "Hearings"),
];

impl CaseField {
    /// Look up a field by wire name. Unknown names return `None`.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        FIELD_TABLE
            .iter()
            .find(|spec| spec.name == name)
            .map(|spec| spec.field)
    }

    /// The table row for this field.
    #[must_use]
    pub fn spec(self) -> &'static FieldSpec {
        // The table lists every variant in declaration order.
        &FIELD_TABLE[self as usize]
    }

    /// Wire name (camelCase JSON key).
    #[must_use]
    pub fn name(self) -> &'static str {
        self.spec().name
    }

    /// Display label.
    #[must_use]
    pub fn label(self) -> &'static str {
        self.spec().label
    }

    /// Iterate over all fields in table order.
    pub fn all() -> impl Iterator<Item = Self> {
        FIELD_TABLE.iter().map(|spec| spec.field)
    }

    /// Returns `true` for the list-valued sub-collection fields.
    #[must_use]
    pub const fn is_collection(self) -> bool {
        matches!(
            self,
            Self::Participants | Self::Collections | Self::Timeline | Self::Hearings
        )
    }
}

impl fmt::Display for CaseField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CaseField {
    type Err = UnknownField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| UnknownField(s.to_owned()))
    }
}

/// A field name that is not in the field-label table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownField(pub String);

impl fmt::Display for UnknownField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown case field '{}'", self.0)
    }
}

impl std::error::Error for UnknownField {}

/// Resolve a list of wire names to table fields, in table order, dropping
/// unknown names and duplicates.
#[must_use]
pub fn resolve_fields<S: AsRef<str>>(names: &[S]) -> Vec<CaseField> {
    let mut fields: Vec<CaseField> = names
        .iter()
        .filter_map(|name| CaseField::from_name(name.as_ref()))
        .collect();
    fields.sort();
    fields.dedup();
    fields
}

// ---------------------------------------------------------------------------
// Display normalization
// ---------------------------------------------------------------------------

/// Render a field value in its canonical display form.
#[must_use]
pub fn display_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => EMPTY_MARKER.to_owned(),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                EMPTY_MARKER.to_owned()
            } else {
                trimmed.to_owned()
            }
        }
        Some(Value::Bool(true)) => "yes".to_owned(),
        Some(Value::Bool(false)) => "no".to_owned(),
        Some(Value::Number(n)) => display_number(n),
        Some(Value::Array(items)) if items.is_empty() => EMPTY_MARKER.to_owned(),
        Some(other) => other.to_string(),
    }
}

fn display_number(n: &serde_json::Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        #[allow(clippy::cast_possible_truncation)]
        Some(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => (f as i64).to_string(),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}

/// Returns `true` if two values render identically.
#[must_use]
pub fn values_equivalent(a: Option<&Value>, b: Option<&Value>) -> bool {
    display_value(a) == display_value(b)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn table_matches_declaration_order() {
        for (index, spec) in FIELD_TABLE.iter().enumerate() {
            assert_eq!(spec.field as usize, index, "{} out of order", spec.name);
            assert_eq!(spec.field.spec(), spec);
        }
    }

    #[test]
    fn table_names_are_unique() {
        let mut names: Vec<_> = FIELD_TABLE.iter().map(|s| s.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), FIELD_TABLE.len());
    }

    #[test]
    fn wire_name_matches_serde_name() {
        for field in CaseField::all() {
            let json = serde_json::to_value(field).unwrap();
            assert_eq!(json, json!(field.name()));
        }
    }

    #[test]
    fn from_name_ignores_internal_fields() {
        assert_eq!(CaseField::from_name("remark"), Some(CaseField::Remark));
        assert_eq!(CaseField::from_name("version"), None);
        assert_eq!(CaseField::from_name("updaterId"), None);
        assert_eq!(CaseField::from_name("id"), None);
    }

    #[test]
    fn resolve_fields_orders_and_dedups() {
        let fields = resolve_fields(&["remark", "caseType", "bogus", "remark"]);
        assert_eq!(fields, vec![CaseField::CaseType, CaseField::Remark]);
    }

    // -- Display normalization --

    #[test]
    fn empty_forms_share_one_marker() {
        assert_eq!(display_value(None), EMPTY_MARKER);
        assert_eq!(display_value(Some(&Value::Null)), EMPTY_MARKER);
        assert_eq!(display_value(Some(&json!(""))), EMPTY_MARKER);
        assert_eq!(display_value(Some(&json!("   "))), EMPTY_MARKER);
        assert_eq!(display_value(Some(&json!([]))), EMPTY_MARKER);
    }

    #[test]
    fn numbers_use_canonical_text() {
        assert_eq!(display_value(Some(&json!(1500))), "1500");
        assert_eq!(display_value(Some(&json!(1500.0))), "1500");
        assert_eq!(display_value(Some(&json!(12.5))), "12.5");
        assert_eq!(display_value(Some(&json!(-3))), "-3");
    }

    #[test]
    fn booleans_and_strings() {
        assert_eq!(display_value(Some(&json!(true))), "yes");
        assert_eq!(display_value(Some(&json!(false))), "no");
        assert_eq!(display_value(Some(&json!("  Beijing "))), "Beijing");
    }

    #[test]
    fn objects_render_with_sorted_keys() {
        let a = json!([{"b": 1, "a": 2}]);
        assert_eq!(display_value(Some(&a)), r#"[{"a":2,"b":1}]"#);
    }

    #[test]
    fn null_and_blank_are_equivalent() {
        assert!(values_equivalent(Some(&Value::Null), Some(&json!(""))));
        assert!(values_equivalent(None, Some(&json!(" "))));
        assert!(values_equivalent(Some(&json!(10)), Some(&json!(10.0))));
        assert!(!values_equivalent(Some(&json!("a")), Some(&json!("b"))));
    }

    #[test]
    fn unknown_field_error_display() {
        let err = "nope".parse::<CaseField>().unwrap_err();
        assert_eq!(err.to_string(), "unknown case field 'nope'");
    }
}
