//! Field-wise merge of a client edit over the latest server snapshot.
//!
//! Dirty fields take the client's submitted value; every other field keeps
//! the server's latest value. A dirty field that the payload does not carry
//! keeps the server value too, so a merge can never invent a change.

use crate::model::fields::{CaseField, FieldMap};
use crate::model::{CaseRecord, RecordError};

/// Build the merged candidate record.
///
/// The result carries the server's identity, version, and audit stamps; the
/// caller bumps the version and stamps it when writing.
///
/// # Errors
/// Returns [`RecordError`] if a client value does not decode into its
/// field's type.
pub fn merge(
    client_payload: &FieldMap,
    server: &CaseRecord,
    dirty: &[CaseField],
) -> Result<CaseRecord, RecordError> {
    let mut merged = server.clone();
    for &field in dirty {
        if let Some(value) = client_payload.get(field.name()) {
            merged.set(field, value.clone())?;
        }
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::model::CaseId;

    fn server() -> CaseRecord {
        let mut record = CaseRecord::new(CaseId::new(3));
        record.version = 4;
        record.remark = Some("server remark".to_owned());
        record.province_city = Some("Shanghai".to_owned());
        record.court_name = Some("Pudong".to_owned());
        record
    }

    #[test]
    fn dirty_fields_take_client_values() {
        let payload = json!({"remark": "client remark"});
        let payload = payload.as_object().unwrap();
        let merged = merge(payload, &server(), &[CaseField::Remark]).unwrap();
        assert_eq!(merged.remark.as_deref(), Some("client remark"));
        assert_eq!(merged.province_city.as_deref(), Some("Shanghai"));
        assert_eq!(merged.version, 4);
    }

    #[test]
    fn non_dirty_payload_values_are_not_applied() {
        let payload = json!({"remark": "client remark", "provinceCity": "stale"});
        let payload = payload.as_object().unwrap();
        let merged = merge(payload, &server(), &[CaseField::Remark]).unwrap();
        assert_eq!(merged.province_city.as_deref(), Some("Shanghai"));
    }

    #[test]
    fn dirty_field_missing_from_payload_keeps_server_value() {
        let payload = FieldMap::new();
        let merged = merge(&payload, &server(), &[CaseField::CourtName]).unwrap();
        assert_eq!(merged, server());
    }

    #[test]
    fn dirty_null_clears_field() {
        let payload = json!({"courtName": null});
        let payload = payload.as_object().unwrap();
        let merged = merge(payload, &server(), &[CaseField::CourtName]).unwrap();
        assert_eq!(merged.court_name, None);
    }

    #[test]
    fn bad_client_value_is_reported() {
        let payload = json!({"lawyerFee": "lots"});
        let payload = payload.as_object().unwrap();
        let err = merge(payload, &server(), &[CaseField::LawyerFee]).unwrap_err();
        assert_eq!(err.field, CaseField::LawyerFee);
    }
}
