//! Text rendering for command output.

use std::fmt::Write as _;

use caseflow::{ChangeLogPage, UpdateOutcome};
use caseflow_core::conflict::CaseUpdateConflictDetails;
use caseflow_core::model::fields::{CaseField, display_value};
use caseflow_core::model::CaseRecord;
use caseflow_core::stage::{self, StageAvailability};

fn labels(fields: &[CaseField]) -> String {
    if fields.is_empty() {
        return "(none)".to_owned();
    }
    fields
        .iter()
        .map(|f| f.label())
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn record(record: &CaseRecord) -> String {
    let mut out = format!("case {} (version {})", record.id, record.version);
    for field in CaseField::all() {
        let value = record.get(field);
        let shown = if field.is_collection() {
            match value.as_array().map(Vec::len) {
                Some(0) | None => continue,
                Some(n) => format!("{n} item(s)"),
            }
        } else {
            display_value(Some(&value))
        };
        if shown == display_value(None) {
            continue;
        }
        let _ = write!(out, "\n  {}: {shown}", field.label());
    }
    if let Some(lawyer) = stage::default_trial_lawyer(record) {
        let _ = write!(out, "\n  Default trial lawyer: {lawyer}");
    }
    if let (Some(name), Some(at)) = (&record.updater_name, &record.updated_at) {
        let _ = write!(out, "\n  Last updated by {name} at {}", at.to_rfc3339());
    }
    out
}

pub fn conflict(details: &CaseUpdateConflictDetails) -> String {
    let mut out = format!("conflict ({}): {}", details.kind, details.message);
    let _ = write!(
        out,
        "\n  your base version: {}",
        details
            .base_version
            .map_or_else(|| "unknown".to_owned(), |v| v.to_string())
    );
    let _ = write!(out, "\n  latest version:    {}", details.latest_version);
    let _ = write!(out, "\n  changed remotely:  {}", labels(&details.remote_changes));
    let _ = write!(out, "\n  changed by you:    {}", labels(&details.client_changes));
    let _ = write!(out, "\n  conflicting:       {}", labels(&details.conflicting_fields));
    out.push_str("\nNothing was written. Reload the case and resubmit.");
    out
}

pub fn outcome(outcome: &UpdateOutcome) -> String {
    match outcome {
        UpdateOutcome::Updated {
            record,
            log,
            merged,
        } => {
            let mut out = format!(
                "updated case {} to version {} ({})",
                record.id, record.version, log.action
            );
            for line in log.display_lines() {
                let _ = write!(out, "\n  {line}");
            }
            if let Some(details) = merged {
                let _ = write!(
                    out,
                    "\nmerged with concurrent changes to: {}",
                    labels(&details.remote_changes)
                );
            }
            out
        }
        UpdateOutcome::Unchanged { record } => format!(
            "no changes; case {} stays at version {}",
            record.id, record.version
        ),
        UpdateOutcome::Conflict(details) => conflict(details),
    }
}

pub fn log_page(page: &ChangeLogPage) -> String {
    let mut out = format!(
        "case {}: {} of {} audit entries",
        page.case_id,
        page.entries.len(),
        page.total
    );
    for entry in &page.entries {
        let _ = write!(
            out,
            "\n{} {} by {} ({})",
            entry.created_at.to_rfc3339(),
            entry.action,
            entry.actor_name,
            entry.actor_role
        );
        for line in &entry.change_list {
            let _ = write!(out, "\n    {line}");
        }
    }
    out
}

pub fn stages(availability: &StageAvailability) -> String {
    let join = |stages: &[caseflow_core::model::TrialStage]| {
        if stages.is_empty() {
            "(none)".to_owned()
        } else {
            stages.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")
        }
    };
    format!(
        "available: {}\ndisabled:  {}",
        join(&availability.available),
        join(&availability.disabled)
    )
}
