//! Conflict classification for optimistic case updates.
//!
//! A client edits a case starting from `baseVersion`. If the server is still
//! at that version the write proceeds. Otherwise the classifier works out
//! which fields the server changed since the client's base snapshot
//! (`remoteChanges`) and compares them with the fields the client changed
//! (`dirtyFields`):
//!
//! ```text
//! base (v3):  remark = "a"   provinceCity = (empty)
//! server (v4): remark = "a"   provinceCity = "Shanghai"     remote = [provinceCity]
//! client:      remark = "b"                                 dirty  = [remark]
//!
//! remote ∩ dirty = {}         → Mergeable
//! ```
//!
//! Field conflicts are exact-match on field name. List-valued fields are a
//! single field: any divergent edit on either side collides.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::diff::{diff, diff_records};
use crate::model::fields::{CaseField, FieldMap, resolve_fields};
use crate::model::{CaseRecord, Role};

// ---------------------------------------------------------------------------
// CaseUpdateMeta
// ---------------------------------------------------------------------------

/// How the client wants a stale-base update resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolveMode {
    /// Merge non-overlapping concurrent edits.
    Merge,
}

/// Client-declared edit context for one update call.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseUpdateMeta {
    /// Version the client started editing from.
    #[serde(default)]
    pub base_version: Option<u64>,
    /// Field values as last seen by the client. May be sparse.
    #[serde(default)]
    pub base_snapshot: Option<FieldMap>,
    /// Names of the fields the client actually changed.
    #[serde(default)]
    pub dirty_fields: Vec<String>,
    #[serde(default)]
    pub resolve_mode: Option<ResolveMode>,
}

impl CaseUpdateMeta {
    /// The client's dirty fields, resolved against the field table.
    ///
    /// An empty `dirtyFields` list falls back to the table fields present
    /// in `payload`.
    #[must_use]
    pub fn dirty(&self, payload: &FieldMap) -> Vec<CaseField> {
        if self.dirty_fields.is_empty() {
            let names: Vec<&str> = payload.keys().map(String::as_str).collect();
            resolve_fields(&names)
        } else {
            resolve_fields(&self.dirty_fields)
        }
    }

    /// Returns `true` if the client asked for stale-base merging.
    #[must_use]
    pub fn wants_merge(&self) -> bool {
        self.resolve_mode == Some(ResolveMode::Merge)
    }
}

// ---------------------------------------------------------------------------
// Conflict details
// ---------------------------------------------------------------------------

/// Severity of a stale-base update.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictKind {
    /// Client and a concurrent writer touched the same field.
    Hard,
    /// Concurrent edits touched disjoint fields.
    Mergeable,
}

impl ConflictKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hard => "hard",
            Self::Mergeable => "mergeable",
        }
    }
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The engine's verdict when `baseVersion` is stale.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseUpdateConflictDetails {
    #[serde(rename = "type")]
    pub kind: ConflictKind,
    /// Human-readable summary.
    pub message: String,
    /// Version the client started from (`None` if it never said).
    pub base_version: Option<u64>,
    /// Current server version.
    pub latest_version: u64,
    /// Fields changed on the server since the base, in table order.
    pub remote_changes: Vec<CaseField>,
    /// Fields the client intended to change, in table order.
    pub client_changes: Vec<CaseField>,
    /// `remote_changes ∩ client_changes`, in table order.
    pub conflicting_fields: Vec<CaseField>,
    /// Who last wrote the case.
    pub updated_by_id: Option<String>,
    pub updated_by_name: Option<String>,
    pub updated_by_role: Option<Role>,
    /// When the case was last written.
    pub updated_at: Option<DateTime<Utc>>,
}

impl CaseUpdateConflictDetails {
    fn new(
        kind: ConflictKind,
        base_version: Option<u64>,
        server: &CaseRecord,
        remote_changes: Vec<CaseField>,
        client_changes: Vec<CaseField>,
    ) -> Self {
        let conflicting_fields = intersect(&remote_changes, &client_changes);
        let message = describe(kind, server, &remote_changes, &conflicting_fields);
        Self {
            kind,
            message,
            base_version,
            latest_version: server.version,
            remote_changes,
            client_changes,
            conflicting_fields,
            updated_by_id: server.updater_id.clone(),
            updated_by_name: server.updater_name.clone(),
            updated_by_role: server.updater_role,
            updated_at: server.updated_at,
        }
    }

    /// A hard conflict for an update that lost the compare-and-swap race
    /// twice in a row.
    ///
    /// `observed` is the snapshot the final attempt was computed from and
    /// `latest` the snapshot that beat it. `base_version` is the client's
    /// declared base, `None` for requests without one.
    #[must_use]
    pub fn write_race(
        base_version: Option<u64>,
        observed: &CaseRecord,
        latest: &CaseRecord,
        client_changes: Vec<CaseField>,
    ) -> Self {
        let remote_changes = diff_records(observed, latest).fields();
        let conflicting_fields = intersect(&remote_changes, &client_changes);
        let who = latest.updater_name.as_deref().unwrap_or("another user");
        Self {
            kind: ConflictKind::Hard,
            message: format!(
                "case {} kept changing while saving (now version {} by {who}); reload and resubmit",
                latest.id, latest.version
            ),
            base_version,
            latest_version: latest.version,
            remote_changes,
            client_changes,
            conflicting_fields,
            updated_by_id: latest.updater_id.clone(),
            updated_by_name: latest.updater_name.clone(),
            updated_by_role: latest.updater_role,
            updated_at: latest.updated_at,
        }
    }

    /// A hard conflict on every client field, for a base the server cannot
    /// compare against.
    fn unknown_base(
        base_version: u64,
        server: &CaseRecord,
        client_changes: Vec<CaseField>,
        message: String,
    ) -> Self {
        let mut details = Self::new(
            ConflictKind::Hard,
            Some(base_version),
            server,
            Vec::new(),
            client_changes.clone(),
        );
        details.conflicting_fields = client_changes;
        details.message = message;
        details
    }

    /// Returns `true` for [`ConflictKind::Hard`].
    #[must_use]
    pub fn is_hard(&self) -> bool {
        self.kind == ConflictKind::Hard
    }
}

fn intersect(a: &[CaseField], b: &[CaseField]) -> Vec<CaseField> {
    let b: BTreeSet<CaseField> = b.iter().copied().collect();
    a.iter().copied().filter(|f| b.contains(f)).collect()
}

fn labels(fields: &[CaseField]) -> String {
    fields
        .iter()
        .map(|f| f.label())
        .collect::<Vec<_>>()
        .join(", ")
}

fn describe(
    kind: ConflictKind,
    server: &CaseRecord,
    remote: &[CaseField],
    conflicting: &[CaseField],
) -> String {
    let who = server.updater_name.as_deref().unwrap_or("another user");
    match kind {
        ConflictKind::Hard if conflicting.is_empty() => format!(
            "case {} was updated by {who} (version {}) and your starting point is unknown; reload before saving",
            server.id, server.version
        ),
        ConflictKind::Hard => format!(
            "case {} was updated by {who} (version {}); both of you changed: {}",
            server.id,
            server.version,
            labels(conflicting)
        ),
        ConflictKind::Mergeable if remote.is_empty() => format!(
            "case {} was saved by {who} (version {}) without changing any field you edited",
            server.id, server.version
        ),
        ConflictKind::Mergeable => format!(
            "case {} was also updated by {who} (version {}): {}; your changes do not overlap",
            server.id,
            server.version,
            labels(remote)
        ),
    }
}

// ---------------------------------------------------------------------------
// classify
// ---------------------------------------------------------------------------

/// Result of classifying one update against the current server snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The client's view was current (or it asked for no version check).
    NoConflict,
    /// Stale base, but concurrent edits are disjoint.
    Mergeable(CaseUpdateConflictDetails),
    /// Stale base and overlapping edits.
    Hard(CaseUpdateConflictDetails),
}

impl Outcome {
    /// The conflict details, if any.
    #[must_use]
    pub fn details(&self) -> Option<&CaseUpdateConflictDetails> {
        match self {
            Self::NoConflict => None,
            Self::Mergeable(details) | Self::Hard(details) => Some(details),
        }
    }
}

/// Classify an update against `server`.
///
/// `client_changes` are the fields the client intends to change (see
/// [`CaseUpdateMeta::dirty`]).
///
/// - No meta, or no `baseVersion`: [`Outcome::NoConflict`].
/// - `baseVersion == server.version`: [`Outcome::NoConflict`].
/// - `baseVersion` ahead of the server: [`Outcome::Hard`] on every client
///   field.
/// - Stale base with a `baseSnapshot`: remote changes are the fields whose
///   value in the snapshot differs from the server's, plus every client
///   field the snapshot does not carry. Disjoint from `client_changes`
///   gives [`Outcome::Mergeable`], otherwise [`Outcome::Hard`].
/// - Stale base without a `baseSnapshot`: the remote side is unknown, so
///   every client field is treated as conflicting ([`Outcome::Hard`]).
#[must_use]
pub fn classify(
    meta: Option<&CaseUpdateMeta>,
    client_changes: &[CaseField],
    server: &CaseRecord,
) -> Outcome {
    let Some(meta) = meta else {
        return Outcome::NoConflict;
    };
    let Some(base_version) = meta.base_version else {
        return Outcome::NoConflict;
    };
    if base_version == server.version {
        return Outcome::NoConflict;
    }

    let client_changes = client_changes.to_vec();
    if base_version > server.version {
        tracing::debug!(case_id = %server.id, base_version, latest_version = server.version, "base version ahead of server");
        let message = format!(
            "case {} is at version {}, but the update claims to start from version {base_version}; reload before saving",
            server.id, server.version
        );
        return Outcome::Hard(CaseUpdateConflictDetails::unknown_base(
            base_version,
            server,
            client_changes,
            message,
        ));
    }

    let Some(base_snapshot) = meta.base_snapshot.as_ref() else {
        tracing::debug!(case_id = %server.id, base_version, "stale base without snapshot");
        let message = describe(ConflictKind::Hard, server, &[], &[]);
        return Outcome::Hard(CaseUpdateConflictDetails::unknown_base(
            base_version,
            server,
            client_changes,
            message,
        ));
    };

    let mut remote_changes = remote_changes(base_snapshot, server);
    // A client field the snapshot does not carry has an unknown base value.
    for field in &client_changes {
        if !base_snapshot.contains_key(field.name()) && !remote_changes.contains(field) {
            remote_changes.push(*field);
        }
    }
    remote_changes.sort();
    let overlaps = remote_changes.iter().any(|f| client_changes.contains(f));
    let kind = if overlaps {
        ConflictKind::Hard
    } else {
        ConflictKind::Mergeable
    };
    tracing::debug!(
        case_id = %server.id,
        base_version,
        latest_version = server.version,
        remote = remote_changes.len(),
        client = client_changes.len(),
        %kind,
        "stale base classified"
    );
    let details = CaseUpdateConflictDetails::new(
        kind,
        Some(base_version),
        server,
        remote_changes,
        client_changes,
    );
    match kind {
        ConflictKind::Hard => Outcome::Hard(details),
        ConflictKind::Mergeable => Outcome::Mergeable(details),
    }
}

/// Fields whose server value differs from the client's base snapshot,
/// restricted to the fields the snapshot carries.
#[must_use]
pub fn remote_changes(base_snapshot: &FieldMap, server: &CaseRecord) -> Vec<CaseField> {
    let server_map: FieldMap = server
        .to_field_map()
        .into_iter()
        .filter(|(name, _)| base_snapshot.contains_key(name))
        .collect();
    diff(base_snapshot, &server_map).fields()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
