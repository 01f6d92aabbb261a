//! File-backed case store.
//!
//! Layout under the store root:
//!
//! ```text
//! <root>/cases/<id>.json        record + audit trail (CaseDocument)
//! <root>/cases/<id>.json.lock   present while a writer holds the case
//! ```
//!
//! Writers take the lock with exclusive create, re-read the document, check
//! the version, write a temp file in the same directory, fsync it, and
//! rename it over the document. Readers never take the lock: the rename is
//! atomic, so a read sees either the old or the new document.
//!
//! The lock file records the holder's pid and start time. A lock older than
//! [`STALE_LOCK_AGE`] is left over from a crashed writer and is broken.

use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, SystemTime};

use caseflow_core::changelog::CaseChangeLog;
use caseflow_core::model::{CaseId, CaseRecord};
use tracing::{debug, warn};

use super::{CaseDocument, CaseStore, StoreError};

const LOCK_ATTEMPTS: u32 = 40;
const LOCK_BACKOFF: Duration = Duration::from_millis(5);

/// No write holds a case lock this long.
pub const STALE_LOCK_AGE: Duration = Duration::from_secs(60);

/// A [`CaseStore`] keeping one JSON document per case.
#[derive(Clone, Debug)]
pub struct FileStore {
    cases_dir: PathBuf,
}

impl FileStore {
    /// Open (creating if needed) a store rooted at `root`.
    ///
    /// # Errors
    /// [`StoreError::Io`] if the directory cannot be created.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let cases_dir = root.as_ref().join("cases");
        fs::create_dir_all(&cases_dir)
            .map_err(|e| StoreError::io(format!("create {}", cases_dir.display()), e))?;
        Ok(Self { cases_dir })
    }

    fn document_path(&self, case_id: CaseId) -> PathBuf {
        self.cases_dir.join(format!("{case_id}.json"))
    }

    fn read_document(&self, case_id: CaseId) -> Result<Option<CaseDocument>, StoreError> {
        let path = self.document_path(case_id);
        let contents = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(format!("read {}", path.display()), e)),
        };
        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|e| StoreError::serialize(path.display().to_string(), e))
    }

    fn write_document(&self, doc: &CaseDocument) -> Result<(), StoreError> {
        let path = self.document_path(doc.record.id);
        let json = serde_json::to_vec_pretty(doc)
            .map_err(|e| StoreError::serialize(path.display().to_string(), e))?;

        let mut tmp = tempfile::NamedTempFile::new_in(&self.cases_dir)
            .map_err(|e| StoreError::io(format!("create temp file in {}", self.cases_dir.display()), e))?;
        tmp.write_all(&json)
            .map_err(|e| StoreError::io(format!("write {}", tmp.path().display()), e))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| StoreError::io(format!("fsync {}", tmp.path().display()), e))?;
        tmp.persist(&path)
            .map_err(|e| StoreError::io(format!("rename into {}", path.display()), e.error))?;
        Ok(())
    }

    fn lock(&self, case_id: CaseId) -> Result<CaseLock, StoreError> {
        let path = self.cases_dir.join(format!("{case_id}.json.lock"));
        for attempt in 0..LOCK_ATTEMPTS {
            match fs::OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    let lock = CaseLock { path };
                    writeln!(
                        file,
                        "pid {} since {}",
                        std::process::id(),
                        chrono::Utc::now().to_rfc3339()
                    )
                    .map_err(|e| StoreError::io(format!("write {}", lock.path.display()), e))?;
                    return Ok(lock);
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    if break_stale_lock(&path) {
                        continue;
                    }
                    debug!(%case_id, attempt, "case lock held, backing off");
                    thread::sleep(LOCK_BACKOFF);
                }
                Err(e) => return Err(StoreError::io(format!("create {}", path.display()), e)),
            }
        }
        warn!(%case_id, lock = %path.display(), "gave up waiting for case lock");
        Err(StoreError::Busy {
            case_id,
            lock: Some(path),
        })
    }
}

/// Remove `path` if it was last touched more than [`STALE_LOCK_AGE`] ago.
/// Returns `true` when the lock is gone and worth retrying at once.
fn break_stale_lock(path: &Path) -> bool {
    let age = fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|modified| SystemTime::now().duration_since(modified).ok());
    let Some(age) = age else {
        return false;
    };
    if age < STALE_LOCK_AGE {
        return false;
    }
    let holder = fs::read_to_string(path).unwrap_or_default();
    match fs::remove_file(path) {
        Ok(()) => {
            warn!(lock = %path.display(), age_secs = age.as_secs(), holder = holder.trim(), "broke stale case lock");
            true
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
        Err(e) => {
            warn!(lock = %path.display(), error = %e, "failed to break stale case lock");
            false
        }
    }
}

/// Held while writing a case; removes the lock file on drop.
struct CaseLock {
    path: PathBuf,
}

impl Drop for CaseLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(lock = %self.path.display(), error = %e, "failed to release case lock");
        }
    }
}

impl CaseStore for FileStore {
    fn load(&self, case_id: CaseId) -> Result<Option<CaseRecord>, StoreError> {
        Ok(self.read_document(case_id)?.map(|doc| doc.record))
    }

    fn insert(&self, record: &CaseRecord, log: &CaseChangeLog) -> Result<(), StoreError> {
        let _lock = self.lock(record.id)?;
        if self.document_path(record.id).exists() {
            return Err(StoreError::AlreadyExists { case_id: record.id });
        }
        self.write_document(&CaseDocument {
            record: record.clone(),
            logs: vec![log.clone()],
        })
    }

    fn compare_and_swap(
        &self,
        expected_version: u64,
        record: &CaseRecord,
        log: Option<&CaseChangeLog>,
    ) -> Result<(), StoreError> {
        let _lock = self.lock(record.id)?;
        let mut doc = self
            .read_document(record.id)?
            .ok_or(StoreError::NotFound { case_id: record.id })?;
        doc.swap(expected_version, record, log)?;
        self.write_document(&doc)
    }

    fn change_logs(&self, case_id: CaseId) -> Result<Vec<CaseChangeLog>, StoreError> {
        self.read_document(case_id)?
            .map(|doc| doc.logs)
            .ok_or(StoreError::NotFound { case_id })
    }
}
