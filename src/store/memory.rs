//! In-process case store.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use caseflow_core::changelog::CaseChangeLog;
use caseflow_core::model::{CaseId, CaseRecord};

use super::{CaseDocument, CaseStore, StoreError};

/// A [`CaseStore`] backed by a mutex-guarded map.
///
/// The mutex is held only for the duration of a single call, so the CAS
/// check and the write are atomic while no lock spans a whole update.
#[derive(Debug, Default)]
pub struct MemoryStore {
    cases: Mutex<BTreeMap<CaseId, CaseDocument>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored cases.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<CaseId, CaseDocument>> {
        // A panic while holding the lock cannot leave a half-written
        // document: every mutation is a single assignment or push.
        self.cases
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl CaseStore for MemoryStore {
    fn load(&self, case_id: CaseId) -> Result<Option<CaseRecord>, StoreError> {
        Ok(self.lock().get(&case_id).map(|doc| doc.record.clone()))
    }

    fn insert(&self, record: &CaseRecord, log: &CaseChangeLog) -> Result<(), StoreError> {
        let mut cases = self.lock();
        if cases.contains_key(&record.id) {
            return Err(StoreError::AlreadyExists { case_id: record.id });
        }
        cases.insert(
            record.id,
            CaseDocument {
                record: record.clone(),
                logs: vec![log.clone()],
            },
        );
        Ok(())
    }

    fn compare_and_swap(
        &self,
        expected_version: u64,
        record: &CaseRecord,
        log: Option<&CaseChangeLog>,
    ) -> Result<(), StoreError> {
        let mut cases = self.lock();
        let doc = cases
            .get_mut(&record.id)
            .ok_or(StoreError::NotFound { case_id: record.id })?;
        doc.swap(expected_version, record, log)
    }

    fn change_logs(&self, case_id: CaseId) -> Result<Vec<CaseChangeLog>, StoreError> {
        self.lock()
            .get(&case_id)
            .map(|doc| doc.logs.clone())
            .ok_or(StoreError::NotFound { case_id })
    }
}
