use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{CandidateStore, StoreError};
use crate::models::audit_log::AuditEntry;
use crate::models::candidate::{Candidate, CandidateId, FieldChange};
use crate::utils::validation::{normalize_national_id, normalize_phone};

/// In-process store used by tests and by the binary when no database is configured.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    rows: Arc<Mutex<HashMap<CandidateId, Candidate>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().map(|rows| rows.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<CandidateId, Candidate>>, StoreError> {
        self.rows
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }
}

impl CandidateStore for MemoryStore {
    async fn find_by_key(&self, id: CandidateId) -> Result<Option<Candidate>, StoreError> {
        Ok(self.lock()?.get(&id).cloned())
    }

    async fn find_by_phone(&self, phone: &str) -> Result<Option<Candidate>, StoreError> {
        let wanted = normalize_phone(phone);
        if wanted.is_empty() {
            return Ok(None);
        }
        let rows = self.lock()?;
        Ok(rows
            .values()
            .filter(|c| normalize_phone(&c.phone) == wanted)
            .min_by_key(|c| (c.created_at, c.id))
            .cloned())
    }

    async fn find_by_national_id(&self, normalized: &str) -> Result<Vec<Candidate>, StoreError> {
        if normalized.is_empty() {
            return Ok(Vec::new());
        }
        let rows = self.lock()?;
        let mut found: Vec<Candidate> = rows
            .values()
            .filter(|c| {
                c.national_id
                    .as_deref()
                    .is_some_and(|id| normalize_national_id(id) == normalized)
            })
            .cloned()
            .collect();
        found.sort_by_key(|c| (c.created_at, c.id));
        Ok(found)
    }

    async fn insert(&self, candidate: Candidate) -> Result<CandidateId, StoreError> {
        let mut rows = self.lock()?;
        if rows.contains_key(&candidate.id) {
            return Err(StoreError::DuplicateKey);
        }
        let id = candidate.id;
        rows.insert(id, candidate);
        Ok(id)
    }

    async fn update(
        &self,
        id: CandidateId,
        expected_version: i64,
        changes: &[FieldChange],
        entries: &[AuditEntry],
        modified_by: &str,
    ) -> Result<Candidate, StoreError> {
        let mut rows = self.lock()?;
        let row = rows.get_mut(&id).ok_or(StoreError::NotFound)?;
        if row.version != expected_version {
            return Err(StoreError::Conflict);
        }

        for change in changes {
            change.apply(row);
        }
        row.audit_log.extend_from_slice(entries);
        row.last_modified_by = modified_by.to_string();
        row.version += 1;
        Ok(row.clone())
    }

    async fn append_audit_entries(
        &self,
        id: CandidateId,
        entries: &[AuditEntry],
    ) -> Result<(), StoreError> {
        let mut rows = self.lock()?;
        let row = rows.get_mut(&id).ok_or(StoreError::NotFound)?;
        row.audit_log.extend_from_slice(entries);
        row.version += 1;
        Ok(())
    }

    async fn scan_all<P>(&self, predicate: P) -> Result<Vec<Candidate>, StoreError>
    where
        P: Fn(&Candidate) -> bool + Send,
    {
        let rows = self.lock()?;
        Ok(rows.values().filter(|c| predicate(c)).cloned().collect())
    }
}
