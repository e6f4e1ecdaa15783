//! Record store contract the pipeline runs against, plus the two adapters shipped with it.

pub mod memory;
pub mod pool;
pub mod postgres;

use std::future::Future;

use crate::models::audit_log::AuditEntry;
use crate::models::candidate::{Candidate, CandidateId, FieldChange};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("record key already exists")]
    DuplicateKey,
    #[error("concurrent write detected")]
    Conflict,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::DuplicateKey,
            other => StoreError::Unavailable(other.to_string()),
        }
    }
}

/// Keyed candidate persistence. Candidates are addressed only by their generated id.
///
/// `update` and `append_audit_entries` must be atomic: field changes and their audit
/// entries persist together or not at all, and a write against a stale version fails
/// with [`StoreError::Conflict`].
pub trait CandidateStore: Send + Sync {
    fn find_by_key(
        &self,
        id: CandidateId,
    ) -> impl Future<Output = Result<Option<Candidate>, StoreError>> + Send;

    /// Oldest record with this normalized phone. Only screening uses this.
    fn find_by_phone(
        &self,
        phone: &str,
    ) -> impl Future<Output = Result<Option<Candidate>, StoreError>> + Send;

    /// Every record whose normalized national id equals `normalized`, oldest first.
    fn find_by_national_id(
        &self,
        normalized: &str,
    ) -> impl Future<Output = Result<Vec<Candidate>, StoreError>> + Send;

    /// Persists a new candidate together with its initial audit log.
    fn insert(
        &self,
        candidate: Candidate,
    ) -> impl Future<Output = Result<CandidateId, StoreError>> + Send;

    /// Applies `changes` and appends `entries` if the stored version equals
    /// `expected_version`, returning the stored result.
    fn update(
        &self,
        id: CandidateId,
        expected_version: i64,
        changes: &[FieldChange],
        entries: &[AuditEntry],
        modified_by: &str,
    ) -> impl Future<Output = Result<Candidate, StoreError>> + Send;

    fn append_audit_entries(
        &self,
        id: CandidateId,
        entries: &[AuditEntry],
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Every candidate the predicate accepts, in no particular order. The predicate
    /// must not look at `audit_log`; adapters may run it before history is loaded.
    fn scan_all<P>(
        &self,
        predicate: P,
    ) -> impl Future<Output = Result<Vec<Candidate>, StoreError>> + Send
    where
        P: Fn(&Candidate) -> bool + Send;
}
