use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{CandidateStore, StoreError};
use crate::models::audit_log::AuditEntry;
use crate::models::candidate::{Candidate, CandidateId, DocumentStatus, FieldChange};
use crate::models::workflow::WorkflowState;
use crate::utils::validation::{normalize_national_id, normalize_phone};

const CANDIDATE_COLUMNS: &str = "id, full_name, date_of_birth, hometown, phone, national_id, position, source, \
     social_links, document_status, bus_route, dormitory_requested, photo_ref, status, note, \
     created_at, created_by, last_modified_by, version";

#[derive(Debug, FromRow)]
struct CandidateRow {
    id: Uuid,
    full_name: String,
    date_of_birth: Option<NaiveDate>,
    hometown: String,
    phone: String,
    national_id: Option<String>,
    position: String,
    source: String,
    social_links: Vec<String>,
    document_status: String,
    bus_route: Option<String>,
    dormitory_requested: bool,
    photo_ref: Option<String>,
    status: String,
    note: String,
    created_at: DateTime<Utc>,
    created_by: String,
    last_modified_by: String,
    version: i64,
}

#[derive(Debug, FromRow)]
struct AuditRow {
    candidate_id: Uuid,
    recorded_at: DateTime<Utc>,
    actor: String,
    field: String,
    old_value: Option<String>,
    new_value: Option<String>,
    summary: String,
}

impl CandidateRow {
    fn into_candidate(self, audit_log: Vec<AuditEntry>) -> Result<Candidate, StoreError> {
        let status = self
            .status
            .parse::<WorkflowState>()
            .map_err(|e| StoreError::Unavailable(format!("corrupt candidate {}: {}", self.id, e)))?;
        let document_status = self
            .document_status
            .parse::<DocumentStatus>()
            .map_err(|e| StoreError::Unavailable(format!("corrupt candidate {}: {}", self.id, e)))?;

        Ok(Candidate {
            id: CandidateId(self.id),
            full_name: self.full_name,
            date_of_birth: self.date_of_birth,
            hometown: self.hometown,
            phone: self.phone,
            national_id: self.national_id,
            position: self.position,
            source: self.source,
            social_links: self.social_links,
            document_status,
            bus_route: self.bus_route,
            dormitory_requested: self.dormitory_requested,
            photo_ref: self.photo_ref,
            status,
            note: self.note,
            created_at: self.created_at,
            created_by: self.created_by,
            last_modified_by: self.last_modified_by,
            version: self.version,
            audit_log,
        })
    }
}

impl From<AuditRow> for AuditEntry {
    fn from(row: AuditRow) -> Self {
        Self {
            timestamp: row.recorded_at,
            actor: row.actor,
            field: row.field,
            old_value: row.old_value,
            new_value: row.new_value,
            summary: row.summary,
        }
    }
}

/// PostgreSQL adapter. Audit entries live in their own append-only table keyed by
/// `(candidate_id, seq)`; row locks plus the `version` column provide conflict detection.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    async fn hydrate(&self, rows: Vec<CandidateRow>) -> Result<Vec<Candidate>, StoreError> {
        let candidates = rows
            .into_iter()
            .map(|row| row.into_candidate(Vec::new()))
            .collect::<Result<Vec<_>, _>>()?;
        self.attach_logs(candidates).await
    }

    /// Loads the audit history of every candidate in one query.
    async fn attach_logs(&self, mut candidates: Vec<Candidate>) -> Result<Vec<Candidate>, StoreError> {
        if candidates.is_empty() {
            return Ok(candidates);
        }
        let ids: Vec<Uuid> = candidates.iter().map(|c| c.id.0).collect();
        let audit_rows = sqlx::query_as::<_, AuditRow>(
            r#"
            SELECT candidate_id, recorded_at, actor, field, old_value, new_value, summary
            FROM candidate_audit_entries
            WHERE candidate_id = ANY($1)
            ORDER BY candidate_id, seq
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut logs: HashMap<Uuid, Vec<AuditEntry>> = HashMap::new();
        for row in audit_rows {
            logs.entry(row.candidate_id).or_default().push(row.into());
        }
        for candidate in &mut candidates {
            candidate.audit_log = logs.remove(&candidate.id.0).unwrap_or_default();
        }
        Ok(candidates)
    }

    async fn fetch_one(&self, id: Uuid) -> Result<Option<Candidate>, StoreError> {
        let row = sqlx::query_as::<_, CandidateRow>(&format!(
            "SELECT {} FROM candidates WHERE id = $1",
            CANDIDATE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }
}

async fn insert_entries(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    entries: &[AuditEntry],
) -> Result<(), StoreError> {
    if entries.is_empty() {
        return Ok(());
    }
    let last_seq: Option<i64> =
        sqlx::query_scalar("SELECT MAX(seq) FROM candidate_audit_entries WHERE candidate_id = $1")
            .bind(id)
            .fetch_one(&mut **tx)
            .await?;

    let mut seq = last_seq.unwrap_or(0);
    for entry in entries {
        seq += 1;
        sqlx::query(
            r#"
            INSERT INTO candidate_audit_entries
                (candidate_id, seq, recorded_at, actor, field, old_value, new_value, summary)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(id)
        .bind(seq)
        .bind(entry.timestamp)
        .bind(&entry.actor)
        .bind(&entry.field)
        .bind(&entry.old_value)
        .bind(&entry.new_value)
        .bind(&entry.summary)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

async fn lock_version(tx: &mut Transaction<'_, Postgres>, id: Uuid) -> Result<i64, StoreError> {
    sqlx::query_scalar::<_, i64>("SELECT version FROM candidates WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(StoreError::NotFound)
}

impl CandidateStore for PgStore {
    async fn find_by_key(&self, id: CandidateId) -> Result<Option<Candidate>, StoreError> {
        self.fetch_one(id.0).await
    }

    async fn find_by_phone(&self, phone: &str) -> Result<Option<Candidate>, StoreError> {
        let row = sqlx::query_as::<_, CandidateRow>(&format!(
            "SELECT {} FROM candidates WHERE phone_normalized = $1 ORDER BY created_at, id LIMIT 1",
            CANDIDATE_COLUMNS
        ))
        .bind(normalize_phone(phone))
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn find_by_national_id(&self, normalized: &str) -> Result<Vec<Candidate>, StoreError> {
        if normalized.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, CandidateRow>(&format!(
            "SELECT {} FROM candidates WHERE national_id_normalized = $1 ORDER BY created_at, id",
            CANDIDATE_COLUMNS
        ))
        .bind(normalized)
        .fetch_all(&self.pool)
        .await?;

        self.hydrate(rows).await
    }

    async fn insert(&self, candidate: Candidate) -> Result<CandidateId, StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO candidates (
                id, full_name, date_of_birth, hometown, phone, phone_normalized,
                national_id, national_id_normalized, position, source, social_links,
                document_status, bus_route, dormitory_requested, photo_ref, status, note,
                created_at, created_by, last_modified_by, version
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21)
            "#,
        )
        .bind(candidate.id.0)
        .bind(&candidate.full_name)
        .bind(candidate.date_of_birth)
        .bind(&candidate.hometown)
        .bind(&candidate.phone)
        .bind(normalize_phone(&candidate.phone))
        .bind(&candidate.national_id)
        .bind(candidate.national_id.as_deref().map(normalize_national_id))
        .bind(&candidate.position)
        .bind(&candidate.source)
        .bind(&candidate.social_links)
        .bind(candidate.document_status.as_str())
        .bind(&candidate.bus_route)
        .bind(candidate.dormitory_requested)
        .bind(&candidate.photo_ref)
        .bind(candidate.status.as_str())
        .bind(&candidate.note)
        .bind(candidate.created_at)
        .bind(&candidate.created_by)
        .bind(&candidate.last_modified_by)
        .bind(candidate.version)
        .execute(&mut *tx)
        .await?;

        insert_entries(&mut tx, candidate.id.0, &candidate.audit_log).await?;
        tx.commit().await?;
        Ok(candidate.id)
    }

    async fn update(
        &self,
        id: CandidateId,
        expected_version: i64,
        changes: &[FieldChange],
        entries: &[AuditEntry],
        modified_by: &str,
    ) -> Result<Candidate, StoreError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, CandidateRow>(&format!(
            "SELECT {} FROM candidates WHERE id = $1 FOR UPDATE",
            CANDIDATE_COLUMNS
        ))
        .bind(id.0)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StoreError::NotFound)?;

        if row.version != expected_version {
            return Err(StoreError::Conflict);
        }

        let mut candidate = row.into_candidate(Vec::new())?;
        for change in changes {
            change.apply(&mut candidate);
        }
        candidate.last_modified_by = modified_by.to_string();
        candidate.version += 1;

        sqlx::query(
            r#"
            UPDATE candidates SET
                full_name = $2, date_of_birth = $3, hometown = $4, phone = $5,
                phone_normalized = $6, national_id = $7, national_id_normalized = $8,
                position = $9, source = $10, social_links = $11, document_status = $12,
                bus_route = $13, dormitory_requested = $14, photo_ref = $15, status = $16,
                note = $17, last_modified_by = $18, version = $19
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .bind(&candidate.full_name)
        .bind(candidate.date_of_birth)
        .bind(&candidate.hometown)
        .bind(&candidate.phone)
        .bind(normalize_phone(&candidate.phone))
        .bind(&candidate.national_id)
        .bind(candidate.national_id.as_deref().map(normalize_national_id))
        .bind(&candidate.position)
        .bind(&candidate.source)
        .bind(&candidate.social_links)
        .bind(candidate.document_status.as_str())
        .bind(&candidate.bus_route)
        .bind(candidate.dormitory_requested)
        .bind(&candidate.photo_ref)
        .bind(candidate.status.as_str())
        .bind(&candidate.note)
        .bind(&candidate.last_modified_by)
        .bind(candidate.version)
        .execute(&mut *tx)
        .await?;

        insert_entries(&mut tx, id.0, entries).await?;
        tx.commit().await?;

        self.fetch_one(id.0).await?.ok_or(StoreError::NotFound)
    }

    async fn append_audit_entries(
        &self,
        id: CandidateId,
        entries: &[AuditEntry],
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        lock_version(&mut tx, id.0).await?;
        insert_entries(&mut tx, id.0, entries).await?;
        sqlx::query("UPDATE candidates SET version = version + 1 WHERE id = $1")
            .bind(id.0)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn scan_all<P>(&self, predicate: P) -> Result<Vec<Candidate>, StoreError>
    where
        P: Fn(&Candidate) -> bool + Send,
    {
        let rows = sqlx::query_as::<_, CandidateRow>(&format!(
            "SELECT {} FROM candidates",
            CANDIDATE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        let mut matched = Vec::new();
        for row in rows {
            let candidate = row.into_candidate(Vec::new())?;
            if predicate(&candidate) {
                matched.push(candidate);
            }
        }
        self.attach_logs(matched).await
    }
}
