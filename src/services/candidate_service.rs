use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::database::{CandidateStore, StoreError};
use crate::error::PipelineError;
use crate::models::audit_log::AuditEntry;
use crate::models::candidate::{Candidate, CandidateDraft, CandidateId, CandidatePatch, FieldChange};
use crate::models::user::Actor;
use crate::models::workflow::WorkflowState;
use crate::services::audit_service::AuditEngine;
use crate::services::screening_service::ScreeningEngine;
use crate::services::workflow_service::{DeadlineStatus, WorkflowEngine};
use crate::utils::time::{Clock, SystemClock};
use crate::utils::validation::{check_social_link, describe, normalize_phone, validate};

const INSERT_ATTEMPTS: usize = 3;

/// Listing filter. Empty filters match everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CandidateQuery {
    pub keyword: Option<String>,
    #[serde(default)]
    pub positions: Vec<String>,
    #[serde(default)]
    pub statuses: Vec<WorkflowState>,
}

impl CandidateQuery {
    pub fn matches(&self, candidate: &Candidate) -> bool {
        if !self.positions.is_empty()
            && !self
                .positions
                .iter()
                .any(|p| p.trim().eq_ignore_ascii_case(candidate.position.trim()))
        {
            return false;
        }
        if !self.statuses.is_empty() && !self.statuses.contains(&candidate.status) {
            return false;
        }
        match self.keyword.as_deref().map(str::trim) {
            Some(keyword) if !keyword.is_empty() => {
                let needle = keyword.to_lowercase();
                [
                    Some(candidate.full_name.as_str()),
                    Some(candidate.phone.as_str()),
                    Some(candidate.hometown.as_str()),
                    candidate.national_id.as_deref(),
                    Some(candidate.position.as_str()),
                    Some(candidate.note.as_str()),
                ]
                .into_iter()
                .flatten()
                .any(|haystack| haystack.to_lowercase().contains(&needle))
            }
            _ => true,
        }
    }
}

/// Dashboard figures derived from the current store contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub total: usize,
    pub employed: usize,
    pub awaiting_start: usize,
    pub pass_rate_percent: u32,
    pub overdue: usize,
    pub by_position: BTreeMap<String, usize>,
    pub by_status: BTreeMap<WorkflowState, usize>,
}

/// Orchestrates screening, workflow, and audit over a record store.
pub struct PipelineService<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    screening: ScreeningEngine,
    workflow: WorkflowEngine,
    audit: AuditEngine,
}

impl<S> Clone for PipelineService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
            screening: self.screening,
            workflow: self.workflow,
            audit: self.audit,
        }
    }
}

impl<S: CandidateStore> PipelineService<S> {
    pub fn new(store: Arc<S>, workflow: WorkflowEngine) -> Self {
        Self::with_clock(store, workflow, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<S>, workflow: WorkflowEngine, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            screening: ScreeningEngine::new(),
            workflow,
            audit: AuditEngine::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn workflow(&self) -> &WorkflowEngine {
        &self.workflow
    }

    /// Registers a new candidate after validation and screening.
    pub async fn intake(
        &self,
        draft: CandidateDraft,
        actor: &Actor,
    ) -> Result<Candidate, PipelineError> {
        let draft = draft.normalized();
        validate(&draft).map_err(|e| PipelineError::InvalidInput(describe(&e)))?;
        if normalize_phone(&draft.phone).is_empty() {
            return Err(PipelineError::InvalidInput(
                "Phone number must contain digits".to_string(),
            ));
        }
        for link in &draft.social_links {
            check_social_link(link).map_err(PipelineError::InvalidInput)?;
        }

        if let Err(rejection) = self.screening.screen(self.store.as_ref(), &draft).await {
            tracing::info!(
                actor = %actor.id,
                reason = rejection.code(),
                existing = ?rejection.candidate_id(),
                "Intake rejected by screening"
            );
            return Err(rejection);
        }

        let now = self.clock.now();
        let mut candidate = Candidate {
            id: CandidateId::generate(),
            full_name: draft.full_name,
            date_of_birth: draft.date_of_birth,
            hometown: draft.hometown,
            phone: draft.phone,
            national_id: draft.national_id,
            position: draft.position,
            source: draft.source,
            social_links: draft.social_links,
            document_status: draft.document_status,
            bus_route: draft.bus_route,
            dormitory_requested: draft.dormitory_requested,
            photo_ref: draft.photo_ref,
            status: WorkflowState::New,
            note: draft.note,
            created_at: now,
            created_by: actor.id.clone(),
            last_modified_by: actor.id.clone(),
            version: 1,
            audit_log: Vec::new(),
        };
        candidate.audit_log.push(self.audit.created(&candidate, actor));

        let mut attempt = 1;
        loop {
            match self.store.insert(candidate.clone()).await {
                Ok(id) => {
                    tracing::info!(candidate_id = %id, actor = %actor.id, "Candidate registered");
                    return Ok(candidate);
                }
                Err(StoreError::DuplicateKey) if attempt < INSERT_ATTEMPTS => {
                    tracing::warn!(candidate_id = %candidate.id, "Generated id collided, regenerating");
                    candidate.id = CandidateId::generate();
                    attempt += 1;
                }
                Err(err) => {
                    tracing::error!(error = %err, "Failed to persist candidate");
                    return Err(PipelineError::from_store(err, candidate.id));
                }
            }
        }
    }

    /// Applies a caller patch, recording one audit entry per changed field.
    pub async fn update(
        &self,
        id: CandidateId,
        patch: CandidatePatch,
        actor: &Actor,
    ) -> Result<Candidate, PipelineError> {
        let snapshot = self.load(id).await?;
        let expected_version = patch.expected_version;
        let requested_status = patch.status.clone();
        let changes = patch.into_changes().map_err(|e| PipelineError::InvalidTransition {
            from: snapshot.status.to_string(),
            to: requested_status.unwrap_or(e.0),
        })?;

        self.apply(snapshot, changes, expected_version, actor).await
    }

    /// Same as [`update`](Self::update) for callers that already hold typed changes.
    pub async fn apply_changes(
        &self,
        id: CandidateId,
        changes: Vec<FieldChange>,
        expected_version: Option<i64>,
        actor: &Actor,
    ) -> Result<Candidate, PipelineError> {
        let snapshot = self.load(id).await?;
        self.apply(snapshot, changes, expected_version, actor).await
    }

    async fn apply(
        &self,
        snapshot: Candidate,
        changes: Vec<FieldChange>,
        expected_version: Option<i64>,
        actor: &Actor,
    ) -> Result<Candidate, PipelineError> {
        let id = snapshot.id;
        if let Some(expected) = expected_version {
            if expected != snapshot.version {
                tracing::warn!(
                    candidate_id = %id,
                    expected,
                    stored = snapshot.version,
                    "Stale update rejected"
                );
                return Err(PipelineError::Conflict(id));
            }
        }

        self.check_changes(&snapshot, &changes)?;

        let entries = self
            .audit
            .diff(&snapshot, &changes, actor, self.clock.now())?;
        if entries.is_empty() {
            return Ok(snapshot);
        }

        let updated = self
            .store
            .update(id, snapshot.version, &changes, &entries, &actor.id)
            .await
            .map_err(|err| {
                if err == StoreError::Conflict {
                    tracing::warn!(candidate_id = %id, "Concurrent update detected");
                }
                PipelineError::from_store(err, id)
            })?;

        tracing::info!(
            candidate_id = %id,
            actor = %actor.id,
            fields = entries.len(),
            status = %updated.status,
            "Candidate updated"
        );
        Ok(updated)
    }

    fn check_changes(&self, snapshot: &Candidate, changes: &[FieldChange]) -> Result<(), PipelineError> {
        let mut status = snapshot.status;
        for change in changes {
            match change {
                FieldChange::FullName(name) if name.is_empty() => {
                    return Err(PipelineError::InvalidInput(
                        "Full name is required".to_string(),
                    ));
                }
                FieldChange::Phone(phone) if normalize_phone(phone).is_empty() => {
                    return Err(PipelineError::InvalidInput(
                        "Phone number is required".to_string(),
                    ));
                }
                FieldChange::SocialLinks(links) => {
                    for link in links {
                        check_social_link(link).map_err(PipelineError::InvalidInput)?;
                    }
                }
                FieldChange::Status(next) => {
                    if !self.workflow.check_transition(status, *next) {
                        return Err(PipelineError::InvalidTransition {
                            from: status.to_string(),
                            to: next.to_string(),
                        });
                    }
                    status = *next;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Appends a free-text comment to the candidate's history without touching its fields.
    pub async fn annotate(
        &self,
        id: CandidateId,
        message: &str,
        actor: &Actor,
    ) -> Result<Candidate, PipelineError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(PipelineError::InvalidInput(
                "Comment must not be empty".to_string(),
            ));
        }

        let snapshot = self.load(id).await?;
        let entry = self.audit.comment(&snapshot, actor, message, self.clock.now());
        self.store
            .append_audit_entries(id, std::slice::from_ref(&entry))
            .await
            .map_err(|err| PipelineError::from_store(err, id))?;

        tracing::debug!(candidate_id = %id, actor = %actor.id, "Comment recorded");
        self.load(id).await
    }

    pub async fn get(&self, id: CandidateId) -> Result<Candidate, PipelineError> {
        self.load(id).await
    }

    /// Oldest entry first.
    pub async fn history(&self, id: CandidateId) -> Result<Vec<AuditEntry>, PipelineError> {
        Ok(self.load(id).await?.audit_log)
    }

    pub fn compute_deadline(&self, candidate: &Candidate) -> DeadlineStatus {
        self.workflow.compute_deadline(candidate, self.clock.now())
    }

    pub fn list_overdue<'a>(&self, candidates: &'a [Candidate]) -> Vec<&'a Candidate> {
        self.workflow.list_overdue(candidates, self.clock.now())
    }

    /// Overdue candidates currently in the store, most overdue first.
    pub async fn overdue(&self) -> Result<Vec<Candidate>, PipelineError> {
        let now = self.clock.now();
        let workflow = self.workflow;
        let mut overdue = self
            .store
            .scan_all(move |c: &Candidate| workflow.compute_deadline(c, now).is_overdue())
            .await?;
        overdue.sort_by_key(|c| (c.created_at.timestamp() + c.status.sla_days() * 86_400, c.id));
        Ok(overdue)
    }

    /// Newest intake first.
    pub async fn search(&self, query: &CandidateQuery) -> Result<Vec<Candidate>, PipelineError> {
        let query = query.clone();
        let mut found = self
            .store
            .scan_all(move |c: &Candidate| query.matches(c))
            .await?;
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(found)
    }

    pub async fn report(&self) -> Result<PipelineReport, PipelineError> {
        let all = self.store.scan_all(|_: &Candidate| true).await?;
        let now = self.clock.now();

        let mut by_position = BTreeMap::new();
        let mut by_status = BTreeMap::new();
        for candidate in &all {
            *by_position.entry(candidate.position.clone()).or_insert(0) += 1;
            *by_status.entry(candidate.status).or_insert(0) += 1;
        }

        let count = |state| by_status.get(&state).copied().unwrap_or(0);
        let employed = count(WorkflowState::Employed);
        let awaiting_start = count(WorkflowState::OfferedPendingStart);
        let pass_rate_percent = if all.is_empty() {
            0
        } else {
            (((employed + awaiting_start) as f64 / all.len() as f64) * 100.0).round() as u32
        };
        let overdue = self.workflow.list_overdue(&all, now).len();

        Ok(PipelineReport {
            total: all.len(),
            employed,
            awaiting_start,
            pass_rate_percent,
            overdue,
            by_position,
            by_status,
        })
    }

    async fn load(&self, id: CandidateId) -> Result<Candidate, PipelineError> {
        self.store
            .find_by_key(id)
            .await
            .map_err(|err| PipelineError::from_store(err, id))?
            .ok_or(PipelineError::NotFound(id))
    }
}
