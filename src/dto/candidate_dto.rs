use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::audit_log::AuditEntry;
use crate::models::candidate::{Candidate, CandidateId};
use crate::models::workflow::WorkflowState;
use crate::services::candidate_service::CandidateQuery;
use crate::services::workflow_service::DeadlineStatus;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateResponse {
    #[serde(flatten)]
    pub candidate: Candidate,
    pub deadline: DeadlineStatus,
    pub progress: f32,
}

impl CandidateResponse {
    pub fn new(candidate: Candidate, deadline: DeadlineStatus) -> Self {
        let progress = candidate.status.progress();
        Self {
            candidate,
            deadline,
            progress,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateList {
    pub items: Vec<CandidateResponse>,
    pub total: usize,
}

/// Query string of the listing endpoint. List filters are comma separated.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub positions: Option<String>,
    pub statuses: Option<String>,
}

impl SearchParams {
    pub fn into_query(self) -> Result<CandidateQuery, String> {
        let split = |raw: Option<String>| -> Vec<String> {
            raw.unwrap_or_default()
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        };

        let statuses = split(self.statuses)
            .iter()
            .map(|s| s.parse::<WorkflowState>().map_err(|e| e.to_string()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(CandidateQuery {
            keyword: self.q,
            positions: split(self.positions),
            statuses,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CommentPayload {
    #[validate(length(min = 1, max = 2000))]
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub candidate_id: CandidateId,
    pub entries: Vec<AuditEntry>,
}
