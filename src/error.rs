use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;

use crate::database::StoreError;
use crate::models::candidate::CandidateId;

pub type Result<T> = std::result::Result<T, Error>;

/// Outcome taxonomy of the pipeline operations.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("candidate already registered as {existing}")]
    DuplicateCandidate { existing: CandidateId },

    #[error("candidate is denylisted (previous record {existing})")]
    Denylisted { existing: CandidateId },

    #[error("candidate {0} not found")]
    NotFound(CandidateId),

    #[error("candidate {0} was modified concurrently; reload and retry")]
    Conflict(CandidateId),

    #[error("invalid transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("record store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("failed to encode audit value: {0}")]
    AuditEncoding(#[from] serde_json::Error),
}

impl PipelineError {
    /// Whether the caller may retry the same request after reloading.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PipelineError::Conflict(_) | PipelineError::StoreUnavailable(_)
        )
    }

    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::InvalidInput(_) => "invalid_input",
            PipelineError::DuplicateCandidate { .. } => "duplicate_candidate",
            PipelineError::Denylisted { .. } => "denylisted",
            PipelineError::NotFound(_) => "not_found",
            PipelineError::Conflict(_) => "conflict",
            PipelineError::InvalidTransition { .. } => "invalid_transition",
            PipelineError::StoreUnavailable(_) => "store_unavailable",
            PipelineError::AuditEncoding(_) => "audit_encoding",
        }
    }

    /// Id of the record the error refers to, when there is one.
    pub fn candidate_id(&self) -> Option<CandidateId> {
        match self {
            PipelineError::DuplicateCandidate { existing } | PipelineError::Denylisted { existing } => {
                Some(*existing)
            }
            PipelineError::NotFound(id) | PipelineError::Conflict(id) => Some(*id),
            _ => None,
        }
    }

    /// Maps a store failure for an operation on a known id.
    pub fn from_store(err: StoreError, id: CandidateId) -> Self {
        match err {
            StoreError::NotFound => PipelineError::NotFound(id),
            StoreError::Conflict | StoreError::DuplicateKey => PipelineError::Conflict(id),
            StoreError::Unavailable(reason) => PipelineError::StoreUnavailable(reason),
        }
    }
}

/// Store failures outside a keyed operation (scans, screening lookups).
impl From<StoreError> for PipelineError {
    fn from(err: StoreError) -> Self {
        PipelineError::StoreUnavailable(err.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn pipeline_status(err: &PipelineError) -> StatusCode {
    match err {
        PipelineError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        PipelineError::DuplicateCandidate { .. }
        | PipelineError::Denylisted { .. }
        | PipelineError::Conflict(_) => StatusCode::CONFLICT,
        PipelineError::NotFound(_) => StatusCode::NOT_FOUND,
        PipelineError::InvalidTransition { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        PipelineError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        PipelineError::AuditEncoding(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let (status, body) = match &self {
            Error::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": msg, "code": "bad_request" }),
            ),
            Error::Unauthorized(msg) => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": msg, "code": "unauthorized" }),
            ),
            Error::Forbidden(msg) => (
                StatusCode::FORBIDDEN,
                json!({ "error": msg, "code": "forbidden" }),
            ),
            Error::Pipeline(err) => (
                pipeline_status(err),
                json!({
                    "error": err.to_string(),
                    "code": err.code(),
                    "candidate_id": err.candidate_id(),
                    "retryable": err.is_retryable(),
                }),
            ),
            _ => {
                tracing::error!(error = %self, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "An unexpected error occurred", "code": "internal" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
