use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use validator::Validate;

use crate::database::CandidateStore;
use crate::dto::candidate_dto::{
    CandidateList, CandidateResponse, CommentPayload, HistoryResponse, SearchParams,
};
use crate::error::{Error, Result};
use crate::models::candidate::{Candidate, CandidateDraft, CandidateId, CandidatePatch};
use crate::models::user::Actor;
use crate::AppState;

fn respond<S: CandidateStore>(state: &AppState<S>, candidate: Candidate) -> CandidateResponse {
    let deadline = state.pipeline.compute_deadline(&candidate);
    CandidateResponse::new(candidate, deadline)
}

fn list<S: CandidateStore>(state: &AppState<S>, candidates: Vec<Candidate>) -> CandidateList {
    let items: Vec<CandidateResponse> = candidates
        .into_iter()
        .map(|c| respond(state, c))
        .collect();
    CandidateList {
        total: items.len(),
        items,
    }
}

pub async fn intake_candidate<S: CandidateStore + 'static>(
    State(state): State<AppState<S>>,
    Extension(actor): Extension<Actor>,
    Json(draft): Json<CandidateDraft>,
) -> Result<impl IntoResponse> {
    tracing::info!(actor = %actor.id, "Candidate intake request received");
    let candidate = state.pipeline.intake(draft, &actor).await?;
    Ok((StatusCode::CREATED, Json(respond(&state, candidate))))
}

pub async fn search_candidates<S: CandidateStore + 'static>(
    State(state): State<AppState<S>>,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse> {
    let query = params.into_query().map_err(Error::BadRequest)?;
    let found = state.pipeline.search(&query).await?;
    Ok(Json(list(&state, found)))
}

pub async fn list_overdue<S: CandidateStore + 'static>(
    State(state): State<AppState<S>>,
) -> Result<impl IntoResponse> {
    let overdue = state.pipeline.overdue().await?;
    Ok(Json(list(&state, overdue)))
}

pub async fn pipeline_report<S: CandidateStore + 'static>(
    State(state): State<AppState<S>>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.pipeline.report().await?))
}

pub async fn get_candidate<S: CandidateStore + 'static>(
    State(state): State<AppState<S>>,
    Path(id): Path<CandidateId>,
) -> Result<impl IntoResponse> {
    let candidate = state.pipeline.get(id).await?;
    Ok(Json(respond(&state, candidate)))
}

pub async fn update_candidate<S: CandidateStore + 'static>(
    State(state): State<AppState<S>>,
    Path(id): Path<CandidateId>,
    Extension(actor): Extension<Actor>,
    Json(patch): Json<CandidatePatch>,
) -> Result<impl IntoResponse> {
    let candidate = state.pipeline.update(id, patch, &actor).await?;
    Ok(Json(respond(&state, candidate)))
}

pub async fn candidate_history<S: CandidateStore + 'static>(
    State(state): State<AppState<S>>,
    Path(id): Path<CandidateId>,
) -> Result<impl IntoResponse> {
    let entries = state.pipeline.history(id).await?;
    Ok(Json(HistoryResponse {
        candidate_id: id,
        entries,
    }))
}

pub async fn add_comment<S: CandidateStore + 'static>(
    State(state): State<AppState<S>>,
    Path(id): Path<CandidateId>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<CommentPayload>,
) -> Result<impl IntoResponse> {
    payload
        .validate()
        .map_err(|e| Error::BadRequest(crate::utils::validation::describe(&e)))?;
    let candidate = state.pipeline.annotate(id, &payload.message, &actor).await?;
    Ok((StatusCode::CREATED, Json(respond(&state, candidate))))
}
