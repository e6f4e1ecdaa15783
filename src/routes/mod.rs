pub mod candidate_routes;
pub mod health;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, patch, post},
    Router,
};

use crate::database::CandidateStore;
use crate::middleware::auth::{require_bearer_auth, require_hr_or_admin, AuthState};
use crate::AppState;

/// Full HTTP surface. Every `/api` route needs a bearer token; edits also need an editor role.
pub fn router<S: CandidateStore + 'static>(state: AppState<S>, auth: AuthState) -> Router {
    use candidate_routes::*;

    let api = Router::new()
        .route(
            "/api/candidates",
            post(intake_candidate::<S>).get(search_candidates::<S>),
        )
        .route("/api/candidates/overdue", get(list_overdue::<S>))
        .route("/api/candidates/report", get(pipeline_report::<S>))
        .route(
            "/api/candidates/:id",
            get(get_candidate::<S>)
                .merge(patch(update_candidate::<S>).route_layer(from_fn(require_hr_or_admin))),
        )
        .route("/api/candidates/:id/history", get(candidate_history::<S>))
        .route("/api/candidates/:id/comments", post(add_comment::<S>))
        .route_layer(from_fn_with_state(auth, require_bearer_auth));

    Router::new()
        .route("/health", get(health::health))
        .merge(api)
        .with_state(state)
}
