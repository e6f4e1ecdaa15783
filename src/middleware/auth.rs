use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::models::user::Actor;

/// Roles allowed to edit candidates.
pub const EDITOR_ROLES: [&str; 2] = ["admin", "hr"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub role: Option<String>,
    pub name: Option<String>,
}

impl Claims {
    pub fn into_actor(self) -> Actor {
        let display_name = self.name.unwrap_or_else(|| self.sub.clone());
        Actor {
            id: self.sub,
            display_name,
            role: self.role,
        }
    }
}

/// Verification key handed to the middleware as router state.
#[derive(Clone)]
pub struct AuthState {
    key: DecodingKey,
}

impl AuthState {
    pub fn new(secret: &str) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

fn reject(status: StatusCode, code: &str) -> Response {
    (status, Json(json!({ "error": code, "code": code }))).into_response()
}

fn authenticate(state: &AuthState, req: &Request) -> Result<Actor, Response> {
    let Some(auth_header) = req.headers().get(axum::http::header::AUTHORIZATION) else {
        return Err(reject(StatusCode::UNAUTHORIZED, "missing_authorization"));
    };
    let Ok(auth_str) = auth_header.to_str() else {
        return Err(reject(StatusCode::UNAUTHORIZED, "bad_authorization"));
    };
    let Some(token) = auth_str.strip_prefix("Bearer ") else {
        return Err(reject(StatusCode::UNAUTHORIZED, "unsupported_scheme"));
    };

    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    match decode::<Claims>(token, &state.key, &validation) {
        Ok(data) => Ok(data.claims.into_actor()),
        Err(e) => {
            tracing::debug!(error = %e, "Rejected bearer token");
            Err(reject(StatusCode::UNAUTHORIZED, "invalid_token"))
        }
    }
}

/// Resolves the acting user from the bearer token and stores it as an [`Actor`] extension.
pub async fn require_bearer_auth(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Response {
    match authenticate(&state, &req) {
        Ok(actor) => {
            req.extensions_mut().insert(actor);
            next.run(req).await
        }
        Err(response) => response,
    }
}

/// Must run inside [`require_bearer_auth`]; admits only [`EDITOR_ROLES`].
pub async fn require_hr_or_admin(req: Request, next: Next) -> Response {
    let Some(actor) = req.extensions().get::<Actor>().cloned() else {
        return reject(StatusCode::UNAUTHORIZED, "missing_authorization");
    };
    if !actor.has_any_role(&EDITOR_ROLES) {
        tracing::info!(actor = %actor.id, role = ?actor.role, "Forbidden candidate edit");
        return reject(StatusCode::FORBIDDEN, "forbidden");
    }
    next.run(req).await
}
