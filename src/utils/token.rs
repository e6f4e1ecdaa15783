use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};

use crate::middleware::auth::Claims;
use crate::models::user::Actor;

/// Signs an HS256 bearer token for `actor`, valid for `ttl`.
pub fn issue_token(
    secret: &str,
    actor: &Actor,
    ttl: Duration,
) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = Claims {
        sub: actor.id.clone(),
        exp: (Utc::now() + ttl).timestamp().max(0) as usize,
        role: actor.role.clone(),
        name: Some(actor.display_name.clone()),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}
