use axum::{
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, header, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    models::Role,
    repository::RepositoryState,
};

/// Audience Supabase stamps on tokens of signed-in users.
pub const SUPABASE_AUDIENCE: &str = "authenticated";

/// Claims
///
/// The subset of a Supabase access token this service reads.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the auth.users id, also the primary key of `public.users`.
    pub sub: Uuid,
    pub aud: String,
    pub exp: usize,
    pub iat: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// AuthUser
///
/// Resolved identity of an authenticated request: who is calling and with
/// which role. Admin handlers check `role` themselves.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    /// Taken from the token; absent for the local bypass.
    pub email: Option<String>,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Looks up the caller's role. A user without a role row is a plain `User`.
async fn resolve_role(repo: &RepositoryState, user_id: Uuid) -> Result<Role, StatusCode> {
    match repo.get_role(user_id).await {
        Ok(role) => Ok(role.unwrap_or_default()),
        Err(e) => {
            tracing::error!("role lookup failed for {}: {:?}", user_id, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// AuthUser Extractor Implementation
///
/// 1. Local bypass: in `Env::Local`, an `x-user-id` header is trusted as-is.
/// 2. Token extraction: `Authorization: Bearer <jwt>`.
/// 3. JWT validation against the Supabase secret, audience and expiry.
/// 4. Role lookup in `public.users`, defaulting to `user`.
///
/// Rejects with 401 on any authentication failure, 500 if the role lookup errors.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        if config.env == Env::Local {
            let bypass_id = parts
                .headers
                .get("x-user-id")
                .and_then(|value| value.to_str().ok())
                .and_then(|value| Uuid::parse_str(value).ok());

            if let Some(user_id) = bypass_id {
                let role = resolve_role(&repo, user_id).await?;
                return Ok(AuthUser {
                    id: user_id,
                    email: None,
                    role,
                });
            }
        }

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(StatusCode::UNAUTHORIZED)?;

        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
        let mut validation = Validation::default();
        validation.validate_exp = true;
        validation.set_audience(&[SUPABASE_AUDIENCE]);

        let token_data = decode::<Claims>(token, &decoding_key, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => tracing::debug!("rejected expired token"),
                other => tracing::warn!("rejected token: {:?}", other),
            }
            StatusCode::UNAUTHORIZED
        })?;

        let Claims { sub, email, .. } = token_data.claims;
        let role = resolve_role(&repo, sub).await?;

        Ok(AuthUser {
            id: sub,
            email,
            role,
        })
    }
}
