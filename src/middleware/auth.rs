use axum::{extract::FromRequestParts, http::header};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::AppError, state::AppState, status::Role};

/// Token claims issued by the authentication provider.
#[derive(Debug, Deserialize, Serialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
}

/// Verification settings for bearer tokens.
#[derive(Clone)]
pub struct AuthConfig {
    secret: String,
    audience: Option<String>,
}

impl AuthConfig {
    pub fn new(secret: impl Into<String>, audience: Option<String>) -> Self {
        Self {
            secret: secret.into(),
            audience,
        }
    }

    pub fn verify(&self, token: &str) -> Result<Uuid, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        match &self.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        let decoded = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|err| {
            tracing::debug!(error = %err, "token rejected");
            AppError::Unauthorized
        })?;

        Uuid::parse_str(&decoded.claims.sub).map_err(|_| AppError::Unauthorized)
    }

    /// Signs a token the way the provider does. Used by the seed binary and tests.
    pub fn issue(&self, user_id: Uuid, ttl: Duration) -> anyhow::Result<String> {
        let expiration = Utc::now()
            .checked_add_signed(ttl)
            .ok_or_else(|| anyhow::anyhow!("Failed to set expiration"))?;

        let claims = Claims {
            sub: user_id.to_string(),
            exp: expiration.timestamp() as usize,
            aud: self.audience.clone(),
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )?;
        Ok(token)
    }
}

/// The caller, with the role read from their profile on every request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

pub fn ensure_admin(user: &AuthUser) -> Result<(), AppError> {
    if !user.is_admin() {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

/// Loads the profile behind `user_id`. Missing profiles are unauthenticated,
/// banned ones are forbidden.
pub async fn authorize(state: &AppState, user_id: Uuid) -> Result<AuthUser, AppError> {
    let profile = state
        .store
        .get_profile(user_id)
        .await?
        .ok_or(AppError::Unauthorized)?;

    if profile.role == Role::Banned {
        tracing::info!(user_id = %user_id, "banned user rejected");
        return Err(AppError::Forbidden);
    }

    Ok(AuthUser {
        user_id,
        role: profile.role,
    })
}

/// The verified token subject, with no profile lookup. Only the profile
/// registration route accepts callers this far.
#[derive(Debug, Clone, Copy)]
pub struct TokenSubject(pub Uuid);

fn bearer_subject(parts: &axum::http::request::Parts, state: &AppState) -> Result<Uuid, AppError> {
    let auth_header = parts
        .headers
        .get(header::AUTHORIZATION)
        .ok_or(AppError::Unauthorized)?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| AppError::BadRequest("Invalid Authorization header".into()))?;

    let token = auth_str
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::BadRequest("Invalid Authorization scheme".into()))?
        .trim();

    state.auth.verify(token)
}

impl FromRequestParts<AppState> for TokenSubject {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        bearer_subject(parts, state).map(TokenSubject)
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user_id = bearer_subject(parts, state)?;
        authorize(state, user_id).await
    }
}
