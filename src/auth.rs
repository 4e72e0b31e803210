use std::convert::Infallible;

use axum::{
    extract::{FromRef, FromRequestParts, OptionalFromRequestParts},
    http::{header, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    error::{AppError, AppResult},
    models::{TokenResponse, User, UserRole},
    repository::RepositoryState,
};

/// TokenKind
///
/// Every token carries its purpose so a refresh or reset token can never be
/// replayed as an access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
    Reset,
}

/// Claims
///
/// JWT payload signed with the server secret (HS256).
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user's UUID.
    pub sub: Uuid,
    /// Role at issue time. Informational only; the extractor reloads the role
    /// from the database on every request. Absent on reset tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
    #[serde(rename = "type")]
    pub kind: TokenKind,
    pub exp: usize,
    pub iat: usize,
}

fn ttl(config: &AppConfig, kind: TokenKind) -> chrono::Duration {
    match kind {
        TokenKind::Access => config.access_token_ttl,
        TokenKind::Refresh => config.refresh_token_ttl,
        TokenKind::Reset => config.reset_token_ttl,
    }
}

/// issue_token
///
/// Signs a token of the given kind for `user_id`, expiring after the TTL
/// configured for that kind.
pub fn issue_token(
    config: &AppConfig,
    user_id: Uuid,
    role: Option<UserRole>,
    kind: TokenKind,
) -> AppResult<String> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id,
        role,
        kind,
        exp: (now + ttl(config, kind)).timestamp() as usize,
        iat: now.timestamp() as usize,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )?;
    Ok(token)
}

/// Access + refresh pair returned by login and refresh.
pub fn issue_token_pair(config: &AppConfig, user: &User) -> AppResult<TokenResponse> {
    Ok(TokenResponse::bearer(
        issue_token(config, user.id, Some(user.role), TokenKind::Access)?,
        issue_token(config, user.id, Some(user.role), TokenKind::Refresh)?,
    ))
}

/// verify_token
///
/// Decodes and validates a token, requiring it to be of `expected` kind.
/// Every failure maps to 401.
pub fn verify_token(config: &AppConfig, token: &str, expected: TokenKind) -> AppResult<Claims> {
    let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
    let mut validation = Validation::default();
    validation.validate_exp = true;
    validation.leeway = 0;

    let data = decode::<Claims>(token, &decoding_key, &validation).map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AppError::unauthorized("Token has expired"),
        _ => AppError::unauthorized("Invalid token"),
    })?;

    if data.claims.kind != expected {
        return Err(AppError::unauthorized("Invalid token type"));
    }
    Ok(data.claims)
}

/// AuthUser
///
/// Resolved identity of an authenticated request. The role is the one stored in
/// the database at request time, not the one baked into the token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: UserRole,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

fn active(user: User) -> AppResult<AuthUser> {
    if user.is_blocked {
        return Err(AppError::forbidden("User is blocked"));
    }
    Ok(AuthUser {
        id: user.id,
        role: user.role,
    })
}

/// AuthUser Extractor Implementation
///
/// 1. Local bypass: in `Env::Local` an `x-user-id` header naming an existing user
///    authenticates directly.
/// 2. Bearer access token validation.
/// 3. Database lookup: the user must still exist and must not be blocked.
///
/// Rejects with 401 for credential problems and 403 for blocked accounts.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        if config.env == Env::Local {
            let header_id = parts
                .headers
                .get("x-user-id")
                .and_then(|value| value.to_str().ok())
                .and_then(|value| Uuid::parse_str(value).ok());
            if let Some(user_id) = header_id {
                if let Some(user) = repo.get_user(user_id).await? {
                    return active(user);
                }
            }
        }

        let token = bearer_token(parts)
            .ok_or_else(|| AppError::unauthorized("Not authenticated"))?;
        let claims = verify_token(&config, token, TokenKind::Access)?;

        let user = repo
            .get_user(claims.sub)
            .await?
            .ok_or_else(|| AppError::unauthorized("User not found"))?;

        active(user)
    }
}

/// Optional authentication for public endpoints that personalise their output
/// (`is_liked`, `is_favorite`, `can_edit`). Any failure, including a blocked
/// account, yields an anonymous viewer.
impl<S> OptionalFromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        match <AuthUser as FromRequestParts<S>>::from_request_parts(parts, state).await {
            Ok(user) => Ok(Some(user)),
            Err(err) => {
                if err.status().is_server_error() {
                    tracing::warn!(error = %err, "optional auth lookup failed");
                }
                Ok(None)
            }
        }
    }
}
