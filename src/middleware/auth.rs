// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity token authentication middleware.

use crate::error::AppError;
use crate::services::identity::{Identity, IdentityError};
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;

/// Session cookie holding the identity token.
pub const TOKEN_COOKIE: &str = "freshtrack_token";
/// Header used by older clients to pass the raw token.
pub const LEGACY_TOKEN_HEADER: &str = "token";

/// Authenticated caller, inserted as a request extension.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub identity: Identity,
}

impl AuthUser {
    pub fn subject_id(&self) -> &str {
        &self.identity.subject_id
    }
}

impl From<IdentityError> for AppError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::MissingToken => AppError::Unauthorized,
            IdentityError::MalformedToken => AppError::MalformedToken,
            IdentityError::InvalidToken => AppError::InvalidToken,
        }
    }
}

/// Token from `Authorization: Bearer`, then the `token` header, then the cookie.
fn extract_token(jar: &CookieJar, headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    let legacy = headers
        .get(LEGACY_TOKEN_HEADER)
        .and_then(|h| h.to_str().ok());
    if let Some(token) = legacy {
        return Some(token.to_string());
    }

    jar.get(TOKEN_COOKIE).map(|c| c.value().to_string())
}

/// Middleware that requires a resolvable identity token.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_token(&jar, request.headers());
    let identity = state.identity.resolve(token.as_deref()).map_err(|e| {
        tracing::debug!(error = %e, path = %request.uri().path(), "Rejected request");
        AppError::from(e)
    })?;

    request.extensions_mut().insert(AuthUser { identity });

    Ok(next.run(request).await)
}
