// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity token resolution.
//!
//! Tokens are issued by the external identity provider. With a configured
//! key the HS256 signature and expiry are enforced; without one the claims
//! are only decoded.

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

/// Claims read from an identity token.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentityClaims {
    /// Stable subject identifier
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<usize>,
}

/// Caller identity derived from a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub subject_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub picture: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    #[error("No token provided")]
    MissingToken,

    #[error("Token is malformed or has no subject")]
    MalformedToken,

    #[error("Token signature or expiry check failed")]
    InvalidToken,
}

#[derive(Clone)]
enum Mode {
    Verified(DecodingKey),
    DecodeOnly,
}

/// Resolves bearer tokens to identities.
#[derive(Clone)]
pub struct IdentityResolver {
    mode: Mode,
}

impl IdentityResolver {
    /// Build a resolver; `None` selects decode-only mode.
    pub fn new(secret: Option<&[u8]>) -> Self {
        let mode = match secret {
            Some(key) => Mode::Verified(DecodingKey::from_secret(key)),
            None => {
                tracing::warn!("No identity key configured; token signatures are NOT verified");
                Mode::DecodeOnly
            }
        };
        Self { mode }
    }

    pub fn verifies_signatures(&self) -> bool {
        matches!(self.mode, Mode::Verified(_))
    }

    /// Resolve an optional raw token to an identity.
    pub fn resolve(&self, token: Option<&str>) -> Result<Identity, IdentityError> {
        let token = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(IdentityError::MissingToken)?;

        let claims = match &self.mode {
            Mode::Verified(key) => {
                let mut validation = Validation::new(Algorithm::HS256);
                validation.validate_aud = false;
                decode::<IdentityClaims>(token, key, &validation)
                    .map_err(|e| classify_jwt_error(&e))?
                    .claims
            }
            Mode::DecodeOnly => {
                let mut validation = Validation::new(Algorithm::HS256);
                validation.insecure_disable_signature_validation();
                validation.validate_exp = false;
                validation.validate_aud = false;
                validation.required_spec_claims.clear();
                decode::<IdentityClaims>(token, &DecodingKey::from_secret(&[]), &validation)
                    .map_err(|_| IdentityError::MalformedToken)?
                    .claims
            }
        };

        let subject_id = claims
            .sub
            .filter(|s| !s.trim().is_empty())
            .ok_or(IdentityError::MalformedToken)?;

        Ok(Identity {
            subject_id,
            name: claims.name,
            email: claims.email,
            picture: claims.picture,
        })
    }
}

fn classify_jwt_error(err: &jsonwebtoken::errors::Error) -> IdentityError {
    use jsonwebtoken::errors::ErrorKind;
    match err.kind() {
        ErrorKind::InvalidToken
        | ErrorKind::Base64(_)
        | ErrorKind::Json(_)
        | ErrorKind::Utf8(_)
        | ErrorKind::MissingRequiredClaim(_) => IdentityError::MalformedToken,
        _ => IdentityError::InvalidToken,
    }
}

/// Issue an HS256 identity token. Used by tests and local tooling.
pub fn issue_token(claims: &IdentityClaims, secret: &[u8]) -> anyhow::Result<String> {
    use jsonwebtoken::{encode, EncodingKey, Header};

    Ok(encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret),
    )?)
}
