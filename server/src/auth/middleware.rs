use axum::{extract::FromRequestParts, http::request::Parts};
use std::convert::Infallible;

/// Upload token presented as `Authorization: Bearer <token>`.
/// Implements axum's FromRequestParts for use as an extractor; a missing or
/// malformed header yields `None` and the form's `auth` field is consulted
/// instead.
#[derive(Debug, Clone, Default)]
pub struct BearerToken(pub Option<String>);

impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        Ok(BearerToken(token))
    }
}
