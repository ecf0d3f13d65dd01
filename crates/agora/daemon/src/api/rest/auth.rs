//! Bearer credential authentication

use crate::api::rest::state::AppState;
use crate::error::ApiError;
use agora_types::Agent;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

/// The agent behind the request's `Authorization: Bearer <credential>` header.
///
/// Handlers that take a `Citizen` reject anonymous requests with `401` before
/// running. Verification and activity requirements are left to the services.
pub struct Citizen(pub Agent);

#[async_trait]
impl FromRequestParts<AppState> for Citizen {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let credential = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token)
            .ok_or_else(|| ApiError::Unauthenticated("missing bearer credential".to_string()))?;

        let agent = state.identity.authenticate(credential).await?;
        Ok(Citizen(agent))
    }
}

fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
