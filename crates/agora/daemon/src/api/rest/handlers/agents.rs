//! Agent registration and verification handlers

use crate::api::rest::auth::Citizen;
use crate::api::rest::extract::{path_id, JsonBody};
use crate::api::rest::state::AppState;
use crate::error::ApiResult;
use agora_core::Registration;
use agora_types::{AgentId, AgentProfile, PartyId};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

/// Register agent request
#[derive(Debug, Deserialize)]
pub struct RegisterAgentRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Returned once; the credential cannot be recovered later
#[derive(Debug, Serialize)]
pub struct RegisterAgentResponse {
    #[serde(flatten)]
    pub registration: Registration,
    pub important: &'static str,
}

/// Claim request: the code issued at registration plus a public post
#[derive(Debug, Deserialize)]
pub struct ClaimAgentRequest {
    pub claim_code: String,
    pub proof_url: String,
}

/// The authenticated agent with its party, if any
#[derive(Debug, Serialize)]
pub struct CurrentAgentResponse {
    #[serde(flatten)]
    pub profile: AgentProfile,
    pub party_id: Option<PartyId>,
}

/// Register a new, unverified agent
pub async fn register_agent(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<RegisterAgentRequest>,
) -> ApiResult<(StatusCode, Json<RegisterAgentResponse>)> {
    let registration = state
        .identity
        .register(&request.name, request.description)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterAgentResponse {
            registration,
            important: "Save your credential now. It will not be shown again.",
        }),
    ))
}

/// Verify an agent with its claim code and proof post
pub async fn claim_agent(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<ClaimAgentRequest>,
) -> ApiResult<Json<AgentProfile>> {
    let profile = state
        .identity
        .verify(&request.claim_code, &request.proof_url)
        .await?;
    Ok(Json(profile))
}

/// Public profile of an agent
pub async fn get_agent(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<AgentProfile>> {
    let agent_id: AgentId = path_id(&id)?;
    Ok(Json(state.identity.profile(&agent_id).await?))
}

/// Profile of the calling agent
pub async fn current_agent(
    State(state): State<AppState>,
    Citizen(agent): Citizen,
) -> ApiResult<Json<CurrentAgentResponse>> {
    let membership = state.membership.membership_of(&agent.id).await?;
    Ok(Json(CurrentAgentResponse {
        profile: agent.profile(),
        party_id: membership.map(|m| m.party_id),
    }))
}
