//! Party handlers: founding, membership, recommendations and unity

use crate::api::rest::auth::Citizen;
use crate::api::rest::extract::{path_id, JsonBody};
use crate::api::rest::state::AppState;
use crate::error::ApiResult;
use agora_core::{LeaveOutcome, UnityScore};
use agora_types::{BillId, Party, PartyId, PartyMembership, PartyRecommendation, VoteValue};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

/// Found party request
#[derive(Debug, Deserialize)]
pub struct FoundPartyRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Recommendation request
#[derive(Debug, Deserialize)]
pub struct RecommendRequest {
    pub bill_id: BillId,
    pub value: VoteValue,
}

/// A party with its roster
#[derive(Debug, Serialize)]
pub struct PartyDetailResponse {
    #[serde(flatten)]
    pub party: Party,
    pub members: Vec<PartyMembership>,
}

/// List all parties
pub async fn list_parties(State(state): State<AppState>) -> ApiResult<Json<Vec<Party>>> {
    Ok(Json(state.membership.list_parties().await?))
}

/// Found a party with the caller as first member
pub async fn found_party(
    State(state): State<AppState>,
    Citizen(agent): Citizen,
    JsonBody(request): JsonBody<FoundPartyRequest>,
) -> ApiResult<(StatusCode, Json<Party>)> {
    let party = state
        .membership
        .found_party(&agent, &request.name, request.description)
        .await?;
    Ok((StatusCode::CREATED, Json(party)))
}

/// Get a party and its members
pub async fn get_party(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<PartyDetailResponse>> {
    let party_id: PartyId = path_id(&id)?;
    let party = state.membership.get_party(&party_id).await?;
    let members = state.membership.members(&party_id).await?;
    Ok(Json(PartyDetailResponse { party, members }))
}

/// Join a party
pub async fn join_party(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Citizen(agent): Citizen,
) -> ApiResult<Json<Party>> {
    let party_id: PartyId = path_id(&id)?;
    Ok(Json(state.membership.join(&agent, &party_id).await?))
}

/// Leave the caller's party
pub async fn leave_party(
    State(state): State<AppState>,
    Citizen(agent): Citizen,
) -> ApiResult<Json<LeaveOutcome>> {
    Ok(Json(state.membership.leave(&agent).await?))
}

/// Record the party line on a bill
pub async fn recommend(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Citizen(agent): Citizen,
    JsonBody(request): JsonBody<RecommendRequest>,
) -> ApiResult<Json<PartyRecommendation>> {
    let party_id: PartyId = path_id(&id)?;
    let recommendation = state
        .membership
        .recommend(&agent, &party_id, &request.bill_id, request.value)
        .await?;
    Ok(Json(recommendation))
}

/// How closely members vote with the party line.
///
/// Unlike the other `:id` routes this never answers 404: an unknown or
/// malformed party id yields a zero score.
pub async fn party_unity(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<UnityScore>> {
    let score = match id.parse::<PartyId>() {
        Ok(party_id) => state.alignment.score(&party_id).await?,
        Err(_) => UnityScore::default(),
    };
    Ok(Json(score))
}
