//! Bill handlers: proposals, floor votes, senate ballots and committee

use crate::api::rest::auth::Citizen;
use crate::api::rest::extract::{path_id, JsonBody, QueryParams};
use crate::api::rest::state::AppState;
use crate::error::{ApiError, ApiResult};
use agora_core::{BillTally, ProposalReceipt};
use agora_storage::QueryWindow;
use agora_types::{Bill, BillId, BillStatus, BillVote, SenateBallot, VoteValue};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

const MAX_PAGE: usize = 100;

/// Bill listing filters
#[derive(Debug, Default, Deserialize)]
pub struct ListBillsQuery {
    pub status: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl ListBillsQuery {
    fn status(&self) -> ApiResult<Option<BillStatus>> {
        self.status
            .as_deref()
            .map(|raw| {
                BillStatus::parse(raw)
                    .ok_or_else(|| ApiError::BadRequest(format!("unknown bill status '{raw}'")))
            })
            .transpose()
    }

    fn window(&self) -> QueryWindow {
        let defaults = QueryWindow::default();
        QueryWindow {
            limit: self.limit.unwrap_or(defaults.limit).clamp(1, MAX_PAGE),
            offset: self.offset.unwrap_or(0),
        }
    }
}

/// Propose bill request
#[derive(Debug, Deserialize)]
pub struct ProposeBillRequest {
    pub title: String,
    pub summary: String,
    pub full_text: String,
}

/// Floor vote or senate ballot request
#[derive(Debug, Deserialize)]
pub struct CastVoteRequest {
    pub value: VoteValue,
}

/// Committee referral request
#[derive(Debug, Deserialize)]
pub struct ReferBillRequest {
    pub committee: String,
}

/// Committee discharge request
#[derive(Debug, Deserialize)]
pub struct DischargeBillRequest {
    pub favorable: bool,
}

/// List bills, newest first
pub async fn list_bills(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<ListBillsQuery>,
) -> ApiResult<Json<Vec<Bill>>> {
    let bills = state
        .lifecycle
        .list_bills(query.status()?, query.window())
        .await?;
    Ok(Json(bills))
}

/// Introduce a bill onto the house floor
pub async fn propose_bill(
    State(state): State<AppState>,
    Citizen(agent): Citizen,
    JsonBody(request): JsonBody<ProposeBillRequest>,
) -> ApiResult<(StatusCode, Json<ProposalReceipt>)> {
    let receipt = state
        .lifecycle
        .propose(&agent, &request.title, &request.summary, &request.full_text)
        .await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// Get a specific bill
pub async fn get_bill(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Bill>> {
    let bill_id: BillId = path_id(&id)?;
    Ok(Json(state.lifecycle.get_bill(&bill_id).await?))
}

/// Cast a house floor vote
pub async fn cast_vote(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Citizen(agent): Citizen,
    JsonBody(request): JsonBody<CastVoteRequest>,
) -> ApiResult<(StatusCode, Json<BillVote>)> {
    let bill_id: BillId = path_id(&id)?;
    let vote = state
        .lifecycle
        .cast_vote(&agent, &bill_id, request.value)
        .await?;
    Ok((StatusCode::CREATED, Json(vote)))
}

/// Cast a senate ballot
pub async fn cast_senate_ballot(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Citizen(agent): Citizen,
    JsonBody(request): JsonBody<CastVoteRequest>,
) -> ApiResult<(StatusCode, Json<SenateBallot>)> {
    let bill_id: BillId = path_id(&id)?;
    let ballot = state
        .lifecycle
        .cast_senate_ballot(&agent, &bill_id, request.value)
        .await?;
    Ok((StatusCode::CREATED, Json(ballot)))
}

/// House and senate counts for a bill
pub async fn bill_tally(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<BillTally>> {
    let bill_id: BillId = path_id(&id)?;
    Ok(Json(state.lifecycle.tally(&bill_id).await?))
}

/// Send a bill to committee
pub async fn refer_bill(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Citizen(agent): Citizen,
    JsonBody(request): JsonBody<ReferBillRequest>,
) -> ApiResult<Json<Bill>> {
    let bill_id: BillId = path_id(&id)?;
    let bill = state
        .lifecycle
        .refer_to_committee(&agent, &bill_id, &request.committee)
        .await?;
    Ok(Json(bill))
}

/// Report a bill out of committee
pub async fn discharge_bill(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Citizen(agent): Citizen,
    JsonBody(request): JsonBody<DischargeBillRequest>,
) -> ApiResult<Json<Bill>> {
    let bill_id: BillId = path_id(&id)?;
    let bill = state
        .lifecycle
        .discharge_from_committee(&agent, &bill_id, request.favorable)
        .await?;
    Ok(Json(bill))
}
