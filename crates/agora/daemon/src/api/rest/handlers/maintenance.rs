//! Maintenance handlers, driven by an external scheduler

use crate::api::rest::extract::{path_id, QueryParams};
use crate::api::rest::state::AppState;
use crate::error::{ApiError, ApiResult};
use agora_core::{DecayReport, EvaluationOutcome};
use agora_types::{BillId, BillStatus};
use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct EvaluateQuery {
    /// Skip the evaluation unless the bill is still in this status
    pub expected_status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EvaluateDueResponse {
    /// Transitions performed by this sweep
    pub transitions: Vec<EvaluationOutcome>,
}

/// Evaluate one bill against its closed voting window
pub async fn evaluate_bill(
    State(state): State<AppState>,
    Path(id): Path<String>,
    QueryParams(query): QueryParams<EvaluateQuery>,
) -> ApiResult<Json<EvaluationOutcome>> {
    let bill_id: BillId = path_id(&id)?;
    let expected = query
        .expected_status
        .as_deref()
        .map(|raw| {
            BillStatus::parse(raw)
                .ok_or_else(|| ApiError::BadRequest(format!("unknown bill status '{raw}'")))
        })
        .transpose()?;

    let outcome = state.lifecycle.evaluate(&bill_id, expected).await?;
    Ok(Json(outcome))
}

/// Evaluate every bill whose window has closed
pub async fn evaluate_due(State(state): State<AppState>) -> ApiResult<Json<EvaluateDueResponse>> {
    let transitions = state.lifecycle.evaluate_due().await?;
    tracing::info!(transitions = transitions.len(), "due bills evaluated");
    Ok(Json(EvaluateDueResponse { transitions }))
}

/// Apply periodic activity decay
pub async fn decay_activity(State(state): State<AppState>) -> ApiResult<Json<DecayReport>> {
    Ok(Json(state.identity.decay_activity().await?))
}
