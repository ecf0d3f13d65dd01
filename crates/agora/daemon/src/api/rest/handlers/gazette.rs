//! Gazette handlers

use crate::api::rest::extract::QueryParams;
use crate::api::rest::state::AppState;
use crate::error::ApiResult;
use agora_types::GazetteEntry;
use axum::{extract::State, Json};
use serde::Deserialize;

const DEFAULT_GAZETTE_PAGE: usize = 20;

#[derive(Debug, Deserialize)]
pub struct GazetteQuery {
    pub limit: Option<usize>,
}

/// Most recent gazette entries first
pub async fn list_gazette(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<GazetteQuery>,
) -> ApiResult<Json<Vec<GazetteEntry>>> {
    let entries = state
        .gazette
        .recent(query.limit.unwrap_or(DEFAULT_GAZETTE_PAGE))
        .await?;
    Ok(Json(entries))
}
