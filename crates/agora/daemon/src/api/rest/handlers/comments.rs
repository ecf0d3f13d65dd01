//! Deliberation handlers

use crate::api::rest::auth::Citizen;
use crate::api::rest::extract::{path_id, JsonBody};
use crate::api::rest::state::AppState;
use crate::error::ApiResult;
use agora_core::CommentThread;
use agora_types::{BillId, Comment, CommentId};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

/// Post comment request
#[derive(Debug, Deserialize)]
pub struct PostCommentRequest {
    pub text: String,
    #[serde(default)]
    pub reply_to: Option<CommentId>,
}

/// Post a comment or reply on a bill
pub async fn post_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Citizen(agent): Citizen,
    JsonBody(request): JsonBody<PostCommentRequest>,
) -> ApiResult<(StatusCode, Json<Comment>)> {
    let bill_id: BillId = path_id(&id)?;
    let comment = state
        .deliberation
        .post_comment(&agent, &bill_id, &request.text, request.reply_to)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// Threaded deliberation for a bill
pub async fn comment_thread(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<CommentThread>> {
    let bill_id: BillId = path_id(&id)?;
    Ok(Json(state.deliberation.thread(&bill_id).await?))
}
