use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use parley_types::api::{Claims, EditMessageRequest, SendMessageRequest};

use crate::error::blocking;
use crate::state::AppState;

/// A missing receiver becomes the nil id, which the pipeline rejects as invalid input.
pub async fn send_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let message = blocking(move || {
        state
            .pipeline
            .send(
                claims.sub,
                req.receiver_id.unwrap_or_default(),
                &req.content,
                req.parent_id,
            )
    })
    .await?;

    Ok((StatusCode::CREATED, Json(message)))
}

/// The caller is recorded as the editor.
pub async fn edit_message(
    State(state): State<AppState>,
    Path(message_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<EditMessageRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let message = blocking(move || state.pipeline.edit(message_id, &req.content, Some(claims.sub))).await?;
    Ok(Json(message))
}

pub async fn message_history(
    State(state): State<AppState>,
    Path(message_id): Path<Uuid>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let history = blocking(move || state.pipeline.history(message_id)).await?;
    Ok(Json(history))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Path(message_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    blocking(move || state.inbox.mark_read(claims.sub, message_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
