use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use parley_types::api::{Claims, MarkedRead, NotificationQuery};

use crate::error::blocking;
use crate::state::AppState;

/// Unread received messages for the caller. Reading the inbox does not mark anything read.
pub async fn unread(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let messages = blocking(move || state.inbox.unread_for_user(claims.sub)).await?;
    Ok(Json(messages))
}

pub async fn notifications(
    State(state): State<AppState>,
    Query(query): Query<NotificationQuery>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let notifications =
        blocking(move || state.inbox.notifications_for_user(claims.sub, query.unread)).await?;
    Ok(Json(notifications))
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let marked = blocking(move || state.inbox.mark_all_read(claims.sub)).await?;
    Ok(Json(MarkedRead { marked }))
}
