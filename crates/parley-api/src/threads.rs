use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use parley_types::api::Claims;

use crate::error::blocking;
use crate::state::AppState;

pub async fn list_threads(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let roots = blocking(move || state.threads.list_roots()).await?;
    Ok(Json(roots))
}

/// Served from the thread cache; replies newer than the cached copy show up once it expires.
pub async fn get_thread(
    State(state): State<AppState>,
    Path(root_id): Path<Uuid>,
    Extension(_claims): Extension<Claims>,
) -> Result<Response, StatusCode> {
    let tree = blocking(move || {
        state
            .cache
            .get_or_build(&state.threads, root_id, state.cache_ttl)
    })
    .await?;

    Ok(Json(tree.as_ref()).into_response())
}
