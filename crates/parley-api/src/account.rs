use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{info, warn};

use parley_types::api::{AccountDeletionAccepted, Claims};
use parley_types::events::AccountEvent;

use crate::error::blocking;
use crate::state::AppState;

/// Queue the caller's account deletion for the account listener, which cleans up
/// asynchronously (202). With no listener attached the cleanup runs inline and the
/// report is returned (200).
pub async fn delete_account(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Response, StatusCode> {
    let user_id = claims.sub;

    if state.accounts.publish(AccountEvent::Deleted { user_id }).await {
        info!(%user_id, "Account deletion queued");
        return Ok((StatusCode::ACCEPTED, Json(AccountDeletionAccepted { user_id })).into_response());
    }

    warn!(%user_id, "No account listener running, cleaning up inline");
    let report = blocking(move || state.pipeline.delete_account(user_id)).await?;
    Ok(Json(report).into_response())
}
