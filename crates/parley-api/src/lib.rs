pub mod account;
pub mod error;
pub mod inbox;
pub mod messages;
pub mod middleware;
pub mod state;
pub mod threads;

use axum::{
    Router, middleware as axum_middleware,
    routing::{delete, get, patch, post},
};

pub use state::{AppState, AppStateInner};

/// All routes require a bearer token; the caller's id comes from its `sub` claim.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/messages", post(messages::send_message))
        .route("/messages/{message_id}", patch(messages::edit_message))
        .route("/messages/{message_id}/history", get(messages::message_history))
        .route("/messages/{message_id}/read", post(messages::mark_read))
        .route("/threads", get(threads::list_threads))
        .route("/threads/{root_id}", get(threads::get_thread))
        .route("/inbox", get(inbox::unread))
        .route("/notifications", get(inbox::notifications))
        .route("/notifications/read", post(inbox::mark_all_read))
        .route("/account", delete(account::delete_account))
        .layer(axum_middleware::from_fn_with_state(state.clone(), middleware::require_auth))
        .with_state(state)
}
