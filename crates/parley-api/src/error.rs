use axum::http::StatusCode;
use tracing::{debug, error, warn};

use parley_core::Error;

pub fn status_for(err: &Error) -> StatusCode {
    match err {
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::Validation(_) => StatusCode::BAD_REQUEST,
        Error::Conflict(_) => StatusCode::CONFLICT,
        Error::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// Log a core error at a level matching its cause and turn it into a status code.
pub(crate) fn reject(err: Error) -> StatusCode {
    match &err {
        Error::StoreUnavailable(_) => error!("Store failure: {}", err),
        Error::Conflict(_) => warn!("Edit conflict: {}", err),
        Error::NotFound(_) | Error::Validation(_) => debug!("Rejected request: {}", err),
    }
    status_for(&err)
}

/// Run store work off the async runtime.
pub(crate) async fn blocking<F, T>(f: F) -> Result<T, StatusCode>
where
    F: FnOnce() -> parley_core::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(reject)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_error_kind_has_a_distinct_status() {
        let statuses = [
            status_for(&Error::NotFound(String::new())),
            status_for(&Error::Validation(String::new())),
            status_for(&Error::Conflict(String::new())),
            status_for(&Error::StoreUnavailable(String::new())),
        ];
        assert_eq!(
            statuses,
            [
                StatusCode::NOT_FOUND,
                StatusCode::BAD_REQUEST,
                StatusCode::CONFLICT,
                StatusCode::SERVICE_UNAVAILABLE,
            ]
        );
    }
}
