use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    Validation(String),

    /// Reserved for optimistic-versioning conflicts; the store layer never raises it.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<anyhow::Error> for Error {
    /// Domain errors raised inside a store closure come back out unchanged; everything
    /// else, lock contention included, is a store failure. Edits serialize on the write
    /// lock, so the store never reports an edit conflict.
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<Error>() {
            Ok(domain) => domain,
            Err(err) => match sqlite_code(&err) {
                Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) => {
                    Error::StoreUnavailable(format!("store busy: {:#}", err))
                }
                _ => Error::StoreUnavailable(format!("{:#}", err)),
            },
        }
    }
}

fn sqlite_code(err: &anyhow::Error) -> Option<ErrorCode> {
    match err.downcast_ref::<rusqlite::Error>() {
        Some(rusqlite::Error::SqliteFailure(failure, _)) => Some(failure.code),
        _ => None,
    }
}
