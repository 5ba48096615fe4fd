use thiserror::Error;

/// Error taxonomy for the Noteful API.
///
/// The first three variants carry client-facing messages and map to HTTP 400;
/// `NotFound` passes through to the generic 404 responder; everything else is
/// reported as a generic 500 without leaking the underlying cause.
#[derive(Error, Debug)]
pub enum NotefulError {
    #[error("The id entered is not a valid ID")]
    InvalidId(String),

    #[error("Missing {0} in request body")]
    MissingField(&'static str),

    /// Unique-constraint violation surfaced by the store. The payload names
    /// the constrained field, e.g. "folder name" or "username".
    #[error("The {0} already exists")]
    DuplicateName(&'static str),

    #[error("not found")]
    NotFound,

    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type NfResult<T> = Result<T, NotefulError>;
