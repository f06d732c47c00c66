use thiserror::Error;

/// Errors raised while turning a request body into a storage operation.
///
/// The messages are part of the HTTP contract: handlers send them back
/// verbatim as the response body.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TodoError {
    #[error("{0}")]
    Malformed(String),
    #[error("The todo must be a JSON object")]
    NotAnObject,
    #[error("The todo must have a field id.")]
    MissingUpdateId,
    #[error("The todo must have a field id")]
    MissingDeleteId,
    #[error("The todo field id must be a string")]
    InvalidId,
}
