use thiserror::Error;

/// Errors raised by the domain rules.
///
/// Every variant maps onto one of the stable error kinds exposed by the HTTP
/// layer, so callers can match on the variant instead of parsing messages.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    InvalidState(String),
    #[error("{0}")]
    InvalidArgument(String),
    #[error("catalogue error: {0}")]
    Catalogue(String),
}
