use thiserror::Error;

/// Request-level failures. Each one ends the request with a JSON `{ "error": .. }` body.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WishError {
    #[error("missing field: {0}")]
    Validation(String),
    /// Never created, expired and burned all look the same from the outside.
    #[error("the wish has dissipated")]
    NotFound,
    #[error("method not allowed")]
    MethodNotAllowed,
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl WishError {
    pub fn status_code(&self) -> u16 {
        match self {
            WishError::Validation(_) | WishError::BadRequest(_) => 400,
            WishError::NotFound => 404,
            WishError::MethodNotAllowed => 405,
            WishError::Internal(_) => 500,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {var}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
}
