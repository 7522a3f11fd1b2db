use std::time::Duration;

use thiserror::Error;

/// Failures talking to the advice oracle. All of them are soft: callers fall
/// back to local answers.
#[derive(Error, Debug)]
pub enum AdviceError {
    #[error("Advice oracle unavailable: {0}")]
    OracleUnavailable(String),

    #[error("Advice oracle timed out after {0:?}")]
    Timeout(Duration),

    #[error("Malformed advice response: {0}")]
    MalformedResponse(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}
