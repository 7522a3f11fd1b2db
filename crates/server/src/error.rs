use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chess_core::{OracleError, SessionError};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),
}

impl From<OracleError> for AppError {
    fn from(e: OracleError) -> Self {
        AppError::BadRequest(e.to_string())
    }
}

impl From<SessionError> for AppError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::Illegal(_) | SessionError::Oracle(_) => AppError::BadRequest(e.to_string()),
            SessionError::InvalidPromotionRequest
            | SessionError::DifficultyNotChosen
            | SessionError::NotHumanTurn
            | SessionError::GameOver
            | SessionError::StaleTicket => AppError::Conflict(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
        };

        (status, Json(json!({ "detail": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_core::IllegalMoveError;

    #[test]
    fn test_session_error_mapping() {
        let illegal = SessionError::Illegal(IllegalMoveError { uci: "e2e5".to_string() });
        assert_eq!(AppError::from(illegal).into_response().status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::from(SessionError::GameOver).into_response().status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::NotFound("Game 3 not found".to_string()).into_response().status(),
            StatusCode::NOT_FOUND
        );
    }
}
