use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

pub const STORE_FAILURE_BODY: &str = "INTERNAL: store failure";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),
    #[error("CONFIG_INVALID: {0}")]
    Config(String),
    #[error("IO_FAILURE: {0}")]
    Io(String),
    #[error("INTERNAL: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::Config(_) | Self::Io(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Invalid input is echoed back to the caller. Every other failure gets a
/// fixed body; the detail stays in the logs.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = match &self {
            Self::InvalidInput(_) => self.to_string(),
            Self::Config(_) | Self::Io(_) | Self::Internal(_) => STORE_FAILURE_BODY.to_string(),
        };
        (self.status(), body).into_response()
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value.to_string())
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Internal(value.to_string())
    }
}

impl From<deadpool::managed::PoolError<rusqlite::Error>> for AppError {
    fn from(value: deadpool::managed::PoolError<rusqlite::Error>) -> Self {
        Self::Internal(format!("connection pool: {value}"))
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(value: tokio::task::JoinError) -> Self {
        Self::Internal(format!("store task aborted: {value}"))
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::AppError;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    #[test]
    fn invalid_input_is_the_only_client_error() {
        assert_eq!(AppError::InvalidInput("x".to_string()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::Internal("x".to_string()).status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(AppError::Io("x".to_string()).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn server_errors_hide_their_detail_from_the_response() {
        let response = AppError::Internal("no such table: pokemon".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = AppError::InvalidInput("name missing".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn store_errors_keep_their_message() {
        let error = AppError::from(rusqlite::Error::QueryReturnedNoRows);
        assert!(error.to_string().starts_with("INTERNAL: "));
        assert!(error.to_string().contains("Query returned no rows"));
    }
}
