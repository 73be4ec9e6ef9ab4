use axum::http::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access data file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode data file: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("{table} row {id} not found")]
    NotFound { table: &'static str, id: String },
    #[error("{table} already has a row for {key}")]
    Conflict { table: &'static str, key: String },
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("an account already exists for this email")]
    EmailTaken,
    #[error("{0}")]
    InvalidInput(String),
    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: message.into(),
        }
    }

    pub fn internal(err: impl std::error::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
        }
    }

    /// A failure the user sees as a plain message; details stay in the log.
    pub fn save_failed(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        Self::internal(err)
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        (self.status, self.message).into_response()
    }
}
