use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use points_ledger::LedgerError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

/// JSON body returned for every failed request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Ledger(e) => match e {
                LedgerError::InvalidAmount { .. } => StatusCode::BAD_REQUEST,
                LedgerError::InsufficientBalance { .. } => StatusCode::CONFLICT,
                LedgerError::Overflow { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                LedgerError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                LedgerError::HistoryWriteFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
                LedgerError::LockAcquisitionTimeout { .. } => StatusCode::SERVICE_UNAVAILABLE,
            },
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Config(_) | Self::Io(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Ledger(e) => e.code(),
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Config(_) => "CONFIG",
            Self::Io(_) => "IO",
            Self::Internal(_) => "INTERNAL",
        }
    }
}

impl From<PathRejection> for ServerError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<JsonRejection> for ServerError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "request failed");
        }
        let body = ErrorBody {
            code: self.code().to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use points_store::StoreError;

    #[test]
    fn ledger_errors_map_to_status() {
        let cases = [
            (LedgerError::InvalidAmount { amount: 0 }, StatusCode::BAD_REQUEST),
            (
                LedgerError::InsufficientBalance { current: 1, requested: 2 },
                StatusCode::CONFLICT,
            ),
            (
                LedgerError::StoreUnavailable(StoreError::Unavailable("down".into())),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ServerError::from(err).status(), status);
        }
    }

    #[test]
    fn bad_request_is_client_error() {
        let err = ServerError::BadRequest("expected an integer".into());
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "BAD_REQUEST");
    }

    #[test]
    fn code_comes_from_ledger() {
        let err = ServerError::from(LedgerError::Overflow { balance: 1, amount: 1 });
        assert_eq!(err.code(), "OVERFLOW");
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
