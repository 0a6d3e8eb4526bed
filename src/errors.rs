use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    /// The requested interval is no longer free; the caller should pick another time.
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("unauthorized")]
    Unauthorized,

    /// Store I/O failure. Nothing was committed, so the whole operation can be retried.
    #[error("database error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = match &self {
            AppError::Store(e) => {
                tracing::error!(error = %e, "store failure");
                "storage temporarily unavailable, please retry".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                "internal error".to_string()
            }
            other => other.to_string(),
        };

        let body = serde_json::json!({ "success": false, "message": message });
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::Validation("bad date".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::NotFound("barber".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Conflict("taken".into()).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::Forbidden("nope".into()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(AppError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::Store(rusqlite::Error::QueryReturnedNoRows).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_not_found_message() {
        assert_eq!(
            AppError::NotFound("booking".into()).to_string(),
            "booking not found"
        );
    }
}
