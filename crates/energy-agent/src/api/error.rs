//! `ApiError` is returned by API handlers. It pairs an HTTP status with an
//! `anyhow::Error`, and responds with a JSON body of both.
use axum::http::StatusCode;

#[derive(Debug, thiserror::Error)]
#[error("status: {status}, error: {error}")]
pub struct ApiError {
    pub status: StatusCode,
    #[source]
    pub error: anyhow::Error,
}

impl ApiError {
    pub fn new(status: StatusCode, error: anyhow::Error) -> ApiError {
        ApiError { status, error }
    }

    pub fn not_found(what: impl std::fmt::Display) -> ApiError {
        ApiError::new(StatusCode::NOT_FOUND, anyhow::anyhow!("{what} was not found"))
    }

    pub fn unprocessable(error: anyhow::Error) -> ApiError {
        ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, error)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(error: anyhow::Error) -> Self {
        tracing::error!(error = ?error, "API responding with internal error");
        ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error,
        }
    }
}

#[derive(serde::Serialize)]
struct Body {
    status: u16,
    error: String,
}

impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let body = Body {
            status: self.status.as_u16(),
            // Alternate form renders nested causes.
            error: format!("{:#}", self.error),
        };
        (self.status, axum::Json(body)).into_response()
    }
}
