use accrual_engine::{AccrualError, ErrorCategory};
use actix_web::{
    error::ResponseError,
    http::{
        header::{ContentType, RETRY_AFTER},
        StatusCode,
    },
    HttpResponse,
};
use log::error;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Invalid order number: {0}")]
    InvalidOrderNumber(String),
    #[error("{0}")]
    Conflict(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("Too many requests. Retry in {0} seconds")]
    RateLimited(u64),
    #[error("The request timed out")]
    RequestTimeout,
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidOrderNumber(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::RequestTimeout => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut response = HttpResponse::build(self.status_code());
        response.insert_header(ContentType::json());
        if let Self::RateLimited(secs) = self {
            response.insert_header((RETRY_AFTER, secs.to_string()));
        }
        response.body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

impl From<AccrualError> for ServerError {
    /// The default mapping. Handlers override it where an endpoint reports a category differently, e.g. a malformed
    /// order number in a request body is a 400, but a 422 in a path.
    fn from(e: AccrualError) -> Self {
        match e.category() {
            ErrorCategory::Validation => Self::InvalidRequestBody(e.to_string()),
            ErrorCategory::Conflict => Self::Conflict(e.to_string()),
            ErrorCategory::NotFound => Self::NoRecordFound(e.to_string()),
            ErrorCategory::Storage => {
                error!("💻️ Backend failure. {e}");
                Self::BackendError(e.to_string())
            },
        }
    }
}
