//! Error handling - quota rejections and RFC 7807 responses.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use spark_core::{LimitError, QuotaError};
use spark_shared::ErrorResponse;
use spark_shared::rate_limit::{
    HEADER_LIMIT, HEADER_REMAINING, HEADER_RESET, HEADER_RETRY_AFTER, RateLimitRejection,
};
use std::fmt;

/// Application-level error type.
///
/// Quota rejections get the dedicated 429 body and headers the client cache
/// parses; everything else falls back to RFC 7807.
#[derive(Debug)]
pub enum AppError {
    /// A gated action's budget for the window is spent.
    RateLimited(LimitError),
    /// The per-origin anonymous-token issuance budget is spent.
    TokenIssuanceLimited(LimitError),
    BadRequest(String),
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::RateLimited(error) => write!(f, "{}", error.message),
            AppError::TokenIssuanceLimited(error) => write!(f, "{}", error.message),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::RateLimited(_) | AppError::TokenIssuanceLimited(_) => {
                StatusCode::TOO_MANY_REQUESTS
            }
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::RateLimited(error) | AppError::TokenIssuanceLimited(error) => {
                quota_rejection(error)
            }
            AppError::BadRequest(detail) => {
                HttpResponse::BadRequest().json(ErrorResponse::bad_request(detail))
            }
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                HttpResponse::InternalServerError().json(ErrorResponse::internal_error())
            }
        }
    }
}

/// 429 response carrying the full header triple plus the rejection body.
fn quota_rejection(error: &LimitError) -> HttpResponse {
    HttpResponse::TooManyRequests()
        .insert_header((HEADER_LIMIT, error.total.to_string()))
        .insert_header((HEADER_REMAINING, error.remaining.to_string()))
        .insert_header((HEADER_RESET, error.reset_time_ms.to_string()))
        .insert_header((HEADER_RETRY_AFTER, error.retry_after_secs.to_string()))
        .json(RateLimitRejection {
            error: error.message.clone(),
            code: error.code.to_string(),
            remaining: error.remaining,
            reset_time: error.reset_time_ms,
            retry_after: error.retry_after_secs,
            success: false,
        })
}

impl From<QuotaError> for AppError {
    fn from(err: QuotaError) -> Self {
        match err {
            QuotaError::RateLimitExceeded(error) => AppError::RateLimited(error),
            QuotaError::TokenIssuanceLimitExceeded(error) => {
                AppError::TokenIssuanceLimited(error)
            }
            QuotaError::UnknownPolicy(name) => {
                tracing::error!("Unregistered rate-limit policy requested: {}", name);
                AppError::Internal(format!("unknown policy {name}"))
            }
            QuotaError::Store(e) => {
                tracing::error!("Quota store error: {}", e);
                AppError::Internal("Quota store unavailable".to_string())
            }
        }
    }
}

/// Result type alias for handlers.
pub type AppResult<T> = Result<T, AppError>;
