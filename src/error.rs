// region:    --- Imports
use crate::auction::model::ListingStatus;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
// endregion: --- Imports

// region:    --- StoreError

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("{0}")]
    Internal(String),
}

// endregion: --- StoreError

// region:    --- EngineError

/// Rejection taxonomy for bid and auction mutations. Every variant maps to a
/// machine-readable `code` in the HTTP response so callers can re-prompt
/// without parsing prose.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("listing not found")]
    NotFound,
    #[error("listing is not open for bidding (status: {status:?})")]
    NotLive { status: ListingStatus },
    #[error("bidding on your own listing is not allowed")]
    SelfBid,
    #[error("bid is below the minimum, at least {minimum_required} required")]
    BelowMinimum { minimum_required: i64 },
    #[error("bid cooldown active, retry in {retry_after_ms}ms")]
    RateLimited { retry_after_ms: i64 },
    #[error("listing is busy, retry")]
    ContentionTimeout,
    #[error("bidding agreement must be accepted first")]
    AgreementRequired,
    #[error("buy now is not available for this listing")]
    BuyNowUnavailable,
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl EngineError {
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::Validation(_) => "INVALID_INPUT",
            EngineError::NotFound => "NOT_FOUND",
            EngineError::NotLive { .. } => "NOT_LIVE",
            EngineError::SelfBid => "SELF_BID",
            EngineError::BelowMinimum { .. } => "BELOW_MINIMUM",
            EngineError::RateLimited { .. } => "RATE_LIMITED",
            EngineError::ContentionTimeout => "CONTENTION",
            EngineError::AgreementRequired => "AGREEMENT_REQUIRED",
            EngineError::BuyNowUnavailable => "BUY_NOW_UNAVAILABLE",
            EngineError::Store(_) => "INTERNAL",
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            EngineError::Validation(_)
            | EngineError::NotLive { .. }
            | EngineError::SelfBid
            | EngineError::BelowMinimum { .. }
            | EngineError::BuyNowUnavailable => StatusCode::BAD_REQUEST,
            EngineError::NotFound => StatusCode::NOT_FOUND,
            EngineError::AgreementRequired => StatusCode::FORBIDDEN,
            EngineError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            EngineError::ContentionTimeout => StatusCode::SERVICE_UNAVAILABLE,
            EngineError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let mut body = serde_json::json!({
            "error": self.to_string(),
            "code": self.code(),
        });
        match &self {
            EngineError::BelowMinimum { minimum_required } => {
                body["minimum_required"] = (*minimum_required).into();
            }
            EngineError::RateLimited { retry_after_ms } => {
                body["retry_after_ms"] = (*retry_after_ms).into();
            }
            EngineError::ContentionTimeout => {
                body["retryable"] = true.into();
            }
            _ => {}
        }
        (self.status_code(), Json(body)).into_response()
    }
}

// endregion: --- EngineError
