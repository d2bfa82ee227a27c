use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rust_decimal::Decimal;
use serde_json::json;
use thiserror::Error;

/// Error kinds surfaced by the auction service.
#[derive(Debug, Error)]
pub enum AuctionError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    /// State-incompatible request. Carries the minimum acceptable amount when
    /// a bid was rejected for being at or below it.
    #[error("{message}")]
    Conflict {
        message: String,
        min_acceptable: Option<Decimal>,
    },

    #[error("{0}")]
    InvalidArgument(String),
}

impl AuctionError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict {
            message: msg.into(),
            min_acceptable: None,
        }
    }

    /// Rejected bid: the caller needs the fresh minimum to retry sensibly.
    pub fn below_minimum(min_acceptable: Decimal) -> Self {
        Self::Conflict {
            message: format!("bid must be higher than {}", min_acceptable),
            min_acceptable: Some(min_acceptable),
        }
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

impl IntoResponse for AuctionError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AuctionError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AuctionError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            AuctionError::Conflict { .. } => (StatusCode::CONFLICT, "CONFLICT"),
            AuctionError::InvalidArgument(_) => (StatusCode::BAD_REQUEST, "INVALID_ARGUMENT"),
        };

        let mut body = json!({
            "error": self.to_string(),
            "code": code,
        });
        if let AuctionError::Conflict {
            min_acceptable: Some(min),
            ..
        } = &self
        {
            body["min_acceptable"] = json!(min);
        }

        (status, Json(body)).into_response()
    }
}
