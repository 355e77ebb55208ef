//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use rockt_core::error::DomainError;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("payment required: {0}")]
  PaymentRequired(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Translate a backend error, surfacing domain rejections as client errors.
  pub fn from_store<E>(e: E) -> Self
  where
    E: std::error::Error + DomainError + Send + Sync + 'static,
  {
    use rockt_core::Error as Core;

    let Some(domain) = e.as_domain() else {
      tracing::error!(error = %e, "store failure");
      return ApiError::Store(Box::new(e));
    };
    let message = domain.to_string();
    let to_client: Option<fn(String) -> ApiError> = match domain {
      Core::NotAllowed(_) => Some(ApiError::Forbidden),
      Core::InsufficientFunds { .. } => Some(ApiError::PaymentRequired),
      Core::CarNotFound(_) | Core::UserNotFound(_) | Core::StopNotFound(_) => {
        Some(ApiError::NotFound)
      }
      Core::NotCheckedIn(_) | Core::AlreadyCheckedIn(_) => Some(ApiError::Conflict),
      Core::NegativeAmount { .. }
      | Core::InvalidRules(_)
      | Core::UnknownEvent(_)
      | Core::Serialization(_) => None,
    };
    match to_client {
      Some(variant) => {
        tracing::warn!(%message, "request rejected");
        variant(message)
      }
      None => {
        tracing::error!(error = %e, "server-side failure");
        ApiError::Store(Box::new(e))
      }
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::Forbidden(m) => (StatusCode::FORBIDDEN, m.clone()),
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::PaymentRequired(m) => (StatusCode::PAYMENT_REQUIRED, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::Store(e) => (StatusCode::SERVICE_UNAVAILABLE, e.to_string()),
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
