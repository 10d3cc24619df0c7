//! Error types and axum `IntoResponse` implementation.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unauthorized")]
  Unauthorized,
  #[error("forbidden")]
  Forbidden,
  #[error("not found: {0}")]
  NotFound(String),
  #[error("bad request: {0}")]
  BadRequest(String),
  #[error("conflict: {0}")]
  Conflict(String),
  #[error("unprocessable: {0}")]
  Unprocessable(String),
  #[error("storage unavailable: {0}")]
  Unavailable(String),
  #[error("internal error: {0}")]
  Internal(String),
}

impl From<mealbook_core::Error> for Error {
  fn from(e: mealbook_core::Error) -> Self {
    use mealbook_core::Error as Core;
    match e {
      Core::DuplicateUsername(_) => Error::Conflict(e.to_string()),
      Core::UnknownIdentity(_) => Error::NotFound(e.to_string()),
      Core::InvalidUsername
      | Core::DateOutOfRange(_)
      | Core::InvalidGuestCount(_)
      | Core::MissingGuestCompany => {
        Error::Unprocessable(e.to_string())
      }
      Core::StorageUnavailable(_) => {
        tracing::error!(error = %e, "store operation failed");
        Error::Unavailable(e.to_string())
      }
    }
  }
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    let status = match &self {
      Error::Unauthorized => StatusCode::UNAUTHORIZED,
      Error::Forbidden => StatusCode::FORBIDDEN,
      Error::NotFound(_) => StatusCode::NOT_FOUND,
      Error::BadRequest(_) => StatusCode::BAD_REQUEST,
      Error::Conflict(_) => StatusCode::CONFLICT,
      Error::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
      Error::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
      Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let mut res = (status, Json(json!({ "error": self.to_string() }))).into_response();
    if matches!(self, Error::Unauthorized) {
      res.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Basic realm=\"mealbook\""),
      );
    }
    res
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
