//! Error types for the license server

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] sea_orm::DbErr),

  #[error("license key not found")]
  NotFound,

  #[error("license is inactive")]
  Inactive,

  #[error("license is suspended")]
  Suspended,

  #[error("license has expired")]
  Expired,

  #[error("license is activated on another machine")]
  MachineMismatch,

  #[error("invalid or missing token")]
  TokenNotFound,

  #[error("token has expired")]
  TokenExpired,

  #[error("token has been revoked")]
  TokenRevoked,

  #[error("monthly quota exceeded ({used}/{limit})")]
  QuotaExceeded { used: i32, limit: i32 },

  #[error("provider request failed: {0}")]
  Provider(#[from] reqwest::Error),
}

impl Error {
  /// Stable machine-readable reason code returned to clients.
  pub fn reason(&self) -> &'static str {
    match self {
      Error::Database(_) => "internal",
      Error::NotFound => "not_found",
      Error::Inactive => "inactive",
      Error::Suspended => "suspended",
      Error::Expired => "expired",
      Error::MachineMismatch => "machine_mismatch",
      Error::TokenNotFound => "token_not_found",
      Error::TokenExpired => "token_expired",
      Error::TokenRevoked => "token_revoked",
      Error::QuotaExceeded { .. } => "quota_exceeded",
      Error::Provider(_) => "provider_error",
    }
  }

  fn status(&self) -> StatusCode {
    match self {
      Error::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
      Error::NotFound => StatusCode::NOT_FOUND,
      Error::Inactive
      | Error::Suspended
      | Error::Expired
      | Error::MachineMismatch
      | Error::QuotaExceeded { .. } => StatusCode::FORBIDDEN,
      Error::TokenNotFound | Error::TokenExpired | Error::TokenRevoked => {
        StatusCode::UNAUTHORIZED
      }
      Error::Provider(_) => StatusCode::BAD_GATEWAY,
    }
  }
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    // Storage and transport faults are server-side problems: log them and
    // hide the details from the client.
    let message = match &self {
      Error::Database(err) => {
        tracing::error!("storage failure: {err}");
        "internal error".to_string()
      }
      Error::Provider(err) => {
        tracing::error!("provider failure: {err}");
        "provider request failed".to_string()
      }
      other => other.to_string(),
    };

    let body = json::json!({
      "success": false,
      "reason": self.reason(),
      "message": message,
    });

    (self.status(), Json(body)).into_response()
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
