//! Error taxonomy for remote reads and writes.

use thiserror::Error;

use super::model::UserId;
use super::schema::ValidationError;

/// The remote call could not complete.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
  #[error("invalid request URL for {path}: {message}")]
  InvalidUrl { path: String, message: String },
  #[error("could not reach {url}: {message}")]
  Unreachable { url: String, message: String },
  #[error("request to {url} timed out")]
  Timeout { url: String },
  #[error("failed to read response from {url}: {message}")]
  Body { url: String, message: String },
}

/// Machine-readable reason the service rejected a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceErrorKind {
  /// Lookup target does not exist (e.g. signing in as an unknown user)
  NotFound,
  /// Creation clashed with an existing record (e.g. email already registered)
  AlreadyExists,
  /// Any other business failure
  Rejected,
}

/// The remote call completed but reported a business failure.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ServiceError {
  pub kind: ServiceErrorKind,
  /// HTTP status, when the failure was signalled by one
  pub status: Option<u16>,
  /// Message as reported by the service
  pub message: String,
}

#[derive(Debug, Clone, Error)]
pub enum ClientError {
  #[error(transparent)]
  Transport(#[from] TransportError),
  #[error(transparent)]
  Service(#[from] ServiceError),
  #[error("malformed response: {0}")]
  Validation(#[from] ValidationError),
  #[error("no user is signed in")]
  NotAuthenticated,
  #[error("user {0} is not in the loaded user directory")]
  UnknownAssignee(UserId),
}

impl ClientError {
  pub fn service_kind(&self) -> Option<ServiceErrorKind> {
    match self {
      ClientError::Service(e) => Some(e.kind),
      _ => None,
    }
  }

  /// Text suitable for showing to the user.
  pub fn user_message(&self) -> String {
    match self {
      ClientError::Service(ServiceError {
        kind: ServiceErrorKind::NotFound,
        ..
      }) => "User does not exist".to_string(),
      ClientError::Service(ServiceError {
        kind: ServiceErrorKind::AlreadyExists,
        ..
      }) => "User with this email already exists".to_string(),
      ClientError::Transport(_) => "Service unavailable, try again".to_string(),
      other => other.to_string(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::schema::Violation;

  fn service(kind: ServiceErrorKind) -> ClientError {
    ClientError::Service(ServiceError {
      kind,
      status: Some(400),
      message: "Bad request".to_string(),
    })
  }

  #[test]
  fn test_user_message_is_chosen_by_kind_not_text() {
    assert_eq!(
      service(ServiceErrorKind::NotFound).user_message(),
      "User does not exist"
    );
    assert_eq!(
      service(ServiceErrorKind::AlreadyExists).user_message(),
      "User with this email already exists"
    );
    assert_eq!(service(ServiceErrorKind::Rejected).user_message(), "Bad request");
  }

  #[test]
  fn test_validation_display() {
    let err: ClientError = ValidationError::new("owner.email", Violation::InvalidEmail).into();
    assert_eq!(err.to_string(), "malformed response: owner.email: invalid email address");
    assert_eq!(err.service_kind(), None);
  }
}
