//! Error types for `rockt-core`.

use thiserror::Error;

use crate::user::UserId;

#[derive(Debug, Error)]
pub enum Error {
  /// The ownership rules rejected the transition (wrong user, car already
  /// owned, policy refusal).
  #[error("not allowed: {0}")]
  NotAllowed(String),

  #[error("insufficient funds: {required} required, balance is {balance}")]
  InsufficientFunds { required: i64, balance: i64 },

  #[error("car not found: {0}")]
  CarNotFound(u32),

  #[error("user not found: {0}")]
  UserNotFound(UserId),

  #[error("stop not found: {0:?}")]
  StopNotFound(String),

  #[error("user {0} is not checked in to a car")]
  NotCheckedIn(UserId),

  #[error("user {0} is already checked in to a car")]
  AlreadyCheckedIn(UserId),

  /// The rules priced a purchase or a ride below zero.
  #[error("rules produced a negative {kind}: {amount}")]
  NegativeAmount { kind: &'static str, amount: i64 },

  #[error("invalid rules: {0}")]
  InvalidRules(String),

  #[error("unknown event discriminant: {0:?}")]
  UnknownEvent(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Implemented by backend error types so callers can tell a domain rejection
/// (which carries an [`Error`]) apart from a storage failure.
pub trait DomainError {
  /// The domain error wrapped by this backend error, if any. `None` means the
  /// failure came from the storage layer itself.
  fn as_domain(&self) -> Option<&Error>;
}

impl DomainError for Error {
  fn as_domain(&self) -> Option<&Error> { Some(self) }
}
