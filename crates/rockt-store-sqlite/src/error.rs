//! Error type for `rockt-store-sqlite`.

use rockt_core::error::DomainError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A domain rejection from the car/rules layer; nothing was written.
  #[error(transparent)]
  Core(#[from] rockt_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),
}

impl DomainError for Error {
  fn as_domain(&self) -> Option<&rockt_core::Error> {
    match self {
      Error::Core(e) => Some(e),
      _ => None,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
