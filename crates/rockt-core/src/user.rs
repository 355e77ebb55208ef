//! Player profiles, the balance holders that cars debit and credit.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Identifier of a [`UserProfile`]. Events store this, never the profile.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// The car and boarding stop of a user who has checked in and not yet
/// checked out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckIn {
  pub car:  u32,
  pub stop: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
  pub user_id:    UserId,
  pub username:   String,
  pub balance:    i64,
  pub created_at: DateTime<Utc>,
  pub riding:     Option<CheckIn>,
}

impl UserProfile {
  /// Take `amount` from the balance, refusing to go below zero.
  pub fn debit(&mut self, amount: i64) -> Result<()> {
    if self.balance < amount {
      return Err(Error::InsufficientFunds {
        required: amount,
        balance:  self.balance,
      });
    }
    self.balance -= amount;
    Ok(())
  }

  pub fn credit(&mut self, amount: i64) { self.balance += amount; }

  pub fn check_in(&mut self, car: u32, stop: impl Into<String>) -> Result<()> {
    if self.riding.is_some() {
      return Err(Error::AlreadyCheckedIn(self.user_id));
    }
    self.riding = Some(CheckIn { car, stop: stop.into() });
    Ok(())
  }

  /// The current check-in, without clearing it.
  pub fn current_check_in(&self) -> Result<&CheckIn> {
    self.riding.as_ref().ok_or(Error::NotCheckedIn(self.user_id))
  }
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;

  pub(crate) fn user(id: i64, balance: i64) -> UserProfile {
    UserProfile {
      user_id: UserId(id),
      username: format!("user{id}"),
      balance,
      created_at: Utc::now(),
      riding: None,
    }
  }

  #[test]
  fn debit_refuses_overdraft_without_mutating() {
    let mut u = user(1, 10);
    let err = u.debit(11).unwrap_err();
    assert!(matches!(
      err,
      Error::InsufficientFunds { required: 11, balance: 10 }
    ));
    assert_eq!(u.balance, 10);

    u.debit(10).unwrap();
    assert_eq!(u.balance, 0);
  }

  #[test]
  fn double_check_in_is_rejected() {
    let mut u = user(1, 0);
    u.check_in(4211, "00258").unwrap();
    assert!(matches!(
      u.check_in(4212, "00258"),
      Err(Error::AlreadyCheckedIn(UserId(1)))
    ));
    assert_eq!(u.current_check_in().unwrap().car, 4211);
  }
}
