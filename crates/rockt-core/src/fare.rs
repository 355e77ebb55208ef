//! Rider/revenue ledgers kept on every car.

use serde::{Deserialize, Serialize};

/// An accumulator of riders and revenue.
///
/// Values are snapshots: [`FareInfo::record`] returns a new ledger rather than
/// mutating in place.
#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize,
)]
pub struct FareInfo {
  pub riders:  u32,
  pub revenue: i64,
}

impl FareInfo {
  /// The ledger after one more rider paying `fare`.
  #[must_use]
  pub fn record(self, fare: i64) -> Self {
    Self {
      riders:  self.riders + 1,
      revenue: self.revenue + fare,
    }
  }
}
