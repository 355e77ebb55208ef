//! Stops: the boarding and alighting points a fare is measured between.

use serde::{Deserialize, Serialize};

use crate::location::Location;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
  /// Agency stop code; may carry leading zeros (e.g. `"00258"`).
  pub number:   String,
  pub route:    Option<i32>,
  pub location: Location,
}

impl Stop {
  /// Geodesic distance to `other`, in kilometres.
  pub fn distance_to(&self, other: &Stop) -> f64 {
    self.location.distance_km(&other.location)
  }

  pub fn snapshot(&self) -> StopSnapshot {
    StopSnapshot {
      number:   self.number.clone(),
      location: self.location,
    }
  }
}

/// The part of a stop captured in a ride event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopSnapshot {
  pub number:   String,
  pub location: Location,
}
