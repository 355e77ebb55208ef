//! Game rules: who may buy a car, what it costs, and what a ride costs.
//!
//! The [`Car`] transitions never hard-code prices or fares; they ask a
//! [`Rules`] implementation, which callers pass in. Tests and game balancing
//! substitute their own.

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  car::Car,
  stop::Stop,
  user::{UserId, UserProfile},
};

pub const STREETCAR_PRICE: i64 = 400;
pub const STREETCAR_FARE_RATE: f64 = 2.0;

pub trait Rules: Send + Sync {
  /// Whether `buyer` may take ownership of `car` (funds are checked
  /// separately).
  fn can_buy_car(&self, buyer: &UserProfile, car: &Car) -> bool;

  /// Price of `car` for `user`; used for both purchase and buy-back.
  fn car_price(&self, user: &UserProfile, car: &Car) -> i64;

  /// Fare for riding from `on` to `off`.
  fn fare(
    &self,
    on: &Stop,
    off: &Stop,
    rider: &UserProfile,
    owner: Option<UserId>,
  ) -> i64;
}

/// Convert a travelled distance into a fare, rounding half away from zero.
pub fn fare_for_distance(kilometres: f64, rate: f64) -> i64 {
  (kilometres * rate).round() as i64
}

/// Fixed price, distance-proportional fare, unowned cars only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StandardRules {
  pub price:     i64,
  /// Currency units per kilometre.
  pub fare_rate: f64,
}

impl Default for StandardRules {
  fn default() -> Self {
    Self {
      price:     STREETCAR_PRICE,
      fare_rate: STREETCAR_FARE_RATE,
    }
  }
}

impl StandardRules {
  /// Reject settings that would pay buyers or charge owners.
  pub fn validate(&self) -> Result<()> {
    if self.price < 0 {
      return Err(Error::InvalidRules(format!(
        "price must not be negative, got {}",
        self.price
      )));
    }
    if !(self.fare_rate.is_finite() && self.fare_rate >= 0.0) {
      return Err(Error::InvalidRules(format!(
        "fare_rate must be a finite non-negative number, got {}",
        self.fare_rate
      )));
    }
    Ok(())
  }
}

impl Rules for StandardRules {
  fn can_buy_car(&self, _buyer: &UserProfile, car: &Car) -> bool {
    car.owner.is_none()
  }

  fn car_price(&self, _user: &UserProfile, _car: &Car) -> i64 { self.price }

  fn fare(
    &self,
    on: &Stop,
    off: &Stop,
    rider: &UserProfile,
    owner: Option<UserId>,
  ) -> i64 {
    // You don't pay to ride your own streetcar.
    if owner == Some(rider.user_id) {
      return 0;
    }
    fare_for_distance(on.distance_to(off), self.fare_rate)
  }
}
