//! The [`Car`] aggregate and its ownership/ride transitions.
//!
//! Each transition validates first and mutates second: on any error neither
//! the car nor the users passed in have been touched. Persisting the mutated
//! values and appending the returned [`NewEvent`] is the store's job and must
//! happen in a single transaction.

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  event::NewEvent,
  fare::FareInfo,
  location::Location,
  rules::Rules,
  stop::Stop,
  user::{UserId, UserProfile},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Car {
  /// Fleet number; unique.
  pub number:      u32,
  pub route:       Option<i32>,
  pub active:      bool,
  pub location:    Location,
  pub owner:       Option<UserId>,
  /// Riders and revenue since the current owner took possession.
  pub owner_fares: FareInfo,
  /// Riders and revenue over the car's lifetime; never reset.
  pub total_fares: FareInfo,
}

/// Input to [`crate::store::GameStore::add_car`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCar {
  pub number:   u32,
  pub route:    Option<i32>,
  #[serde(default)]
  pub active:   bool,
  pub location: Location,
}

/// A position report for a car already in the fleet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CarPosition {
  pub location: Location,
  pub route:    Option<i32>,
  pub active:   bool,
}

impl From<NewCar> for Car {
  fn from(c: NewCar) -> Self {
    Self {
      number:      c.number,
      route:       c.route,
      active:      c.active,
      location:    c.location,
      owner:       None,
      owner_fares: FareInfo::default(),
      total_fares: FareInfo::default(),
    }
  }
}

impl Car {
  pub fn is_owned_by(&self, user: UserId) -> bool { self.owner == Some(user) }

  pub fn move_to(&mut self, position: CarPosition) {
    self.location = position.location;
    self.route = position.route;
    self.active = position.active;
  }

  /// Transfer the car to `buyer`, debiting the rules' price.
  pub fn sell_to(
    &mut self,
    buyer: &mut UserProfile,
    rules: &dyn Rules,
  ) -> Result<NewEvent> {
    if !rules.can_buy_car(buyer, self) {
      return Err(Error::NotAllowed(format!(
        "car {} cannot be bought by user {}",
        self.number, buyer.user_id
      )));
    }
    let price = non_negative("price", rules.car_price(buyer, self))?;
    buyer.debit(price)?;

    let old_user = self.owner.replace(buyer.user_id);
    self.owner_fares = FareInfo::default();

    Ok(NewEvent::car_bought(self, buyer.user_id, price, old_user))
  }

  /// Return the car to the pool, crediting its owner the rules' price.
  pub fn buy_back(
    &mut self,
    user: &mut UserProfile,
    rules: &dyn Rules,
  ) -> Result<NewEvent> {
    if !self.is_owned_by(user.user_id) {
      return Err(Error::NotAllowed(format!(
        "user {} does not own car {}",
        user.user_id, self.number
      )));
    }
    let price = non_negative("price", rules.car_price(user, self))?;
    user.credit(price);

    self.owner = None;
    self.owner_fares = FareInfo::default();

    Ok(NewEvent::car_sold(self, user.user_id, price))
  }

  /// Carry `rider` from `on` to `off`, returning the fare and the event.
  ///
  /// `owner` must be the car's owner profile when the car is owned by someone
  /// other than the rider, and `None` otherwise. Owners ride free and skip the
  /// balance check entirely; a car without an owner collects the fare with no
  /// payee. Both ledgers count every ride.
  ///
  /// The owner's fare is always zero, whatever the rules say.
  pub fn ride(
    &mut self,
    rider: &mut UserProfile,
    owner: Option<&mut UserProfile>,
    on: &Stop,
    off: &Stop,
    rules: &dyn Rules,
  ) -> Result<(i64, NewEvent)> {
    match (&owner, self.owner) {
      (Some(payee), _) if payee.user_id == rider.user_id => {
        return Err(Error::NotAllowed(format!(
          "user {} cannot be paid for riding car {}",
          rider.user_id, self.number
        )));
      }
      (Some(payee), Some(id)) if payee.user_id == id => {}
      (None, Some(id)) if id == rider.user_id => {}
      (None, None) => {}
      (_, Some(id)) => return Err(Error::UserNotFound(id)),
      (Some(payee), None) => {
        return Err(Error::NotAllowed(format!(
          "user {} does not own car {}",
          payee.user_id, self.number
        )));
      }
    }

    let fare = if self.is_owned_by(rider.user_id) {
      0
    } else {
      non_negative("fare", rules.fare(on, off, rider, self.owner))?
    };
    rider.debit(fare)?;
    if let Some(payee) = owner {
      payee.credit(fare);
    }

    self.owner_fares = self.owner_fares.record(fare);
    self.total_fares = self.total_fares.record(fare);

    let event = NewEvent::car_ride(rider.user_id, self.owner, self, on, off, fare);
    Ok((fare, event))
  }
}

/// Amounts quoted by [`Rules`] must not move money the wrong way.
fn non_negative(kind: &'static str, amount: i64) -> Result<i64> {
  if amount < 0 {
    return Err(Error::NegativeAmount { kind, amount });
  }
  Ok(amount)
}
