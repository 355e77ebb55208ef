//! The `GameStore` and `ProximityIndex` traits.
//!
//! Storage backends (e.g. `rockt-store-sqlite`) implement these. Higher layers
//! (`rockt-api`) depend on the abstraction, not on any concrete backend.

use std::{future::Future, sync::Arc};

use crate::{
  car::{Car, CarPosition, NewCar},
  error::DomainError,
  event::{Event, NewEvent},
  location::Location,
  rules::Rules,
  stop::Stop,
  user::{UserId, UserProfile},
};

/// The outcome of a completed ride.
#[derive(Debug, Clone)]
pub struct Ride {
  pub fare:  i64,
  pub event: Event,
}

/// A car event log entry with user references resolved at read time.
/// `None` marks a user that has since been deleted.
pub type TimelineEvent = Event<Option<UserProfile>>;

// ─── GameStore ───────────────────────────────────────────────────────────────

/// Abstraction over a rockt game backend.
///
/// The ownership and ride operations are atomic: each one reads the car and
/// the users involved, applies the [`Car`] transition, writes everything back
/// and appends exactly one event, or changes nothing at all. Concurrent calls
/// touching the same car or user must serialise.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait GameStore: Send + Sync {
  type Error: std::error::Error + DomainError + Send + Sync + 'static;

  // ── Users ─────────────────────────────────────────────────────────────

  fn add_user(
    &self,
    username: String,
    balance: i64,
  ) -> impl Future<Output = Result<UserProfile, Self::Error>> + Send + '_;

  fn get_user(
    &self,
    id: UserId,
  ) -> impl Future<Output = Result<Option<UserProfile>, Self::Error>> + Send + '_;

  /// Administrative removal. Cars the user owned become unowned; events that
  /// mention the user are left untouched. Returns `false` if there was no
  /// such user.
  fn delete_user(
    &self,
    id: UserId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Stops ─────────────────────────────────────────────────────────────

  fn add_stop(
    &self,
    stop: Stop,
  ) -> impl Future<Output = Result<Stop, Self::Error>> + Send + '_;

  fn get_stop<'a>(
    &'a self,
    number: &'a str,
  ) -> impl Future<Output = Result<Option<Stop>, Self::Error>> + Send + 'a;

  // ── Cars ──────────────────────────────────────────────────────────────

  fn add_car(
    &self,
    car: NewCar,
  ) -> impl Future<Output = Result<Car, Self::Error>> + Send + '_;

  fn get_car(
    &self,
    number: u32,
  ) -> impl Future<Output = Result<Option<Car>, Self::Error>> + Send + '_;

  /// Cars in service, optionally only those on `route`, ordered by number.
  fn active_cars(
    &self,
    route: Option<i32>,
  ) -> impl Future<Output = Result<Vec<Car>, Self::Error>> + Send + '_;

  /// Cars currently owned by `owner`, ordered by number.
  fn cars_owned_by(
    &self,
    owner: UserId,
  ) -> impl Future<Output = Result<Vec<Car>, Self::Error>> + Send + '_;

  /// Record a new position/route/service state for a car.
  fn update_car_position(
    &self,
    number: u32,
    position: CarPosition,
  ) -> impl Future<Output = Result<Car, Self::Error>> + Send + '_;

  // ── Ownership and rides ───────────────────────────────────────────────

  /// [`Car::sell_to`] plus persistence; appends a `car_bought` event.
  fn sell_car(
    &self,
    number: u32,
    buyer: UserId,
    rules: Arc<dyn Rules>,
  ) -> impl Future<Output = Result<Event, Self::Error>> + Send + '_;

  /// [`Car::buy_back`] plus persistence; appends a `car_sold` event.
  fn buy_back_car(
    &self,
    number: u32,
    owner: UserId,
    rules: Arc<dyn Rules>,
  ) -> impl Future<Output = Result<Event, Self::Error>> + Send + '_;

  /// [`Car::ride`] plus persistence; appends a `car_ride` event.
  fn ride_car<'a>(
    &'a self,
    number: u32,
    rider: UserId,
    on: &'a str,
    off: &'a str,
    rules: Arc<dyn Rules>,
  ) -> impl Future<Output = Result<Ride, Self::Error>> + Send + 'a;

  /// Mark `user` as aboard car `number` since stop `stop`.
  fn check_in<'a>(
    &'a self,
    user: UserId,
    number: u32,
    stop: &'a str,
  ) -> impl Future<Output = Result<UserProfile, Self::Error>> + Send + 'a;

  /// Ride from the checked-in stop to `off` and clear the check-in, as one
  /// transaction.
  fn check_out<'a>(
    &'a self,
    user: UserId,
    off: &'a str,
    rules: Arc<dyn Rules>,
  ) -> impl Future<Output = Result<Ride, Self::Error>> + Send + 'a;

  // ── Event log ─────────────────────────────────────────────────────────

  /// Append an event. The `event_id` and `recorded_at` are set by the store.
  fn record_event(
    &self,
    data: NewEvent,
  ) -> impl Future<Output = Result<Event, Self::Error>> + Send + '_;

  /// Every event about car `number`, oldest first, with users resolved.
  fn car_timeline(
    &self,
    number: u32,
  ) -> impl Future<Output = Result<Vec<TimelineEvent>, Self::Error>> + Send + '_;
}

// ─── ProximityIndex ──────────────────────────────────────────────────────────

/// "Which cars are near this point on this route?" and "which stops are
/// near this point?"
pub trait ProximityIndex: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Active cars on `route` within `max_km` of `point`, nearest first.
  fn find_nearby(
    &self,
    route: i32,
    point: Location,
    max_km: f64,
  ) -> impl Future<Output = Result<Vec<Car>, Self::Error>> + Send + '_;

  /// Stops on any route within `max_km` of `point`, nearest first.
  fn find_stops_nearby(
    &self,
    point: Location,
    max_km: f64,
  ) -> impl Future<Output = Result<Vec<Stop>, Self::Error>> + Send + '_;
}
