//! Synchronous statements run on the `tokio_rusqlite` connection thread.
//!
//! Every function takes a plain [`Connection`]; a [`rusqlite::Transaction`]
//! derefs to one, so the same helpers serve single reads and the multi-step
//! ownership/ride transactions in [`crate::store`].

use std::collections::HashMap;

use chrono::Utc;
use rockt_core::{
  car::Car,
  event::{Event, NewEvent},
  rules::Rules,
  stop::Stop,
  store::{Ride, TimelineEvent},
  user::{UserId, UserProfile},
};
use rusqlite::{Connection, OptionalExtension as _, TransactionBehavior};
use uuid::Uuid;

use crate::{
  Result,
  encode::{
    CAR_COLUMNS, EVENT_COLUMNS, RawEvent, RawUser, STOP_COLUMNS, USER_COLUMNS,
    car_from_row, encode_dt, encode_uuid, stop_from_row,
  },
};

/// Run `body` inside an immediate transaction, committing only if it succeeds.
/// Dropping the transaction on the error path rolls everything back.
pub fn in_transaction<T>(
  conn: &mut Connection,
  body: impl FnOnce(&Connection) -> Result<T>,
) -> Result<T> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
  let value = body(&*tx)?;
  tx.commit()?;
  Ok(value)
}

// ─── Users ───────────────────────────────────────────────────────────────────

pub fn load_user(conn: &Connection, id: UserId) -> Result<Option<UserProfile>> {
  let raw = conn
    .query_row(
      &format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1"),
      rusqlite::params![id.0],
      RawUser::from_row,
    )
    .optional()?;
  raw.map(RawUser::into_user).transpose()
}

pub fn require_user(conn: &Connection, id: UserId) -> Result<UserProfile> {
  load_user(conn, id)?.ok_or_else(|| rockt_core::Error::UserNotFound(id).into())
}

pub fn save_user(conn: &Connection, user: &UserProfile) -> Result<()> {
  let (riding_car, riding_stop) = match &user.riding {
    Some(c) => (Some(c.car), Some(c.stop.as_str())),
    None => (None, None),
  };
  conn.execute(
    "UPDATE users SET balance = ?2, riding_car = ?3, riding_stop = ?4
     WHERE user_id = ?1",
    rusqlite::params![user.user_id.0, user.balance, riding_car, riding_stop],
  )?;
  Ok(())
}

// ─── Stops ───────────────────────────────────────────────────────────────────

pub fn load_stop(conn: &Connection, number: &str) -> Result<Option<Stop>> {
  Ok(
    conn
      .query_row(
        &format!("SELECT {STOP_COLUMNS} FROM stops WHERE number = ?1"),
        rusqlite::params![number],
        stop_from_row,
      )
      .optional()?,
  )
}

pub fn require_stop(conn: &Connection, number: &str) -> Result<Stop> {
  load_stop(conn, number)?
    .ok_or_else(|| rockt_core::Error::StopNotFound(number.to_owned()).into())
}

// ─── Cars ────────────────────────────────────────────────────────────────────

pub fn load_car(conn: &Connection, number: u32) -> Result<Option<Car>> {
  Ok(
    conn
      .query_row(
        &format!("SELECT {CAR_COLUMNS} FROM cars WHERE number = ?1"),
        rusqlite::params![number],
        car_from_row,
      )
      .optional()?,
  )
}

pub fn require_car(conn: &Connection, number: u32) -> Result<Car> {
  load_car(conn, number)?
    .ok_or_else(|| rockt_core::Error::CarNotFound(number).into())
}

pub fn save_car(conn: &Connection, car: &Car) -> Result<()> {
  conn.execute(
    "UPDATE cars SET
       route = ?2, active = ?3, longitude = ?4, latitude = ?5, owner_id = ?6,
       owner_riders = ?7, owner_revenue = ?8, total_riders = ?9, total_revenue = ?10
     WHERE number = ?1",
    rusqlite::params![
      car.number,
      car.route,
      car.active,
      car.location.longitude,
      car.location.latitude,
      car.owner.map(|id| id.0),
      car.owner_fares.riders,
      car.owner_fares.revenue,
      car.total_fares.riders,
      car.total_fares.revenue,
    ],
  )?;
  Ok(())
}

// ─── Rides ───────────────────────────────────────────────────────────────────

/// Load everything a ride touches, apply [`Car::ride`], and write it back.
///
/// `rider` is loaded by the caller so check-out can clear the check-in on the
/// same profile; it is saved here.
pub fn ride(
  conn: &Connection,
  number: u32,
  rider: &mut UserProfile,
  on: &str,
  off: &str,
  rules: &dyn Rules,
) -> Result<Ride> {
  let mut car = require_car(conn, number)?;
  let on = require_stop(conn, on)?;
  let off = require_stop(conn, off)?;
  let mut owner = match car.owner {
    Some(id) if id != rider.user_id => Some(require_user(conn, id)?),
    _ => None,
  };

  let (fare, data) = car.ride(rider, owner.as_mut(), &on, &off, rules)?;

  save_car(conn, &car)?;
  save_user(conn, rider)?;
  if let Some(owner) = &owner {
    save_user(conn, owner)?;
  }
  let event = insert_event(conn, data)?;
  Ok(Ride { fare, event })
}

// ─── Events ──────────────────────────────────────────────────────────────────

pub fn insert_event(conn: &Connection, data: NewEvent) -> Result<Event> {
  let event = Event {
    event_id:    Uuid::new_v4(),
    recorded_at: Utc::now(),
    data,
  };

  conn.execute(
    "INSERT INTO events (event_id, event, car, data_json, recorded_at)
     VALUES (?1, ?2, ?3, ?4, ?5)",
    rusqlite::params![
      encode_uuid(event.event_id),
      event.data.kind().as_str(),
      event.data.car(),
      event.data.to_json()?.to_string(),
      encode_dt(event.recorded_at),
    ],
  )?;
  Ok(event)
}

/// Events for `car` in insertion order, with user ids resolved against the
/// users table as it is now.
pub fn car_timeline(conn: &Connection, car: u32) -> Result<Vec<TimelineEvent>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {EVENT_COLUMNS} FROM events WHERE car = ?1 ORDER BY seq"
  ))?;
  let events: Vec<Event> = stmt
    .query_map(rusqlite::params![car], RawEvent::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?
    .into_iter()
    .map(RawEvent::into_event)
    .collect::<Result<_>>()?;

  let mut users: HashMap<UserId, Option<UserProfile>> = HashMap::new();
  for event in &events {
    for id in event.data.users() {
      if !users.contains_key(id) {
        users.insert(*id, load_user(conn, *id)?);
      }
    }
  }

  Ok(
    events
      .into_iter()
      .map(|e| e.map_users(|id| users.get(&id).cloned().flatten()))
      .collect(),
  )
}
