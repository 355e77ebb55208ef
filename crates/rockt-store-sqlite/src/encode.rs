//! Encoding and decoding helpers between rockt domain types and the plain
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, UUIDs hyphenated lowercase strings, and
//! event payloads compact JSON. Locations are split into `longitude` and
//! `latitude` REAL columns.

use chrono::{DateTime, Utc};
use rockt_core::{
  car::Car,
  event::{Event, NewEvent},
  fare::FareInfo,
  location::Location,
  stop::Stop,
  user::{CheckIn, UserId, UserProfile},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Cars ─────────────────────────────────────────────────────────────────────

pub const CAR_COLUMNS: &str = "number, route, active, longitude, latitude, owner_id,
  owner_riders, owner_revenue, total_riders, total_revenue";

/// Cars have no text-encoded columns, so they map straight from the row.
pub fn car_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Car> {
  Ok(Car {
    number:      row.get(0)?,
    route:       row.get(1)?,
    active:      row.get(2)?,
    location:    Location::new(row.get(3)?, row.get(4)?),
    owner:       row.get::<_, Option<i64>>(5)?.map(UserId),
    owner_fares: FareInfo {
      riders:  row.get(6)?,
      revenue: row.get(7)?,
    },
    total_fares: FareInfo {
      riders:  row.get(8)?,
      revenue: row.get(9)?,
    },
  })
}

// ─── Stops ────────────────────────────────────────────────────────────────────

pub const STOP_COLUMNS: &str = "number, route, longitude, latitude";

pub fn stop_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Stop> {
  Ok(Stop {
    number:   row.get(0)?,
    route:    row.get(1)?,
    location: Location::new(row.get(2)?, row.get(3)?),
  })
}

// ─── Users ────────────────────────────────────────────────────────────────────

pub const USER_COLUMNS: &str =
  "user_id, username, balance, created_at, riding_car, riding_stop";

/// Raw values read directly from a `users` row.
pub struct RawUser {
  pub user_id:     i64,
  pub username:    String,
  pub balance:     i64,
  pub created_at:  String,
  pub riding_car:  Option<u32>,
  pub riding_stop: Option<String>,
}

impl RawUser {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:     row.get(0)?,
      username:    row.get(1)?,
      balance:     row.get(2)?,
      created_at:  row.get(3)?,
      riding_car:  row.get(4)?,
      riding_stop: row.get(5)?,
    })
  }

  pub fn into_user(self) -> Result<UserProfile> {
    let riding = match (self.riding_car, self.riding_stop) {
      (Some(car), Some(stop)) => Some(CheckIn { car, stop }),
      _ => None,
    };
    Ok(UserProfile {
      user_id: UserId(self.user_id),
      username: self.username,
      balance: self.balance,
      created_at: decode_dt(&self.created_at)?,
      riding,
    })
  }
}

// ─── Events ───────────────────────────────────────────────────────────────────

pub const EVENT_COLUMNS: &str = "event_id, event, data_json, recorded_at";

/// Raw strings read directly from an `events` row.
pub struct RawEvent {
  pub event_id:    String,
  pub event:       String,
  pub data_json:   String,
  pub recorded_at: String,
}

impl RawEvent {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      event_id:    row.get(0)?,
      event:       row.get(1)?,
      data_json:   row.get(2)?,
      recorded_at: row.get(3)?,
    })
  }

  pub fn into_event(self) -> Result<Event> {
    let data_json: serde_json::Value = serde_json::from_str(&self.data_json)?;
    Ok(Event {
      event_id:    decode_uuid(&self.event_id)?,
      recorded_at: decode_dt(&self.recorded_at)?,
      data:        NewEvent::from_parts(&self.event, data_json)?,
    })
  }
}
