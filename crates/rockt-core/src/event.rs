//! The event log: an immutable record of every ownership change and ride.
//!
//! Events are append-only. Users are referenced by [`UserId`] inside the
//! payload; readers resolve those ids when the log is queried, so a user
//! deleted after the fact shows up as `None` instead of breaking history.
//! The payload is generic over the user representation for that reason:
//! `EventData<UserId>` is what gets written, `EventData<Option<UserProfile>>`
//! is what a timeline returns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  car::Car,
  stop::{Stop, StopSnapshot},
  user::UserId,
};

// ─── Kind ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
  CarBought,
  CarSold,
  CarRide,
}

impl EventKind {
  /// The discriminant stored in the `event` column.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::CarBought => "car_bought",
      Self::CarSold => "car_sold",
      Self::CarRide => "car_ride",
    }
  }
}

// ─── Payloads ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarBought<U = UserId> {
  pub car:      u32,
  pub user:     U,
  pub price:    i64,
  /// Previous owner, when the car changed hands directly.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub old_user: Option<U>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarSold<U = UserId> {
  pub car:   u32,
  pub user:  U,
  pub price: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarRide<U = UserId> {
  pub car:      u32,
  pub rider:    U,
  /// Absent when the car had no owner at the time of the ride.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub owner:    Option<U>,
  pub on:       StopSnapshot,
  pub off:      StopSnapshot,
  pub fare:     i64,
  /// Kilometres between `on` and `off`.
  pub traveled: f64,
}

/// The typed payload of an event. The variant name is the `event` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum EventData<U = UserId> {
  CarBought(CarBought<U>),
  CarSold(CarSold<U>),
  CarRide(CarRide<U>),
}

/// Input to [`crate::store::GameStore::record_event`]; the store assigns the
/// id and timestamp.
pub type NewEvent = EventData<UserId>;

impl EventData<UserId> {
  pub fn car_bought(
    car: &Car,
    user: UserId,
    price: i64,
    old_user: Option<UserId>,
  ) -> Self {
    Self::CarBought(CarBought { car: car.number, user, price, old_user })
  }

  pub fn car_sold(car: &Car, user: UserId, price: i64) -> Self {
    Self::CarSold(CarSold { car: car.number, user, price })
  }

  pub fn car_ride(
    rider: UserId,
    owner: Option<UserId>,
    car: &Car,
    on: &Stop,
    off: &Stop,
    fare: i64,
  ) -> Self {
    Self::CarRide(CarRide {
      car: car.number,
      rider,
      owner,
      on: on.snapshot(),
      off: off.snapshot(),
      fare,
      traveled: on.distance_to(off),
    })
  }

  /// Serialise the inner payload (without the tag) for the `data_json`
  /// column.
  pub fn to_json(&self) -> Result<serde_json::Value> {
    let full = serde_json::to_value(self)?;
    Ok(full.get("data").cloned().unwrap_or(serde_json::Value::Null))
  }

  /// Rebuild from the stored discriminant and JSON payload.
  pub fn from_parts(discriminant: &str, data: serde_json::Value) -> Result<Self> {
    if !matches!(discriminant, "car_bought" | "car_sold" | "car_ride") {
      return Err(Error::UnknownEvent(discriminant.to_owned()));
    }
    let wrapped = serde_json::json!({ "event": discriminant, "data": data });
    Ok(serde_json::from_value(wrapped)?)
  }
}

impl<U> EventData<U> {
  pub fn kind(&self) -> EventKind {
    match self {
      Self::CarBought(_) => EventKind::CarBought,
      Self::CarSold(_) => EventKind::CarSold,
      Self::CarRide(_) => EventKind::CarRide,
    }
  }

  /// Number of the car this event is about.
  pub fn car(&self) -> u32 {
    match self {
      Self::CarBought(e) => e.car,
      Self::CarSold(e) => e.car,
      Self::CarRide(e) => e.car,
    }
  }

  /// Every user reference in the payload.
  pub fn users(&self) -> Vec<&U> {
    match self {
      Self::CarBought(e) => std::iter::once(&e.user).chain(&e.old_user).collect(),
      Self::CarSold(e) => vec![&e.user],
      Self::CarRide(e) => std::iter::once(&e.rider).chain(&e.owner).collect(),
    }
  }

  /// Replace every user reference with `f(reference)`.
  pub fn map_users<V>(self, mut f: impl FnMut(U) -> V) -> EventData<V> {
    match self {
      Self::CarBought(e) => EventData::CarBought(CarBought {
        car:      e.car,
        user:     f(e.user),
        price:    e.price,
        old_user: e.old_user.map(&mut f),
      }),
      Self::CarSold(e) => EventData::CarSold(CarSold {
        car:   e.car,
        user:  f(e.user),
        price: e.price,
      }),
      Self::CarRide(e) => EventData::CarRide(CarRide {
        car:      e.car,
        rider:    f(e.rider),
        owner:    e.owner.map(&mut f),
        on:       e.on,
        off:      e.off,
        fare:     e.fare,
        traveled: e.traveled,
      }),
    }
  }
}

// ─── Event ───────────────────────────────────────────────────────────────────

/// A recorded event. Never updated once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event<U = UserId> {
  pub event_id:    Uuid,
  /// Server-assigned timestamp.
  pub recorded_at: DateTime<Utc>,
  #[serde(flatten)]
  pub data:        EventData<U>,
}

impl<U> Event<U> {
  pub fn map_users<V>(self, f: impl FnMut(U) -> V) -> Event<V> {
    Event {
      event_id:    self.event_id,
      recorded_at: self.recorded_at,
      data:        self.data.map_users(f),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{car::tests::car, location::Location};

  fn stop(number: &str, longitude: f64, latitude: f64) -> Stop {
    Stop {
      number:   number.into(),
      route:    Some(510),
      location: Location::new(longitude, latitude),
    }
  }

  #[test]
  fn old_user_only_serialised_when_present() {
    let c = car(4211);
    let without = NewEvent::car_bought(&c, UserId(1), 150, None);
    assert!(without.to_json().unwrap().get("old_user").is_none());

    let with = NewEvent::car_bought(&c, UserId(1), 150, Some(UserId(2)));
    assert_eq!(with.to_json().unwrap()["old_user"], 2);
  }

  #[test]
  fn ride_payload_is_complete() {
    let c = car(4211);
    let king = stop("04412", -79.402858, 43.644075);
    let station = stop("00112", -79.411286, 43.666532);
    let data = NewEvent::car_ride(UserId(1), Some(UserId(2)), &c, &king, &station, 120);
    let json = data.to_json().unwrap();

    assert_eq!(json["car"], 4211);
    assert_eq!(json["rider"], 1);
    assert_eq!(json["owner"], 2);
    assert_eq!(json["fare"], 120);
    assert_eq!(json["on"]["number"], "04412");
    assert_eq!(json["off"]["location"], serde_json::json!([-79.411286, 43.666532]));
    assert_eq!(json["traveled"], king.distance_to(&station));
  }

  #[test]
  fn ride_without_owner_omits_owner() {
    let c = car(4211);
    let a = stop("a", 0.0, 0.0);
    let data = NewEvent::car_ride(UserId(1), None, &c, &a, &a, 0);
    assert!(data.to_json().unwrap().get("owner").is_none());
    assert_eq!(data.users(), vec![&UserId(1)]);
  }

  #[test]
  fn parts_round_trip_and_unknown_discriminant() {
    let data = NewEvent::car_sold(&car(4212), UserId(3), 400);
    let back = NewEvent::from_parts("car_sold", data.to_json().unwrap()).unwrap();
    assert_eq!(back, data);
    assert_eq!(back.kind(), EventKind::CarSold);
    assert!(matches!(
      NewEvent::from_parts("car_crashed", serde_json::json!({})),
      Err(Error::UnknownEvent(_))
    ));
  }

  #[test]
  fn map_users_resolves_every_reference() {
    let data = NewEvent::car_bought(&car(1), UserId(1), 10, Some(UserId(2)));
    let resolved = data.map_users(|id| (id.0 == 1).then(|| "joe".to_owned()));
    match resolved {
      EventData::CarBought(e) => {
        assert_eq!(e.user.as_deref(), Some("joe"));
        assert_eq!(e.old_user, Some(None));
      }
      other => panic!("unexpected {other:?}"),
    }
  }

  #[test]
  fn missing_optional_users_read_back_as_none() {
    let raw = serde_json::json!({
      "event_id": "67e55044-10b1-426f-9247-bb680e5fe0c8",
      "recorded_at": "2026-01-01T00:00:00Z",
      "event": "car_bought",
      "data": { "car": 4211, "user": "joe", "price": 400 },
    });
    let event: Event<Option<String>> = serde_json::from_value(raw).unwrap();
    match event.data {
      EventData::CarBought(e) => {
        assert_eq!(e.user.as_deref(), Some("joe"));
        assert_eq!(e.old_user, None);
      }
      other => panic!("unexpected {other:?}"),
    }

    let data = NewEvent::from_parts(
      "car_ride",
      serde_json::json!({
        "car": 4211,
        "rider": 1,
        "on": { "number": "a", "location": [0.0, 0.0] },
        "off": { "number": "b", "location": [0.0, 0.0] },
        "fare": 0,
        "traveled": 0.0,
      }),
    )
    .unwrap();
    assert_eq!(data.users(), vec![&UserId(1)]);
  }
}
