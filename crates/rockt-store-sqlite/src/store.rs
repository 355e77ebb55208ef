//! [`SqliteStore`]: the SQLite implementation of [`GameStore`] and
//! [`ProximityIndex`].

use std::{path::Path, sync::Arc};

use chrono::Utc;
use rockt_core::{
  car::{Car, CarPosition, NewCar},
  event::{Event, NewEvent},
  location::Location,
  rules::Rules,
  stop::Stop,
  store::{GameStore, ProximityIndex, Ride, TimelineEvent},
  user::{UserId, UserProfile},
};

use crate::{
  Result,
  encode::{CAR_COLUMNS, STOP_COLUMNS, car_from_row, encode_dt, stop_from_row},
  queries::{self, in_transaction},
  schema::SCHEMA,
};

/// Shortest length of a degree of latitude (at the equator), in km.
const KM_PER_DEGREE_LATITUDE: f64 = 110.574;
/// Length of a degree of longitude at the equator, in km.
const KM_PER_DEGREE_LONGITUDE: f64 = 111.320;

/// Latitude/longitude ranges that contain every point within `max_km` of
/// `point`. Ignores the antimeridian.
struct BoundingBox {
  min_lat: f64,
  max_lat: f64,
  min_lon: f64,
  max_lon: f64,
}

impl BoundingBox {
  fn around(point: Location, max_km: f64) -> Self {
    let d_lat = max_km / KM_PER_DEGREE_LATITUDE;
    let widest = (point.latitude.abs() + d_lat).min(89.0).to_radians();
    let d_lon = max_km / (KM_PER_DEGREE_LONGITUDE * widest.cos());
    Self {
      min_lat: point.latitude - d_lat,
      max_lat: point.latitude + d_lat,
      min_lon: point.longitude - d_lon,
      max_lon: point.longitude + d_lon,
    }
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A rockt game store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── GameStore impl ──────────────────────────────────────────────────────────

impl GameStore for SqliteStore {
  type Error = crate::Error;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn add_user(&self, username: String, balance: i64) -> Result<UserProfile> {
    let created_at = Utc::now();
    let at_str     = encode_dt(created_at);
    let name       = username.clone();

    let user_id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO users (username, balance, created_at) VALUES (?1, ?2, ?3)",
          rusqlite::params![name, balance, at_str],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(UserProfile {
      user_id: UserId(user_id),
      username,
      balance,
      created_at,
      riding: None,
    })
  }

  async fn get_user(&self, id: UserId) -> Result<Option<UserProfile>> {
    self.conn.call(move |conn| Ok(queries::load_user(conn, id))).await?
  }

  async fn delete_user(&self, id: UserId) -> Result<bool> {
    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM users WHERE user_id = ?1", rusqlite::params![id.0])?)
      })
      .await?;
    if deleted > 0 {
      tracing::info!(user = %id, "user deleted");
    }
    Ok(deleted > 0)
  }

  // ── Stops ─────────────────────────────────────────────────────────────────

  async fn add_stop(&self, stop: Stop) -> Result<Stop> {
    let row = stop.clone();
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO stops (number, route, longitude, latitude) VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![
            row.number,
            row.route,
            row.location.longitude,
            row.location.latitude,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(stop)
  }

  async fn get_stop(&self, number: &str) -> Result<Option<Stop>> {
    let number = number.to_owned();
    self.conn.call(move |conn| Ok(queries::load_stop(conn, &number))).await?
  }

  // ── Cars ──────────────────────────────────────────────────────────────────

  async fn add_car(&self, car: NewCar) -> Result<Car> {
    let car = Car::from(car);
    let row = car.clone();
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO cars (number, route, active, longitude, latitude)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![
            row.number,
            row.route,
            row.active,
            row.location.longitude,
            row.location.latitude,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(car)
  }

  async fn get_car(&self, number: u32) -> Result<Option<Car>> {
    self.conn.call(move |conn| Ok(queries::load_car(conn, number))).await?
  }

  async fn active_cars(&self, route: Option<i32>) -> Result<Vec<Car>> {
    let cars = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {CAR_COLUMNS} FROM cars
           WHERE active = 1 AND (?1 IS NULL OR route = ?1)
           ORDER BY number"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![route], car_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(cars)
  }

  async fn cars_owned_by(&self, owner: UserId) -> Result<Vec<Car>> {
    let cars = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {CAR_COLUMNS} FROM cars WHERE owner_id = ?1 ORDER BY number"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![owner.0], car_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(cars)
  }

  async fn update_car_position(
    &self,
    number:   u32,
    position: CarPosition,
  ) -> Result<Car> {
    self
      .conn
      .call(move |conn| {
        Ok(in_transaction(conn, |tx| {
          let mut car = queries::require_car(tx, number)?;
          car.move_to(position);
          queries::save_car(tx, &car)?;
          Ok(car)
        }))
      })
      .await?
  }

  // ── Ownership and rides ───────────────────────────────────────────────────

  async fn sell_car(
    &self,
    number: u32,
    buyer:  UserId,
    rules:  Arc<dyn Rules>,
  ) -> Result<Event> {
    let event = self
      .conn
      .call(move |conn| {
        Ok(in_transaction(conn, |tx| {
          let mut car = queries::require_car(tx, number)?;
          let mut user = queries::require_user(tx, buyer)?;
          let data = car.sell_to(&mut user, rules.as_ref())?;
          queries::save_car(tx, &car)?;
          queries::save_user(tx, &user)?;
          queries::insert_event(tx, data)
        }))
      })
      .await??;

    tracing::info!(car = number, user = %buyer, event = %event.event_id, "car bought");
    Ok(event)
  }

  async fn buy_back_car(
    &self,
    number: u32,
    owner:  UserId,
    rules:  Arc<dyn Rules>,
  ) -> Result<Event> {
    let event = self
      .conn
      .call(move |conn| {
        Ok(in_transaction(conn, |tx| {
          let mut car = queries::require_car(tx, number)?;
          let mut user = queries::require_user(tx, owner)?;
          let data = car.buy_back(&mut user, rules.as_ref())?;
          queries::save_user(tx, &user)?;
          queries::save_car(tx, &car)?;
          queries::insert_event(tx, data)
        }))
      })
      .await??;

    tracing::info!(car = number, user = %owner, event = %event.event_id, "car sold back");
    Ok(event)
  }

  async fn ride_car(
    &self,
    number: u32,
    rider:  UserId,
    on:     &str,
    off:    &str,
    rules:  Arc<dyn Rules>,
  ) -> Result<Ride> {
    let (on, off) = (on.to_owned(), off.to_owned());
    let ride = self
      .conn
      .call(move |conn| {
        Ok(in_transaction(conn, |tx| {
          let mut user = queries::require_user(tx, rider)?;
          queries::ride(tx, number, &mut user, &on, &off, rules.as_ref())
        }))
      })
      .await??;

    tracing::info!(car = number, rider = %rider, fare = ride.fare, "car ride");
    Ok(ride)
  }

  async fn check_in(&self, user: UserId, number: u32, stop: &str) -> Result<UserProfile> {
    let stop = stop.to_owned();
    let profile = self
      .conn
      .call(move |conn| {
        Ok(in_transaction(conn, |tx| {
          let mut profile = queries::require_user(tx, user)?;
          queries::require_car(tx, number)?;
          queries::require_stop(tx, &stop)?;
          profile.check_in(number, stop.as_str())?;
          queries::save_user(tx, &profile)?;
          Ok(profile)
        }))
      })
      .await??;

    tracing::info!(car = number, user = %user, "checked in");
    Ok(profile)
  }

  async fn check_out(
    &self,
    user:  UserId,
    off:   &str,
    rules: Arc<dyn Rules>,
  ) -> Result<Ride> {
    let off = off.to_owned();
    let ride = self
      .conn
      .call(move |conn| {
        Ok(in_transaction(conn, |tx| {
          let mut profile = queries::require_user(tx, user)?;
          let boarding = profile.current_check_in()?.clone();
          profile.riding = None;
          queries::ride(tx, boarding.car, &mut profile, &boarding.stop, &off, rules.as_ref())
        }))
      })
      .await??;

    tracing::info!(car = ride.event.data.car(), rider = %user, fare = ride.fare, "checked out");
    Ok(ride)
  }

  // ── Event log ─────────────────────────────────────────────────────────────

  async fn record_event(&self, data: NewEvent) -> Result<Event> {
    self.conn.call(move |conn| Ok(queries::insert_event(conn, data))).await?
  }

  async fn car_timeline(&self, number: u32) -> Result<Vec<TimelineEvent>> {
    self.conn.call(move |conn| Ok(queries::car_timeline(conn, number))).await?
  }
}

// ─── ProximityIndex impl ─────────────────────────────────────────────────────

impl ProximityIndex for SqliteStore {
  type Error = crate::Error;

  /// A bounding box on the indexed columns narrows the candidates, then the
  /// geodesic distance decides membership and order.
  async fn find_nearby(&self, route: i32, point: Location, max_km: f64) -> Result<Vec<Car>> {
    let bbox = BoundingBox::around(point, max_km);

    let candidates = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {CAR_COLUMNS} FROM cars
           WHERE route = ?1 AND active = 1
             AND latitude  BETWEEN ?2 AND ?3
             AND longitude BETWEEN ?4 AND ?5"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![route, bbox.min_lat, bbox.max_lat, bbox.min_lon, bbox.max_lon],
            car_from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let mut nearby: Vec<(f64, Car)> = candidates
      .into_iter()
      .map(|car| (point.distance_km(&car.location), car))
      .filter(|(distance, _)| *distance <= max_km)
      .collect();
    nearby.sort_by(|(da, a), (db, b)| da.total_cmp(db).then(a.number.cmp(&b.number)));

    tracing::debug!(route, max_km, found = nearby.len(), "proximity lookup");
    Ok(nearby.into_iter().map(|(_, car)| car).collect())
  }

  async fn find_stops_nearby(&self, point: Location, max_km: f64) -> Result<Vec<Stop>> {
    let bbox = BoundingBox::around(point, max_km);

    let candidates = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {STOP_COLUMNS} FROM stops
           WHERE latitude  BETWEEN ?1 AND ?2
             AND longitude BETWEEN ?3 AND ?4"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![bbox.min_lat, bbox.max_lat, bbox.min_lon, bbox.max_lon],
            stop_from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let mut nearby: Vec<(f64, Stop)> = candidates
      .into_iter()
      .map(|stop| (point.distance_km(&stop.location), stop))
      .filter(|(distance, _)| *distance <= max_km)
      .collect();
    nearby.sort_by(|(da, a), (db, b)| da.total_cmp(db).then_with(|| a.number.cmp(&b.number)));

    tracing::debug!(max_km, found = nearby.len(), "stop lookup");
    Ok(nearby.into_iter().map(|(_, stop)| stop).collect())
  }
}
