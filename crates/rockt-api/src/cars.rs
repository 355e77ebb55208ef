//! Handlers for `/cars` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/cars` | Positions of cars in service, `?route=` to filter |
//! | `GET`  | `/cars/:number` | Public car info |
//! | `POST` | `/cars/:number/buy` | Acting user buys the car; 201 + `car_bought` event |
//! | `POST` | `/cars/:number/sell` | Acting user sells it back; `car_sold` event |
//! | `POST` | `/cars/:number/ride` | Body: `{"on":"...","off":"..."}` |
//! | `POST` | `/cars/:number/check_in` | Body: `{"stop":"..."}` |
//! | `GET`  | `/cars/:number/timeline` | Events, users shown by username |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use rockt_core::{
  event::Event,
  location::Location,
  store::{GameStore, ProximityIndex, Ride},
};
use serde::{Deserialize, Serialize};

use crate::{ApiState, CurrentUser, error::ApiError, user::UserBody};

// ─── Map ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Default)]
pub struct ListParams {
  pub route: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct CarLocation {
  pub number:   u32,
  pub route:    Option<i32>,
  pub location: Location,
  pub owned:    bool,
  pub url:      String,
}

/// `GET /cars[?route=...]`: every active car, ordered by number.
pub async fn list<S>(
  State(state): State<ApiState<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<CarLocation>>, ApiError>
where
  S: GameStore + ProximityIndex + 'static,
{
  let cars = state
    .store
    .active_cars(params.route)
    .await
    .map_err(ApiError::from_store)?;

  let locations = cars
    .into_iter()
    .map(|car| CarLocation {
      number:   car.number,
      route:    car.route,
      location: car.location,
      owned:    car.owner.is_some(),
      url:      state.url(&format!("/cars/{}", car.number)),
    })
    .collect();
  Ok(Json(locations))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct CarInfo {
  pub number:       u32,
  pub route:        Option<i32>,
  pub active:       bool,
  pub location:     Location,
  pub owned:        bool,
  pub timeline_url: String,
}

/// `GET /cars/:number`
pub async fn get_one<S>(
  State(state): State<ApiState<S>>,
  Path(number): Path<u32>,
) -> Result<Json<CarInfo>, ApiError>
where
  S: GameStore + ProximityIndex + 'static,
{
  let car = state
    .store
    .get_car(number)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("car {number} not found")))?;

  Ok(Json(CarInfo {
    number:       car.number,
    route:        car.route,
    active:       car.active,
    location:     car.location,
    owned:        car.owner.is_some(),
    timeline_url: state.url(&format!("/cars/{number}/timeline")),
  }))
}

// ─── Buy / sell ───────────────────────────────────────────────────────────────

/// `POST /cars/:number/buy`: returns 201 + the `car_bought` event.
pub async fn buy<S>(
  State(state): State<ApiState<S>>,
  CurrentUser(user): CurrentUser,
  Path(number): Path<u32>,
) -> Result<impl IntoResponse, ApiError>
where
  S: GameStore + ProximityIndex + 'static,
{
  let event = state
    .store
    .sell_car(number, user.user_id, state.rules.clone())
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(event)))
}

/// `POST /cars/:number/sell`: returns the `car_sold` event.
pub async fn sell<S>(
  State(state): State<ApiState<S>>,
  CurrentUser(user): CurrentUser,
  Path(number): Path<u32>,
) -> Result<Json<Event>, ApiError>
where
  S: GameStore + ProximityIndex + 'static,
{
  let event = state
    .store
    .buy_back_car(number, user.user_id, state.rules.clone())
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(event))
}

// ─── Ride ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RideRequest {
  pub on:  String,
  pub off: String,
}

#[derive(Debug, Serialize)]
pub struct RideBody {
  pub fare:  i64,
  pub event: Event,
}

impl From<Ride> for RideBody {
  fn from(r: Ride) -> Self {
    Self { fare: r.fare, event: r.event }
  }
}

/// `POST /cars/:number/ride`: body: `{"on":"00258","off":"04412"}`
pub async fn ride<S>(
  State(state): State<ApiState<S>>,
  CurrentUser(user): CurrentUser,
  Path(number): Path<u32>,
  Json(body): Json<RideRequest>,
) -> Result<Json<RideBody>, ApiError>
where
  S: GameStore + ProximityIndex + 'static,
{
  let ride = state
    .store
    .ride_car(number, user.user_id, &body.on, &body.off, state.rules.clone())
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(RideBody::from(ride)))
}

// ─── Check in ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CheckInBody {
  pub stop: String,
}

/// `POST /cars/:number/check_in`: body: `{"stop":"00258"}`
pub async fn check_in<S>(
  State(state): State<ApiState<S>>,
  CurrentUser(user): CurrentUser,
  Path(number): Path<u32>,
  Json(body): Json<CheckInBody>,
) -> Result<Json<UserBody>, ApiError>
where
  S: GameStore + ProximityIndex + 'static,
{
  let user = state
    .store
    .check_in(user.user_id, number, &body.stop)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(UserBody::new(&state, user)))
}

// ─── Timeline ─────────────────────────────────────────────────────────────────

/// `GET /cars/:number/timeline`: oldest first; deleted users are `null`.
pub async fn timeline<S>(
  State(state): State<ApiState<S>>,
  Path(number): Path<u32>,
) -> Result<Json<Vec<Event<Option<String>>>>, ApiError>
where
  S: GameStore + ProximityIndex + 'static,
{
  if state.store.get_car(number).await.map_err(ApiError::from_store)?.is_none() {
    return Err(ApiError::NotFound(format!("car {number} not found")));
  }

  let events = state
    .store
    .car_timeline(number)
    .await
    .map_err(ApiError::from_store)?
    .into_iter()
    .map(|e| e.map_users(|user| user.map(|u| u.username)))
    .collect();
  Ok(Json(events))
}
