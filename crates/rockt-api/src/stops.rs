//! Handlers for `GET /stops/nearby` and `GET /stops/:number/nearby`.

use axum::{
  Json,
  extract::{Path, Query, State},
};
use rockt_core::{
  location::Location,
  store::{GameStore, ProximityIndex},
};
use serde::{Deserialize, Serialize};

use crate::{ApiState, error::ApiError};

#[derive(Debug, Deserialize, Default)]
pub struct NearbyParams {
  /// Search radius in kilometres; defaults to the configured radius.
  pub max_km: Option<f64>,
}

/// Validated search radius: the query value or the configured default.
fn radius<S>(state: &ApiState<S>, max_km: Option<f64>) -> Result<f64, ApiError> {
  let max_km = max_km.unwrap_or(state.nearby_max_km);
  if !(max_km.is_finite() && max_km > 0.0) {
    return Err(ApiError::BadRequest("max_km must be a positive number".into()));
  }
  Ok(max_km)
}

// ─── Stops near a point ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LocateParams {
  pub lat:    f64,
  pub lon:    f64,
  pub max_km: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct NearbyStop {
  pub number:      String,
  pub route:       Option<i32>,
  pub location:    Location,
  pub distance_km: f64,
  pub cars_url:    String,
}

/// `GET /stops/nearby?lat=...&lon=...[&max_km=...]`: stops around a
/// position, nearest first.
pub async fn locate<S>(
  State(state): State<ApiState<S>>,
  Query(params): Query<LocateParams>,
) -> Result<Json<Vec<NearbyStop>>, ApiError>
where
  S: GameStore + ProximityIndex + 'static,
{
  if !((-90.0..=90.0).contains(&params.lat) && (-180.0..=180.0).contains(&params.lon)) {
    return Err(ApiError::BadRequest("lat/lon out of range".into()));
  }
  let max_km = radius(&state, params.max_km)?;
  let point = Location::new(params.lon, params.lat);

  let stops = state
    .store
    .find_stops_nearby(point, max_km)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;

  let nearby = stops
    .into_iter()
    .map(|stop| NearbyStop {
      distance_km: point.distance_km(&stop.location),
      cars_url:    state.url(&format!("/stops/{}/nearby", stop.number)),
      number:      stop.number,
      route:       stop.route,
      location:    stop.location,
    })
    .collect();
  Ok(Json(nearby))
}

// ─── Cars near a stop ─────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct NearbyCar {
  pub number:      u32,
  pub location:    Location,
  pub distance_km: f64,
  pub ride_url:    String,
}

/// `GET /stops/:number/nearby[?max_km=...]`: active cars on the stop's
/// route, nearest first.
pub async fn nearby<S>(
  State(state): State<ApiState<S>>,
  Path(number): Path<String>,
  Query(params): Query<NearbyParams>,
) -> Result<Json<Vec<NearbyCar>>, ApiError>
where
  S: GameStore + ProximityIndex + 'static,
{
  let stop = state
    .store
    .get_stop(&number)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("stop {number:?} not found")))?;
  let route = stop
    .route
    .ok_or_else(|| ApiError::BadRequest(format!("stop {number:?} has no route")))?;
  let max_km = radius(&state, params.max_km)?;

  let cars = state
    .store
    .find_nearby(route, stop.location, max_km)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;

  let nearby = cars
    .into_iter()
    .map(|car| NearbyCar {
      number:      car.number,
      location:    car.location,
      distance_km: stop.location.distance_km(&car.location),
      ride_url:    state.url(&format!("/cars/{}/ride", car.number)),
    })
    .collect();
  Ok(Json(nearby))
}
