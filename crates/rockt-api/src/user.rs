//! Handlers for the acting user's `/user` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/user` | Balance and check-out link |
//! | `GET`  | `/user/cars` | Cars the user owns |
//! | `GET`  | `/user/cars/:number` | Ledgers of an owned car; 403 otherwise |
//! | `POST` | `/user/check_out` | Body: `{"stop":"..."}`; settles the ride |

use axum::{
  Json,
  extract::{FromRequestParts, Path, State},
  http::request::Parts,
};
use rockt_core::{
  fare::FareInfo,
  location::Location,
  store::{GameStore, ProximityIndex},
  user::{UserId, UserProfile},
};
use serde::{Deserialize, Serialize};

use crate::{ApiState, cars::RideBody, error::ApiError};

/// Header carrying the id of the authenticated user.
pub const USER_HEADER: &str = "x-rockt-user";

// ─── Extractor ────────────────────────────────────────────────────────────────

/// The user on whose behalf the request is made. Rejects with 403 when the
/// header is missing, malformed, or names no user.
pub struct CurrentUser(pub UserProfile);

impl<S> FromRequestParts<ApiState<S>> for CurrentUser
where
  S: GameStore + ProximityIndex + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &ApiState<S>,
  ) -> Result<Self, Self::Rejection> {
    let id = parts
      .headers
      .get(USER_HEADER)
      .and_then(|v| v.to_str().ok())
      .and_then(|s| s.trim().parse::<i64>().ok())
      .ok_or_else(|| ApiError::Forbidden("authentication required".into()))?;

    let user = state
      .store
      .get_user(UserId(id))
      .await
      .map_err(ApiError::from_store)?
      .ok_or_else(|| ApiError::Forbidden("authentication required".into()))?;
    Ok(CurrentUser(user))
  }
}

// ─── Me ───────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct UserBody {
  pub username:      String,
  pub balance:       i64,
  /// Where to settle the current ride; `null` unless checked in.
  pub check_out_url: Option<String>,
}

impl UserBody {
  pub fn new<S>(state: &ApiState<S>, user: UserProfile) -> Self {
    Self {
      check_out_url: user.riding.as_ref().map(|_| state.url("/user/check_out")),
      username:      user.username,
      balance:       user.balance,
    }
  }
}

/// `GET /user`
pub async fn me<S>(
  State(state): State<ApiState<S>>,
  CurrentUser(user): CurrentUser,
) -> Json<UserBody>
where
  S: GameStore + ProximityIndex + 'static,
{
  Json(UserBody::new(&state, user))
}

// ─── Owned cars ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct CarSummary {
  pub number:       u32,
  pub location:     Location,
  pub timeline_url: String,
  pub stats_url:    String,
}

/// `GET /user/cars`
pub async fn cars<S>(
  State(state): State<ApiState<S>>,
  CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<CarSummary>>, ApiError>
where
  S: GameStore + ProximityIndex + 'static,
{
  let cars = state
    .store
    .cars_owned_by(user.user_id)
    .await
    .map_err(ApiError::from_store)?;

  let summaries = cars
    .into_iter()
    .map(|car| CarSummary {
      number:       car.number,
      location:     car.location,
      timeline_url: state.url(&format!("/cars/{}/timeline", car.number)),
      stats_url:    state.url(&format!("/user/cars/{}", car.number)),
    })
    .collect();
  Ok(Json(summaries))
}

#[derive(Debug, Serialize)]
pub struct CarStats {
  pub number:       u32,
  pub route:        Option<i32>,
  pub active:       bool,
  pub location:     Location,
  pub owner_fares:  FareInfo,
  pub total_fares:  FareInfo,
  pub sell_car_url: String,
}

/// `GET /user/cars/:number`: only the owner may see a car's ledgers.
pub async fn car_stats<S>(
  State(state): State<ApiState<S>>,
  CurrentUser(user): CurrentUser,
  Path(number): Path<u32>,
) -> Result<Json<CarStats>, ApiError>
where
  S: GameStore + ProximityIndex + 'static,
{
  let car = state
    .store
    .get_car(number)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("car {number} not found")))?;

  if !car.is_owned_by(user.user_id) {
    return Err(ApiError::Forbidden(format!("you do not own car {number}")));
  }

  Ok(Json(CarStats {
    number:       car.number,
    route:        car.route,
    active:       car.active,
    location:     car.location,
    owner_fares:  car.owner_fares,
    total_fares:  car.total_fares,
    sell_car_url: state.url(&format!("/cars/{number}/sell")),
  }))
}

// ─── Check out ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CheckOutBody {
  pub stop: String,
}

/// `POST /user/check_out`: body: `{"stop":"04412"}`
pub async fn check_out<S>(
  State(state): State<ApiState<S>>,
  CurrentUser(user): CurrentUser,
  Json(body): Json<CheckOutBody>,
) -> Result<Json<RideBody>, ApiError>
where
  S: GameStore + ProximityIndex + 'static,
{
  let ride = state
    .store
    .check_out(user.user_id, &body.stop, state.rules.clone())
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(RideBody::from(ride)))
}
