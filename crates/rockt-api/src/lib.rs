//! JSON REST API for rockt.
//!
//! Exposes an axum [`Router`] backed by any store implementing
//! [`GameStore`] and [`ProximityIndex`]. Authentication is the caller's
//! responsibility: an outer layer is expected to establish who is asking and
//! forward it in the [`USER_HEADER`] header.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", rockt_api::api_router(state))
//! ```
//!
//! `base_path` in [`ApiState`] must match the mount point; it is used to
//! build the URLs embedded in responses.

pub mod cars;
pub mod error;
pub mod stops;
pub mod user;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use rockt_core::{
  rules::Rules,
  store::{GameStore, ProximityIndex},
};

pub use error::ApiError;
pub use user::{CurrentUser, USER_HEADER};

/// Shared state threaded through all handlers.
pub struct ApiState<S> {
  pub store:         Arc<S>,
  pub rules:         Arc<dyn Rules>,
  /// Mount point of the router, e.g. `"/api"`.
  pub base_path:     Arc<str>,
  /// Search radius for `/stops/{number}/nearby` when none is given.
  pub nearby_max_km: f64,
}

impl<S> Clone for ApiState<S> {
  fn clone(&self) -> Self {
    Self {
      store:         Arc::clone(&self.store),
      rules:         Arc::clone(&self.rules),
      base_path:     Arc::clone(&self.base_path),
      nearby_max_km: self.nearby_max_km,
    }
  }
}

impl<S> ApiState<S> {
  /// An absolute URL path under the router's mount point.
  pub fn url(&self, path: &str) -> String {
    format!("{}{path}", self.base_path.trim_end_matches('/'))
  }
}

/// Build a fully-materialised API router.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: ApiState<S>) -> Router<()>
where
  S: GameStore + ProximityIndex + 'static,
{
  Router::new()
    // Acting user
    .route("/user", get(user::me::<S>))
    .route("/user/cars", get(user::cars::<S>))
    .route("/user/cars/{number}", get(user::car_stats::<S>))
    .route("/user/check_out", post(user::check_out::<S>))
    // Cars
    .route("/cars", get(cars::list::<S>))
    .route("/cars/{number}", get(cars::get_one::<S>))
    .route("/cars/{number}/buy", post(cars::buy::<S>))
    .route("/cars/{number}/sell", post(cars::sell::<S>))
    .route("/cars/{number}/ride", post(cars::ride::<S>))
    .route("/cars/{number}/check_in", post(cars::check_in::<S>))
    .route("/cars/{number}/timeline", get(cars::timeline::<S>))
    // Stops
    .route("/stops/nearby", get(stops::locate::<S>))
    .route("/stops/{number}/nearby", get(stops::nearby::<S>))
    .with_state(state)
}

#[cfg(test)]
mod tests;
