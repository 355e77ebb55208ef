//! rockt HTTP server: configuration, fleet seeding, and router assembly.

use std::path::PathBuf;

use anyhow::Context as _;
use axum::Router;
use rockt_api::ApiState;
use rockt_core::{
  car::{CarPosition, NewCar},
  rules::StandardRules,
  stop::Stop,
  store::{GameStore, ProximityIndex},
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Server settings, read from `config.toml` and `ROCKT_*` variables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:          String,
  pub port:          u16,
  pub store_path:    PathBuf,
  /// Where the API is mounted; also used for URLs in responses.
  pub base_path:     String,
  pub nearby_max_km: f64,
  pub rules:         StandardRules,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:          "127.0.0.1".to_string(),
      port:          8080,
      store_path:    PathBuf::from("rockt.db"),
      base_path:     "/api".to_string(),
      nearby_max_km: 5.0,
      rules:         StandardRules::default(),
    }
  }
}

impl ServerConfig {
  /// Refuse settings the game cannot run with.
  pub fn validate(&self) -> anyhow::Result<()> {
    self.rules.validate().context("bad [rules] section")?;
    if !(self.nearby_max_km.is_finite() && self.nearby_max_km > 0.0) {
      anyhow::bail!("nearby_max_km must be positive, got {}", self.nearby_max_km);
    }
    Ok(())
  }
}

// ─── Seeding ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SeedUser {
  pub username: String,
  #[serde(default)]
  pub balance:  i64,
}

/// Initial fleet, stops, and accounts, loaded with `--seed`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Seed {
  pub users: Vec<SeedUser>,
  pub stops: Vec<Stop>,
  pub cars:  Vec<NewCar>,
}

/// Load `seed` into `store`.
///
/// Stops that already exist are left alone; cars that already exist have
/// their position updated. Users are always created, so a username that is
/// already taken is an error.
pub async fn apply_seed<S: GameStore>(store: &S, seed: Seed) -> anyhow::Result<()> {
  for user in seed.users {
    store
      .add_user(user.username.clone(), user.balance)
      .await
      .with_context(|| format!("failed to add user {:?}", user.username))?;
  }

  for stop in seed.stops {
    if store.get_stop(&stop.number).await?.is_some() {
      continue;
    }
    store.add_stop(stop).await?;
  }

  let mut moved = 0;
  let mut added = 0;
  for car in seed.cars {
    if store.get_car(car.number).await?.is_some() {
      let position = CarPosition {
        location: car.location,
        route:    car.route,
        active:   car.active,
      };
      store.update_car_position(car.number, position).await?;
      moved += 1;
    } else {
      store
        .add_car(car)
        .await
        .context("failed to add car")?;
      added += 1;
    }
  }

  tracing::info!(added, moved, "fleet seeded");
  Ok(())
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// The API mounted at `state.base_path`, with request tracing.
pub fn app<S>(state: ApiState<S>) -> Router
where
  S: GameStore + ProximityIndex + 'static,
{
  let base = state.base_path.trim_end_matches('/').to_string();
  let api = rockt_api::api_router(state);
  let router = if base.is_empty() {
    Router::new().merge(api)
  } else {
    Router::new().nest(&base, api)
  };
  router.layer(TraceLayer::new_for_http())
}
