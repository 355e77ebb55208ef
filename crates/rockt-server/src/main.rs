//! rockt server binary.
//!
//! Reads `config.toml` (or the path given with `--config`), opens the SQLite
//! store, optionally loads a seed file, and serves the JSON API over HTTP.
//!
//! ```
//! cargo run -p rockt-server --bin server -- --seed fleet.json
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use rockt_api::ApiState;
use rockt_server::{Seed, ServerConfig, apply_seed};
use rockt_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "rockt streetcar game server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// JSON file with users, stops, and cars to load before serving.
  #[arg(long)]
  seed: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("ROCKT"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;
  server_cfg.validate()?;

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  if let Some(path) = cli.seed {
    let raw = tokio::fs::read_to_string(&path)
      .await
      .with_context(|| format!("failed to read seed file {path:?}"))?;
    let seed: Seed = serde_json::from_str(&raw)
      .with_context(|| format!("invalid seed file {path:?}"))?;
    apply_seed(&store, seed).await?;
  }

  let state = ApiState {
    store:         Arc::new(store),
    rules:         Arc::new(server_cfg.rules),
    base_path:     server_cfg.base_path.as_str().into(),
    nearby_max_km: server_cfg.nearby_max_km,
  };

  let app = rockt_server::app(state);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!(base_path = %server_cfg.base_path, "Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
