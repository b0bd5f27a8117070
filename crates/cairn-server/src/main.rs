//! cairn server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens an
//! in-process SQLite store, and serves the JSON:API surface over HTTP
//! under `/v1`.

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use axum::Router;
use cairn_api::Services;
use cairn_core::business::EntityType;
use cairn_store_sqlite::SqliteStore;
use clap::Parser;
use serde::Deserialize;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "cairn JSON:API server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[derive(Debug, Deserialize)]
struct ServerConfig {
  #[serde(default = "default_bind_addr")]
  bind_addr:  String,
  #[serde(default = "default_store_path")]
  store_path: String,
  /// Base used when generating document links; include the mount prefix.
  #[serde(default = "default_base_url")]
  base_url:   String,
}

fn default_bind_addr() -> String {
  "127.0.0.1:8002".to_owned()
}

fn default_store_path() -> String {
  "cairn.db".to_owned()
}

fn default_base_url() -> String {
  "http://127.0.0.1:8002/v1".to_owned()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration: TOML file, overridable via CAIRN_* env vars.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("CAIRN"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  // Open the SQLite store and hand one repository view per variant to the
  // API layer.
  let store = SqliteStore::open(&server_cfg.store_path)
    .await
    .with_context(|| {
      format!("failed to open store at {}", server_cfg.store_path)
    })?;

  let services = Arc::new(Services::new(
    server_cfg.base_url.clone(),
    store.repository(EntityType::User),
    store.repository(EntityType::Person),
    store.repository(EntityType::Account),
    store.repository(EntityType::Tag),
  ));

  let app = Router::new()
    .nest("/v1", cairn_api::api_router(services))
    .layer(TraceLayer::new_for_http());

  let listener = TcpListener::bind(&server_cfg.bind_addr)
    .await
    .with_context(|| format!("failed to bind {}", server_cfg.bind_addr))?;
  tracing::info!(addr = %server_cfg.bind_addr, "cairn API listening");

  axum::serve(listener, app).await?;
  Ok(())
}
