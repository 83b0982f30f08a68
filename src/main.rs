//! Math practice backend server.
//!
//! - Axum HTTP API under `/api/...`
//! - Optional generative model (OpenAI-compatible chat completions)
//!
//! Important env variables:
//!   PORT                 : u16 (default 3000)
//!   MODEL_API_KEY        : enables the model (fallbacks: GEMINI_API_KEY, GOOGLE_API_KEY, OPENAI_API_KEY)
//!   MODEL_BASE_URL       : default Gemini's OpenAI-compatible endpoint
//!   MODEL_NAME           : default "gemini-2.0-flash"
//!   MODEL_TIMEOUT_SECS   : bound on every model call (default 30)
//!   PROMPTS_CONFIG_PATH  : path to TOML prompt overrides
//!   LOG_LEVEL            : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT           : "pretty" (default), "compact" or "json"

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{error, info};

use mathpractice_backend::config::AppConfig;
use mathpractice_backend::routes::build_router;
use mathpractice_backend::state::AppState;
use mathpractice_backend::telemetry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Configuration is resolved once here and passed down by reference.
  let config = AppConfig::from_env();
  let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

  let state = Arc::new(AppState::from_config(config)?);
  let app = build_router(state);

  let listener = TcpListener::bind(addr).await?;
  info!(target: "mathpractice_backend", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  info!(target: "mathpractice_backend", "Server stopped");
  Ok(())
}

async fn shutdown_signal() {
  match tokio::signal::ctrl_c().await {
    Ok(()) => info!(target: "mathpractice_backend", "Shutdown signal received"),
    Err(e) => error!(target: "mathpractice_backend", error = %e, "Failed to listen for shutdown signal"),
  }
}
