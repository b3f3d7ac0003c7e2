//! Startup helpers for the events agent server.

use std::process::ExitCode;
use std::sync::Arc;

use crate::config::AgentConfig;
use crate::server::{self, AppState};

/// Install the global `tracing` subscriber, INFO unless `RUST_LOG` says otherwise.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .try_init();
}

/// Run the server (used by the `it-events-agent` binary).
///
/// # Returns
/// `ExitCode::SUCCESS` on graceful shutdown, `1` on failure.
#[must_use]
pub fn run() -> ExitCode {
    init_tracing();
    tracing::info!("Starting IT events agent v{}", env!("CARGO_PKG_VERSION"));

    let (state, port) = match initialize() {
        Ok(initialized) => initialized,
        Err(e) => {
            tracing::error!("Failed to create state: {e}");
            return ExitCode::from(1);
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to create runtime: {e}");
            return ExitCode::from(1);
        }
    };

    if let Err(e) = rt.block_on(server::run_server(state, port)) {
        tracing::error!("Server error: {e}");
        return ExitCode::from(1);
    }

    ExitCode::SUCCESS
}

/// Load config from the environment and build the application state without serving.
///
/// # Errors
/// Returns an error if the config is invalid or state creation fails.
pub fn initialize() -> Result<(Arc<AppState>, u16), Box<dyn std::error::Error + Send + Sync>> {
    let config = AgentConfig::from_env()?;
    tracing::info!(
        "Ollama endpoint: {}",
        config.llm.base_url.as_deref().unwrap_or("default (http://localhost:11434)")
    );
    tracing::info!("Model: {}", config.llm.model);

    let state = AppState::new(&config)?;
    Ok((state, config.port))
}
