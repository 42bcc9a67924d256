use std::future::Future;

use fileman_api::ApiServer;
use fileman_config::ServerConfig;
use fileman_fsops::{BatchLimits, FileManager, PathResolver};
use fileman_telemetry::{LoggingConfig, Metrics};
use tokio::signal;
use tracing::{error, info};

use crate::error::{AppError, AppResult};

/// Dependencies required to serve the file manager.
pub(crate) struct BootstrapDependencies {
    config: ServerConfig,
    telemetry: Metrics,
}

impl BootstrapDependencies {
    /// Construct production dependencies from the environment for the binary entrypoint.
    pub(crate) fn from_env() -> AppResult<Self> {
        let config =
            ServerConfig::from_env().map_err(|err| AppError::config("server_config.from_env", err))?;
        Self::new(config)
    }

    pub(crate) fn new(config: ServerConfig) -> AppResult<Self> {
        let telemetry =
            Metrics::new().map_err(|err| AppError::telemetry("telemetry.metrics", err))?;
        Ok(Self { config, telemetry })
    }
}

/// Entry point for the file manager boot sequence.
///
/// # Errors
///
/// Returns an error if configuration, logging setup, or serving fails.
pub async fn run_app() -> AppResult<()> {
    let dependencies = BootstrapDependencies::from_env()?;
    let logging = LoggingConfig {
        level: &dependencies.config.log_level,
        format: dependencies.config.log_format,
        ..LoggingConfig::default()
    };
    fileman_telemetry::init_logging(&logging)
        .map_err(|err| AppError::telemetry("telemetry.init", err))?;
    run_app_with(dependencies, shutdown_signal()).await
}

/// Boot sequence that relies entirely on injected dependencies to simplify testing.
pub(crate) async fn run_app_with<F>(dependencies: BootstrapDependencies, shutdown: F) -> AppResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let BootstrapDependencies { config, telemetry } = dependencies;
    info!(
        storage_root = %config.storage_root.display(),
        batch_concurrency = config.batch_concurrency,
        "file manager bootstrap starting"
    );

    let resolver = PathResolver::new(&config.storage_root)
        .map_err(|err| AppError::fsops("path_resolver.new", err))?;
    let limits = BatchLimits {
        max_in_flight: config.batch_concurrency,
        deadline: config.batch_timeout,
    };
    let files = FileManager::new(resolver, limits, telemetry.clone());
    let api = ApiServer::new(files, telemetry, config.upload_limit_bytes);

    let addr = config.socket_addr();
    info!(addr = %addr, "launching api listener");
    api.serve(addr, shutdown)
        .await
        .map_err(|err| AppError::api_server("api_server.serve", err))?;
    info!("api server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
