use std::env;
#[cfg(feature = "openapi")]
use std::fs;
use std::path::PathBuf;

use anyhow::anyhow;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use voxcast::{ArtifactSweeper, ServerConfig, routes, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Handle CLI commands
    let mut args = env::args().skip(1);
    let mut config_path: Option<PathBuf> = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-c" | "--config" => {
                let path = args
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                config_path = Some(PathBuf::from(path));
            }
            #[cfg(feature = "openapi")]
            "openapi" => return export_openapi(args),
            other => {
                #[cfg(feature = "openapi")]
                {
                    anyhow::bail!(
                        "Unknown argument '{other}'. Usage: voxcast [--config <file.yaml>] | voxcast openapi [-f yaml|json] [-o file]"
                    );
                }
                #[cfg(not(feature = "openapi"))]
                {
                    anyhow::bail!("Unknown argument '{other}'. Usage: voxcast [--config <file.yaml>]");
                }
            }
        }
    }

    // Load configuration
    let config = match &config_path {
        Some(path) => ServerConfig::from_file(path),
        None => ServerConfig::from_env(),
    }
    .map_err(|e| anyhow!(e.to_string()))?;
    let address = config.address();
    info!("Starting server on {address}");

    // Create application state
    let app_state = AppState::new(config)
        .await
        .map_err(|e| anyhow!("Failed to initialize: {e}"))?;

    // Start the artifact sweeper
    let shutdown = CancellationToken::new();
    let sweeper = ArtifactSweeper::spawn(
        app_state.core_state.artifacts.clone(),
        app_state.config.artifact_ttl(),
        app_state.config.artifact_sweep_interval(),
        shutdown.clone(),
    );

    let core_state = app_state.core_state.clone();
    let app = routes::api::create_app(app_state);

    // Create listener
    let listener = TcpListener::bind(&address).await?;
    info!("Server listening on {address}");

    // Start server
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    shutdown.cancel();
    if let Err(e) = sweeper.await {
        tracing::warn!("Artifact sweeper ended abnormally: {e}");
    }
    if let Some(summary) = core_state.http_summary() {
        info!("Outbound HTTP: {summary}");
    }
    info!("Server stopped");

    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM and cancels background tasks.
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
    token.cancel();
}

#[cfg(feature = "openapi")]
fn export_openapi(mut args: impl Iterator<Item = String>) -> anyhow::Result<()> {
    let mut format = "yaml".to_string();
    let mut output: Option<PathBuf> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-f" | "--format" => {
                format = args
                    .next()
                    .ok_or_else(|| anyhow!("--format requires a value (yaml or json)"))?;
                if format != "yaml" && format != "json" {
                    anyhow::bail!("Invalid format '{}'. Must be 'yaml' or 'json'", format);
                }
            }
            "-o" | "--output" => {
                let path = args
                    .next()
                    .ok_or_else(|| anyhow!("--output requires a file path"))?;
                output = Some(PathBuf::from(path));
            }
            other => {
                anyhow::bail!(
                    "Unknown option '{}'. Use --format (yaml|json) or --output <file>",
                    other
                );
            }
        }
    }

    // Generate the spec in the requested format
    let spec_content = if format == "json" {
        voxcast::docs::openapi::spec_json()
            .map_err(|e| anyhow!("Failed to generate OpenAPI JSON: {}", e))?
    } else {
        voxcast::docs::openapi::spec_yaml()
            .map_err(|e| anyhow!("Failed to generate OpenAPI YAML: {}", e))?
    };

    // Write to file or stdout
    if let Some(output_path) = output {
        fs::write(&output_path, &spec_content)
            .map_err(|e| anyhow!("Failed to write to {}: {}", output_path.display(), e))?;
        println!("OpenAPI spec written to {}", output_path.display());
    } else {
        println!("{}", spec_content);
    }

    Ok(())
}
