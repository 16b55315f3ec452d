// Leanweb - Local Development Server

use std::net::SocketAddr;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use leanweb_auth::{AuthBackend, AuthConfig, LeanCloudResolver};
use leanweb_common::{Config, Environment};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;

    leanweb_app::init_tracing(&config);

    info!(env = %config.env, "Starting Leanweb server");

    let resolver = LeanCloudResolver::new(AuthConfig::from_config(&config)).map_err(|e| {
        error!("Failed to create session resolver: {}", e);
        anyhow::anyhow!("Session resolver setup failed: {}", e)
    })?;

    let views = leanweb_app::build_views(&config).map_err(|e| {
        error!("Failed to load views: {}", e);
        anyhow::anyhow!("View loading failed: {}", e)
    })?;

    let mut app = leanweb_app::create_app(&config, AuthBackend::from_resolver(resolver), views);
    if config.env != Environment::Production {
        app = app.layer(CorsLayer::permissive());
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    info!("Server starting on http://{}", addr);
    info!("Health check available at http://{}/health", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }
}
