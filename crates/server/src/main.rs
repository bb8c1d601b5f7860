use anyhow::{Context, Error as AnyhowError};
use deployment::{Deployment, DeploymentError};
use mission_control::{DeploymentImpl, routes};
use thiserror::Error;
use tracing_subscriber::{EnvFilter, prelude::*};

#[derive(Debug, Error)]
pub enum MissionControlError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Deployment(#[from] DeploymentError),
    #[error(transparent)]
    Other(#[from] AnyhowError),
}

#[tokio::main]
async fn main() -> Result<(), MissionControlError> {
    // Pick up MC_AUTH_TOKEN and friends from `.env` during local development.
    dotenv::dotenv().ok();

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let filter_string = format!(
        "warn,mission_control={level},services={level},db={level},deployment={level},local_deployment={level},utils={level}",
        level = log_level
    );
    let env_filter = EnvFilter::try_new(filter_string).context("Failed to create tracing filter")?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(env_filter))
        .init();

    let deployment = match DeploymentImpl::new().await {
        Ok(deployment) => deployment,
        Err(e) => {
            tracing::error!("Refusing to start: {}", e);
            return Err(e.into());
        }
    };

    let config = deployment.config().clone();
    let app_router = routes::router(deployment);

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    let actual_port = listener.local_addr()?.port();
    tracing::info!(
        db = %config.db_path.display(),
        "Server running on http://{}:{}",
        config.host,
        actual_port
    );

    axum::serve(listener, app_router).await?;
    Ok(())
}
