use std::sync::Arc;

use async_trait::async_trait;
use services::services::{
    config::{Config, ConfigError},
    events::EventService,
    workflow::WorkflowEngine,
};
use sqlx::Error as SqlxError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Sqlx(#[from] SqlxError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Everything the HTTP layer needs, behind one handle it can clone into
/// every request.
#[async_trait]
pub trait Deployment: Clone + Send + Sync + 'static {
    /// Build from the process environment. Fails when the bearer token is
    /// missing so the server never starts open.
    async fn new() -> Result<Self, DeploymentError>;

    fn config(&self) -> &Arc<Config>;

    fn events(&self) -> &EventService;

    fn workflow(&self) -> &WorkflowEngine;

    /// Number of live-update observers currently connected.
    fn observer_count(&self) -> usize {
        self.events().subscriber_count()
    }
}
