use std::sync::Arc;

use async_trait::async_trait;
use db::DBService;
use deployment::{Deployment, DeploymentError};
use services::services::{config::Config, events::EventService, workflow::WorkflowEngine};

/// Single-process deployment: one SQLite file and an in-memory fan-out.
#[derive(Clone)]
pub struct LocalDeployment {
    config: Arc<Config>,
    events: EventService,
    workflow: WorkflowEngine,
}

impl LocalDeployment {
    pub async fn from_config(config: Config) -> Result<Self, DeploymentError> {
        if let Some(parent) = config.db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let db = DBService::new(&config.db_path).await?;
        Ok(Self::from_parts(config, db))
    }

    /// Wire a deployment around an already-open store.
    pub fn from_parts(config: Config, db: DBService) -> Self {
        let events = EventService::new(config.event_buffer);
        let workflow = WorkflowEngine::new(db, events.clone());
        Self {
            config: Arc::new(config),
            events,
            workflow,
        }
    }
}

#[async_trait]
impl Deployment for LocalDeployment {
    async fn new() -> Result<Self, DeploymentError> {
        let config = Config::from_env()?;
        tracing::debug!(?config, "Loaded configuration");
        Self::from_config(config).await
    }

    fn config(&self) -> &Arc<Config> {
        &self.config
    }

    fn events(&self) -> &EventService {
        &self.events
    }

    fn workflow(&self) -> &WorkflowEngine {
        &self.workflow
    }
}

#[cfg(test)]
mod tests {
    use db::test_utils::setup_test_pool;
    use services::services::config::Config;

    use super::*;

    fn config() -> Config {
        Config::from_lookup(|name| match name {
            "MC_AUTH_TOKEN" => Some("secret".into()),
            "MC_DB_PATH" => Some("/unused.sqlite".into()),
            "MC_EVENT_BUFFER" => Some("8".into()),
            _ => None,
        })
        .expect("config")
    }

    #[tokio::test]
    async fn workflow_and_events_share_one_fan_out() {
        let deployment = LocalDeployment::from_parts(config(), DBService::from_pool(setup_test_pool().await));
        let _feed = deployment.workflow().subscribe();
        assert_eq!(deployment.observer_count(), 1);

        deployment.workflow().seed_demo(None).await.expect("seed");
        assert_eq!(deployment.config().event_buffer, 8);
    }
}
