use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use db::DBService;
use deployment::{Deployment, DeploymentError};
use services::services::{
    config::{Config, load_config_from_file, save_config_to_file},
    events::EventService,
    presence::PresenceStore,
};
use tokio::sync::RwLock;
use utils::{assets::config_path, version::APP_VERSION};

#[derive(Clone)]
pub struct LocalDeployment {
    config: Arc<RwLock<Config>>,
    db: DBService,
    events: EventService,
    presence: PresenceStore,
}

#[async_trait]
impl Deployment for LocalDeployment {
    async fn new() -> Result<Self, DeploymentError> {
        let config = Self::load_runtime_config().await?;

        let presence = {
            let config = config.read().await;
            PresenceStore::new(Duration::from_secs(config.presence.idle_timeout_secs))
        };

        let db = DBService::new().await?;
        let events = EventService::new(db.clone(), presence.clone());

        Ok(Self {
            config,
            db,
            events,
            presence,
        })
    }

    fn config(&self) -> &Arc<RwLock<Config>> {
        &self.config
    }

    fn db(&self) -> &DBService {
        &self.db
    }

    fn events(&self) -> &EventService {
        &self.events
    }

    fn presence(&self) -> &PresenceStore {
        &self.presence
    }
}

impl LocalDeployment {
    async fn load_runtime_config() -> Result<Arc<RwLock<Config>>, DeploymentError> {
        let mut raw_config = load_config_from_file(&config_path()).await;
        Self::stamp_app_version(&mut raw_config, APP_VERSION);
        save_config_to_file(&raw_config, &config_path()).await?;
        Ok(Arc::new(RwLock::new(raw_config)))
    }

    fn stamp_app_version(config: &mut Config, current_version: &str) {
        if config.last_app_version.as_deref() != Some(current_version) {
            config.last_app_version = Some(current_version.to_string());
        }
    }

    pub async fn spawn_presence_sweeper(&self) -> tokio::task::JoinHandle<()> {
        let sweep_interval = {
            let config = self.config.read().await;
            Duration::from_secs(config.presence.sweep_interval_secs.max(1))
        };
        self.presence.spawn_sweeper(sweep_interval)
    }
}

#[cfg(test)]
mod tests {
    use services::services::config::Config;

    use super::LocalDeployment;

    #[test]
    fn stamp_app_version_updates_stale_version() {
        let mut config = Config {
            last_app_version: Some("0.0.1".to_string()),
            ..Config::default()
        };
        LocalDeployment::stamp_app_version(&mut config, "0.1.0");
        assert_eq!(config.last_app_version.as_deref(), Some("0.1.0"));
    }

    #[test]
    fn stamp_app_version_keeps_current_version() {
        let mut config = Config {
            last_app_version: Some("0.1.0".to_string()),
            ..Config::default()
        };
        LocalDeployment::stamp_app_version(&mut config, "0.1.0");
        assert_eq!(config.last_app_version.as_deref(), Some("0.1.0"));
    }
}
