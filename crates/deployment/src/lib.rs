use std::sync::Arc;

use async_trait::async_trait;
use db::{DBService, DbErr};
use services::services::{
    config::{Config, ConfigError},
    events::EventService,
    presence::PresenceStore,
};
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Service container: everything the HTTP and realtime layers need, wired up
/// once at process start. The presence store lives here so its lifecycle is
/// explicit and an alternative backing (say, a shared cache when running more
/// than one instance) can be swapped in behind the same accessor.
#[async_trait]
pub trait Deployment: Clone + Send + Sync + 'static {
    async fn new() -> Result<Self, DeploymentError>;

    fn config(&self) -> &Arc<RwLock<Config>>;

    fn db(&self) -> &DBService;

    fn events(&self) -> &EventService;

    fn presence(&self) -> &PresenceStore;

    async fn shutdown(&self) {
        self.presence().clear();
    }
}
