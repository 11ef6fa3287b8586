use std::sync::Arc;

use crate::cache::{TicketCache, load_snapshot};
use crate::config::{AppConfig, SecretBackend};
use crate::error::AppResult;
use crate::infra::jira::JiraGateway;
use crate::infra::secrets::{EnvSecretSource, FileSecretSource};
use crate::services::SecretSource;

const ENV_SECRET_PREFIX: &str = "TEAMDASH_SECRET_";

/// Owns the long-lived services shared by the HTTP routes and the refresh task.
#[derive(Clone)]
pub struct AppContext {
    pub config: AppConfig,
    pub gateway: Arc<JiraGateway>,
    pub tickets: TicketCache,
}

impl AppContext {
    pub fn new(config: AppConfig, gateway: Arc<JiraGateway>, tickets: TicketCache) -> Self {
        Self {
            config,
            gateway,
            tickets,
        }
    }

    /// Wires the gateway to the configured secret source and the ticket cache
    /// to the gateway.
    pub fn from_config(config: AppConfig) -> AppResult<Self> {
        let secrets: Arc<dyn SecretSource> = match config.secrets.backend {
            SecretBackend::File => Arc::new(FileSecretSource::new(&config.secrets.dir)),
            SecretBackend::Env => Arc::new(EnvSecretSource::new(ENV_SECRET_PREFIX)),
        };
        let gateway = Arc::new(JiraGateway::new(
            config.gateway(),
            secrets,
            config.fallback_credentials(),
        ));

        let snapshot = match &config.ticket_snapshot {
            Some(path) => load_snapshot(path)?,
            None => None,
        };
        let tickets = TicketCache::new(gateway.clone(), config.feed(), snapshot);

        Ok(Self::new(config, gateway, tickets))
    }
}
