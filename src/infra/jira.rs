use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    Client,
    header::{ACCEPT, AUTHORIZATION, USER_AGENT},
};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::domain::credentials::Credentials;
use crate::domain::search::{SEARCH_PATH, SearchQuery, SearchResults};
use crate::error::{AppError, AppResult};
use crate::services::{IssueTracker, SecretSource};

pub const CREDENTIAL_TTL: Duration = Duration::from_secs(5 * 60);
pub const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);

const CLIENT_AGENT: &str = concat!("teamdash/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub base_url: String,
    pub jql: String,
    pub max_results: u32,
    pub email_key: String,
    pub token_key: String,
}

/// Account and token supplied through the process environment, used when the
/// secret source cannot be read.
#[derive(Clone)]
pub struct FallbackCredentials {
    pub account: String,
    pub token: SecretString,
}

#[derive(Debug, Clone)]
pub struct ProxyResponse {
    pub status: u16,
    pub body: Value,
}

struct CachedCredentials {
    credentials: Credentials,
    loaded_at: Instant,
}

/// Bridges dashboard queries to the issue tracker, injecting credentials the
/// caller never sees.
pub struct JiraGateway {
    http: Client,
    settings: GatewaySettings,
    secrets: Arc<dyn SecretSource>,
    env_fallback: Option<FallbackCredentials>,
    cached: Mutex<Option<CachedCredentials>>,
    timeout: Duration,
}

impl JiraGateway {
    pub fn new(
        settings: GatewaySettings,
        secrets: Arc<dyn SecretSource>,
        env_fallback: Option<FallbackCredentials>,
    ) -> Self {
        Self {
            http: Client::new(),
            settings,
            secrets,
            env_fallback,
            cached: Mutex::new(None),
            timeout: UPSTREAM_TIMEOUT,
        }
    }

    #[cfg(test)]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn resolve_credentials(&self) -> AppResult<Credentials> {
        let mut cached = self.cached.lock().await;
        if let Some(entry) = cached.as_ref() {
            if entry.loaded_at.elapsed() < CREDENTIAL_TTL {
                return Ok(entry.credentials.clone());
            }
        }

        info!("Fetching issue tracker credentials from secret source...");
        match self.load_from_source().await {
            Ok(credentials) => {
                *cached = Some(CachedCredentials {
                    credentials: credentials.clone(),
                    loaded_at: Instant::now(),
                });
                info!("Issue tracker credentials loaded successfully");
                Ok(credentials)
            }
            Err(err) => {
                error!("Error loading issue tracker credentials: {err}");
                match &self.env_fallback {
                    Some(fallback) => {
                        warn!("Using fallback environment variables for issue tracker credentials");
                        Ok(self.credentials(fallback.account.clone(), fallback.token.clone()))
                    }
                    None => Err(AppError::Configuration(
                        "unable to load issue tracker credentials from the secret source or environment"
                            .to_string(),
                    )),
                }
            }
        }
    }

    /// Relays `GET <base_url>/<path>?<raw_query>` and hands back the upstream
    /// status and JSON body unchanged.
    pub async fn forward(&self, path: &str, raw_query: Option<&str>) -> AppResult<ProxyResponse> {
        self.execute(path, raw_query, &[]).await
    }

    async fn load_from_source(&self) -> AppResult<Credentials> {
        let (account, token) = tokio::try_join!(
            self.secrets.fetch(&self.settings.email_key),
            self.secrets.fetch(&self.settings.token_key),
        )?;

        Ok(self.credentials(account.expose_secret().to_string(), token))
    }

    fn credentials(&self, account: String, token: SecretString) -> Credentials {
        Credentials {
            base_url: self.settings.base_url.clone(),
            account,
            token,
            jql: self.settings.jql.clone(),
            max_results: self.settings.max_results,
        }
    }

    async fn execute(
        &self,
        path: &str,
        raw_query: Option<&str>,
        params: &[(&str, String)],
    ) -> AppResult<ProxyResponse> {
        let credentials = self.resolve_credentials().await?;
        let url = upstream_url(&credentials.base_url, path, raw_query);
        info!("Proxying request to: {url}");

        let request = self
            .http
            .get(&url)
            .query(params)
            .header(AUTHORIZATION, credentials.auth_header())
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, CLIENT_AGENT);

        let exchange = async {
            let response = request.send().await?;
            let status = response.status();
            let bytes = response.bytes().await?;
            Ok::<_, reqwest::Error>((status, bytes))
        };

        let (status, bytes) = match tokio::time::timeout(self.timeout, exchange).await {
            Ok(Ok(parts)) => parts,
            Ok(Err(err)) => {
                error!("Error proxying to issue tracker: {err}");
                return Err(AppError::Transport(err.to_string()));
            }
            Err(_) => {
                warn!("Issue tracker request timed out after {:?}", self.timeout);
                return Err(AppError::Timeout(self.timeout));
            }
        };

        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).map_err(|err| {
                AppError::Decode(format!("upstream returned non-JSON body ({status}): {err}"))
            })?
        };

        Ok(ProxyResponse {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl IssueTracker for JiraGateway {
    async fn check_credentials(&self) -> AppResult<()> {
        let credentials = self.resolve_credentials().await?;
        match credentials.invalid_field() {
            Some(field) => Err(AppError::Configuration(format!(
                "issue tracker {field} is missing or a placeholder"
            ))),
            None => Ok(()),
        }
    }

    async fn search(&self, query: &SearchQuery) -> AppResult<SearchResults> {
        let mut query = query.clone();
        if query.jql.trim().is_empty() {
            query.jql = self.settings.jql.clone();
        }
        if query.max_results == 0 {
            query.max_results = self.settings.max_results;
        }

        let response = self.execute(SEARCH_PATH, None, &query.params()).await?;
        if !(200..300).contains(&response.status) {
            return Err(AppError::UpstreamStatus {
                status: response.status,
                body: response.body.to_string(),
            });
        }

        serde_json::from_value(response.body)
            .map_err(|err| AppError::Decode(format!("invalid search response: {err}")))
    }
}

fn upstream_url(base_url: &str, path: &str, raw_query: Option<&str>) -> String {
    let mut url = format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    if let Some(query) = raw_query.filter(|query| !query.is_empty()) {
        url.push('?');
        url.push_str(query);
    }
    url
}
