use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use tracing::info;

use crate::cache::TicketFeedConfig;
use crate::error::{AppError, AppResult};
use crate::infra::jira::{FallbackCredentials, GatewaySettings};

const DEFAULT_PORT: u16 = 3001;
const DEFAULT_ENVIRONMENT: &str = "development";
const DEFAULT_BASE_URL: &str = "https://YOUR_DOMAIN.atlassian.net";
const DEFAULT_JQL: &str = "project = SD AND status NOT IN (Done, Resolved, Closed) ORDER BY created DESC";
const DEFAULT_MAX_RESULTS: u32 = 15;
const DEFAULT_REFRESH_SECS: u64 = 300;
const DEFAULT_SECRETS_DIR: &str = "/run/secrets";
const DEFAULT_EMAIL_KEY: &str = "jira_email";
const DEFAULT_TOKEN_KEY: &str = "jira_token";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub environment: String,
    pub allowed_origins: Vec<String>,
    pub static_dir: Option<PathBuf>,
    pub ticket_snapshot: Option<PathBuf>,
    pub jira: JiraConfig,
    pub secrets: SecretsConfig,
}

#[derive(Debug, Clone)]
pub struct JiraConfig {
    pub base_url: String,
    pub jql: String,
    pub max_results: u32,
    pub refresh_interval: Duration,
    pub enabled: bool,
}

/// Where the tracker account and token are read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretBackend {
    /// One file per secret inside `SecretsConfig::dir`.
    File,
    /// `TEAMDASH_SECRET_<KEY>` environment variables.
    Env,
}

impl FromStr for SecretBackend {
    type Err = AppError;

    fn from_str(value: &str) -> AppResult<Self> {
        match value.trim().to_lowercase().as_str() {
            "file" => Ok(SecretBackend::File),
            "env" => Ok(SecretBackend::Env),
            other => Err(AppError::Configuration(format!(
                "unknown secret backend '{other}', expected 'file' or 'env'"
            ))),
        }
    }
}

#[derive(Clone)]
pub struct SecretsConfig {
    pub backend: SecretBackend,
    pub dir: PathBuf,
    pub email_key: String,
    pub token_key: String,
    pub env_email: Option<String>,
    pub env_token: Option<SecretString>,
}

impl std::fmt::Debug for SecretsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretsConfig")
            .field("backend", &self.backend)
            .field("dir", &self.dir)
            .field("email_key", &self.email_key)
            .field("token_key", &self.token_key)
            .field("env_email", &self.env_email)
            .field("env_token", &self.env_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl AppConfig {
    pub fn load() -> AppResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let allowed_origins = var("TEAMDASH_ALLOWED_ORIGINS")
            .map(|origins| {
                origins
                    .split(',')
                    .map(|origin| origin.trim().to_string())
                    .filter(|origin| !origin.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let jira = JiraConfig {
            base_url: var("JIRA_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            jql: var("JIRA_JQL").unwrap_or_else(|| DEFAULT_JQL.to_string()),
            max_results: parse_or("JIRA_MAX_RESULTS", var("JIRA_MAX_RESULTS"), DEFAULT_MAX_RESULTS)?,
            refresh_interval: Duration::from_secs(parse_or(
                "JIRA_REFRESH_INTERVAL_SECS",
                var("JIRA_REFRESH_INTERVAL_SECS"),
                DEFAULT_REFRESH_SECS,
            )?),
            enabled: parse_flag("JIRA_ENABLED", var("JIRA_ENABLED"), true)?,
        };

        let secrets = SecretsConfig {
            backend: match var("TEAMDASH_SECRET_BACKEND") {
                Some(raw) => raw.parse()?,
                None => SecretBackend::File,
            },
            dir: var("TEAMDASH_SECRETS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SECRETS_DIR)),
            email_key: var("TEAMDASH_SECRET_EMAIL_KEY")
                .unwrap_or_else(|| DEFAULT_EMAIL_KEY.to_string()),
            token_key: var("TEAMDASH_SECRET_TOKEN_KEY")
                .unwrap_or_else(|| DEFAULT_TOKEN_KEY.to_string()),
            env_email: var("JIRA_EMAIL"),
            env_token: var("JIRA_TOKEN").map(SecretString::from),
        };

        Ok(Self {
            port: parse_or("TEAMDASH_PORT", var("TEAMDASH_PORT"), DEFAULT_PORT)?,
            environment: var("TEAMDASH_ENV").unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string()),
            allowed_origins,
            static_dir: var("TEAMDASH_STATIC_DIR").map(PathBuf::from),
            ticket_snapshot: var("TEAMDASH_TICKET_SNAPSHOT").map(PathBuf::from),
            jira,
            secrets,
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    pub fn feed(&self) -> TicketFeedConfig {
        TicketFeedConfig {
            enabled: self.jira.enabled,
            base_url: self.jira.base_url.clone(),
            jql: self.jira.jql.clone(),
            max_results: self.jira.max_results,
            refresh_interval: self.jira.refresh_interval,
        }
    }

    pub fn gateway(&self) -> GatewaySettings {
        GatewaySettings {
            base_url: self.jira.base_url.clone(),
            jql: self.jira.jql.clone(),
            max_results: self.jira.max_results,
            email_key: self.secrets.email_key.clone(),
            token_key: self.secrets.token_key.clone(),
        }
    }

    /// Both `JIRA_EMAIL` and `JIRA_TOKEN` must be set for the fallback to apply.
    pub fn fallback_credentials(&self) -> Option<FallbackCredentials> {
        match (&self.secrets.env_email, &self.secrets.env_token) {
            (Some(account), Some(token)) => Some(FallbackCredentials {
                account: account.clone(),
                token: token.clone(),
            }),
            _ => None,
        }
    }
}

fn parse_or<T>(key: &str, value: Option<String>, default: T) -> AppResult<T>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|err| AppError::Configuration(format!("invalid {key} value '{raw}': {err}"))),
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}

fn parse_flag(key: &str, value: Option<String>, default: bool) -> AppResult<bool> {
    let Some(raw) = value else {
        return Ok(default);
    };
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(AppError::Configuration(format!(
            "invalid {key} value '{other}': expected true or false"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> AppResult<AppConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn applies_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.port, 3001);
        assert_eq!(config.environment, "development");
        assert!(!config.is_production());
        assert_eq!(config.jira.max_results, 15);
        assert_eq!(config.jira.refresh_interval, Duration::from_secs(300));
        assert!(config.jira.enabled);
        assert_eq!(config.secrets.backend, SecretBackend::File);
        assert_eq!(config.secrets.dir, PathBuf::from("/run/secrets"));
        assert!(config.fallback_credentials().is_none());
    }

    #[test]
    fn reads_overrides() {
        let config = load(&[
            ("TEAMDASH_PORT", "8080"),
            ("TEAMDASH_ENV", "production"),
            ("TEAMDASH_ALLOWED_ORIGINS", "https://a.example, https://b.example,"),
            ("JIRA_BASE_URL", "https://ops.atlassian.net"),
            ("JIRA_MAX_RESULTS", "25"),
            ("JIRA_REFRESH_INTERVAL_SECS", "0"),
            ("JIRA_ENABLED", "false"),
            ("TEAMDASH_SECRET_BACKEND", "env"),
            ("JIRA_EMAIL", "ops@example.com"),
            ("JIRA_TOKEN", "abc123"),
        ])
        .unwrap();

        assert_eq!(config.port, 8080);
        assert!(config.is_production());
        assert_eq!(
            config.allowed_origins,
            vec!["https://a.example", "https://b.example"]
        );
        assert_eq!(config.jira.base_url, "https://ops.atlassian.net");
        assert_eq!(config.jira.max_results, 25);
        assert!(config.jira.refresh_interval.is_zero());
        assert!(!config.feed().enabled);
        assert_eq!(config.secrets.backend, SecretBackend::Env);

        let fallback = config.fallback_credentials().unwrap();
        assert_eq!(fallback.account, "ops@example.com");
        assert_eq!(fallback.token.expose_secret(), "abc123");
    }

    #[test]
    fn rejects_invalid_numbers_and_flags() {
        let err = load(&[("TEAMDASH_PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("TEAMDASH_PORT"));

        let err = load(&[("JIRA_ENABLED", "maybe")]).unwrap_err();
        assert!(err.to_string().contains("JIRA_ENABLED"));

        let err = load(&[("TEAMDASH_SECRET_BACKEND", "vault")]).unwrap_err();
        assert!(err.to_string().contains("vault"));
    }

    #[test]
    fn debug_output_hides_env_token() {
        let config = load(&[("JIRA_TOKEN", "super-secret")]).unwrap();
        assert!(!format!("{config:?}").contains("super-secret"));
    }
}
