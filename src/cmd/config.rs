use clap::{Args, Subcommand};
use secrecy::{ExposeSecret, SecretString};

use crate::config::{AppConfig, SecretBackend};
use crate::error::AppResult;

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommand {
    /// Show the effective configuration (secrets masked).
    Show,
}

pub fn run(command: ConfigCommand) -> AppResult<()> {
    match command {
        ConfigCommand::Show => run_show(),
    }
}

fn run_show() -> AppResult<()> {
    let cfg = AppConfig::load()?;
    for (label, value) in describe(&cfg) {
        println!("{label}: {value}");
    }
    Ok(())
}

fn describe(cfg: &AppConfig) -> Vec<(&'static str, String)> {
    let secret_source = match cfg.secrets.backend {
        SecretBackend::File => format!("files in {}", cfg.secrets.dir.display()),
        SecretBackend::Env => "environment (TEAMDASH_SECRET_*)".to_string(),
    };

    vec![
        ("Port", cfg.port.to_string()),
        ("Environment", cfg.environment.clone()),
        ("Allowed origins", display_list(&cfg.allowed_origins)),
        (
            "Static directory",
            display_value(&cfg.static_dir.as_ref().map(|p| p.display().to_string())),
        ),
        (
            "Ticket snapshot",
            display_value(&cfg.ticket_snapshot.as_ref().map(|p| p.display().to_string())),
        ),
        ("Jira base URL", cfg.jira.base_url.clone()),
        ("Jira JQL", cfg.jira.jql.clone()),
        ("Jira max results", cfg.jira.max_results.to_string()),
        (
            "Refresh interval",
            format!("{}s", cfg.jira.refresh_interval.as_secs()),
        ),
        ("Ticket feed enabled", cfg.jira.enabled.to_string()),
        ("Secret source", secret_source),
        (
            "Secret keys",
            format!("{}, {}", cfg.secrets.email_key, cfg.secrets.token_key),
        ),
        ("Fallback Jira email", display_value(&cfg.secrets.env_email)),
        ("Fallback Jira token", mask_secret(&cfg.secrets.env_token)),
    ]
}

fn display_value(value: &Option<String>) -> String {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
        .unwrap_or_else(|| "<not set>".to_string())
}

fn display_list(values: &[String]) -> String {
    if values.is_empty() {
        "<not set>".to_string()
    } else {
        values.join(", ")
    }
}

fn mask_secret(value: &Option<SecretString>) -> String {
    match value.as_ref().map(|secret| secret.expose_secret()) {
        Some(token) if token.chars().count() > 6 => {
            let chars: Vec<char> = token.chars().collect();
            let prefix: String = chars[..3].iter().collect();
            let suffix: String = chars[chars.len() - 3..].iter().collect();
            format!("{prefix}***{suffix}")
        }
        Some(token) if !token.is_empty() => "***".to_string(),
        _ => "<not set>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_long_and_short_secrets() {
        let long = Some(SecretString::from("abcdef123456".to_string()));
        assert_eq!(mask_secret(&long), "abc***456");

        let short = Some(SecretString::from("abc".to_string()));
        assert_eq!(mask_secret(&short), "***");

        assert_eq!(mask_secret(&None), "<not set>");
    }

    #[test]
    fn description_never_contains_the_token() {
        let cfg = AppConfig::from_lookup(|key| match key {
            "JIRA_EMAIL" => Some("ops@example.com".to_string()),
            "JIRA_TOKEN" => Some("very-secret-token".to_string()),
            _ => None,
        })
        .unwrap();

        let lines = describe(&cfg);
        assert!(lines.iter().all(|(_, value)| !value.contains("very-secret-token")));
        assert!(
            lines
                .iter()
                .any(|(label, value)| *label == "Fallback Jira email" && value == "ops@example.com")
        );
    }
}
