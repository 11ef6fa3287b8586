use std::fmt;

use base64::prelude::{BASE64_STANDARD, Engine as _};
use secrecy::{ExposeSecret, SecretString};

/// Everything needed to talk to the issue tracker on behalf of the dashboard.
#[derive(Clone)]
pub struct Credentials {
    pub base_url: String,
    pub account: String,
    pub token: SecretString,
    pub jql: String,
    pub max_results: u32,
}

impl Credentials {
    pub fn auth_header(&self) -> String {
        let credentials = format!("{}:{}", self.account, self.token.expose_secret());
        let encoded = BASE64_STANDARD.encode(credentials);
        format!("Basic {encoded}")
    }

    /// Returns the name of the first field that is missing or still a
    /// placeholder value.
    pub fn invalid_field(&self) -> Option<&'static str> {
        if is_placeholder(&self.base_url) {
            Some("base URL")
        } else if is_placeholder(&self.account) {
            Some("email")
        } else if is_placeholder(self.token.expose_secret()) {
            Some("API token")
        } else {
            None
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("base_url", &self.base_url)
            .field("account", &self.account)
            .field("token", &"[REDACTED]")
            .field("jql", &self.jql)
            .field("max_results", &self.max_results)
            .finish()
    }
}

/// Template values such as `YOUR_EMAIL` or `your-api-token-here` count as unset.
pub fn is_placeholder(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || value.contains("YOUR_") || value.contains("your-")
}
