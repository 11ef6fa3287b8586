use std::env;
use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use secrecy::SecretString;
use tracing::debug;

use crate::error::SecretError;
use crate::services::SecretSource;

/// Reads secrets mounted as files, one value per file (`/run/secrets/<name>`).
pub struct FileSecretSource {
    dir: PathBuf,
}

impl FileSecretSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl SecretSource for FileSecretSource {
    async fn fetch(&self, name: &str) -> Result<SecretString, SecretError> {
        let path = self.dir.join(name);
        debug!("Reading secret {name} from {}", path.display());

        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => {
                let value = contents.trim();
                if value.is_empty() {
                    return Err(SecretError::NotFound(name.to_string()));
                }
                Ok(SecretString::from(value.to_string()))
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Err(SecretError::NotFound(name.to_string()))
            }
            Err(err) if err.kind() == ErrorKind::PermissionDenied => {
                Err(SecretError::AccessDenied(name.to_string()))
            }
            Err(err) => Err(SecretError::Other {
                name: name.to_string(),
                message: err.to_string(),
            }),
        }
    }
}

/// Reads secrets from environment variables named `<prefix><NAME>`.
pub struct EnvSecretSource {
    prefix: String,
}

impl EnvSecretSource {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    fn variable(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name.to_uppercase())
    }
}

#[async_trait]
impl SecretSource for EnvSecretSource {
    async fn fetch(&self, name: &str) -> Result<SecretString, SecretError> {
        env::var(self.variable(name))
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(SecretString::from)
            .ok_or_else(|| SecretError::NotFound(name.to_string()))
    }
}
