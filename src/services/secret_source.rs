use async_trait::async_trait;
use secrecy::SecretString;

use crate::error::SecretError;

/// A store of named secrets, e.g. a mounted secrets directory or a parameter store.
#[async_trait]
pub trait SecretSource: Send + Sync {
    async fn fetch(&self, name: &str) -> Result<SecretString, SecretError>;
}
