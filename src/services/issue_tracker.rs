use async_trait::async_trait;

use crate::domain::search::{SearchQuery, SearchResults};
use crate::error::AppResult;

#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// Fails with a configuration error when credentials are missing or still
    /// placeholders.
    async fn check_credentials(&self) -> AppResult<()>;
    async fn search(&self, query: &SearchQuery) -> AppResult<SearchResults>;
}
