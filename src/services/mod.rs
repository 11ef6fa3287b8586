pub mod issue_tracker;
pub mod secret_source;

pub use issue_tracker::IssueTracker;
pub use secret_source::SecretSource;
