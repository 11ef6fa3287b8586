pub mod jira;
pub mod secrets;
