use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::search::{IssueRecord, SearchResults};

pub const DEFAULT_PRIORITY: &str = "Medium";
pub const UNASSIGNED: &str = "Unassigned";
const UNKNOWN_STATUS: &str = "Unknown";
const DEFAULT_ISSUE_TYPE: &str = "Task";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub key: String,
    pub title: String,
    pub status: String,
    pub priority: String,
    pub assignee: String,
    pub updated: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(rename = "type", default = "default_issue_type")]
    pub issue_type: String,
    pub url: String,
}

fn default_issue_type() -> String {
    DEFAULT_ISSUE_TYPE.to_string()
}

impl Ticket {
    pub fn from_issue(issue: IssueRecord, base_url: &str) -> Self {
        let fields = issue.fields;
        let url = browse_url(base_url, &issue.key);

        Self {
            title: fields.summary.unwrap_or_default(),
            status: fields
                .status
                .map(|status| status.name)
                .unwrap_or_else(|| UNKNOWN_STATUS.to_string()),
            priority: fields
                .priority
                .map(|priority| priority.name)
                .unwrap_or_else(|| DEFAULT_PRIORITY.to_string()),
            assignee: fields
                .assignee
                .and_then(|assignee| assignee.display_name)
                .unwrap_or_else(|| UNASSIGNED.to_string()),
            updated: fields.updated.as_deref().map(date_part).unwrap_or_default(),
            created: fields.created.as_deref().map(date_part),
            issue_type: fields
                .issuetype
                .map(|issue_type| issue_type.name)
                .unwrap_or_else(default_issue_type),
            url,
            key: issue.key,
        }
    }
}

/// Where a collection handed to callers came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedSource {
    Live,
    Snapshot,
    Fallback,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketCollection {
    pub tickets: Vec<Ticket>,
    #[serde(default = "Utc::now")]
    pub fetched_at: DateTime<Utc>,
    #[serde(default = "snapshot_source")]
    pub source: FeedSource,
}

fn snapshot_source() -> FeedSource {
    FeedSource::Snapshot
}

impl TicketCollection {
    pub fn from_search(results: SearchResults, base_url: &str) -> Self {
        let tickets = results
            .issues
            .into_iter()
            .map(|issue| Ticket::from_issue(issue, base_url))
            .collect();

        Self {
            tickets,
            fetched_at: Utc::now(),
            source: FeedSource::Live,
        }
    }

    /// Single placeholder entry shown when nothing better is available.
    pub fn unavailable() -> Self {
        let now = Utc::now();
        Self {
            tickets: vec![Ticket {
                key: "INFRA-OFFLINE".to_string(),
                title: "Jira integration temporarily unavailable".to_string(),
                status: "Info".to_string(),
                priority: "Low".to_string(),
                assignee: "System".to_string(),
                updated: now.format("%Y-%m-%d").to_string(),
                created: None,
                issue_type: "System".to_string(),
                url: "#".to_string(),
            }],
            fetched_at: now,
            source: FeedSource::Fallback,
        }
    }

    pub fn len(&self) -> usize {
        self.tickets.len()
    }
}

pub fn browse_url(base_url: &str, key: &str) -> String {
    format!("{}/browse/{}", base_url.trim_end_matches('/'), key)
}

fn date_part(timestamp: &str) -> String {
    timestamp
        .split_once('T')
        .map(|(date, _)| date)
        .unwrap_or(timestamp)
        .to_string()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn issue(value: serde_json::Value) -> IssueRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn maps_complete_issue() {
        let ticket = Ticket::from_issue(
            issue(json!({
                "key": "SD-1",
                "fields": {
                    "summary": "VPN down",
                    "status": { "name": "In Progress" },
                    "priority": { "name": "High" },
                    "assignee": { "displayName": "Jo Park" },
                    "updated": "2024-03-02T10:15:00.000+0000",
                    "created": "2024-03-01T08:00:00.000+0000",
                    "issuetype": { "name": "Incident" }
                }
            })),
            "https://example.atlassian.net/",
        );

        assert_eq!(ticket.key, "SD-1");
        assert_eq!(ticket.title, "VPN down");
        assert_eq!(ticket.status, "In Progress");
        assert_eq!(ticket.priority, "High");
        assert_eq!(ticket.assignee, "Jo Park");
        assert_eq!(ticket.updated, "2024-03-02");
        assert_eq!(ticket.created.as_deref(), Some("2024-03-01"));
        assert_eq!(ticket.issue_type, "Incident");
        assert_eq!(ticket.url, "https://example.atlassian.net/browse/SD-1");
    }

    #[test]
    fn fills_defaults_for_missing_fields() {
        let ticket = Ticket::from_issue(
            issue(json!({
                "key": "SD-2",
                "fields": {
                    "summary": "Badge reader",
                    "status": { "name": "Open" },
                    "priority": null,
                    "assignee": null,
                    "updated": "2024-03-02T10:15:00.000+0000"
                }
            })),
            "https://example.atlassian.net",
        );

        assert_eq!(ticket.priority, DEFAULT_PRIORITY);
        assert_eq!(ticket.assignee, UNASSIGNED);
        assert_eq!(ticket.issue_type, "Task");
        assert!(ticket.created.is_none());
    }

    #[test]
    fn unavailable_collection_has_single_offline_entry() {
        let collection = TicketCollection::unavailable();
        assert_eq!(collection.len(), 1);
        assert_eq!(collection.tickets[0].key, "INFRA-OFFLINE");
        assert_eq!(collection.source, FeedSource::Fallback);
    }

    #[test]
    fn snapshot_files_default_their_source() {
        let collection: TicketCollection = serde_json::from_value(json!({
            "tickets": [{
                "key": "SD-7",
                "title": "Laptop refresh",
                "status": "Open",
                "priority": "Low",
                "assignee": "Unassigned",
                "updated": "2024-02-28",
                "url": "https://example.atlassian.net/browse/SD-7"
            }]
        }))
        .unwrap();

        assert_eq!(collection.source, FeedSource::Snapshot);
        assert_eq!(collection.tickets[0].issue_type, "Task");
    }
}
