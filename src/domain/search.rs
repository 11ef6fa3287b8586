//! Issue-search request parameters and the subset of the search response the
//! dashboard reads.

use serde::Deserialize;

pub const SEARCH_PATH: &str = "rest/api/3/search";
pub const SEARCH_FIELDS: &str = "key,summary,status,priority,assignee,updated,created,issuetype";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub jql: String,
    pub max_results: u32,
}

impl SearchQuery {
    pub fn new(jql: impl Into<String>, max_results: u32) -> Self {
        Self {
            jql: jql.into(),
            max_results,
        }
    }

    pub fn params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("jql", self.jql.clone()),
            ("maxResults", self.max_results.to_string()),
            ("fields", SEARCH_FIELDS.to_string()),
        ]
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResults {
    #[serde(default)]
    pub issues: Vec<IssueRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssueRecord {
    pub key: String,
    #[serde(default)]
    pub fields: IssueFields,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IssueFields {
    pub summary: Option<String>,
    pub status: Option<NamedField>,
    pub priority: Option<NamedField>,
    pub assignee: Option<Assignee>,
    pub updated: Option<String>,
    pub created: Option<String>,
    pub issuetype: Option<NamedField>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamedField {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignee {
    pub display_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_params_carry_fields_list() {
        let query = SearchQuery::new("project = SD", 15);
        let params = query.params();
        assert_eq!(params[0], ("jql", "project = SD".to_string()));
        assert_eq!(params[1], ("maxResults", "15".to_string()));
        assert_eq!(params[2].1, SEARCH_FIELDS);
    }

    #[test]
    fn decodes_sparse_issue() {
        let results: SearchResults = serde_json::from_value(serde_json::json!({
            "issues": [
                { "key": "SD-9", "fields": { "summary": "Printer on fire", "assignee": null } }
            ]
        }))
        .unwrap();

        let issue = &results.issues[0];
        assert_eq!(issue.key, "SD-9");
        assert_eq!(issue.fields.summary.as_deref(), Some("Printer on fire"));
        assert!(issue.fields.assignee.is_none());
        assert!(issue.fields.priority.is_none());
    }
}
