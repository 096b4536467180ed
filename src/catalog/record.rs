// src/catalog/record.rs
// =============================================================================
// A manifest as stored in the catalog: the repository's own JSON object with
// two attributes added by the crawler.
//
//   repo      "{account}/{lowercased repository name}"
//   platform  the link-stripped repository summary
//
// The record serializes as that plain object, so the catalog file is just a
// list of decorated manifests.
// =============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::github::RepositorySummary;

pub const REPO_KEY: &str = "repo";
pub const PLATFORM_KEY: &str = "platform";

// The record itself
//
// #[serde(transparent)] makes the newtype (de)serialize exactly like the map
// inside it: no wrapper object in the catalog file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ManifestRecord(Map<String, Value>);

impl ManifestRecord {
    /// Decorates a decoded manifest. Any `repo` or `platform` attribute the
    /// manifest brought along is overwritten.
    pub fn new(mut manifest: Map<String, Value>, account: &str, summary: &RepositorySummary) -> Self {
        manifest.insert(
            REPO_KEY.to_string(),
            Value::String(format!("{}/{}", account, summary.lowercase_name())),
        );
        manifest.insert(
            PLATFORM_KEY.to_string(),
            Value::Object(summary.metadata.clone()),
        );
        Self(manifest)
    }

    /// The `account/name` key, if the record has one.
    pub fn repo(&self) -> Option<&str> {
        self.0.get(REPO_KEY).and_then(Value::as_str)
    }

    /// The account segment of the `repo` key.
    pub fn account(&self) -> Option<&str> {
        // text before the first slash, so "alice" never matches "alicia/x"
        self.repo().and_then(|repo| repo.split('/').next())
    }

    pub fn belongs_to(&self, account: &str) -> bool {
        self.account() == Some(account)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn summary(name: &str) -> RepositorySummary {
        RepositorySummary::from_item(&json!({
            "name": name,
            "size": 10,
            "html_url": "https://github.com/alice/x",
            "stargazers_count": 1
        }))
        .unwrap()
    }

    #[test]
    fn test_new_decorates_manifest() {
        let manifest = json!({ "name": "x", "repo": "bogus" });
        let record = ManifestRecord::new(
            manifest.as_object().unwrap().clone(),
            "alice",
            &summary("X"),
        );
        assert_eq!(record.repo(), Some("alice/x"));
        assert_eq!(record.account(), Some("alice"));
        assert!(record.belongs_to("alice"));
        assert!(!record.belongs_to("ali"));
        assert_eq!(
            record.get("platform"),
            Some(&json!({ "name": "X", "size": 10, "stargazers_count": 1 }))
        );
    }

    #[test]
    fn test_serializes_as_plain_object() {
        let record = ManifestRecord::new(Map::new(), "bob", &summary("lib"));
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["repo"], "bob/lib");
        let back: ManifestRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_record_without_repo_has_no_account() {
        let record: ManifestRecord = serde_json::from_value(json!({ "name": "orphan" })).unwrap();
        assert_eq!(record.account(), None);
        assert!(!record.belongs_to("orphan"));
    }
}
