// src/github/types.rs
// =============================================================================
// Repository summaries as returned by the search endpoint.
//
// Search items carry dozens of hypermedia fields (`url`, `html_url`,
// `avatar_url`, ...) that point back into the API. They are noise for the
// catalog, so every item is stripped of them, at every depth, before anything
// else looks at it. The stripped object is kept whole as `metadata` and ends
// up embedded in the catalog record under `platform`.
// =============================================================================

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::CrawlError;

/// Suffix marking a hyperlink field. A key is a link when it equals the
/// suffix itself or ends in `_url`.
const LINK_SUFFIX: &str = "url";

fn is_link_key(key: &str) -> bool {
    key == LINK_SUFFIX
        || key
            .strip_suffix(LINK_SUFFIX)
            .is_some_and(|rest| rest.ends_with('_'))
}

/// Returns a copy of `value` with every link field removed, recursing into
/// nested objects and arrays. The input is left untouched.
pub fn strip_link_fields(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(key, _)| !is_link_key(key))
                .map(|(key, val)| (key.clone(), strip_link_fields(val)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(strip_link_fields).collect()),
        scalar => scalar.clone(),  // strings, numbers, bools, null
    }
}

// The handful of fields the crawler actually reads. Everything else stays in
// the untyped metadata map.
#[derive(Debug, Deserialize)]
struct SummaryFields {
    name: String,
    #[serde(default)]
    owner: Option<OwnerFields>,
    #[serde(default)]
    default_branch: Option<String>,
    #[serde(default)]  // missing size reads as 0, i.e. bare
    size: u64,
    #[serde(default)]
    has_issues: bool,
    #[serde(default)]
    private: bool,
}

#[derive(Debug, Deserialize)]
struct OwnerFields {
    login: String,
}

/// One item of a repository search page, already stripped of link fields.
#[derive(Debug, Clone, PartialEq)]
pub struct RepositorySummary {
    pub owner: Option<String>,
    pub name: String,
    pub default_branch: Option<String>,
    /// Repository size in KB as reported by the platform; 0 means bare.
    pub size: u64,
    pub has_issues: bool,
    pub private: bool,
    /// The full stripped item, typed fields included.
    pub metadata: Map<String, Value>,
}

impl RepositorySummary {
    /// Strips a raw search item and extracts the typed fields from it.
    pub fn from_item(item: &Value) -> Result<Self, CrawlError> {
        let stripped = strip_link_fields(item);
        // &Value implements serde's Deserializer, so the typed view is read
        // straight from the tree without cloning it
        let fields = SummaryFields::deserialize(&stripped)
            .map_err(|e| CrawlError::Decode(format!("invalid repository item: {e}")))?;
        let Value::Object(metadata) = stripped else {
            return Err(CrawlError::Decode("repository item is not an object".into()));
        };

        Ok(Self {
            owner: fields.owner.map(|o| o.login),
            name: fields.name,
            default_branch: fields.default_branch,
            size: fields.size,
            has_issues: fields.has_issues,
            private: fields.private,
            metadata,
        })
    }

    /// The repository name as used in raw-content URLs and record keys.
    pub fn lowercase_name(&self) -> String {
        self.name.to_lowercase()
    }
}
