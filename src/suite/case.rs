//! Suite and test case definitions
//!
//! Defines the data structures for deserializing YAML suite files.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::engine::Assertion;

/// A named, ordered collection of test cases
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Suite {
    pub id: u64,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub domain: String,
    /// Overrides the configured base URL for this suite's cases
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default)]
    pub sort: i64,
}

/// One HTTP call with its state extraction, validations and snapshots
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct TestCase {
    /// Unique within a suite file; 0 asks the repository to assign one
    #[serde(default)]
    pub id: u64,
    /// Owning suite id
    pub suite: u64,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Execution order within the suite
    #[serde(default)]
    pub sort: i64,
    #[serde(default = "default_method")]
    pub method: String,
    /// URL path template, may embed `<variable>` tokens
    pub url: String,
    /// JSON object template for request parameters, may embed tokens
    #[serde(default = "default_params", deserialize_with = "params_template")]
    pub params: String,
    /// Role/privilege marker sent as `u_a_role`, 0 for none
    #[serde(default)]
    pub role: u32,
    /// Case this one relies on, 0 for none; ordering comes from `sort`
    #[serde(default, skip_serializing_if = "is_zero")]
    pub depends_on: u64,
    /// Chain group label for display grouping
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub group: String,
    /// `{state_key: response.path}` written after a successful response
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub state_save: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validations: Vec<Assertion>,
    /// Auxiliary fetches made after the case completes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub snapshots: Vec<SnapshotRequest>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tags: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

/// An auxiliary read-only fetch for inspection
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct SnapshotRequest {
    pub label: String,
    #[serde(default = "default_method")]
    pub method: String,
    pub url: String,
    /// Flat parameter object; string values may embed tokens
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub params: Map<String, Value>,
}

fn default_method() -> String {
    "GET".to_string()
}

fn default_params() -> String {
    "{}".to_string()
}

fn default_active() -> bool {
    true
}

fn is_zero(n: &u64) -> bool {
    *n == 0
}

/// Accept `params` either as a JSON string or as an inline mapping
fn params_template<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Null => Ok(default_params()),
        other => serde_json::to_string(&other).map_err(serde::de::Error::custom),
    }
}

impl TestCase {
    /// Create a case with defaults for everything but the request line
    pub fn new(suite: u64, name: &str, method: &str, url: &str) -> Self {
        Self {
            id: 0,
            suite,
            name: name.to_string(),
            description: String::new(),
            sort: 0,
            method: method.to_string(),
            url: url.to_string(),
            params: default_params(),
            role: 0,
            depends_on: 0,
            group: String::new(),
            state_save: BTreeMap::new(),
            validations: Vec::new(),
            snapshots: Vec::new(),
            tags: String::new(),
            active: true,
        }
    }
}
