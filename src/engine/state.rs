//! Session state threaded between cases

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// State key holding the session token
pub const TOKEN_KEY: &str = "token";
/// State key holding the session hash
pub const U_HASH_KEY: &str = "u_hash";
/// State key holding the authenticated user id
pub const U_ID_KEY: &str = "u_id";

/// Variables extracted from earlier responses, keyed by name
///
/// Written only by the authentication flow and by merging the delta a
/// successful case returns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionState {
    values: Map<String, Value>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    /// Apply a delta, later values overwriting earlier ones
    pub fn merge(&mut self, delta: &SessionState) {
        for (key, value) in &delta.values {
            self.values.insert(key.clone(), value.clone());
        }
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    /// Session token, if one is stored and non-empty
    pub fn token(&self) -> Option<&str> {
        self.non_empty_str(TOKEN_KEY)
    }

    /// Session hash, if one is stored and non-empty
    pub fn u_hash(&self) -> Option<&str> {
        self.non_empty_str(U_HASH_KEY)
    }

    fn non_empty_str(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }
}
