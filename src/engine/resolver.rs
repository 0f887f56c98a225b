//! Variable substitution for `<name>` tokens
//!
//! `<name>` reads the session state; `<cfg_name>` reads the configuration
//! variables instead. Unknown names are left in place verbatim so a missing
//! prerequisite stays visible in the resolved request.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::{Map, Value};

use super::state::SessionState;
use super::value::template_string;

/// Prefix selecting the configuration variables as lookup source
pub const CONFIG_PREFIX: &str = "cfg_";

static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<([^>]+)>").expect("token pattern is valid"));

/// Substitute every `<name>` token in `template`
pub fn resolve(template: &str, state: &SessionState, config: &HashMap<String, String>) -> String {
    TOKEN_RE
        .replace_all(template, |caps: &Captures| {
            let name = &caps[1];
            let found = match name.strip_prefix(CONFIG_PREFIX) {
                Some(key) => config.get(key).cloned(),
                None => state.get(name).map(template_string),
            };
            found.unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Substitute tokens in every string field of a flat object
///
/// Non-string values are copied untouched.
pub fn resolve_object(
    object: &Map<String, Value>,
    state: &SessionState,
    config: &HashMap<String, String>,
) -> Map<String, Value> {
    object
        .iter()
        .map(|(key, value)| {
            let resolved = match value {
                Value::String(s) => Value::String(resolve(s, state, config)),
                other => other.clone(),
            };
            (key.clone(), resolved)
        })
        .collect()
}
