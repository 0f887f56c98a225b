//! Configuration file handling

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use super::paths::config_path;
use super::Result;
use crate::engine::SessionState;

/// Main configuration structure
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// Target server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Credentials and authentication endpoints
    #[serde(default)]
    pub auth: AuthConfig,

    /// Run pacing and diagnostics settings
    #[serde(default)]
    pub run: RunConfig,
}

/// Target server settings
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Base URL prepended to every case URL (no trailing slash)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Upper bound for a single HTTP call
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost".to_string()
}
fn default_timeout() -> u64 {
    30
}
fn default_user_agent() -> String {
    concat!("apicase/", env!("CARGO_PKG_VERSION")).to_string()
}

/// Credentials and authentication endpoints
#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    #[serde(default)]
    pub login: String,

    #[serde(default)]
    pub password: String,

    /// Value of the `type` field sent with the credentials
    #[serde(default = "default_login_type")]
    pub login_type: String,

    /// Credential exchange endpoint, returns `auth_hash`
    #[serde(default = "default_auth_path")]
    pub auth_path: String,

    /// Token exchange endpoint, returns `token` and `u_hash`
    #[serde(default = "default_token_path")]
    pub token_path: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            login: String::new(),
            password: String::new(),
            login_type: default_login_type(),
            auth_path: default_auth_path(),
            token_path: default_token_path(),
        }
    }
}

fn default_login_type() -> String {
    "e-mail".to_string()
}
fn default_auth_path() -> String {
    "/auth/".to_string()
}
fn default_token_path() -> String {
    "/token".to_string()
}

/// Run pacing and diagnostics settings
#[derive(Debug, Deserialize, Clone)]
pub struct RunConfig {
    /// Delay between cases in auto mode
    #[serde(default = "default_pacing")]
    pub pacing_ms: u64,

    /// How much of a non-JSON body is kept in the error message
    #[serde(default = "default_raw_preview")]
    pub raw_preview_chars: usize,

    /// How much of a JSON value is shown as an assertion's actual value
    #[serde(default = "default_actual_preview")]
    pub actual_preview_chars: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            pacing_ms: default_pacing(),
            raw_preview_chars: default_raw_preview(),
            actual_preview_chars: default_actual_preview(),
        }
    }
}

fn default_pacing() -> u64 {
    180
}
fn default_raw_preview() -> usize {
    300
}
fn default_actual_preview() -> usize {
    60
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        match config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| super::Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        let mut config: Self =
            toml::from_str(&content).map_err(|e| super::Error::ConfigParse(e.to_string()))?;
        config.server.base_url = trim_base_url(&config.server.base_url);
        Ok(config)
    }

    /// Override the base URL, stripping any trailing slash
    pub fn set_base_url(&mut self, base_url: &str) {
        self.server.base_url = trim_base_url(base_url);
    }

    /// Values reachable through `<cfg_NAME>` tokens
    ///
    /// `token` and `u_hash` mirror the session so templates can refer to
    /// the current credentials explicitly.
    pub fn template_vars(&self, session: &SessionState) -> HashMap<String, String> {
        let mut vars = HashMap::new();
        vars.insert("baseUrl".to_string(), self.server.base_url.clone());
        vars.insert("login".to_string(), self.auth.login.clone());
        vars.insert("password".to_string(), self.auth.password.clone());
        vars.insert(
            "token".to_string(),
            session.token().unwrap_or_default().to_string(),
        );
        vars.insert(
            "u_hash".to_string(),
            session.u_hash().unwrap_or_default().to_string(),
        );
        vars
    }
}

fn trim_base_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_when_sections_missing() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.timeout_secs, 30);
        assert_eq!(config.auth.auth_path, "/auth/");
        assert_eq!(config.run.pacing_ms, 180);
    }

    #[test]
    fn test_load_from_file_trims_base_url() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[server]\nbase_url = \"https://api.example.test/v1/\"\n\n[run]\npacing_ms = 0\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.server.base_url, "https://api.example.test/v1");
        assert_eq!(config.run.pacing_ms, 0);
        assert_eq!(config.run.raw_preview_chars, 300);
    }

    #[test]
    fn test_invalid_toml_is_config_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, super::super::Error::ConfigParse(_)));
    }

    #[test]
    fn test_template_vars_mirror_session_credentials() {
        let mut config = Config::default();
        config.set_base_url("http://api.test/");
        let mut session = SessionState::new();
        session.insert("token", json!("tok"));

        let vars = config.template_vars(&session);
        assert_eq!(vars["baseUrl"], "http://api.test");
        assert_eq!(vars["token"], "tok");
        assert_eq!(vars["u_hash"], "");
    }
}
