//! Two-step authentication exchange
//!
//! Credentials are exchanged for an intermediate `auth_hash`, which is then
//! exchanged for the session `token` and `u_hash`. Both responses use the
//! ordinary `{code, data, message}` envelope.

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use super::normalizer::{normalize, parse_body};
use super::state::{SessionState, TOKEN_KEY, U_HASH_KEY, U_ID_KEY};
use super::value::lookup_path;
use crate::common::config::AuthConfig;
use crate::common::{Error, Result};
use crate::transport::{encode_form, HttpRequest, Transport};

/// Performs the login exchange and stores credentials in session state
pub struct Authenticator {
    transport: Arc<dyn Transport>,
    config: AuthConfig,
    raw_preview_chars: usize,
}

impl Authenticator {
    pub fn new(transport: Arc<dyn Transport>, config: AuthConfig, raw_preview_chars: usize) -> Self {
        Self {
            transport,
            config,
            raw_preview_chars,
        }
    }

    /// Log in against `base_url`, writing `token`, `u_hash` and `u_id`
    ///
    /// On any failure the session state is cleared.
    pub async fn login(&self, base_url: &str, session: &mut SessionState) -> Result<()> {
        match self.exchange(base_url).await {
            Ok(credentials) => {
                session.merge(&credentials);
                info!(
                    user_id = %credentials.get(U_ID_KEY).map(serde_json::Value::to_string).unwrap_or_default(),
                    "Authenticated"
                );
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Authentication failed");
                session.clear();
                Err(e)
            }
        }
    }

    async fn exchange(&self, base_url: &str) -> Result<SessionState> {
        if self.config.login.is_empty() || self.config.password.is_empty() {
            return Err(Error::AuthFailed(
                "login and password must be configured".to_string(),
            ));
        }

        let first = self
            .post(
                base_url,
                &self.config.auth_path,
                &[
                    ("login", self.config.login.as_str()),
                    ("type", self.config.login_type.as_str()),
                    ("password", self.config.password.as_str()),
                ],
                "auth",
            )
            .await?;
        let auth_hash = non_empty_str(&first, "auth_hash")
            .or_else(|| non_empty_str(&first, "data.auth_hash"))
            .ok_or_else(|| Error::AuthFailed("auth response carries no auth_hash".to_string()))?
            .to_string();

        let second = self
            .post(
                base_url,
                &self.config.token_path,
                &[("auth_hash", auth_hash.as_str())],
                "token",
            )
            .await?;
        let token = non_empty_str(&second, "data.token")
            .ok_or_else(|| Error::AuthFailed("token response carries no token".to_string()))?;

        let mut credentials = SessionState::new();
        credentials.insert(TOKEN_KEY, Value::String(token.to_string()));
        if let Some(u_hash) = lookup_path(&second, "data.u_hash") {
            credentials.insert(U_HASH_KEY, u_hash.clone());
        }
        let u_id = lookup_path(&second, "data.u_id")
            .or_else(|| lookup_path(&second, "auth_user.u_id"))
            .cloned()
            .unwrap_or(Value::Null);
        credentials.insert(U_ID_KEY, u_id);
        Ok(credentials)
    }

    /// POST a form and return the parsed body of a successful envelope
    async fn post(
        &self,
        base_url: &str,
        path: &str,
        fields: &[(&str, &str)],
        context: &str,
    ) -> Result<Value> {
        let request = HttpRequest::form(
            "POST",
            format!("{}{}", base_url, path),
            encode_form(fields.iter().copied()),
        );
        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| Error::AuthFailed(e.to_string()))?;
        let body = parse_body(&response.text, context, self.raw_preview_chars)
            .map_err(Error::AuthFailed)?;

        let outcome = normalize(&body, context);
        if !outcome.ok {
            return Err(Error::AuthFailed(
                outcome
                    .error_text
                    .unwrap_or_else(|| format!("{} step rejected", context)),
            ));
        }
        Ok(body)
    }
}

fn non_empty_str<'a>(body: &'a Value, path: &str) -> Option<&'a str> {
    lookup_path(body, path)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ScriptedTransport;
    use serde_json::json;

    fn authenticator(transport: &Arc<ScriptedTransport>) -> Authenticator {
        let config = AuthConfig {
            login: "qa@example.test".to_string(),
            password: "secret".to_string(),
            ..AuthConfig::default()
        };
        Authenticator::new(transport.clone(), config, 100)
    }

    #[tokio::test]
    async fn test_login_stores_credentials() {
        let transport = Arc::new(ScriptedTransport::new());
        transport
            .push_json(200, json!({"code": "200", "auth_hash": "h1"}))
            .push_json(
                200,
                json!({"code": "200", "data": {"token": "tok", "u_hash": "uh", "u_id": 12}}),
            );

        let mut session = SessionState::new();
        authenticator(&transport)
            .login("http://api.test", &mut session)
            .await
            .unwrap();

        assert_eq!(session.token(), Some("tok"));
        assert_eq!(session.u_hash(), Some("uh"));
        assert_eq!(session.get("u_id"), Some(&json!(12)));

        let requests = transport.requests();
        assert_eq!(requests[0].url, "http://api.test/auth/");
        assert_eq!(
            requests[0].body.as_deref(),
            Some("login=qa%40example.test&type=e-mail&password=secret")
        );
        assert_eq!(requests[1].url, "http://api.test/token");
        assert_eq!(requests[1].body.as_deref(), Some("auth_hash=h1"));
    }

    #[tokio::test]
    async fn test_user_id_falls_back_to_auth_user() {
        let transport = Arc::new(ScriptedTransport::new());
        transport
            .push_json(200, json!({"code": "200", "data": {"auth_hash": "h1"}}))
            .push_json(
                200,
                json!({"code": "200", "data": {"token": "tok"}, "auth_user": {"u_id": 3}}),
            );

        let mut session = SessionState::new();
        authenticator(&transport)
            .login("http://api.test", &mut session)
            .await
            .unwrap();
        assert_eq!(session.get("u_id"), Some(&json!(3)));
    }

    #[tokio::test]
    async fn test_rejected_credentials_clear_state() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_json(200, json!({"code": "401", "message": "wrong password"}));

        let mut session = SessionState::new();
        session.insert("b_id", json!(1));
        let err = authenticator(&transport)
            .login("http://api.test", &mut session)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::AuthFailed(ref m) if m == "wrong password"));
        assert!(session.is_empty());
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_token_is_failure() {
        let transport = Arc::new(ScriptedTransport::new());
        transport
            .push_json(200, json!({"code": "200", "auth_hash": "h1"}))
            .push_json(200, json!({"code": "200", "data": {}}));

        let mut session = SessionState::new();
        let err = authenticator(&transport)
            .login("http://api.test", &mut session)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no token"));
    }

    #[tokio::test]
    async fn test_missing_credentials_skip_network() {
        let transport = Arc::new(ScriptedTransport::new());
        let auth = Authenticator::new(transport.clone(), AuthConfig::default(), 100);

        let mut session = SessionState::new();
        assert!(auth.login("http://api.test", &mut session).await.is_err());
        assert!(transport.requests().is_empty());
    }
}
