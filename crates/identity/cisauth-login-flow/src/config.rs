//! Login flow configuration types.

use crate::error::{LoginFlowError, LoginFlowResult};
use serde::{Deserialize, Serialize};
use url::Url;

/// Path of the provider's authorization endpoint under the OAuth base URL.
pub const AUTHORIZE_PATH: &str = "/oauth2/auth";

/// Everything one login attempt needs to know about its environment.
///
/// Passed to [`crate::LoginFlow::new`]; the flow never reads the process
/// environment itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowConfig {
    /// Base URL of the OAuth2 provider, e.g. `http://localhost:3000`
    pub oauth_base_url: String,
    pub client_id: String,
    pub redirect_uri: String,
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
    /// Backend password encryption key: base64 of a `PUBLIC KEY` PEM document
    pub public_key: String,
    pub backend: BackendEndpoints,
    #[serde(default)]
    pub cookies: CookieNames,
    #[serde(default = "default_http_timeout")]
    pub http_timeout_seconds: u64,
}

/// Identity backend endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendEndpoints {
    pub login: String,
    pub register: String,
    pub verify: String,
    pub token_exchange: String,
}

impl BackendEndpoints {
    /// Standard endpoint layout below a service base such as
    /// `http://localhost:3000/user-service/v1`.
    pub fn from_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            login: format!("{base}/login"),
            register: format!("{base}/register"),
            verify: format!("{base}/verify"),
            token_exchange: format!("{base}/token/exchange"),
        }
    }

    fn all(&self) -> [(&'static str, &str); 4] {
        [
            ("login", &self.login),
            ("register", &self.register),
            ("verify", &self.verify),
            ("token_exchange", &self.token_exchange),
        ]
    }
}

/// Names of the cookies the flow has to pick out of `Set-Cookie` headers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CookieNames {
    /// Prefix of the provider's authentication session cookie
    pub authentication_session_prefix: String,
    /// Prefix of the provider's consent CSRF cookie
    pub consent_prefix: String,
    /// Exact name of the backend session cookie set on token exchange
    pub session: String,
    /// Position the backend is expected to emit the session cookie at.
    /// Checked, never relied on.
    pub session_position: Option<usize>,
}

impl Default for CookieNames {
    fn default() -> Self {
        Self {
            authentication_session_prefix: "oauth2_authentication_session".to_string(),
            consent_prefix: "oauth2_consent_csrf".to_string(),
            session: "session".to_string(),
            // three CSRF clears and access_token precede it
            session_position: Some(4),
        }
    }
}

fn default_scopes() -> Vec<String> {
    vec!["offline_access".to_string(), "openid".to_string()]
}

fn default_http_timeout() -> u64 {
    30
}

impl FlowConfig {
    pub fn new(
        oauth_base_url: impl Into<String>,
        client_id: impl Into<String>,
        redirect_uri: impl Into<String>,
        public_key: impl Into<String>,
        backend: BackendEndpoints,
    ) -> Self {
        Self {
            oauth_base_url: oauth_base_url.into(),
            client_id: client_id.into(),
            redirect_uri: redirect_uri.into(),
            scopes: default_scopes(),
            public_key: public_key.into(),
            backend,
            cookies: CookieNames::default(),
            http_timeout_seconds: default_http_timeout(),
        }
    }

    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_cookie_names(mut self, cookies: CookieNames) -> Self {
        self.cookies = cookies;
        self
    }

    pub fn with_http_timeout(mut self, seconds: u64) -> Self {
        self.http_timeout_seconds = seconds;
        self
    }

    /// `{oauth_base_url}/oauth2/auth`
    pub fn authorize_endpoint(&self) -> String {
        format!(
            "{}{}",
            self.oauth_base_url.trim_end_matches('/'),
            AUTHORIZE_PATH
        )
    }

    /// Scopes as the space separated `scope` parameter.
    pub fn scope_param(&self) -> String {
        self.scopes.join(" ")
    }

    pub fn validate(&self) -> LoginFlowResult<()> {
        if self.client_id.trim().is_empty() {
            return Err(LoginFlowError::ConfigError(
                "client_id must not be empty".to_string(),
            ));
        }

        if self.scopes.is_empty() {
            return Err(LoginFlowError::ConfigError(
                "at least one scope is required".to_string(),
            ));
        }

        if self.http_timeout_seconds == 0 {
            return Err(LoginFlowError::ConfigError(
                "http_timeout_seconds must be positive".to_string(),
            ));
        }

        if self.cookies.session.is_empty() {
            return Err(LoginFlowError::ConfigError(
                "session cookie name must not be empty".to_string(),
            ));
        }

        let urls = [
            ("oauth_base_url", self.oauth_base_url.as_str()),
            ("redirect_uri", self.redirect_uri.as_str()),
        ];
        for (field, value) in urls.into_iter().chain(self.backend.all()) {
            Url::parse(value).map_err(|e| {
                LoginFlowError::ConfigError(format!("{field} is not a valid URL ({value}): {e}"))
            })?;
        }

        Ok(())
    }
}
