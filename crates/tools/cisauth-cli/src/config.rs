//! Runner configuration.
//!
//! Values are layered, later sources winning:
//! - defaults
//! - a TOML file (`cisauth.toml`, or the path in `CISAUTH_CONFIG_FILE`)
//! - nested environment variables, e.g. `CISAUTH__OAUTH__CLIENT_ID`
//! - the flat `CISAUTH_*` variables used by existing deployments

use anyhow::{Context, Result};
use cisauth_login_flow::{BackendEndpoints, Credentials, FlowConfig};
use config::{Config as ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub oauth: OAuthConfig,
    pub backend: BackendConfig,
    pub user: UserConfig,
    pub logging: LoggingConfig,
    /// Config file the values were read from, if one existed
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

/// Provider and client registration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuthConfig {
    /// Provider base URL; `/oauth2/auth` is appended
    pub url: String,
    pub client_id: String,
    pub redirect_uri: String,
    /// Base64 of the PEM public key used to encrypt passwords
    pub public_key: String,
    pub scopes: Vec<String>,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Identity backend base, e.g. `http://localhost:3000/user-service/v1`
    pub base_url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter string
    pub level: String,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:3000".to_string(),
            client_id: String::new(),
            redirect_uri: "http://localhost:3000/callback".to_string(),
            public_key: String::new(),
            scopes: vec!["offline_access".to_string(), "openid".to_string()],
            timeout_seconds: 30,
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000/user-service/v1".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load from the default file location and the process environment.
    pub fn load() -> Result<Self> {
        let config_path =
            std::env::var("CISAUTH_CONFIG_FILE").unwrap_or_else(|_| "cisauth.toml".to_string());
        Self::load_from(Path::new(&config_path), |key| std::env::var(key).ok())
    }

    /// Load from `config_path` (if it exists), nested `CISAUTH__` variables
    /// and the flat variables resolved through `lookup`.
    pub fn load_from<F>(config_path: &Path, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = ConfigBuilder::builder();

        let source = config_path.exists().then(|| config_path.to_path_buf());
        if let Some(path) = &source {
            builder = builder.add_source(File::from(path.as_path()));
        }

        builder = builder.add_source(
            Environment::with_prefix("CISAUTH")
                .separator("__")
                .list_separator(" ")
                .with_list_parse_key("oauth.scopes")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        let mut settings: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        settings.source = source;
        settings.apply_env_overrides(lookup)?;
        settings.validate()?;

        Ok(settings)
    }

    /// Flat variables shared with the deployment's `.env` files.
    fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("CISAUTH_OAUTH_URL") {
            self.oauth.url = url;
        }
        if let Some(client_id) = lookup("CISAUTH_UI_WEB_CLIENT_ID") {
            self.oauth.client_id = client_id;
        }
        if let Some(redirect_uri) = lookup("CISAUTH_OAUTH_REDIRECT_URI") {
            self.oauth.redirect_uri = redirect_uri;
        }
        if let Some(public_key) = lookup("CISAUTH_UI_WEB_PUBLIC_KEY") {
            self.oauth.public_key = public_key;
        }
        if let Some(email) = lookup("CISAUTH_USER_EMAIL") {
            self.user.email = Some(email);
        }
        if let Some(password) = lookup("CISAUTH_USER_PASSWORD") {
            self.user.password = Some(password);
        }
        if let Some(timeout) = lookup("CISAUTH_HTTP_TIMEOUT_SECONDS") {
            self.oauth.timeout_seconds = timeout
                .parse()
                .context("Invalid CISAUTH_HTTP_TIMEOUT_SECONDS value")?;
        }
        if let Some(log_level) = lookup("RUST_LOG") {
            self.logging.level = log_level;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.oauth.url.is_empty() {
            anyhow::bail!("OAuth URL is not set (CISAUTH_OAUTH_URL)");
        }
        if self.oauth.client_id.is_empty() {
            anyhow::bail!("OAuth client id is not set (CISAUTH_UI_WEB_CLIENT_ID)");
        }
        if self.oauth.redirect_uri.is_empty() {
            anyhow::bail!("OAuth redirect URI is not set (CISAUTH_OAUTH_REDIRECT_URI)");
        }
        if self.oauth.public_key.is_empty() {
            anyhow::bail!("Password encryption key is not set (CISAUTH_UI_WEB_PUBLIC_KEY)");
        }
        if self.oauth.timeout_seconds == 0 {
            anyhow::bail!("HTTP timeout must be positive");
        }
        if self.backend.base_url.is_empty() {
            anyhow::bail!("Backend base URL cannot be empty");
        }

        if !self.logging.level.contains('=') && !self.logging.level.contains(',') {
            let valid_levels = ["trace", "debug", "info", "warn", "error"];
            let level_lower = self.logging.level.to_lowercase();
            if !valid_levels.contains(&level_lower.as_str()) {
                anyhow::bail!(
                    "Invalid log level '{}'. Must be one of: {:?}",
                    self.logging.level,
                    valid_levels
                );
            }
        }

        Ok(())
    }

    pub fn flow_config(&self) -> FlowConfig {
        FlowConfig::new(
            self.oauth.url.clone(),
            self.oauth.client_id.clone(),
            self.oauth.redirect_uri.clone(),
            self.oauth.public_key.clone(),
            BackendEndpoints::from_base(&self.backend.base_url),
        )
        .with_scopes(self.oauth.scopes.iter().cloned())
        .with_http_timeout(self.oauth.timeout_seconds)
    }

    /// Configured user credentials, if both halves are present.
    pub fn credentials(&self) -> Option<Credentials> {
        self.credentials_with(None, None)
    }

    /// Credentials with `email` and `password` taking precedence over the
    /// configured values, field by field.
    pub fn credentials_with(
        &self,
        email: Option<&str>,
        password: Option<&str>,
    ) -> Option<Credentials> {
        let email = email.or(self.user.email.as_deref())?;
        let password = password.or(self.user.password.as_deref())?;
        Some(Credentials::new(email, password))
    }

    /// Get the log filter string for tracing
    pub fn log_filter(&self) -> String {
        if self.logging.level.contains('=') || self.logging.level.contains(',') {
            self.logging.level.clone()
        } else {
            format!(
                "cisauth_cli={},cisauth_login_flow={},warn",
                self.logging.level, self.logging.level
            )
        }
    }
}
