//! Login orchestration: authorize → login → consent → token exchange.

use crate::client::{FlowClient, LoginReply, RegistrationOutcome};
use crate::config::FlowConfig;
use crate::consent::ConsentRequest;
use crate::crypto::CredentialEncryptor;
use crate::error::{CredentialError, LoginFlowResult};
use crate::pkce::{PkceChallenge, generate_state};
use crate::state::{FlowStage, FlowState};
use crate::types::{
    AuthorizationRequest, LoginSubmission, RegistrationSubmission, TokenExchangeRequest,
    TokenResult,
};
use std::fmt;
use std::sync::Arc;
use tracing::{Instrument, error, info, info_span};

/// Email and plaintext password as entered by the user.
#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// How a completed login attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Authenticated(TokenResult),
    /// The backend refused the credentials. Start a new attempt to retry.
    InvalidCredentials(CredentialError),
}

/// Entry point for logins against one provider/backend pair.
///
/// Cheap to clone; clones share the HTTP connection pool and imported key.
#[derive(Debug, Clone)]
pub struct LoginFlow {
    config: Arc<FlowConfig>,
    client: FlowClient,
    encryptor: Arc<CredentialEncryptor>,
}

impl LoginFlow {
    pub fn new(config: FlowConfig) -> LoginFlowResult<Self> {
        config.validate()?;
        let encryptor = CredentialEncryptor::import_public_key(&config.public_key)?;
        let client = FlowClient::new(config.http_timeout_seconds)?;

        Ok(Self {
            config: Arc::new(config),
            client,
            encryptor: Arc::new(encryptor),
        })
    }

    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    /// Start a new attempt with freshly generated PKCE material and state.
    pub fn begin(&self) -> LoginAttempt<'_> {
        LoginAttempt {
            flow: self,
            pkce: PkceChallenge::generate(),
            oauth_state: generate_state(),
            state: FlowState::new(),
        }
    }

    /// Run a complete attempt.
    pub async fn login(&self, credentials: &Credentials) -> LoginFlowResult<LoginOutcome> {
        self.begin().run(credentials).await
    }

    pub async fn register(&self, credentials: &Credentials) -> LoginFlowResult<RegistrationOutcome> {
        // the backend decrypts both fields and compares them
        let password = self.encryptor.encrypt(&credentials.password)?;
        let submission = RegistrationSubmission {
            email: credentials.email.clone(),
            confirm_password: password.clone(),
            password,
        };

        self.client
            .register(&self.config.backend.register, &submission)
            .instrument(info_span!("register"))
            .await
    }

    pub async fn verify_account(&self, code: &str) -> LoginFlowResult<()> {
        self.client
            .verify_account(&self.config.backend.verify, code)
            .await
    }
}

/// One login attempt. Owns its PKCE verifier, `state` and [`FlowState`].
pub struct LoginAttempt<'a> {
    flow: &'a LoginFlow,
    pkce: PkceChallenge,
    oauth_state: String,
    state: FlowState,
}

impl LoginAttempt<'_> {
    pub fn state(&self) -> &FlowState {
        &self.state
    }

    pub fn into_state(self) -> FlowState {
        self.state
    }

    /// Drive the attempt to a terminal stage. Any error leaves the state in
    /// `FAILED`; calling `run` again fails without touching the network.
    pub async fn run(&mut self, credentials: &Credentials) -> LoginFlowResult<LoginOutcome> {
        let span = info_span!("login_attempt", attempt = %self.oauth_state);
        let result = self.drive(credentials).instrument(span).await;

        if let Err(e) = &result {
            error!(error = %e, stage = %self.state.stage(), "Login attempt failed");
            self.state.fail(e.to_string());
        }
        result
    }

    async fn drive(&mut self, credentials: &Credentials) -> LoginFlowResult<LoginOutcome> {
        self.state.expect_stage(FlowStage::Init)?;

        let flow = self.flow;
        let config = flow.config.as_ref();
        let authorize_endpoint = config.authorize_endpoint();

        // Stage 1: INIT -> AUTHORIZED
        let grant = flow
            .client
            .request_authorization(&AuthorizationRequest {
                authorize_endpoint: authorize_endpoint.clone(),
                client_id: config.client_id.clone(),
                redirect_uri: config.redirect_uri.clone(),
                scope: config.scope_param(),
                state: self.oauth_state.clone(),
                code_challenge: self.pkce.challenge().to_string(),
                code_challenge_method: self.pkce.method().to_string(),
            })
            .await?;
        let csrf_cookie = grant.csrf_cookie.clone();
        self.state
            .record_authorization(grant.login_challenge.clone(), grant.csrf_cookie)?;

        // Stage 2: AUTHORIZED -> CREDENTIALS_SUBMITTED
        let submission = LoginSubmission {
            email: credentials.email.clone(),
            password: flow.encryptor.encrypt(&credentials.password)?,
            login_challenge: grant.login_challenge,
        };
        let redirect_to = match flow
            .client
            .submit_login(&config.backend.login, &submission)
            .await?
        {
            LoginReply::Accepted { redirect_to } => redirect_to,
            LoginReply::Rejected(rejection) => {
                self.state.record_rejection()?;
                return Ok(LoginOutcome::InvalidCredentials(rejection));
            }
        };
        self.state.record_login(redirect_to.clone())?;

        // Stage 3: CREDENTIALS_SUBMITTED -> CONSENTED
        let consent = flow
            .client
            .complete_consent(ConsentRequest {
                authorize_endpoint: &authorize_endpoint,
                redirect_to: &redirect_to,
                csrf_cookie: &csrf_cookie,
                cookie_names: &config.cookies,
            })
            .await?;
        let code = consent.authorization_code.clone();
        self.state.record_consent(
            consent.authentication_session,
            consent.consent_cookie,
            consent.authorization_code,
        )?;

        // Stage 4: CONSENTED -> TOKEN_EXCHANGED
        let tokens = flow
            .client
            .exchange_token(
                &config.backend.token_exchange,
                &TokenExchangeRequest {
                    code,
                    redirect_uri: config.redirect_uri.clone(),
                    client_id: config.client_id.clone(),
                    code_verifier: self.pkce.verifier().to_string(),
                },
                &config.cookies,
            )
            .await?;
        self.state.record_tokens(&tokens)?;

        info!("Login complete");
        Ok(LoginOutcome::Authenticated(tokens))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_debug_redacts_password() {
        let credentials = Credentials::new("user@example.com", "hunter2");
        let debug = format!("{credentials:?}");

        assert!(debug.contains("user@example.com"));
        assert!(!debug.contains("hunter2"));
    }
}
