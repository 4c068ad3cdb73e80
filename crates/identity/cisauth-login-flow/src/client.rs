//! HTTP client for the individual flow steps.
//!
//! Redirect following is disabled: every provider redirect is inspected by
//! hand so its `Location` and `Set-Cookie` headers can be carried into the
//! next request.

use crate::cookie::{CookiePair, SetCookies};
use crate::error::{CredentialError, FlowStep, LoginFlowError, LoginFlowResult, ProtocolError};
use crate::types::{
    AuthorizationGrant, AuthorizationRequest, BackendMessage, LoginSubmission, RedirectResponse,
    RegistrationSubmission,
};
use reqwest::header::LOCATION;
use reqwest::{Client, Response, StatusCode, redirect};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Outcome of submitting credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginReply {
    Accepted { redirect_to: String },
    Rejected(CredentialError),
}

/// Outcome of a registration request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    Created,
    /// The backend already knows this email
    AlreadyRegistered { message: String },
}

/// A provider redirect that was not followed.
#[derive(Debug, Clone)]
pub(crate) struct Redirect {
    pub location: Url,
    pub cookies: SetCookies,
}

#[derive(Debug, Clone)]
pub struct FlowClient {
    http_client: Client,
}

impl FlowClient {
    pub fn new(http_timeout_seconds: u64) -> LoginFlowResult<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(http_timeout_seconds))
            .redirect(redirect::Policy::none())
            .build()
            .map_err(|e| LoginFlowError::ConfigError(format!("HTTP client: {e}")))?;

        Ok(Self { http_client })
    }

    pub(crate) fn http(&self) -> &Client {
        &self.http_client
    }

    /// Issue the authorize request and read the login challenge off the
    /// provider's redirect.
    pub async fn request_authorization(
        &self,
        request: &AuthorizationRequest,
    ) -> LoginFlowResult<AuthorizationGrant> {
        let step = FlowStep::Authorize;
        let response = self
            .http_client
            .get(&request.authorize_endpoint)
            .query(&request.query())
            .send()
            .await
            .map_err(|e| LoginFlowError::transport(step, e))?;

        let redirect = expect_redirect(step, response).await?;

        let login_challenge = query_param(&redirect.location, "login_challenge")
            .ok_or_else(|| LoginFlowError::protocol(step, ProtocolError::MissingLoginChallenge))?;

        let csrf_cookie = redirect.cookies.first().cloned().ok_or_else(|| {
            LoginFlowError::protocol(
                step,
                ProtocolError::MissingSessionCookie {
                    name: "oauth2_authentication_csrf".to_string(),
                },
            )
        })?;

        debug!(cookie = %csrf_cookie.name, "Received login challenge");
        Ok(AuthorizationGrant {
            login_challenge,
            csrf_cookie,
        })
    }

    /// Post encrypted credentials to the backend login endpoint.
    pub async fn submit_login(
        &self,
        endpoint: &str,
        submission: &LoginSubmission,
    ) -> LoginFlowResult<LoginReply> {
        let step = FlowStep::SubmitLogin;
        let response = self
            .http_client
            .post(endpoint)
            .json(submission)
            .send()
            .await
            .map_err(|e| LoginFlowError::transport(step, e))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            let body = response.text().await.unwrap_or_default();
            let message = BackendMessage::from_body(&body)
                .text()
                .unwrap_or("invalid email or password")
                .to_string();
            info!("Backend rejected credentials");
            return Ok(LoginReply::Rejected(CredentialError { message }));
        }

        let body: RedirectResponse = expect_json(step, response).await?;
        Ok(LoginReply::Accepted {
            redirect_to: body.redirect_to,
        })
    }

    pub async fn register(
        &self,
        endpoint: &str,
        submission: &RegistrationSubmission,
    ) -> LoginFlowResult<RegistrationOutcome> {
        let step = FlowStep::Register;
        let response = self
            .http_client
            .post(endpoint)
            .json(submission)
            .send()
            .await
            .map_err(|e| LoginFlowError::transport(step, e))?;

        let status = response.status();
        if status.is_success() {
            info!("User registered");
            return Ok(RegistrationOutcome::Created);
        }

        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::UNPROCESSABLE_ENTITY {
            let message = BackendMessage::from_body(&body)
                .text()
                .unwrap_or("already registered")
                .to_string();
            warn!(%message, "Registration refused, user exists");
            return Ok(RegistrationOutcome::AlreadyRegistered { message });
        }

        Err(LoginFlowError::protocol(
            step,
            ProtocolError::UnexpectedStatus {
                status: status.as_u16(),
                body,
            },
        ))
    }

    pub async fn verify_account(&self, endpoint: &str, code: &str) -> LoginFlowResult<()> {
        let step = FlowStep::VerifyAccount;
        let response = self
            .http_client
            .get(endpoint)
            .query(&[("code", code)])
            .send()
            .await
            .map_err(|e| LoginFlowError::transport(step, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LoginFlowError::protocol(
                step,
                ProtocolError::UnexpectedStatus {
                    status: status.as_u16(),
                    body,
                },
            ));
        }

        info!("Account verified");
        Ok(())
    }
}

fn is_redirect(status: StatusCode) -> bool {
    status.is_redirection() && status != StatusCode::NOT_MODIFIED
}

/// Accept a 3xx response and resolve its `Location` against the request URL.
pub(crate) async fn expect_redirect(
    step: FlowStep,
    response: Response,
) -> LoginFlowResult<Redirect> {
    let status = response.status();
    if !is_redirect(status) {
        let body = response.text().await.unwrap_or_default();
        return Err(LoginFlowError::protocol(
            step,
            ProtocolError::UnexpectedStatus {
                status: status.as_u16(),
                body,
            },
        ));
    }

    let location = response
        .headers()
        .get(LOCATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| LoginFlowError::protocol(step, ProtocolError::MissingRedirectLocation))?;

    let location = response.url().join(location).map_err(|e| {
        LoginFlowError::protocol(step, ProtocolError::InvalidRedirect(e.to_string()))
    })?;

    if let Some(error) = query_param(&location, "error") {
        let description = query_param(&location, "error_description").unwrap_or_default();
        return Err(LoginFlowError::protocol(
            step,
            ProtocolError::ProviderRejected { error, description },
        ));
    }

    let cookies = SetCookies::from_headers(response.headers());
    debug!(%step, status = status.as_u16(), cookies = cookies.len(), "Captured redirect");

    Ok(Redirect { location, cookies })
}

/// Require a 2xx response and decode its JSON body.
pub(crate) async fn expect_json<T: DeserializeOwned>(
    step: FlowStep,
    response: Response,
) -> LoginFlowResult<T> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| LoginFlowError::transport(step, e))?;

    if !status.is_success() {
        return Err(LoginFlowError::protocol(
            step,
            ProtocolError::UnexpectedStatus {
                status: status.as_u16(),
                body,
            },
        ));
    }

    serde_json::from_str(&body).map_err(|e| {
        LoginFlowError::protocol(step, ProtocolError::InvalidResponseBody(e.to_string()))
    })
}

pub(crate) fn query_param(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}

/// `endpoint` with its query replaced by the query of `redirect_to`.
///
/// Provider redirects name the provider's public host, which the client may
/// not be able to reach directly; only their query is replayed.
pub(crate) fn replay_url(step: FlowStep, endpoint: &str, redirect_to: &str) -> LoginFlowResult<Url> {
    let invalid =
        |e: url::ParseError| LoginFlowError::protocol(step, ProtocolError::InvalidRedirect(e.to_string()));

    let redirect = Url::parse(redirect_to).map_err(invalid)?;
    let mut url = Url::parse(endpoint).map_err(invalid)?;
    url.set_query(redirect.query());
    Ok(url)
}

/// Provider cookie lookup by name prefix.
pub(crate) fn require_cookie(
    step: FlowStep,
    cookies: &SetCookies,
    prefix: &str,
) -> LoginFlowResult<CookiePair> {
    cookies.find_cookie_with_prefix(prefix).cloned().ok_or_else(|| {
        LoginFlowError::protocol(
            step,
            ProtocolError::MissingSessionCookie {
                name: prefix.to_string(),
            },
        )
    })
}
