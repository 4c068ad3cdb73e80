//! Consent leg of the flow: accept-login redirect, consent fetch and the
//! consent-accept redirect that finally carries the authorization code.

use crate::client::{
    FlowClient, expect_json, expect_redirect, query_param, replay_url, require_cookie,
};
use crate::config::CookieNames;
use crate::cookie::{CookiePair, cookie_header};
use crate::error::{FlowStep, LoginFlowError, LoginFlowResult, ProtocolError};
use crate::types::RedirectResponse;
use reqwest::header::COOKIE;
use tracing::debug;
use url::Url;

/// Cookies and code collected while walking the consent redirects.
#[derive(Debug, Clone)]
pub struct ConsentGrant {
    pub authentication_session: CookiePair,
    pub consent_cookie: CookiePair,
    pub authorization_code: String,
}

/// Inputs of the consent leg.
#[derive(Debug, Clone, Copy)]
pub struct ConsentRequest<'a> {
    pub authorize_endpoint: &'a str,
    /// `redirect_to` returned by the login endpoint
    pub redirect_to: &'a str,
    pub csrf_cookie: &'a CookiePair,
    pub cookie_names: &'a CookieNames,
}

impl FlowClient {
    /// Walk the three consent requests in order. Each request depends on the
    /// cookies or redirect target produced by the one before it.
    pub async fn complete_consent(
        &self,
        request: ConsentRequest<'_>,
    ) -> LoginFlowResult<ConsentGrant> {
        let (consent_url, authentication_session, consent_cookie) = self
            .accept_login(
                request.authorize_endpoint,
                request.redirect_to,
                request.csrf_cookie,
                request.cookie_names,
            )
            .await?;

        let cookies = cookie_header([&authentication_session, &consent_cookie]);

        let accept_redirect = self.fetch_consent(consent_url, &cookies).await?;

        let authorization_code = self
            .accept_consent(request.authorize_endpoint, &accept_redirect, &cookies)
            .await?;

        Ok(ConsentGrant {
            authentication_session,
            consent_cookie,
            authorization_code,
        })
    }

    /// Replay the post-login redirect with the CSRF cookie. The provider
    /// answers with the consent URL and its two session cookies.
    async fn accept_login(
        &self,
        authorize_endpoint: &str,
        redirect_to: &str,
        csrf_cookie: &CookiePair,
        names: &CookieNames,
    ) -> LoginFlowResult<(Url, CookiePair, CookiePair)> {
        let step = FlowStep::AcceptLogin;
        let url = replay_url(step, authorize_endpoint, redirect_to)?;

        let response = self
            .http()
            .get(url)
            .header(COOKIE, cookie_header([csrf_cookie]))
            .send()
            .await
            .map_err(|e| LoginFlowError::transport(step, e))?;

        let redirect = expect_redirect(step, response).await?;
        let authentication_session =
            require_cookie(step, &redirect.cookies, &names.authentication_session_prefix)?;
        let consent_cookie = require_cookie(step, &redirect.cookies, &names.consent_prefix)?;

        debug!(
            authentication = %authentication_session.name,
            consent = %consent_cookie.name,
            "Login accepted by provider"
        );
        Ok((redirect.location, authentication_session, consent_cookie))
    }

    /// Ask the backend to accept consent; returns the provider URL to replay.
    async fn fetch_consent(&self, consent_url: Url, cookies: &str) -> LoginFlowResult<String> {
        let step = FlowStep::FetchConsent;
        let response = self
            .http()
            .get(consent_url)
            .header(COOKIE, cookies)
            .send()
            .await
            .map_err(|e| LoginFlowError::transport(step, e))?;

        let body: RedirectResponse = expect_json(step, response).await?;
        debug!("Consent accepted by backend");
        Ok(body.redirect_to)
    }

    async fn accept_consent(
        &self,
        authorize_endpoint: &str,
        redirect_to: &str,
        cookies: &str,
    ) -> LoginFlowResult<String> {
        let step = FlowStep::AcceptConsent;
        let url = replay_url(step, authorize_endpoint, redirect_to)?;

        let response = self
            .http()
            .get(url)
            .header(COOKIE, cookies)
            .send()
            .await
            .map_err(|e| LoginFlowError::transport(step, e))?;

        let redirect = expect_redirect(step, response).await?;
        query_param(&redirect.location, "code")
            .ok_or_else(|| LoginFlowError::protocol(step, ProtocolError::MissingAuthorizationCode))
    }
}
