//! Authorization code exchange.

use crate::client::FlowClient;
use crate::config::CookieNames;
use crate::cookie::SetCookies;
use crate::error::{FlowStep, LoginFlowError, LoginFlowResult, ProtocolError};
use crate::types::{TokenExchangeRequest, TokenExchangeResponse, TokenResult};
use chrono::Utc;
use tracing::{error, info, warn};

impl FlowClient {
    /// Trade the authorization code and PKCE verifier for an access token.
    ///
    /// The session id travels in a cookie rather than the body.
    pub async fn exchange_token(
        &self,
        endpoint: &str,
        request: &TokenExchangeRequest,
        names: &CookieNames,
    ) -> LoginFlowResult<TokenResult> {
        let step = FlowStep::TokenExchange;
        let response = self
            .http()
            .post(endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| LoginFlowError::transport(step, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), "Token exchange failed");
            return Err(LoginFlowError::protocol(
                step,
                ProtocolError::TokenExchangeFailed {
                    status: status.as_u16(),
                    body,
                },
            ));
        }

        let cookies = SetCookies::from_headers(response.headers());
        let session_id = session_cookie(&cookies, names)
            .map_err(|e| LoginFlowError::protocol(step, e))?;

        let body: TokenExchangeResponse = response.json().await.map_err(|e| {
            LoginFlowError::protocol(step, ProtocolError::InvalidResponseBody(e.to_string()))
        })?;

        info!("Successfully exchanged code for tokens");
        Ok(TokenResult {
            access_token: body.access_token,
            session_id,
            expires_in: body.expires_in,
            expires_at: body.expires_at,
            received_at: Utc::now(),
        })
    }
}

/// Find the session cookie by name and check it sits where the backend is
/// known to put it.
fn session_cookie(cookies: &SetCookies, names: &CookieNames) -> Result<String, ProtocolError> {
    let (position, cookie) =
        cookies
            .position_of(&names.session)
            .ok_or_else(|| ProtocolError::MissingSessionCookie {
                name: names.session.clone(),
            })?;

    if let Some(expected) = names.session_position {
        if position != expected {
            warn!(
                cookie = %names.session,
                expected,
                actual = position,
                "Session cookie not at its usual position"
            );
        }
    }

    if cookie.value.is_empty() {
        return Err(ProtocolError::MissingSessionCookie {
            name: names.session.clone(),
        });
    }

    Ok(cookie.value.clone())
}
