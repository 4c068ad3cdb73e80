//! Per-attempt flow state.
//!
//! A [`FlowState`] belongs to exactly one login attempt. Each stage
//! transition checks the current stage and fills its fields once; nothing
//! recorded by an earlier stage is ever overwritten.

use crate::cookie::CookiePair;
use crate::error::{LoginFlowError, LoginFlowResult};
use crate::types::TokenResult;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowStage {
    Init,
    Authorized,
    CredentialsSubmitted,
    Consented,
    TokenExchanged,
    /// Backend rejected the credentials; the attempt is over
    Rejected,
    Failed(String),
}

impl FlowStage {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            FlowStage::TokenExchanged | FlowStage::Rejected | FlowStage::Failed(_)
        )
    }
}

impl fmt::Display for FlowStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowStage::Init => write!(f, "INIT"),
            FlowStage::Authorized => write!(f, "AUTHORIZED"),
            FlowStage::CredentialsSubmitted => write!(f, "CREDENTIALS_SUBMITTED"),
            FlowStage::Consented => write!(f, "CONSENTED"),
            FlowStage::TokenExchanged => write!(f, "TOKEN_EXCHANGED"),
            FlowStage::Rejected => write!(f, "REJECTED"),
            FlowStage::Failed(reason) => write!(f, "FAILED({reason})"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FlowState {
    stage: FlowStage,
    login_challenge: Option<String>,
    authentication_cookie: Option<CookiePair>,
    redirect_to: Option<String>,
    authentication_session: Option<CookiePair>,
    consent_cookie: Option<CookiePair>,
    authorization_code: Option<String>,
    access_token: Option<String>,
    session_id: Option<String>,
    expires_in: Option<i64>,
    expires_at: Option<String>,
}

impl Default for FlowState {
    fn default() -> Self {
        Self::new()
    }
}

impl FlowState {
    pub fn new() -> Self {
        Self {
            stage: FlowStage::Init,
            login_challenge: None,
            authentication_cookie: None,
            redirect_to: None,
            authentication_session: None,
            consent_cookie: None,
            authorization_code: None,
            access_token: None,
            session_id: None,
            expires_in: None,
            expires_at: None,
        }
    }

    pub fn stage(&self) -> &FlowStage {
        &self.stage
    }

    pub fn login_challenge(&self) -> Option<&str> {
        self.login_challenge.as_deref()
    }

    /// CSRF cookie issued by the authorize redirect.
    pub fn authentication_cookie(&self) -> Option<&CookiePair> {
        self.authentication_cookie.as_ref()
    }

    pub fn redirect_to(&self) -> Option<&str> {
        self.redirect_to.as_deref()
    }

    pub fn authentication_session(&self) -> Option<&CookiePair> {
        self.authentication_session.as_ref()
    }

    pub fn consent_cookie(&self) -> Option<&CookiePair> {
        self.consent_cookie.as_ref()
    }

    pub fn authorization_code(&self) -> Option<&str> {
        self.authorization_code.as_deref()
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn expires_in(&self) -> Option<i64> {
        self.expires_in
    }

    pub fn expires_at(&self) -> Option<&str> {
        self.expires_at.as_deref()
    }

    pub(crate) fn expect_stage(&self, expected: FlowStage) -> LoginFlowResult<()> {
        if self.stage != expected {
            return Err(LoginFlowError::OutOfOrder {
                expected,
                actual: self.stage.clone(),
            });
        }
        Ok(())
    }

    fn advance(&mut self, expected: FlowStage, next: FlowStage) -> LoginFlowResult<()> {
        self.expect_stage(expected)?;
        self.stage = next;
        Ok(())
    }

    pub(crate) fn record_authorization(
        &mut self,
        login_challenge: String,
        csrf_cookie: CookiePair,
    ) -> LoginFlowResult<()> {
        self.advance(FlowStage::Init, FlowStage::Authorized)?;
        self.login_challenge = Some(login_challenge);
        self.authentication_cookie = Some(csrf_cookie);
        Ok(())
    }

    pub(crate) fn record_login(&mut self, redirect_to: String) -> LoginFlowResult<()> {
        self.advance(FlowStage::Authorized, FlowStage::CredentialsSubmitted)?;
        self.redirect_to = Some(redirect_to);
        Ok(())
    }

    pub(crate) fn record_rejection(&mut self) -> LoginFlowResult<()> {
        self.advance(FlowStage::Authorized, FlowStage::Rejected)
    }

    pub(crate) fn record_consent(
        &mut self,
        authentication_session: CookiePair,
        consent_cookie: CookiePair,
        authorization_code: String,
    ) -> LoginFlowResult<()> {
        self.advance(FlowStage::CredentialsSubmitted, FlowStage::Consented)?;
        self.authentication_session = Some(authentication_session);
        self.consent_cookie = Some(consent_cookie);
        self.authorization_code = Some(authorization_code);
        Ok(())
    }

    pub(crate) fn record_tokens(&mut self, tokens: &TokenResult) -> LoginFlowResult<()> {
        self.advance(FlowStage::Consented, FlowStage::TokenExchanged)?;
        self.access_token = Some(tokens.access_token.clone());
        self.session_id = Some(tokens.session_id.clone());
        self.expires_in = tokens.expires_in;
        self.expires_at = tokens.expires_at.clone();
        Ok(())
    }

    /// Move to `FAILED`. Terminal stages are left untouched.
    pub(crate) fn fail(&mut self, reason: impl Into<String>) {
        if !self.stage.is_terminal() {
            self.stage = FlowStage::Failed(reason.into());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn cookie(raw: &str) -> CookiePair {
        CookiePair::parse(raw).unwrap()
    }

    fn tokens() -> TokenResult {
        TokenResult {
            access_token: "tok1".to_string(),
            session_id: "sess1".to_string(),
            expires_in: Some(3600),
            expires_at: None,
            received_at: Utc::now(),
        }
    }

    #[test]
    fn test_linear_progression() {
        let mut state = FlowState::new();
        assert_eq!(state.stage(), &FlowStage::Init);

        state
            .record_authorization("abc".to_string(), cookie("csrf=xyz"))
            .unwrap();
        state.record_login("http://idp/redirect".to_string()).unwrap();
        state
            .record_consent(cookie("auth=1"), cookie("consent=2"), "123".to_string())
            .unwrap();
        state.record_tokens(&tokens()).unwrap();

        assert_eq!(state.stage(), &FlowStage::TokenExchanged);
        assert_eq!(state.login_challenge(), Some("abc"));
        assert_eq!(state.authentication_cookie().unwrap().value, "xyz");
        assert_eq!(state.authorization_code(), Some("123"));
        assert_eq!(state.access_token(), Some("tok1"));
        assert_eq!(state.session_id(), Some("sess1"));
        assert_eq!(state.expires_in(), Some(3600));
    }

    #[test]
    fn test_stage_cannot_be_skipped() {
        let mut state = FlowState::new();

        let err = state.record_login("http://idp".to_string()).unwrap_err();

        assert!(matches!(
            err,
            LoginFlowError::OutOfOrder {
                expected: FlowStage::Authorized,
                actual: FlowStage::Init
            }
        ));
        assert!(state.redirect_to().is_none());
    }

    #[test]
    fn test_fields_are_not_revised() {
        let mut state = FlowState::new();
        state
            .record_authorization("first".to_string(), cookie("csrf=1"))
            .unwrap();

        assert!(
            state
                .record_authorization("second".to_string(), cookie("csrf=2"))
                .is_err()
        );
        assert_eq!(state.login_challenge(), Some("first"));
    }

    #[test]
    fn test_failure_is_absorbing() {
        let mut state = FlowState::new();
        state.fail("authorize: no Location");

        assert_eq!(
            state.stage(),
            &FlowStage::Failed("authorize: no Location".to_string())
        );
        assert!(
            state
                .record_authorization("abc".to_string(), cookie("csrf=xyz"))
                .is_err()
        );

        state.fail("second failure");
        assert_eq!(state.stage().to_string(), "FAILED(authorize: no Location)");
    }

    #[test]
    fn test_rejection_is_terminal() {
        let mut state = FlowState::new();
        state
            .record_authorization("abc".to_string(), cookie("csrf=xyz"))
            .unwrap();
        state.record_rejection().unwrap();
        state.fail("ignored");

        assert_eq!(state.stage(), &FlowStage::Rejected);
    }
}
