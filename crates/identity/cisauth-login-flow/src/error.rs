//! Error types for the login flow.

use crate::state::FlowStage;
use std::fmt;
use thiserror::Error;

pub type LoginFlowResult<T> = Result<T, LoginFlowError>;

/// Network call that was in flight when an error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowStep {
    Authorize,
    SubmitLogin,
    AcceptLogin,
    FetchConsent,
    AcceptConsent,
    TokenExchange,
    Register,
    VerifyAccount,
}

impl fmt::Display for FlowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FlowStep::Authorize => "authorize",
            FlowStep::SubmitLogin => "submit-login",
            FlowStep::AcceptLogin => "accept-login",
            FlowStep::FetchConsent => "fetch-consent",
            FlowStep::AcceptConsent => "accept-consent",
            FlowStep::TokenExchange => "token-exchange",
            FlowStep::Register => "register",
            FlowStep::VerifyAccount => "verify-account",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum LoginFlowError {
    #[error("HTTP request failed during {step}: {source}")]
    Network {
        step: FlowStep,
        #[source]
        source: reqwest::Error,
    },

    #[error("Protocol error during {step}: {error}")]
    Protocol {
        step: FlowStep,
        #[source]
        error: ProtocolError,
    },

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Flow step out of order: expected stage {expected}, found {actual}")]
    OutOfOrder {
        expected: FlowStage,
        actual: FlowStage,
    },
}

impl LoginFlowError {
    pub(crate) fn protocol(step: FlowStep, error: ProtocolError) -> Self {
        Self::Protocol { step, error }
    }

    /// Classify a transport error; timeouts are reported as protocol errors.
    pub(crate) fn transport(step: FlowStep, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Protocol {
                step,
                error: ProtocolError::Timeout,
            }
        } else {
            Self::Network { step, source }
        }
    }

    /// The protocol error kind, if this is one.
    pub fn protocol_error(&self) -> Option<&ProtocolError> {
        match self {
            Self::Protocol { error, .. } => Some(error),
            _ => None,
        }
    }

    /// The network step that failed, if known.
    pub fn step(&self) -> Option<FlowStep> {
        match self {
            Self::Network { step, .. } | Self::Protocol { step, .. } => Some(*step),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("unexpected HTTP status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("redirect response has no Location header")]
    MissingRedirectLocation,

    #[error("redirect location has no login_challenge parameter")]
    MissingLoginChallenge,

    #[error("redirect location has no code parameter")]
    MissingAuthorizationCode,

    #[error("expected cookie {name} was not set")]
    MissingSessionCookie { name: String },

    #[error("token exchange failed with status {status}: {body}")]
    TokenExchangeFailed { status: u16, body: String },

    #[error("provider rejected the request: {error} ({description})")]
    ProviderRejected { error: String, description: String },

    #[error("invalid redirect URL: {0}")]
    InvalidRedirect(String),

    #[error("invalid response body: {0}")]
    InvalidResponseBody(String),

    #[error("request timed out")]
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    #[error("public key import failed: {0}")]
    KeyImportFailed(String),

    #[error("encryption failed: {0}")]
    EncryptionFailed(String),
}

/// Backend rejected the submitted email/password pair.
///
/// Not an error of the flow itself; surfaced as a typed outcome so the caller
/// can prompt for new credentials.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid credentials: {message}")]
pub struct CredentialError {
    pub message: String,
}
