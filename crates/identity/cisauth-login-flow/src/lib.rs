//! OAuth2 authorization code login with PKCE against a consent-based provider.
//!
//! This crate drives a provider and its identity backend through the full
//! redirect chain a browser would walk: authorize, credential submission,
//! consent, and finally the code-for-token exchange. Passwords are encrypted
//! with the backend's RSA-OAEP public key before they leave the process, and
//! the provider's CSRF and session cookies are carried from one redirect to
//! the next by hand.
//!
//! ```no_run
//! use cisauth_login_flow::{BackendEndpoints, Credentials, FlowConfig, LoginFlow, LoginOutcome};
//!
//! # async fn run(public_key: String) -> Result<(), Box<dyn std::error::Error>> {
//! let config = FlowConfig::new(
//!     "http://localhost:3000",
//!     "web-client",
//!     "http://localhost:3000/callback",
//!     public_key,
//!     BackendEndpoints::from_base("http://localhost:3000/user-service/v1"),
//! );
//! let flow = LoginFlow::new(config)?;
//!
//! match flow.login(&Credentials::new("user@example.com", "S3cret!pass")).await? {
//!     LoginOutcome::Authenticated(tokens) => println!("session {}", tokens.session_id),
//!     LoginOutcome::InvalidCredentials(e) => eprintln!("{e}"),
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod consent;
mod cookie;
mod crypto;
mod error;
mod flow;
mod pkce;
mod state;
mod token;
mod types;


pub use client::{FlowClient, LoginReply, RegistrationOutcome};
pub use config::{AUTHORIZE_PATH, BackendEndpoints, CookieNames, FlowConfig};
pub use consent::{ConsentGrant, ConsentRequest};
pub use cookie::{CookiePair, SetCookies, cookie_header};
pub use crypto::{CredentialEncryptor, RsaKeyMaterial};
pub use error::{
    CredentialError, CryptoError, FlowStep, LoginFlowError, LoginFlowResult, ProtocolError,
};
pub use flow::{Credentials, LoginAttempt, LoginFlow, LoginOutcome};
pub use pkce::{CHALLENGE_METHOD, PkceChallenge, compute_challenge, generate_state, generate_verifier};
pub use state::{FlowStage, FlowState};
pub use types::{
    AuthorizationGrant, AuthorizationRequest, LoginSubmission, RedirectResponse,
    RegistrationSubmission, TokenExchangeRequest, TokenExchangeResponse, TokenResult,
};
