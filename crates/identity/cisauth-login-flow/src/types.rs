//! Request and response models for the provider and identity backend.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Parameters of the `/oauth2/auth` request.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub authorize_endpoint: String,
    pub client_id: String,
    pub redirect_uri: String,
    pub scope: String,
    pub state: String,
    pub code_challenge: String,
    pub code_challenge_method: String,
}

impl AuthorizationRequest {
    pub(crate) fn query(&self) -> [(&'static str, &str); 7] {
        [
            ("response_type", "code"),
            ("client_id", &self.client_id),
            ("state", &self.state),
            ("scope", &self.scope),
            ("redirect_uri", &self.redirect_uri),
            ("code_challenge", &self.code_challenge),
            ("code_challenge_method", &self.code_challenge_method),
        ]
    }
}

/// Result of the authorize redirect.
#[derive(Debug, Clone)]
pub struct AuthorizationGrant {
    pub login_challenge: String,
    pub csrf_cookie: crate::CookiePair,
}

/// Body of `POST /login`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginSubmission {
    pub email: String,
    /// Base64 RSA-OAEP ciphertext, never the plaintext password
    pub password: String,
    pub login_challenge: String,
}

/// Body of `POST /register`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationSubmission {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

/// `{ "redirect_to": ... }` as returned by login and consent endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedirectResponse {
    pub redirect_to: String,
}

/// Error body shapes used by the backend.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackendMessage {
    pub message: Option<String>,
    pub status: Option<String>,
    pub error: Option<String>,
}

impl BackendMessage {
    pub(crate) fn from_body(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_default()
    }

    pub(crate) fn text(&self) -> Option<&str> {
        self.message
            .as_deref()
            .or(self.status.as_deref())
            .or(self.error.as_deref())
    }
}

/// Body of `POST /token/exchange`.
#[derive(Debug, Clone, Serialize)]
pub struct TokenExchangeRequest {
    pub code: String,
    #[serde(rename = "redirectURI")]
    pub redirect_uri: String,
    #[serde(rename = "clientID")]
    pub client_id: String,
    #[serde(rename = "codeVerifier")]
    pub code_verifier: String,
}

/// Token exchange response body.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenExchangeResponse {
    pub access_token: String,
    pub expires_in: Option<i64>,
    pub expires_at: Option<String>,
}

/// Terminal artifact of a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResult {
    pub access_token: String,
    pub session_id: String,
    pub expires_in: Option<i64>,
    /// Expiry as reported by the backend, kept verbatim
    pub expires_at: Option<String>,
    pub received_at: DateTime<Utc>,
}

impl TokenResult {
    /// Whether `expires_in` seconds have passed since the token was received.
    /// Tokens without a lifetime never expire locally.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_in {
            Some(seconds) => now >= self.received_at + Duration::seconds(seconds),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_submission_uses_backend_field_names() {
        let body = serde_json::to_value(LoginSubmission {
            email: "user@example.com".to_string(),
            password: "Y2lwaGVy".to_string(),
            login_challenge: "abc".to_string(),
        })
        .unwrap();

        assert_eq!(
            body,
            serde_json::json!({
                "email": "user@example.com",
                "password": "Y2lwaGVy",
                "loginChallenge": "abc"
            })
        );
    }

    #[test]
    fn test_token_exchange_request_field_names() {
        let body = serde_json::to_value(TokenExchangeRequest {
            code: "123".to_string(),
            redirect_uri: "http://localhost/cb".to_string(),
            client_id: "web".to_string(),
            code_verifier: "verifier".to_string(),
        })
        .unwrap();

        assert_eq!(body["redirectURI"], "http://localhost/cb");
        assert_eq!(body["clientID"], "web");
        assert_eq!(body["codeVerifier"], "verifier");
    }

    #[test]
    fn test_token_response_optional_expiry() {
        let response: TokenExchangeResponse =
            serde_json::from_str(r#"{"accessToken":"tok1","expiresIn":3600}"#).unwrap();

        assert_eq!(response.access_token, "tok1");
        assert_eq!(response.expires_in, Some(3600));
        assert!(response.expires_at.is_none());
    }

    #[test]
    fn test_backend_message_text() {
        let message = BackendMessage::from_body(r#"{"status":"please try again"}"#);
        assert_eq!(message.text(), Some("please try again"));

        assert!(BackendMessage::from_body("not json").text().is_none());
    }

    #[test]
    fn test_token_expiry() {
        let received_at = Utc::now();
        let token = TokenResult {
            access_token: "tok".to_string(),
            session_id: "sess".to_string(),
            expires_in: Some(60),
            expires_at: None,
            received_at,
        };

        assert!(!token.is_expired_at(received_at + Duration::seconds(59)));
        assert!(token.is_expired_at(received_at + Duration::seconds(60)));

        let eternal = TokenResult {
            expires_in: None,
            ..token
        };
        assert!(!eternal.is_expired_at(received_at + Duration::days(365)));
    }
}
