use cisauth_login_flow::LoginFlowError;
use thiserror::Error;

/// Errors that end a `cisauth` run
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Configuration error: {0:#}")]
    Config(#[from] anyhow::Error),

    #[error("No credentials configured (set CISAUTH_USER_EMAIL and CISAUTH_USER_PASSWORD or pass --email/--password)")]
    MissingCredentials,

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error(transparent)]
    Flow(#[from] LoginFlowError),
}

impl CliError {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidCredentials(_) => 2,
            CliError::Config(_) | CliError::MissingCredentials => 3,
            CliError::Flow(_) => 1,
        }
    }
}
