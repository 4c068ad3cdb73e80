use crate::config::AppConfig;
use crate::error::CliError;
use cisauth_login_flow::{
    Credentials, LoginFlow, LoginOutcome, RegistrationOutcome, TokenResult,
};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fmt;
use tracing::{info, warn};

/// Drive the cisauth OAuth2 login flow from the command line
#[derive(Parser, Debug, Clone)]
#[command(name = "cisauth")]
#[command(about = "Register, verify and log in users against a cisauth deployment")]
#[command(version = "0.1.0")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// User email (defaults to CISAUTH_USER_EMAIL)
    #[arg(short, long, global = true, value_name = "EMAIL")]
    pub email: Option<String>,

    /// User password (defaults to CISAUTH_USER_PASSWORD)
    #[arg(short, long, global = true, value_name = "PASSWORD")]
    pub password: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the full login flow and print the tokens
    Login,
    /// Create the user account
    Register,
    /// Confirm an account with the code from the verification email
    Verify {
        #[arg(long, value_name = "CODE")]
        code: String,
    },
    /// Register the user if needed, then log in
    Bootstrap,
}

/// What a successful run prints, as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Report {
    Authenticated { tokens: TokenResult },
    Registered,
    AlreadyRegistered { message: String },
    Verified,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string_pretty(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

impl From<RegistrationOutcome> for Report {
    fn from(outcome: RegistrationOutcome) -> Self {
        match outcome {
            RegistrationOutcome::Created => Report::Registered,
            RegistrationOutcome::AlreadyRegistered { message } => {
                Report::AlreadyRegistered { message }
            }
        }
    }
}

impl Args {
    pub async fn run(&self, config: &AppConfig) -> Result<Report, CliError> {
        match &self.command {
            Command::Login => {
                let credentials = self.credentials(config)?;
                let flow = LoginFlow::new(config.flow_config())?;
                login(&flow, &credentials).await
            }
            Command::Register => {
                let credentials = self.credentials(config)?;
                let flow = LoginFlow::new(config.flow_config())?;
                Ok(flow.register(&credentials).await?.into())
            }
            Command::Verify { code } => {
                let flow = LoginFlow::new(config.flow_config())?;
                flow.verify_account(code).await?;
                Ok(Report::Verified)
            }
            Command::Bootstrap => {
                let credentials = self.credentials(config)?;
                let flow = LoginFlow::new(config.flow_config())?;
                match flow.register(&credentials).await? {
                    RegistrationOutcome::Created => info!(email = %credentials.email, "Registered"),
                    RegistrationOutcome::AlreadyRegistered { message } => {
                        warn!(%message, "User already registered, logging in")
                    }
                }
                login(&flow, &credentials).await
            }
        }
    }

    /// Command line credentials win over configured ones.
    pub fn credentials(&self, config: &AppConfig) -> Result<Credentials, CliError> {
        config
            .credentials_with(self.email.as_deref(), self.password.as_deref())
            .ok_or(CliError::MissingCredentials)
    }

    pub fn log_filter(&self, config: &AppConfig) -> String {
        if self.verbose {
            "cisauth_cli=debug,cisauth_login_flow=debug,warn".to_string()
        } else {
            config.log_filter()
        }
    }
}

async fn login(flow: &LoginFlow, credentials: &Credentials) -> Result<Report, CliError> {
    match flow.login(credentials).await? {
        LoginOutcome::Authenticated(tokens) => Ok(Report::Authenticated { tokens }),
        LoginOutcome::InvalidCredentials(rejection) => {
            Err(CliError::InvalidCredentials(rejection.message))
        }
    }
}
