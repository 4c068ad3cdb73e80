//! Runner for the cisauth login flow: loads configuration, then registers,
//! verifies or logs in a user and prints the result as JSON.

pub mod cli;
pub mod config;
pub mod error;
