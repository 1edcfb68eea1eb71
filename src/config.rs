// src/config.rs

use dotenvy::dotenv;
use std::env;

/// How many times the submit-path persistence write is attempted before the
/// failure is surfaced. Completed is meant to be terminal, so this write is
/// retried where the pause-path write is not.
pub const SUBMIT_WRITE_ATTEMPTS: u32 = 3;

/// Backoff between submit write attempts, in milliseconds (scales linearly).
pub const SUBMIT_RETRY_BACKOFF_MS: u64 = 200;

/// What happens when a student opens a quiz they already completed.
/// Product has not settled on retake semantics, so it stays configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetakePolicy {
    /// A fresh attempt is started; the completed record is kept as history.
    NewAttempt,
    /// Opening the quiz again is rejected.
    Deny,
}

impl RetakePolicy {
    fn parse(value: &str) -> Self {
        match value {
            "deny" => RetakePolicy::Deny,
            _ => RetakePolicy::NewAttempt,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub retake_policy: RetakePolicy,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(3600);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let retake_policy = RetakePolicy::parse(
            &env::var("QUIZ_RETAKE_POLICY").unwrap_or_else(|_| "new_attempt".to_string()),
        );

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            retake_policy,
        }
    }
}
