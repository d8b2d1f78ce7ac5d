use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

use crate::limiter::SessionLimits;

/// In-process tuning for the runtime service.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Per-session rolling window and thresholds.
    pub session_limits: SessionLimits,
    /// Rolling window for the per-caller global counter.
    pub caller_window: Duration,
    /// Calls one caller may make across all sessions per window.
    pub max_caller_calls: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            session_limits: SessionLimits::default(),
            caller_window: Duration::from_secs(60),
            max_caller_calls: 300,
        }
    }
}

impl RuntimeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the rolling window for both scopes. Tests use short windows.
    pub fn window(mut self, window: Duration) -> Self {
        self.session_limits.window = window;
        self.caller_window = window;
        self
    }

    pub fn max_session_calls(mut self, max: usize) -> Self {
        self.session_limits.max_calls = max;
        self
    }

    pub fn max_setvalue_calls(mut self, max: usize) -> Self {
        self.session_limits.max_setvalue = max;
        self
    }

    pub fn max_commit_calls(mut self, max: usize) -> Self {
        self.session_limits.max_commit = max;
        self
    }

    pub fn max_caller_calls(mut self, max: usize) -> Self {
        self.max_caller_calls = max;
        self
    }
}

/// Server process configuration, environment-driven.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub session_calls_per_minute: usize,
    pub setvalue_calls_per_minute: usize,
    pub commit_calls_per_minute: usize,
    pub caller_calls_per_minute: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let host = env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .context("APP_PORT must be a valid u16")?;

        let session_calls_per_minute = parse_limit("SESSION_CALLS_PER_MINUTE", 120)?;
        let setvalue_calls_per_minute = parse_limit("SETVALUE_CALLS_PER_MINUTE", 60)?;
        let commit_calls_per_minute = parse_limit("COMMIT_CALLS_PER_MINUTE", 20)?;
        let caller_calls_per_minute = parse_limit("CALLER_CALLS_PER_MINUTE", 300)?;

        Ok(Self {
            host,
            port,
            session_calls_per_minute,
            setvalue_calls_per_minute,
            commit_calls_per_minute,
            caller_calls_per_minute,
        })
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig::new()
            .max_session_calls(self.session_calls_per_minute)
            .max_setvalue_calls(self.setvalue_calls_per_minute)
            .max_commit_calls(self.commit_calls_per_minute)
            .max_caller_calls(self.caller_calls_per_minute)
    }
}

fn parse_limit(var: &str, default: usize) -> Result<usize> {
    env::var(var)
        .unwrap_or_else(|_| default.to_string())
        .parse::<usize>()
        .with_context(|| format!("{var} must be a valid usize"))
}
