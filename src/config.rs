// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! A `.env` file is honoured for local development. Both JWT secrets are
//! required and must differ so that refresh tokens can never verify as
//! access tokens.

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Origins allowed by default (the Vite dev server ports).
const DEFAULT_CORS_ORIGINS: &[&str] = &[
    "http://localhost:5173",
    "http://localhost:5174",
    "http://localhost:5175",
    "http://localhost:5176",
    "http://localhost:5177",
    "http://127.0.0.1:5173",
    "http://127.0.0.1:5174",
    "http://127.0.0.1:5175",
    "http://127.0.0.1:5176",
    "http://127.0.0.1:5177",
];

/// Deployment environment. Controls whether error bodies carry diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn is_development(self) -> bool {
        matches!(self, Environment::Development)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(ConfigError::Invalid {
                name: "APP_ENV",
                reason: format!("unknown environment '{}'", other),
            }),
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,
    /// Deployment environment
    pub environment: Environment,
    /// Origins allowed to make credentialed CORS requests
    pub cors_origins: Vec<String>,

    // --- Token settings ---
    /// HMAC secret for access tokens (raw bytes)
    pub jwt_secret: Vec<u8>,
    /// HMAC secret for refresh tokens (raw bytes)
    pub jwt_refresh_secret: Vec<u8>,
    /// Access token lifetime
    pub access_token_ttl: Duration,
    /// Refresh token lifetime
    pub refresh_token_ttl: Duration,

    // --- Storage / hashing ---
    /// Upper bound on any single storage or hashing operation
    pub storage_timeout: Duration,
    /// Argon2 memory cost in KiB
    pub argon2_memory_kib: u32,
    /// Argon2 iteration count
    pub argon2_iterations: u32,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self::test_default()
    }
}

impl Config {
    /// Deterministic configuration for tests: distinct secrets, cheap hashing.
    pub fn test_default() -> Self {
        Self {
            port: 3000,
            environment: Environment::Development,
            cors_origins: DEFAULT_CORS_ORIGINS.iter().map(|s| s.to_string()).collect(),
            jwt_secret: b"test_access_secret_32_bytes_min!".to_vec(),
            jwt_refresh_secret: b"test_refresh_secret_32_bytes_min".to_vec(),
            access_token_ttl: Duration::from_secs(60 * 60),
            refresh_token_ttl: Duration::from_secs(7 * 24 * 60 * 60),
            storage_timeout: Duration::from_secs(5),
            argon2_memory_kib: 1024,
            argon2_iterations: 1,
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let jwt_secret = required("JWT_SECRET")?.into_bytes();
        let jwt_refresh_secret = required("JWT_REFRESH_SECRET")?.into_bytes();
        if jwt_secret == jwt_refresh_secret {
            return Err(ConfigError::Invalid {
                name: "JWT_REFRESH_SECRET",
                reason: "must differ from JWT_SECRET".to_string(),
            });
        }

        let cors_origins = match env::var("CORS_ORIGINS") {
            Ok(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            Err(_) => DEFAULT_CORS_ORIGINS.iter().map(|s| s.to_string()).collect(),
        };

        Ok(Self {
            port: parsed("PORT", 3000)?,
            environment: match env::var("APP_ENV") {
                Ok(raw) => raw.parse()?,
                Err(_) => Environment::Development,
            },
            cors_origins,
            jwt_secret,
            jwt_refresh_secret,
            access_token_ttl: Duration::from_secs(parsed("ACCESS_TOKEN_TTL_SECS", 60 * 60)?),
            refresh_token_ttl: Duration::from_secs(parsed(
                "REFRESH_TOKEN_TTL_SECS",
                7 * 24 * 60 * 60,
            )?),
            storage_timeout: Duration::from_millis(parsed("STORAGE_TIMEOUT_MS", 5000)?),
            argon2_memory_kib: parsed("ARGON2_MEMORY_KIB", argon2::Params::DEFAULT_M_COST)?,
            argon2_iterations: parsed("ARGON2_ITERATIONS", argon2::Params::DEFAULT_T_COST)?,
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .map(|v| v.trim().to_string())
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(name))
}

fn parsed<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            name,
            reason: format!("cannot parse '{}'", raw),
        }),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}
