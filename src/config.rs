use std::{env, fmt, str::FromStr};

use axum::http::HeaderValue;
use thiserror::Error;

const DEFAULT_PORT: u16 = 5001;
const DEFAULT_FRONTEND_URL: &str = "http://localhost:3000";
const DEFAULT_MONGODB_URI: &str = "mongodb://localhost:27017/planb";
const DEFAULT_QUOTE_API_URL: &str = "https://finnhub.io/api/v1";
const DEV_JWT_SECRET: &str = "planb-local-development-session-secret";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{key} is required when NODE_ENV=production")]
    MissingInProduction { key: &'static str },

    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error(
        "FIREBASE_PROJECT_ID is not set; identity tokens cannot be verified. \
         Set ALLOW_UNVERIFIED_IDENTITY_TOKENS=true to accept unsigned tokens anyway"
    )]
    UnverifiedIdentityInProduction,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl Environment {
    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Test => "test",
            Environment::Production => "production",
        }
    }

    pub fn is_production(self) -> bool {
        self == Environment::Production
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "test" => Ok(Environment::Test),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(format!("unknown environment {other:?}")),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub environment: Environment,
    pub frontend_url: String,
    pub mongodb_uri: String,
    pub mongodb_uri_configured: bool,
    pub jwt_secret: String,
    pub firebase_project_id: Option<String>,
    pub allow_unverified_identity: bool,
    pub quote_api_url: String,
    pub quote_api_key: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds and validates the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let environment = match var("NODE_ENV") {
            Some(raw) => raw.parse().map_err(|reason| ConfigError::Invalid {
                key: "NODE_ENV",
                value: raw,
                reason,
            })?,
            None => Environment::Development,
        };

        let port = match var("PORT") {
            Some(raw) => raw.parse().map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
                key: "PORT",
                value: raw,
                reason: e.to_string(),
            })?,
            None => DEFAULT_PORT,
        };

        let frontend_url = var("FRONTEND_URL").unwrap_or_else(|| DEFAULT_FRONTEND_URL.into());
        validate_origin(&frontend_url)?;

        let mongodb_uri = var("MONGODB_URI");
        let mongodb_uri_configured = mongodb_uri.is_some();
        let mongodb_uri = mongodb_uri.unwrap_or_else(|| DEFAULT_MONGODB_URI.into());

        let jwt_secret = match var("JWT_SECRET") {
            Some(secret) => secret,
            None if environment.is_production() => {
                return Err(ConfigError::MissingInProduction { key: "JWT_SECRET" })
            }
            None => DEV_JWT_SECRET.into(),
        };

        let firebase_project_id = var("FIREBASE_PROJECT_ID");
        let allow_unverified_identity = match var("ALLOW_UNVERIFIED_IDENTITY_TOKENS") {
            Some(raw) => parse_bool(&raw).ok_or(ConfigError::Invalid {
                key: "ALLOW_UNVERIFIED_IDENTITY_TOKENS",
                value: raw,
                reason: "expected true or false".into(),
            })?,
            None => !environment.is_production(),
        };
        if environment.is_production() && firebase_project_id.is_none() && !allow_unverified_identity {
            return Err(ConfigError::UnverifiedIdentityInProduction);
        }

        Ok(Self {
            port,
            environment,
            frontend_url,
            mongodb_uri,
            mongodb_uri_configured,
            jwt_secret,
            firebase_project_id,
            allow_unverified_identity,
            quote_api_url: var("QUOTE_API_URL").unwrap_or_else(|| DEFAULT_QUOTE_API_URL.into()),
            quote_api_key: var("QUOTE_API_KEY"),
        })
    }

    pub fn frontend_origin(&self) -> HeaderValue {
        // Checked in from_lookup.
        HeaderValue::from_str(&self.frontend_url).unwrap_or(HeaderValue::from_static(DEFAULT_FRONTEND_URL))
    }
}

fn validate_origin(url: &str) -> Result<(), ConfigError> {
    let invalid = |reason: &str| ConfigError::Invalid {
        key: "FRONTEND_URL",
        value: url.to_string(),
        reason: reason.to_string(),
    };

    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(invalid("must start with http:// or https://"));
    }
    if url.ends_with('/') {
        return Err(invalid("an origin has no trailing slash"));
    }
    HeaderValue::from_str(url).map_err(|_| invalid("not a valid header value"))?;
    Ok(())
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
