//! Identity token handling for the Firebase login hand-off.
//!
//! Two modes exist. [`IdentityVerifier::Firebase`] checks the RS256
//! signature against Google's published `securetoken` keys together with the
//! audience and issuer for the configured project. [`IdentityVerifier::Unverified`]
//! only base64url-decodes the payload: anyone can forge a token that passes it,
//! so it is opt-in (see `Config::allow_unverified_identity`) and every use is
//! logged.

use std::time::{Duration, Instant};

use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine,
};
use jsonwebtoken::{decode, decode_header, jwk::JwkSet, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::{config::Config, models::SessionUser};

const FIREBASE_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";
const KEY_CACHE_TTL: Duration = Duration::from_secs(60 * 60);
const KEY_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

pub const PLACEHOLDER_EMAIL: &str = "user@example.com";
pub const PLACEHOLDER_NAME: &str = "User";

/// base64url with or without `=` padding, as browsers' `atob` accepts.
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("token does not have three dot-separated segments")]
    Shape,

    #[error("payload is not base64url: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("payload is not JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("payload is not a JSON object")]
    NotAnObject,

    #[error("token carries neither user_id nor sub")]
    MissingSubject,

    #[error("token rejected: {0}")]
    Rejected(#[from] jsonwebtoken::errors::Error),

    #[error("no signing key with id {0:?}")]
    UnknownKey(String),

    #[error("could not fetch signing keys: {0}")]
    Keys(#[from] reqwest::Error),
}

#[derive(Debug, Default, Deserialize)]
pub struct IdentityClaims {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl IdentityClaims {
    /// Derives the user, filling in placeholders for a missing email or name.
    pub fn into_session_user(self) -> Result<SessionUser, IdentityError> {
        let present = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        let id = present(self.user_id)
            .or_else(|| present(self.sub))
            .ok_or(IdentityError::MissingSubject)?;
        let email = present(self.email);
        let name = present(self.name)
            .or_else(|| {
                email
                    .as_deref()
                    .and_then(|e| e.split('@').next())
                    .filter(|local| !local.is_empty())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| PLACEHOLDER_NAME.into());

        Ok(SessionUser {
            id,
            email: email.unwrap_or_else(|| PLACEHOLDER_EMAIL.into()),
            name,
        })
    }
}

/// Reads the claims of a JWT without checking its signature.
pub fn decode_unverified(token: &str) -> Result<IdentityClaims, IdentityError> {
    let mut segments = token.trim().split('.');
    let (Some(_header), Some(payload), Some(_signature), None) =
        (segments.next(), segments.next(), segments.next(), segments.next())
    else {
        return Err(IdentityError::Shape);
    };

    let bytes = PAYLOAD_ENGINE.decode(payload)?;
    match serde_json::from_slice::<Value>(&bytes)? {
        object @ Value::Object(_) => Ok(serde_json::from_value(object)?),
        _ => Err(IdentityError::NotAnObject),
    }
}

pub enum IdentityVerifier {
    Unverified,
    Firebase(FirebaseVerifier),
}

impl IdentityVerifier {
    pub fn from_config(config: &Config) -> Result<Self, IdentityError> {
        match &config.firebase_project_id {
            Some(project_id) => {
                info!(%project_id, "verifying Firebase identity tokens");
                Ok(Self::Firebase(FirebaseVerifier::new(project_id)?))
            }
            None => {
                warn!("FIREBASE_PROJECT_ID not set: identity tokens are accepted WITHOUT signature verification");
                Ok(Self::Unverified)
            }
        }
    }

    pub fn is_verified(&self) -> bool {
        matches!(self, Self::Firebase(_))
    }

    pub async fn verify(&self, token: &str) -> Result<IdentityClaims, IdentityError> {
        match self {
            Self::Unverified => {
                warn!("decoding identity token without signature verification");
                decode_unverified(token)
            }
            Self::Firebase(verifier) => verifier.verify(token).await,
        }
    }
}

struct CachedKeys {
    fetched_at: Instant,
    keys: JwkSet,
}

pub struct FirebaseVerifier {
    project_id: String,
    jwks_url: String,
    client: reqwest::Client,
    cache: RwLock<Option<CachedKeys>>,
}

impl FirebaseVerifier {
    pub fn new(project_id: &str) -> Result<Self, IdentityError> {
        Self::with_jwks_url(project_id, FIREBASE_JWKS_URL)
    }

    /// Verifier fetching its signing keys from `jwks_url` instead of Google.
    pub fn with_jwks_url(project_id: &str, jwks_url: &str) -> Result<Self, IdentityError> {
        Ok(Self {
            project_id: project_id.to_string(),
            jwks_url: jwks_url.to_string(),
            client: reqwest::Client::builder().timeout(KEY_FETCH_TIMEOUT).build()?,
            cache: RwLock::new(None),
        })
    }

    pub async fn verify(&self, token: &str) -> Result<IdentityClaims, IdentityError> {
        let header = decode_header(token)?;
        let kid = header.kid.ok_or_else(|| IdentityError::UnknownKey(String::new()))?;
        let key = self.key_for(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[&self.project_id]);
        validation.set_issuer(&[format!("https://securetoken.google.com/{}", self.project_id)]);

        Ok(decode::<IdentityClaims>(token, &key, &validation)?.claims)
    }

    async fn key_for(&self, kid: &str) -> Result<DecodingKey, IdentityError> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref().filter(|c| c.fetched_at.elapsed() < KEY_CACHE_TTL) {
                if let Some(jwk) = cached.keys.find(kid) {
                    return Ok(DecodingKey::from_jwk(jwk)?);
                }
            }
        }

        // Expired cache or a rotated key.
        debug!(kid, "refreshing Firebase signing keys");
        let keys: JwkSet = self
            .client
            .get(&self.jwks_url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let key = match keys.find(kid) {
            Some(jwk) => DecodingKey::from_jwk(jwk)?,
            None => return Err(IdentityError::UnknownKey(kid.to_string())),
        };
        *self.cache.write().await = Some(CachedKeys {
            fetched_at: Instant::now(),
            keys,
        });
        Ok(key)
    }
}
