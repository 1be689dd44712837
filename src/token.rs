//! Manage json web tokens.

use std::time::{SystemTime, SystemTimeError, UNIX_EPOCH};

use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
};
use serde::{Deserialize, Serialize};

use crate::config::Token as TokenConfig;
use crate::user::User;

const DEFAULT_AUDIENCE: &str = "latchkey";
pub const EXPIRATION_TIME: u64 = 60 * 15; // 15 minutes.

type Result<T> = std::result::Result<T, TokenError>;

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error(transparent)]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("system clock is before UNIX epoch")]
    Clock(#[from] SystemTimeError),
    #[error("missing `secret` or `private_key_pem` on token configuration")]
    MissingKey,
    #[error("public key is required to decode ES256 tokens")]
    MissingPublicKey,
}

/// Pieces of information asserted on a JWT.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Claims {
    /// Recipients that the JWT is intended for.
    pub aud: String,
    /// Identifies the expiration time on or after which the JWT must not be
    /// accepted for processing.
    pub exp: u64,
    /// Identifies the time at which the JWT was issued.
    pub iat: u64,
    /// Identifies the organization that issued the JWT.
    pub iss: String,
    /// User ID.
    pub sub: String,
}

/// Creation of signed credentials for an authenticated user.
pub trait TokenIssuer: Send + Sync {
    /// Issue a signed, time-bounded token for `user`.
    fn issue(&self, user: &User) -> Result<String>;
}

/// Manage JWT tokens.
#[derive(Clone)]
pub struct TokenManager {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: Option<DecodingKey>,
    issuer: String,
    audience: String,
    expires_in: u64,
}

impl TokenManager {
    /// Create a HS256 [`TokenManager`] from a shared secret.
    pub fn from_secret(issuer: &str, secret: &str) -> Self {
        Self {
            algorithm: Algorithm::HS256,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: Some(DecodingKey::from_secret(secret.as_bytes())),
            issuer: issuer.to_owned(),
            audience: DEFAULT_AUDIENCE.to_owned(),
            expires_in: EXPIRATION_TIME,
        }
    }

    /// Create a ES256 [`TokenManager`] from PEM encoded keys.
    ///
    /// An empty public key disables [`TokenManager::decode`].
    pub fn from_ec_pem(
        issuer: &str,
        public_key_pem: &str,
        private_key_pem: &str,
    ) -> Result<Self> {
        let decoding_key = if public_key_pem.is_empty() {
            None
        } else {
            Some(DecodingKey::from_ec_pem(public_key_pem.as_bytes())?)
        };

        Ok(Self {
            algorithm: Algorithm::ES256,
            encoding_key: EncodingKey::from_ec_pem(private_key_pem.as_bytes())?,
            decoding_key,
            issuer: issuer.to_owned(),
            audience: DEFAULT_AUDIENCE.to_owned(),
            expires_in: EXPIRATION_TIME,
        })
    }

    /// Build a [`TokenManager`] from the `token` configuration entry.
    ///
    /// A shared secret takes precedence over a PEM pair.
    pub fn from_config(issuer: &str, config: &TokenConfig) -> Result<Self> {
        let manager = match (&config.secret, &config.private_key_pem) {
            (Some(secret), _) if !secret.is_empty() => {
                Self::from_secret(issuer, secret)
            },
            (_, Some(private_key_pem)) => Self::from_ec_pem(
                issuer,
                config.public_key_pem.as_deref().unwrap_or_default(),
                private_key_pem,
            )?,
            _ => return Err(TokenError::MissingKey),
        };

        let manager = match &config.audience {
            Some(audience) => manager.audience(audience),
            None => manager,
        };

        Ok(match config.expires_in {
            Some(seconds) => manager.expires_in(seconds),
            None => manager,
        })
    }

    /// Set `audience` field on JWT.
    pub fn audience(mut self, audience: &str) -> Self {
        self.audience = audience.to_owned();
        self
    }

    /// Set token lifetime, in seconds.
    pub fn expires_in(mut self, seconds: u64) -> Self {
        self.expires_in = seconds;
        self
    }

    /// Create a new [`jsonwebtoken`] for `subject`.
    pub fn create(&self, subject: &str) -> Result<String> {
        let time = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
        let header = Header::new(self.algorithm);
        let claims = Claims {
            aud: self.audience.clone(),
            exp: time + self.expires_in,
            iat: time,
            iss: self.issuer.clone(),
            sub: subject.to_owned(),
        };

        Ok(encode(&header, &claims, &self.encoding_key)?)
    }

    /// Decode and check a token.
    pub fn decode(&self, token: &str) -> Result<Claims> {
        let Some(decoding_key) = &self.decoding_key else {
            return Err(TokenError::MissingPublicKey);
        };

        let mut validation = Validation::new(self.algorithm);
        validation.set_audience(&[&self.audience]);
        validation.set_issuer(&[&self.issuer]);

        Ok(decode::<Claims>(token, decoding_key, &validation)?.claims)
    }
}

impl TokenIssuer for TokenManager {
    fn issue(&self, user: &User) -> Result<String> {
        self.create(&user.id.to_string())
    }
}
