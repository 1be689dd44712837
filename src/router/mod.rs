//! HTTP routes.
pub mod login;
pub mod signup;
pub mod status;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use axum::http::{HeaderMap, header};
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationError};

use crate::error::ServerError;

/// Reject strings made only of whitespace.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }

    Ok(())
}

fn json_content_type(headers: &HeaderMap) -> bool {
    let Some(content_type) = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
    else {
        return false;
    };

    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    essence == "application/json"
        || (essence.starts_with("application/") && essence.ends_with("+json"))
}

/// JSON body extractor running [`Validate`] on the payload.
///
/// An empty body is a bad request whatever its content type; a non-empty
/// body must be declared as JSON.
pub struct Valid<T>(pub T);

impl<T, S> FromRequest<S> for Valid<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request(
        req: Request,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        let is_json = json_content_type(req.headers());
        let bytes = Bytes::from_request(req, state).await?;

        if bytes.is_empty() {
            return Err(ServerError::MissingBody);
        }
        if !is_json {
            return Err(ServerError::UnsupportedMediaType);
        }

        let Json(value) = Json::<T>::from_bytes(&bytes)?;
        value.validate()?;

        Ok(Valid(value))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;

    use axum::http::HeaderValue;

    use super::*;
    use crate::AppState;
    use crate::config::Configuration;
    use crate::crypto::tests::fast_manager;
    use crate::token::TokenManager;
    use crate::user::{AccountService, MemoryUserRepository};

    /// Application state backed by the memory store.
    pub(crate) fn state() -> AppState {
        let config = Arc::new(Configuration::default());
        let token = Arc::new(TokenManager::from_secret(&config.url, "secret"));
        let accounts = AccountService::new(
            Arc::new(MemoryUserRepository::new()),
            Arc::new(fast_manager()),
            token.clone(),
        );

        AppState {
            config,
            accounts,
            token,
            metrics: None,
        }
    }

    #[test]
    fn test_not_blank() {
        assert!(validate_not_blank("secret").is_ok());
        assert!(validate_not_blank(" secret ").is_ok());
        assert!(validate_not_blank("").is_err());
        assert!(validate_not_blank("  \t").is_err());
    }

    #[test]
    fn test_json_content_type() {
        let mut headers = HeaderMap::new();
        assert!(!json_content_type(&headers));

        for (value, expected) in [
            ("application/json", true),
            ("application/json; charset=utf-8", true),
            ("Application/JSON", true),
            ("application/problem+json", true),
            ("text/plain", false),
            ("application/x-www-form-urlencoded", false),
        ] {
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(value));
            assert_eq!(json_content_type(&headers), expected, "{value}");
        }
    }
}
