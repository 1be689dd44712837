//! Configuration manager for Latchkey.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::FromRef;
use serde::Deserialize;
use url::Url;

use crate::AppState;

const DEFAULT_CONFIG_PATH: &str = "config.yaml";
const DEFAULT_PORT: u16 = 8080;
const VERSION: &str = env!("CARGO_PKG_VERSION");
const TOKEN_SECRET_VAR: &str = "TOKEN_SECRET";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Configuration {
    /// Instance name.
    #[serde(default)]
    pub name: String,
    /// Domain name of current instance. Used as token issuer.
    #[serde(default)]
    pub url: String,
    /// Port the HTTP server listens on.
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub version: String,
    #[serde(skip)]
    path: PathBuf,
    /// Related to PostgreSQL configuration.
    pub postgres: Option<Postgres>,
    /// Related to Argon2 configuration.
    pub argon2: Option<Argon2>,
    /// Related to JsonWebToken configuration.
    pub token: Option<Token>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_owned(),
            url: String::default(),
            port: DEFAULT_PORT,
            version: VERSION.to_owned(),
            path: PathBuf::default(),
            postgres: None,
            argon2: None,
            token: None,
        }
    }
}

/// PostgreSQL configuration.
#[derive(Debug, Default, PartialEq, Clone, Deserialize)]
pub struct Postgres {
    /// Hostname:(?port) for PostgreSQL instance.
    pub address: String,
    /// Database name.
    pub database: Option<String>,
    /// Username credential to connect.
    pub username: Option<String>,
    /// Password credential to connect.
    pub password: Option<String>,
    /// Maximum pool connections.
    pub pool_size: Option<u32>,
}

/// Argon2 configuration.
#[derive(Debug, PartialEq, Clone, Deserialize)]
pub struct Argon2 {
    /// Memory used while hashing, in KiB.
    pub memory_cost: u32,
    /// Iterations of hash.
    pub iterations: u32,
    /// Parallelism degree.
    pub parallelism: u32,
    /// Output hash length.
    pub hash_length: usize,
}

impl Default for Argon2 {
    fn default() -> Self {
        Self {
            memory_cost: 1024 * 64, // 64 MiB.
            iterations: 4,
            parallelism: 2,
            hash_length: 32,
        }
    }
}

/// Json Web Token configuration.
///
/// Either `secret` (HS256) or the PEM pair (ES256) must be set.
#[derive(Debug, Default, PartialEq, Clone, Deserialize)]
pub struct Token {
    pub secret: Option<String>,
    pub public_key_pem: Option<String>,
    pub private_key_pem: Option<String>,
    /// Update token audience.
    /// Default is `latchkey`.
    pub audience: Option<String>,
    /// Token lifetime in seconds.
    pub expires_in: Option<u64>,
}

impl FromRef<AppState> for Arc<Configuration> {
    fn from_ref(state: &AppState) -> Arc<Configuration> {
        Arc::clone(&state.config)
    }
}

impl Configuration {
    pub fn path(mut self, path: PathBuf) -> Self {
        self.path = path;
        self
    }

    /// Normalizes a URL string by ensuring it starts with a valid scheme
    /// (`http` or `https`).
    fn normalize_url(&self, url: &str) -> Result<String, url::ParseError> {
        let url_with_scheme =
            if url.starts_with("http://") || url.starts_with("https://") {
                url.to_string()
            } else {
                format!("https://{url}")
            };

        let parsed_url = Url::parse(&url_with_scheme)?;
        Ok(parsed_url.to_string())
    }

    /// Reads the `config.yaml` file from the specified path or the default
    /// location, then applies environment overrides.
    pub fn read(self) -> Result<Arc<Self>, url::ParseError> {
        let file_path = if self.path.is_file() {
            self.path.clone()
        } else {
            Path::new(DEFAULT_CONFIG_PATH).to_path_buf()
        };

        let config = match File::open(&file_path) {
            Ok(file) => match serde_yaml::from_reader(file) {
                Ok(config) => self.finalize(config)?,
                Err(err) => self.error(err),
            },
            Err(err) => self.error(err),
        };

        Ok(Arc::new(
            config.token_secret(std::env::var(TOKEN_SECRET_VAR).ok()),
        ))
    }

    /// Parse configuration from a YAML string. The environment is not read.
    pub fn from_yaml(self, yaml: &str) -> Result<Self, ConfigError> {
        let config: Configuration = serde_yaml::from_str(yaml)?;
        Ok(self.finalize(config)?)
    }

    fn finalize(&self, mut config: Self) -> Result<Self, url::ParseError> {
        // set app version.
        config.version = VERSION.to_owned();
        if config.name.is_empty() {
            config.name = env!("CARGO_PKG_NAME").to_owned();
        }

        if !config.url.is_empty() {
            config.url = self.normalize_url(&config.url)?;
        }

        Ok(config)
    }

    /// Overrides `token.secret`, creating the `token` entry if needed.
    fn token_secret(mut self, secret: Option<String>) -> Self {
        if let Some(secret) = secret {
            self.token.get_or_insert_with(Token::default).secret = Some(secret);
        }
        self
    }

    /// Return a default configuration as fallback.
    fn error(&self, err: impl std::error::Error) -> Self {
        tracing::error!(error = %err, "`config.yaml` file not found or invalid");

        Self::default()
    }
}

/// Errors raised while parsing configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_configuration() {
        let yaml = r#"
name: latchkey-test
url: auth.example.com
port: 3000
postgres:
  address: localhost:5432
  pool_size: 4
argon2:
  memory_cost: 8192
  iterations: 1
  parallelism: 1
  hash_length: 32
token:
  secret: not-so-secret
  audience: example
"#;
        let config = Configuration::default().from_yaml(yaml).unwrap();

        assert_eq!(config.name, "latchkey-test");
        assert_eq!(config.url, "https://auth.example.com/");
        assert_eq!(config.port, 3000);
        assert_eq!(config.version, VERSION);
        assert_eq!(config.postgres.unwrap().pool_size, Some(4));
        assert_eq!(config.argon2.unwrap().iterations, 1);
        assert_eq!(config.token.unwrap().audience.as_deref(), Some("example"));
    }

    #[test]
    fn test_defaults() {
        let config = Configuration::default().from_yaml("url: http://localhost").unwrap();

        assert_eq!(config.url, "http://localhost/");
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.name, env!("CARGO_PKG_NAME"));
        assert!(config.postgres.is_none());
        assert_eq!(Argon2::default().memory_cost, 65536);
    }

    #[test]
    fn test_missing_file_falls_back() {
        let config = Configuration::default()
            .path(PathBuf::from("/definitely/not/here.yaml"))
            .read()
            .unwrap();

        assert_eq!(config.version, VERSION);
        assert!(config.postgres.is_none());
    }

    #[test]
    fn test_from_yaml_keeps_file_token() {
        let config = Configuration::default().from_yaml("url: localhost").unwrap();
        assert!(config.token.is_none());

        let config = Configuration::default()
            .from_yaml("token:\n  secret: from-file\n")
            .unwrap();
        assert_eq!(config.token.unwrap().secret.as_deref(), Some("from-file"));
    }

    #[test]
    fn test_token_secret_override() {
        let config = Configuration::default()
            .from_yaml("token:\n  secret: from-file\n  audience: example\n")
            .unwrap()
            .token_secret(Some("from-env".into()));
        let token = config.token.unwrap();
        assert_eq!(token.secret.as_deref(), Some("from-env"));
        assert_eq!(token.audience.as_deref(), Some("example"));

        let config = Configuration::default().token_secret(Some("from-env".into()));
        assert_eq!(config.token.unwrap().secret.as_deref(), Some("from-env"));

        let config = Configuration::default().token_secret(None);
        assert!(config.token.is_none());
    }
}
