//! Configuration management for fakerestaurant.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use axum::http::HeaderValue;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "fakerestaurant";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "fakerestaurant.db";

/// Default uploads directory name.
const UPLOADS_DIR_NAME: &str = "uploads";

/// Longest accepted session lifetime: one year.
const MAX_TOKEN_TTL_MINUTES: u64 = 365 * 24 * 60;

/// Environment variable prefix.
const ENV_PREFIX: &str = "FAKERESTAURANT_";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `FAKERESTAURANT_`, sections
///    separated by `__`, e.g. `FAKERESTAURANT_AUTH__JWT_SECRET`)
/// 2. TOML config file at `~/.config/fakerestaurant/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server configuration.
    pub server: ServerConfig,
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Authentication configuration.
    pub auth: AuthConfig,
    /// Upload configuration.
    pub uploads: UploadsConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Origins allowed by CORS.
    pub allowed_origins: Vec<String>,
    /// Maximum request body size in bytes (bounds image uploads).
    pub max_body_bytes: usize,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/fakerestaurant/fakerestaurant.db`
    pub database_path: Option<PathBuf>,
}

/// Where the server looks for the caller's token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialSource {
    /// `Authorization: Bearer <token>` request header.
    #[default]
    AuthorizationHeader,
    /// A named cookie (see [`AuthConfig::cookie_name`]).
    Cookie,
}

/// Authentication configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC secret used to sign tokens.
    pub jwt_secret: String,
    /// Token lifetime in minutes.
    pub token_ttl_minutes: u64,
    /// bcrypt work factor for password hashes.
    pub bcrypt_cost: u32,
    /// Where tokens are read from.
    pub credential_source: CredentialSource,
    /// Cookie holding the token when `credential_source = "cookie"`.
    pub cookie_name: String,
}

/// Upload-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadsConfig {
    /// Directory receiving uploaded images.
    /// Defaults to `~/.local/share/fakerestaurant/uploads`
    pub directory: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            allowed_origins: default_allowed_origins(),
            max_body_bytes: 10 * 1024 * 1024,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "change-me-in-production".to_string(),
            token_ttl_minutes: 60,
            bcrypt_cost: 10,
            credential_source: CredentialSource::AuthorizationHeader,
            cookie_name: "token".to_string(),
        }
    }
}

/// Default CORS origins: the web frontend and local dev servers.
fn default_allowed_origins() -> Vec<String> {
    vec![
        "http://localhost:4200".to_string(),
        "http://localhost:5500".to_string(),
        "http://127.0.0.1:5500".to_string(),
        "http://localhost:3000".to_string(),
    ]
}

impl Config {
    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(invalid("server.port must be greater than 0"));
        }

        if self.server.max_body_bytes == 0 {
            return Err(invalid("server.max_body_bytes must be greater than 0"));
        }

        for origin in &self.server.allowed_origins {
            if HeaderValue::from_str(origin).is_err() {
                return Err(invalid(format!("invalid CORS origin: {origin}")));
            }
        }

        if self.auth.jwt_secret.trim().is_empty() {
            return Err(invalid("auth.jwt_secret must not be empty"));
        }

        if !(1..=MAX_TOKEN_TTL_MINUTES).contains(&self.auth.token_ttl_minutes) {
            return Err(invalid(format!(
                "auth.token_ttl_minutes ({}) must be between 1 and {MAX_TOKEN_TTL_MINUTES}",
                self.auth.token_ttl_minutes
            )));
        }

        if !(4..=31).contains(&self.auth.bcrypt_cost) {
            return Err(invalid(format!(
                "auth.bcrypt_cost ({}) must be between 4 and 31",
                self.auth.bcrypt_cost
            )));
        }

        if self.auth.credential_source == CredentialSource::Cookie
            && self.auth.cookie_name.trim().is_empty()
        {
            return Err(invalid(
                "auth.cookie_name must be set when credential_source is cookie",
            ));
        }

        Ok(())
    }

    /// Get the socket address the server binds to.
    ///
    /// # Errors
    ///
    /// Returns an error if host and port do not form a socket address.
    pub fn bind_address(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| invalid(format!("invalid bind address: {e}")))
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the uploads directory, resolving defaults if not set.
    #[must_use]
    pub fn uploads_dir(&self) -> PathBuf {
        self.uploads
            .directory
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(UPLOADS_DIR_NAME))
    }

    /// Get the token lifetime as a Duration.
    #[must_use]
    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.auth.token_ttl_minutes.saturating_mul(60))
    }
}

fn invalid(message: impl Into<String>) -> Error {
    Error::ConfigValidation {
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.auth.token_ttl_minutes, 60);
        assert_eq!(config.auth.bcrypt_cost, 10);
        assert_eq!(
            config.auth.credential_source,
            CredentialSource::AuthorizationHeader
        );
    }

    #[test]
    fn test_default_allowed_origins() {
        let server = ServerConfig::default();
        assert!(server
            .allowed_origins
            .contains(&"http://localhost:4200".to_string()));
        assert_eq!(server.max_body_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_zero_port() {
        let mut config = Config::default();
        config.server.port = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("server.port"));
    }

    #[test]
    fn test_validate_empty_secret() {
        let mut config = Config::default();
        config.auth.jwt_secret = "  ".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("jwt_secret"));
    }

    #[test]
    fn test_validate_zero_ttl() {
        let mut config = Config::default();
        config.auth.token_ttl_minutes = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("token_ttl_minutes"));
    }

    #[test]
    fn test_validate_bcrypt_cost_bounds() {
        let mut config = Config::default();
        config.auth.bcrypt_cost = 3;
        assert!(config.validate().is_err());

        config.auth.bcrypt_cost = 32;
        assert!(config.validate().is_err());

        config.auth.bcrypt_cost = 4;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_cookie_source_needs_name() {
        let mut config = Config::default();
        config.auth.credential_source = CredentialSource::Cookie;
        config.auth.cookie_name = String::new();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("cookie_name"));
    }

    #[test]
    fn test_validate_bad_origin() {
        let mut config = Config::default();
        config.server.allowed_origins = vec!["http://bad\norigin".to_string()];

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("CORS origin"));
    }

    #[test]
    fn test_bind_address() {
        let config = Config::default();
        let addr = config.bind_address().unwrap();
        assert_eq!(addr.port(), 3000);

        let mut config = Config::default();
        config.server.host = "not a host".to_string();
        assert!(config.bind_address().is_err());
    }

    #[test]
    fn test_database_path_default() {
        let config = Config::default();
        assert!(config
            .database_path()
            .to_string_lossy()
            .contains("fakerestaurant.db"));
    }

    #[test]
    fn test_database_path_custom() {
        let mut config = Config::default();
        config.storage.database_path = Some(PathBuf::from("/custom/path/db.sqlite"));

        assert_eq!(
            config.database_path(),
            PathBuf::from("/custom/path/db.sqlite")
        );
    }

    #[test]
    fn test_uploads_dir_default() {
        let config = Config::default();
        let path = config.uploads_dir();
        assert!(path.ends_with("fakerestaurant/uploads"));
    }

    #[test]
    fn test_token_ttl() {
        let config = Config::default();
        assert_eq!(config.token_ttl(), Duration::from_secs(3600));
    }

    #[test]
    fn test_validate_huge_ttl() {
        let mut config = Config::default();
        config.auth.token_ttl_minutes = u64::MAX / 2;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("token_ttl_minutes"));
        assert_eq!(config.token_ttl(), Duration::from_secs(u64::MAX));

        config.auth.token_ttl_minutes = MAX_TOKEN_TTL_MINUTES;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("fakerestaurant"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        let result = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml")));
        assert!(result.is_ok());
    }

    #[test]
    fn test_load_from_toml_file() {
        let path = std::env::temp_dir().join(format!(
            "fakerestaurant_config_test_{}.toml",
            std::process::id()
        ));
        std::fs::write(
            &path,
            r#"
[server]
port = 8080

[auth]
credential_source = "cookie"
cookie_name = "session"
jwt_secret = "from-the-file"
"#,
        )
        .unwrap();

        let config = Config::load_from(Some(path.clone())).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.auth.credential_source, CredentialSource::Cookie);
        assert_eq!(config.auth.cookie_name, "session");
        assert_eq!(config.auth.jwt_secret, "from-the-file");
        // Untouched sections keep their defaults
        assert_eq!(config.auth.token_ttl_minutes, 60);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_credential_source_serde() {
        let json = serde_json::to_string(&CredentialSource::AuthorizationHeader).unwrap();
        assert_eq!(json, "\"authorization_header\"");

        let parsed: CredentialSource = serde_json::from_str("\"cookie\"").unwrap();
        assert_eq!(parsed, CredentialSource::Cookie);
    }

    #[test]
    fn test_config_clone() {
        let config = Config::default();
        let cloned = config.clone();
        assert_eq!(config, cloned);
    }
}
