//! Password hashing, session tokens and credential lookup.
//!
//! Passwords are stored as bcrypt hashes. A successful login yields an HS256
//! JWT carrying the user id; later requests present it through whichever
//! [`CredentialProvider`] the server is configured with.

use std::fmt;

use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{AuthConfig, CredentialSource};
use crate::error::{Error, Result};

/// Hash a password with the given bcrypt cost.
///
/// # Errors
///
/// Returns an error if bcrypt rejects the cost or fails internally.
pub fn hash_password(password: &str, cost: u32) -> Result<String> {
    Ok(bcrypt::hash(password, cost)?)
}

/// Check a password against a stored bcrypt hash.
///
/// A malformed stored hash counts as a mismatch.
#[must_use]
pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Authenticated user.
    #[serde(rename = "userId")]
    pub user_id: i64,
    /// Issued-at, seconds since the epoch.
    pub iat: i64,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
}

/// Signs and verifies session tokens with a shared HMAC secret.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl_seconds: i64,
}

impl fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("ttl_seconds", &self.ttl_seconds)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    /// Build an issuer from the auth configuration.
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        let secret = config.jwt_secret.as_bytes();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
            ttl_seconds: i64::try_from(config.token_ttl_minutes.saturating_mul(60))
                .unwrap_or(i64::MAX),
        }
    }

    /// Issue a token for `user_id`, valid for the configured lifetime.
    ///
    /// # Errors
    ///
    /// Returns `TokenSign` if encoding fails.
    pub fn issue(&self, user_id: i64) -> Result<String> {
        let iat = Utc::now().timestamp();
        let claims = Claims {
            user_id,
            iat,
            exp: iat.saturating_add(self.ttl_seconds),
        };
        self.sign(&claims)
    }

    fn sign(&self, claims: &Claims) -> Result<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding).map_err(Error::TokenSign)
    }

    /// Verify a token and return its claims.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` if the token is malformed, forged or expired.
    pub fn verify(&self, token: &str) -> Result<Claims> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!("Rejected token: {}", e);
                Error::unauthorized("invalid or expired token")
            })
    }
}

/// Finds the caller's raw token in an incoming request.
///
/// The server holds exactly one provider, chosen from
/// [`AuthConfig::credential_source`].
pub trait CredentialProvider: Send + Sync + fmt::Debug {
    /// Extract the token, if the request carries one.
    fn credential(&self, headers: &HeaderMap) -> Option<String>;

    /// The cookie that hands `token` to the client on login, for providers
    /// that read from a cookie.
    fn issue_cookie(&self, _token: String, _max_age_seconds: i64) -> Option<Cookie<'static>> {
        None
    }
}

/// Reads `Authorization: Bearer <token>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BearerHeader;

impl CredentialProvider for BearerHeader {
    fn credential(&self, headers: &HeaderMap) -> Option<String> {
        let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
        let (scheme, token) = value.split_once(' ')?;
        let token = token.trim();
        (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then(|| token.to_string())
    }
}

/// Reads a named cookie.
#[derive(Debug, Clone)]
pub struct CookieCredential {
    name: String,
}

impl CookieCredential {
    /// Read the cookie called `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl CredentialProvider for CookieCredential {
    fn credential(&self, headers: &HeaderMap) -> Option<String> {
        let jar = CookieJar::from_headers(headers);
        let value = jar.get(&self.name)?.value_trimmed();
        (!value.is_empty()).then(|| value.to_string())
    }

    fn issue_cookie(&self, token: String, max_age_seconds: i64) -> Option<Cookie<'static>> {
        Some(
            Cookie::build((self.name.clone(), token))
                .http_only(true)
                .same_site(SameSite::Lax)
                .path("/")
                .max_age(cookie::time::Duration::seconds(max_age_seconds))
                .build(),
        )
    }
}

/// Build the provider selected by the configuration.
#[must_use]
pub fn credential_provider(config: &AuthConfig) -> Box<dyn CredentialProvider> {
    match config.credential_source {
        CredentialSource::AuthorizationHeader => Box::new(BearerHeader),
        CredentialSource::Cookie => Box::new(CookieCredential::new(config.cookie_name.clone())),
    }
}
