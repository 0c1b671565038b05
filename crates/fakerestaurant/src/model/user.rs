//! User accounts.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Minimum accepted password length.
pub const MIN_PASSWORD_LEN: usize = 6;

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid"));

/// A registered user, as exposed to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Row identifier.
    pub user_id: i64,
    /// Unique login name.
    pub username: String,
    /// Unique contact address.
    pub email: String,
    /// Registration time.
    pub created_at: DateTime<Utc>,
}

/// Stored credentials of a user, used only by the login path.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    /// Row identifier.
    pub user_id: i64,
    /// bcrypt hash of the password.
    pub password_hash: String,
}

/// A validated registration request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    /// Login name, trimmed.
    pub username: String,
    /// Contact address, trimmed.
    pub email: String,
    /// Plain password; hashed before it reaches storage.
    pub password: String,
}

impl NewUser {
    /// Validate raw registration fields.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if a field is missing, the email is
    /// malformed, or the password is too short.
    pub fn validate(
        username: Option<String>,
        password: Option<String>,
        email: Option<String>,
    ) -> Result<Self> {
        let (Some(username), Some(password), Some(email)) = (
            non_blank(username),
            password.filter(|p| !p.is_empty()),
            non_blank(email),
        ) else {
            return Err(Error::invalid_argument(
                "username, password and email are required",
            ));
        };

        if !EMAIL_PATTERN.is_match(&email) {
            return Err(Error::invalid_argument(format!(
                "\"{email}\" is not a valid email address"
            )));
        }

        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(Error::invalid_argument(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        Ok(Self {
            username,
            email,
            password,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
