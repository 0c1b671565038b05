//! User account queries.

use rusqlite::{params, OptionalExtension};
use tracing::debug;

use super::{timestamp_column, timestamp_now, Storage};
use crate::error::{is_unique_violation, Error, Result};
use crate::model::{NewUser, User, UserCredentials};

impl Storage {
    /// Insert a new user with an already hashed password.
    ///
    /// # Errors
    ///
    /// Returns `Conflict` if the username or email is taken, or an error if
    /// the database operation fails.
    pub fn create_user(&self, user: &NewUser, password_hash: &str) -> Result<User> {
        let now = timestamp_now();
        self.conn
            .execute(
                r"
                INSERT INTO users (username, email, password_hash, created_at)
                VALUES (?1, ?2, ?3, ?4)
                ",
                params![user.username, user.email, password_hash, now],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    Error::conflict("username or email already in use")
                } else {
                    Error::from(e)
                }
            })?;

        let user_id = self.conn.last_insert_rowid();
        debug!("Created user {} ({})", user_id, user.username);
        self.get_user(user_id)?
            .ok_or_else(|| Error::internal(format!("user {user_id} vanished after insert")))
    }

    /// Get a user by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_user(&self, user_id: i64) -> Result<Option<User>> {
        let user = self
            .conn
            .query_row(
                "SELECT user_id, username, email, created_at FROM users WHERE user_id = ?1",
                [user_id],
                |row| {
                    Ok(User {
                        user_id: row.get(0)?,
                        username: row.get(1)?,
                        email: row.get(2)?,
                        created_at: timestamp_column(row, 3)?,
                    })
                },
            )
            .optional()?;
        Ok(user)
    }

    /// Look up the stored credentials for a username.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn find_credentials(&self, username: &str) -> Result<Option<UserCredentials>> {
        let credentials = self
            .conn
            .query_row(
                "SELECT user_id, password_hash FROM users WHERE username = ?1",
                [username],
                |row| {
                    Ok(UserCredentials {
                        user_id: row.get(0)?,
                        password_hash: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(credentials)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password: "secret1".to_string(),
        }
    }

    #[test]
    fn test_create_and_get_user() {
        let storage = storage();
        let user = storage
            .create_user(&new_user("alice", "alice@example.com"), "hash")
            .unwrap();

        let fetched = storage.get_user(user.user_id).unwrap().unwrap();
        assert_eq!(fetched, user);
        assert_eq!(fetched.username, "alice");
    }

    #[test]
    fn test_duplicate_username_conflicts() {
        let storage = storage();
        storage
            .create_user(&new_user("alice", "alice@example.com"), "hash")
            .unwrap();

        let err = storage
            .create_user(&new_user("alice", "other@example.com"), "hash")
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn test_duplicate_email_conflicts() {
        let storage = storage();
        storage
            .create_user(&new_user("alice", "alice@example.com"), "hash")
            .unwrap();

        let err = storage
            .create_user(&new_user("bob", "alice@example.com"), "hash")
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn test_find_credentials() {
        let storage = storage();
        let id = user(&storage, "carol");

        let creds = storage.find_credentials("carol").unwrap().unwrap();
        assert_eq!(creds.user_id, id);
        assert_eq!(creds.password_hash, "not-a-real-hash");

        assert!(storage.find_credentials("nobody").unwrap().is_none());
    }

    #[test]
    fn test_get_missing_user() {
        let storage = storage();
        assert!(storage.get_user(404).unwrap().is_none());
    }
}
