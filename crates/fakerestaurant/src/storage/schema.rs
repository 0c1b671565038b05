//! `SQLite` schema definitions for fakerestaurant.
//!
//! Referential integrity and cascades are left to the engine: every child
//! table references its parent with `ON DELETE CASCADE`, and connections run
//! with `PRAGMA foreign_keys = ON`.

/// SQL statement to create the users table.
pub const CREATE_USERS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS users (
    user_id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE,
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    created_at TEXT NOT NULL
)
";

/// SQL statement to create the restaurants table.
pub const CREATE_RESTAURANTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS restaurants (
    restaurant_id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    description TEXT NOT NULL,
    latitude REAL NOT NULL,
    longitude REAL NOT NULL,
    image_path TEXT,
    creator_user_id INTEGER NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
";

/// SQL statement to create the reviews table.
pub const CREATE_REVIEWS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS reviews (
    review_id INTEGER PRIMARY KEY AUTOINCREMENT,
    content TEXT NOT NULL,
    rating INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 5),
    author_user_id INTEGER NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    restaurant_id INTEGER NOT NULL REFERENCES restaurants(restaurant_id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
";

/// SQL statement to create the votes table.
///
/// The unique constraint on `(review_id, voter_user_id)` is what keeps the
/// one-vote-per-user-per-review invariant under concurrent submissions.
pub const CREATE_VOTES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS votes (
    vote_id INTEGER PRIMARY KEY AUTOINCREMENT,
    vote_type TEXT NOT NULL CHECK (vote_type IN ('upvote', 'downvote')),
    voter_user_id INTEGER NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    review_id INTEGER NOT NULL REFERENCES reviews(review_id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE (review_id, voter_user_id)
)
";

/// SQL statement to create an index on restaurant name for the name filter.
pub const CREATE_RESTAURANT_NAME_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_restaurants_name ON restaurants(name)
";

/// SQL statement to create an index on `restaurant_id` for review listings.
pub const CREATE_REVIEW_RESTAURANT_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_reviews_restaurant ON reviews(restaurant_id)
";

/// SQL statement to create an index on `author_user_id` for user histories.
pub const CREATE_REVIEW_AUTHOR_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_reviews_author ON reviews(author_user_id)
";

/// SQL statement to create an index on `voter_user_id` for a user's votes.
pub const CREATE_VOTE_VOTER_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_votes_voter ON votes(voter_user_id)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_USERS_TABLE,
    CREATE_RESTAURANTS_TABLE,
    CREATE_REVIEWS_TABLE,
    CREATE_VOTES_TABLE,
    CREATE_RESTAURANT_NAME_INDEX,
    CREATE_REVIEW_RESTAURANT_INDEX,
    CREATE_REVIEW_AUTHOR_INDEX,
    CREATE_VOTE_VOTER_INDEX,
    CREATE_METADATA_TABLE,
];
