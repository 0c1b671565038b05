//! Reviews and their read-side projections.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Lowest accepted star rating.
pub const MIN_RATING: i64 = 1;

/// Highest accepted star rating.
pub const MAX_RATING: i64 = 5;

/// A review as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    /// Row identifier.
    pub review_id: i64,
    /// Review text.
    pub content: String,
    /// Star rating, 1 to 5.
    pub rating: i64,
    /// Author.
    pub author_user_id: i64,
    /// Reviewed restaurant.
    pub restaurant_id: i64,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

/// A validated review to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReview {
    /// Reviewed restaurant.
    pub restaurant_id: i64,
    /// Review text, trimmed.
    pub content: String,
    /// Star rating.
    pub rating: i64,
}

impl NewReview {
    /// Validate raw review fields.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if a field is missing, the content is blank,
    /// or the rating is outside `1..=5`.
    pub fn validate(
        restaurant_id: Option<i64>,
        content: Option<String>,
        rating: Option<i64>,
    ) -> Result<Self> {
        let restaurant_id =
            restaurant_id.ok_or_else(|| Error::invalid_argument("restaurantId is required"))?;
        let content = content
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| Error::invalid_argument("content is required"))?;
        let rating = rating.ok_or_else(|| Error::invalid_argument("rating is required"))?;

        if !(MIN_RATING..=MAX_RATING).contains(&rating) {
            return Err(Error::invalid_argument(format!(
                "rating must be between {MIN_RATING} and {MAX_RATING}"
            )));
        }

        Ok(Self {
            restaurant_id,
            content,
            rating,
        })
    }
}

/// A review in a restaurant's listing, with author name and vote counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantReview {
    /// Review id.
    pub id: i64,
    /// Reviewed restaurant.
    pub restaurant_id: i64,
    /// Author id.
    pub user_id: i64,
    /// Author name.
    pub username: String,
    /// Review text.
    pub content: String,
    /// Star rating.
    pub rating: i64,
    /// Upvote count at read time.
    pub upvotes: i64,
    /// Downvote count at read time.
    pub downvotes: i64,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

/// A review in a user's history, with the restaurant name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserReview {
    /// Review id.
    pub id: i64,
    /// Review text.
    pub content: String,
    /// Star rating.
    pub rating: i64,
    /// Reviewed restaurant.
    pub restaurant_id: i64,
    /// Restaurant name.
    pub restaurant_name: String,
    /// Author id.
    pub author_id: i64,
    /// Author name.
    pub author_name: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

/// Ordering of a restaurant's reviews.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewSort {
    /// Highest score first, newest first on ties.
    #[default]
    Votes,
    /// Newest first.
    Date,
}

impl FromStr for ReviewSort {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "votes" => Ok(Self::Votes),
            "date" => Ok(Self::Date),
            other => Err(Error::invalid_argument(format!(
                "sortBy must be \"votes\" or \"date\", got \"{other}\""
            ))),
        }
    }
}
